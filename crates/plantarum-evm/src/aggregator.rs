//! Multi-contract token aggregator.
//!
//! For each token id the probes run in priority order; the first hit decides
//! the kind. Different ids are classified concurrently (bounded) and the
//! output keeps input order.

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use plantarum_core::{ChainError, MetadataSource, TokenKind, TokenRecord};

use crate::probe::KindProbe;

/// Default number of ids classified concurrently.
pub const DEFAULT_PROBE_CONCURRENCY: usize = 8;

/// What to do with ids no probe recognised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownPolicy {
    /// Drop them from the output.
    #[default]
    Exclude,
    /// Keep them as `kind = unknown` with null fields.
    Retain,
}

/// Aggregation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    pub unknown: UnknownPolicy,
    /// Skip hits whose on-chain `listed` flag is `false` and keep probing.
    pub listed_only: bool,
    pub concurrency: usize,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            unknown: UnknownPolicy::Exclude,
            listed_only: false,
            concurrency: DEFAULT_PROBE_CONCURRENCY,
        }
    }
}

/// Classifies token ids through an ordered list of probes.
pub struct Aggregator {
    probes: Vec<Arc<dyn KindProbe>>,
    metadata: Option<Arc<dyn MetadataSource>>,
    options: AggregateOptions,
}

impl Aggregator {
    pub fn builder() -> AggregatorBuilder {
        AggregatorBuilder::new()
    }

    pub fn options(&self) -> &AggregateOptions {
        &self.options
    }

    /// Probe kinds in priority order.
    pub fn kinds(&self) -> Vec<TokenKind> {
        self.probes.iter().map(|p| p.kind()).collect()
    }

    /// Classify every id. Transport failures and cancellation abort the whole
    /// call; probe misses and metadata failures never do.
    pub async fn aggregate(
        &self,
        ids: &[u64],
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenRecord>, ChainError> {
        tracing::debug!(
            ids = ids.len(),
            probes = self.probes.len(),
            concurrency = self.options.concurrency,
            "aggregating tokens"
        );

        let records: Vec<Option<TokenRecord>> = stream::iter(ids.iter().copied())
            .map(|id| self.classify(id, cancel))
            .buffered(self.options.concurrency.max(1))
            .try_collect()
            .await?;

        let records: Vec<TokenRecord> = records.into_iter().flatten().collect();
        tracing::info!(requested = ids.len(), kept = records.len(), "aggregation complete");
        Ok(records)
    }

    /// Run the probes for one id in priority order.
    ///
    /// With `listed_only`, an unlisted hit does not end the search: later
    /// probes still run, and an id whose every hit is unlisted is dropped
    /// whatever the unknown policy.
    async fn classify(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<TokenRecord>, ChainError> {
        let mut unlisted = false;
        for probe in &self.probes {
            if cancel.is_cancelled() {
                return Err(ChainError::Cancelled);
            }
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ChainError::Cancelled),
                outcome = probe.probe(id) => outcome?,
            };
            let record = match outcome {
                Ok(hit) => TokenRecord {
                    id,
                    kind: probe.kind(),
                    onchain_fields: Some(hit.fields),
                    offchain_metadata: None,
                    token_uri: hit.token_uri,
                },
                Err(miss) => {
                    tracing::trace!(id, %miss, "probe miss");
                    continue;
                }
            };
            if self.options.listed_only && record.is_listed() == Some(false) {
                tracing::trace!(id, kind = %record.kind, "not listed, trying next probe");
                unlisted = true;
                continue;
            }
            return Ok(Some(self.with_metadata(record).await));
        }

        if unlisted {
            tracing::debug!(id, "no listed hit, skipped");
            return Ok(None);
        }
        match self.options.unknown {
            UnknownPolicy::Exclude => {
                tracing::debug!(id, "no probe matched, excluded");
                Ok(None)
            }
            UnknownPolicy::Retain => Ok(Some(TokenRecord::unknown(id))),
        }
    }

    async fn with_metadata(&self, mut record: TokenRecord) -> TokenRecord {
        if let (Some(source), Some(uri)) = (&self.metadata, &record.token_uri) {
            match source.resolve(uri).await {
                Ok(doc) => record.offchain_metadata = Some(doc),
                Err(e) => tracing::warn!(id = record.id, uri = %uri, error = %e, "metadata unavailable"),
            }
        }
        record
    }
}

/// Fluent builder for [`Aggregator`].
///
/// ```rust,ignore
/// let aggregator = Aggregator::builder()
///     .probe(ContractProbe::project(reader.clone(), erc1155)?)
///     .probe(ContractProbe::carbon(reader, erc1155)?)
///     .unknown_policy(UnknownPolicy::Retain)
///     .build();
/// ```
#[derive(Default)]
pub struct AggregatorBuilder {
    probes: Vec<Arc<dyn KindProbe>>,
    metadata: Option<Arc<dyn MetadataSource>>,
    options: AggregateOptions,
}

impl AggregatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe; earlier probes win.
    pub fn probe(self, probe: impl KindProbe + 'static) -> Self {
        self.shared_probe(Arc::new(probe))
    }

    pub fn shared_probe(mut self, probe: Arc<dyn KindProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Resolve token URIs of hits through `source`.
    pub fn metadata(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(source);
        self
    }

    pub fn unknown_policy(mut self, policy: UnknownPolicy) -> Self {
        self.options.unknown = policy;
        self
    }

    pub fn listed_only(mut self, listed_only: bool) -> Self {
        self.options.listed_only = listed_only;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.options.concurrency = n.max(1);
        self
    }

    pub fn build(self) -> Aggregator {
        Aggregator {
            probes: self.probes,
            metadata: self.metadata,
            options: self.options,
        }
    }
}
