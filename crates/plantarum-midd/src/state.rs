//! Shared application state, built once at start-up.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use plantarum_core::{ChainError, LogRange, MetadataSource, MiddConfig, TokenRecord};
use plantarum_evm::{
    decoder::sort_recent_first, enumerate_tokens, AccountView, Aggregator, Catalog, ChainReader,
    ContractProbe, DecodeError, DecodedEvent, EventDecoder, LogFetcher, LogQuery, UnknownPolicy,
};
use plantarum_ipfs::PinningClient;

use crate::error::ApiError;

/// Handles shared by every request. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service_name: String,
    pub pinning: Arc<dyn PinningClient>,
    /// `None` when no RPC endpoint is configured.
    pub chain: Option<Arc<ChainContext>>,
    pub max_body_bytes: Option<usize>,
    /// Cancelled on shutdown; in-flight chain reads abort.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service_name: impl Into<String>, pinning: Arc<dyn PinningClient>) -> Self {
        Self {
            service_name: service_name.into(),
            pinning,
            chain: None,
            max_body_bytes: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_chain(mut self, chain: ChainContext) -> Self {
        self.chain = Some(Arc::new(chain));
        self
    }

    pub fn with_body_limit(mut self, limit: Option<usize>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn chain(&self) -> Result<&ChainContext, ApiError> {
        self.chain
            .as_deref()
            .ok_or_else(|| ApiError::Unavailable("RPC_URL is not configured".into()))
    }
}

/// Contract addresses for the chain-backed routes.
#[derive(Debug, Clone, Default)]
pub struct Contracts {
    pub dao: Option<String>,
    pub treasury: Option<String>,
    pub token721: Option<String>,
    pub token1155: Option<String>,
    pub kyc: Option<String>,
    pub reputation: Option<String>,
}

/// Decoded events of one contract over a resolved block range.
///
/// Carries its own `ok` inside the response envelope, as existing clients
/// read `data.ok`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    pub ok: bool,
    pub from_block: u64,
    pub to_block: u64,
    pub events: Vec<DecodedEvent>,
}

/// Read-only chain access plus the settings the chain routes need.
pub struct ChainContext {
    reader: Arc<dyn ChainReader>,
    fetcher: LogFetcher<Arc<dyn ChainReader>>,
    pub contracts: Contracts,
    pub log_step: u64,
    pub fetch_concurrency: usize,
    pub probe_concurrency: usize,
    pub event_window: u64,
    metadata: Option<Arc<dyn MetadataSource>>,
    dao_events: EventDecoder,
    treasury_events: EventDecoder,
}

impl ChainContext {
    pub fn new(reader: Arc<dyn ChainReader>, contracts: Contracts) -> Result<Self, DecodeError> {
        let chain = plantarum_core::ChainConfig::default();
        Ok(Self {
            fetcher: LogFetcher::new(reader.clone()),
            reader,
            contracts,
            log_step: chain.log_step,
            fetch_concurrency: chain.fetch_concurrency,
            probe_concurrency: chain.probe_concurrency,
            event_window: MiddConfig::default().default_event_window,
            metadata: None,
            dao_events: Catalog::Dao.decoder()?,
            treasury_events: Catalog::Treasury.decoder()?,
        })
    }

    /// Settings and addresses taken from the middleware config.
    pub fn from_config(reader: Arc<dyn ChainReader>, config: &MiddConfig) -> Result<Self, DecodeError> {
        let contracts = Contracts {
            dao: config.dao_address.clone(),
            treasury: config.treasury_address.clone(),
            token721: config.token721_address.clone(),
            token1155: config.token1155_address.clone(),
            kyc: config.kyc_address.clone(),
            reputation: config.reputation_address.clone(),
        };
        let mut ctx = Self::new(reader, contracts)?;
        if let Some(chain) = &config.chain {
            ctx.log_step = chain.log_step;
            ctx.fetch_concurrency = chain.fetch_concurrency;
            ctx.probe_concurrency = chain.probe_concurrency;
        }
        ctx.event_window = config.default_event_window;
        Ok(ctx)
    }

    /// Resolve token URIs of marketplace hits through `source`.
    pub fn with_metadata(mut self, source: Arc<dyn MetadataSource>) -> Self {
        self.metadata = Some(source);
        self
    }

    /// Every log of `address` in the range, decoded against `catalog`.
    ///
    /// Without `from`, DAO events cover the last `event_window` blocks and
    /// treasury history starts at genesis.
    pub async fn events(
        &self,
        catalog: Catalog,
        address: &str,
        from: Option<u64>,
        to: Option<u64>,
        cancel: &CancellationToken,
    ) -> Result<EventPage, ChainError> {
        let (decoder, window) = match catalog {
            Catalog::Dao => (&self.dao_events, self.event_window),
            Catalog::Treasury => (&self.treasury_events, u64::MAX),
        };
        let (range, logs): (LogRange, _) = LogQuery::new()
            .address(address)
            .bounds(from, to)
            .window(window)
            .step(self.log_step)
            .concurrency(self.fetch_concurrency)
            .run(&self.fetcher, cancel)
            .await?;
        let mut events = decoder.decode_all(&logs);
        if catalog == Catalog::Treasury {
            sort_recent_first(&mut events);
        }
        tracing::info!(%catalog, %range, events = events.len(), "event history served");
        Ok(EventPage {
            ok: true,
            from_block: range.from_block,
            to_block: range.to_block,
            events,
        })
    }

    /// `getKYCStatus(account)` on the KYC contract.
    pub async fn kyc_status(&self, contract: &str, account: &str) -> Result<Value, ChainError> {
        AccountView::kyc_status(self.reader.clone(), contract)?
            .read(account)
            .await
    }

    /// `getReputation(account)` on the reputation contract, as a decimal string.
    pub async fn reputation(&self, contract: &str, account: &str) -> Result<Value, ChainError> {
        AccountView::reputation(self.reader.clone(), contract)?
            .read(account)
            .await
    }

    /// ERC-1155 (project, then carbon) and ERC-721 (forest) tokens, classified.
    pub async fn marketplace(
        &self,
        listed_only: bool,
        retain_unknown: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<TokenRecord>, ChainError> {
        let policy = if retain_unknown {
            UnknownPolicy::Retain
        } else {
            UnknownPolicy::Exclude
        };
        let mut records = Vec::new();

        if let Some(erc1155) = &self.contracts.token1155 {
            let aggregator = self
                .aggregator(listed_only, policy)
                .probe(ContractProbe::project(self.reader.clone(), erc1155.clone())?)
                .probe(ContractProbe::carbon(self.reader.clone(), erc1155.clone())?)
                .build();
            let ids = enumerate_tokens(&*self.reader, erc1155).await?;
            records.extend(aggregator.aggregate(&ids, cancel).await?);
        }
        if let Some(erc721) = &self.contracts.token721 {
            let aggregator = self
                .aggregator(listed_only, policy)
                .probe(ContractProbe::forest(self.reader.clone(), erc721.clone())?)
                .build();
            let ids = enumerate_tokens(&*self.reader, erc721).await?;
            records.extend(aggregator.aggregate(&ids, cancel).await?);
        }
        Ok(records)
    }

    fn aggregator(&self, listed_only: bool, policy: UnknownPolicy) -> plantarum_evm::AggregatorBuilder {
        let builder = Aggregator::builder()
            .listed_only(listed_only)
            .unknown_policy(policy)
            .concurrency(self.probe_concurrency);
        match &self.metadata {
            Some(source) => builder.metadata(source.clone()),
            None => builder,
        }
    }
}
