//! Fluent builder for log queries.
//!
//! # Example
//!
//! ```rust,ignore
//! use plantarum_evm::{catalog, LogQuery};
//!
//! let decoder = catalog::treasury_events()?;
//! let query = LogQuery::new()
//!     .address("0x5FbDB2315678afecb367f032d93F642f64180aa3")
//!     .topics(decoder.topic0s())
//!     .from_block(0)
//!     .to_block(5_000)
//!     .step(2_000);
//! let (range, logs) = query.run(&fetcher, &cancel).await?;
//! ```

use tokio_util::sync::CancellationToken;

use plantarum_core::{ChainError, EventFilter, LogRange, DEFAULT_LOG_STEP};

use crate::fetcher::{LogFetcher, RawLog};
use crate::reader::ChainReader;

/// Blocks covered when no lower bound is given.
pub const DEFAULT_WINDOW: u64 = 100;

/// A chunked log query.
///
/// Missing bounds are filled from the chain head: `to` defaults to the head,
/// `from` to `to - window` (clamped at genesis). An explicit `to` past the
/// head is clamped to the head.
#[derive(Debug, Clone)]
pub struct LogQuery {
    filter: EventFilter,
    from_block: Option<u64>,
    to_block: Option<u64>,
    window: u64,
    step: u64,
    concurrency: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            filter: EventFilter::default(),
            from_block: None,
            to_block: None,
            window: DEFAULT_WINDOW,
            step: DEFAULT_LOG_STEP,
            concurrency: 1,
        }
    }
}

impl LogQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a contract address.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.filter.addresses.push(address.into());
        self
    }

    /// Accept these topic0 values (event signature hashes).
    pub fn topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter
            .topic0_values
            .extend(topics.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn from_block(mut self, block: u64) -> Self {
        self.from_block = Some(block);
        self
    }

    pub fn to_block(mut self, block: u64) -> Self {
        self.to_block = Some(block);
        self
    }

    /// Optional bounds, as they arrive from query strings.
    pub fn bounds(mut self, from: Option<u64>, to: Option<u64>) -> Self {
        self.from_block = from;
        self.to_block = to;
        self
    }

    /// Blocks to look back when `from` is not set.
    pub fn window(mut self, blocks: u64) -> Self {
        self.window = blocks;
        self
    }

    /// Maximum sub-range width.
    pub fn step(mut self, step: u64) -> Self {
        self.step = step;
        self
    }

    /// Sub-queries in flight; `1` means strictly sequential.
    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    pub fn event_filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Resolve the block range against the current chain head.
    pub async fn resolve_range<R: ChainReader>(
        &self,
        fetcher: &LogFetcher<R>,
    ) -> Result<LogRange, ChainError> {
        let head = fetcher.head_block_number().await?;
        let to = match self.to_block {
            Some(to) if to > head => {
                tracing::debug!(to, head, "upper bound past chain head, clamped");
                head
            }
            Some(to) => to,
            None => head,
        };
        match self.from_block {
            Some(from) => LogRange::new(from, to),
            None => Ok(LogRange::trailing(to, self.window)),
        }
    }

    /// Resolve the range and fetch every matching log in it.
    pub async fn run<R: ChainReader>(
        &self,
        fetcher: &LogFetcher<R>,
        cancel: &CancellationToken,
    ) -> Result<(LogRange, Vec<RawLog>), ChainError> {
        let range = self.resolve_range(fetcher).await?;
        let logs = if self.concurrency > 1 {
            fetcher
                .fetch_logs_concurrent(&self.filter, range, self.step, self.concurrency, cancel)
                .await?
        } else {
            fetcher.fetch_logs(&self.filter, range, self.step, cancel).await?
        };
        tracing::debug!(%range, logs = logs.len(), "log query complete");
        Ok((range, logs))
    }
}
