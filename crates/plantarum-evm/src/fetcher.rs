//! Chunked log fetcher.
//!
//! Splits a block range into sub-ranges no wider than `step` and issues one
//! `eth_getLogs` per sub-range, so a single query never trips the node's
//! range or result-size limits.

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use plantarum_core::{ChainError, EventFilter, LogRange};

use crate::reader::ChainReader;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash", default)]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number, `None` if it is not a hex quantity.
    pub fn block_number_u64(&self) -> Option<u64> {
        parse_hex_u64(&self.block_number)
    }

    /// Returns the log index, `None` if it is not a hex quantity or exceeds u32.
    pub fn log_index_u32(&self) -> Option<u32> {
        parse_hex_u64(&self.log_index).and_then(|i| u32::try_from(i).ok())
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }

    /// `(block, logIndex)`, the chain order of a log.
    pub fn position(&self) -> Option<(u64, u32)> {
        Some((self.block_number_u64()?, self.log_index_u32()?))
    }
}

/// Log fetcher over a `ChainReader`.
pub struct LogFetcher<R> {
    reader: R,
}

impl<R: ChainReader> LogFetcher<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Fetch the current chain head block number.
    pub async fn head_block_number(&self) -> Result<u64, ChainError> {
        self.reader.block_number().await
    }

    /// Fetch all logs in `range` matching `filter`, one sub-range at a time.
    ///
    /// Sub-range results are concatenated in ascending range order. Any
    /// sub-query failure aborts the whole fetch; there is no partial result.
    pub async fn fetch_logs(
        &self,
        filter: &EventFilter,
        range: LogRange,
        step: u64,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, ChainError> {
        let chunks = range.split(step)?;
        tracing::debug!(%range, step, chunks = range.chunk_count(step), "fetching logs");

        let mut all_logs = Vec::new();
        for chunk in chunks {
            let logs = self.fetch_chunk(filter, chunk, cancel).await?;
            all_logs.extend(logs);
        }
        Ok(all_logs)
    }

    /// Like [`fetch_logs`](Self::fetch_logs) with up to `concurrency` sub-queries
    /// in flight. The result is sorted by `(block, logIndex)`, never arrival order.
    /// The first failing sub-query aborts the fetch and drops every batch
    /// collected so far.
    pub async fn fetch_logs_concurrent(
        &self,
        filter: &EventFilter,
        range: LogRange,
        step: u64,
        concurrency: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, ChainError> {
        let chunks = range.split(step)?;
        tracing::debug!(
            %range,
            step,
            concurrency,
            chunks = range.chunk_count(step),
            "fetching logs concurrently"
        );

        let batches: Vec<Vec<RawLog>> = stream::iter(chunks)
            .map(|chunk| self.fetch_chunk(filter, chunk, cancel))
            .buffer_unordered(concurrency.max(1))
            .try_collect()
            .await?;

        let mut all_logs: Vec<RawLog> = batches.into_iter().flatten().collect();
        all_logs.sort_by_key(|l| l.position().unwrap_or_default());
        Ok(all_logs)
    }

    async fn fetch_chunk(
        &self,
        filter: &EventFilter,
        chunk: LogRange,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawLog>, ChainError> {
        if cancel.is_cancelled() {
            return Err(ChainError::Cancelled);
        }
        let logs = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChainError::Cancelled),
            logs = self.reader.get_logs(chunk, filter) => logs,
        };
        let logs = logs.map_err(|e| {
            tracing::warn!(range = %chunk, error = %e, "eth_getLogs sub-query failed");
            e
        })?;
        tracing::debug!(range = %chunk, count = logs.len(), "sub-range fetched");
        Ok(logs
            .into_iter()
            .filter(|l| !l.is_removed())
            .filter(|l| {
                let ok = l.position().is_some();
                if !ok {
                    tracing::warn!(
                        tx = %l.tx_hash,
                        block = %l.block_number,
                        log_index = %l.log_index,
                        "log with malformed position dropped"
                    );
                }
                ok
            })
            .collect())
    }
}

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> Option<u64> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).ok()
}
