//! The chain-read seam: head block, log queries and read-only calls.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use plantarum_core::{ChainError, EventFilter, LogRange};
use plantarum_rpc::{RpcTransport, TransportError};

use crate::fetcher::RawLog;

/// Read-only access to an EVM node.
///
/// `RpcChainReader` speaks JSON-RPC; tests plug in in-memory readers.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Latest block number.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// One `eth_getLogs` request over `range`.
    async fn get_logs(
        &self,
        range: LogRange,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, ChainError>;

    /// `eth_call` against `to` at the latest block. A revert is `ChainError::Reverted`.
    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError>;
}

#[async_trait]
impl<R: ChainReader + ?Sized> ChainReader for Arc<R> {
    async fn block_number(&self) -> Result<u64, ChainError> {
        (**self).block_number().await
    }

    async fn get_logs(
        &self,
        range: LogRange,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, ChainError> {
        (**self).get_logs(range, filter).await
    }

    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        (**self).call(to, data).await
    }
}

/// `ChainReader` over any JSON-RPC transport.
#[derive(Debug, Clone)]
pub struct RpcChainReader<T> {
    transport: T,
}

impl<T: RpcTransport> RpcChainReader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<T: RpcTransport> ChainReader for RpcChainReader<T> {
    async fn block_number(&self) -> Result<u64, ChainError> {
        let hex: String = self
            .transport
            .call("eth_blockNumber", vec![])
            .await
            .map_err(chain_error)?;
        let trimmed = hex.strip_prefix("0x").unwrap_or(&hex);
        u64::from_str_radix(trimmed, 16)
            .map_err(|_| ChainError::InvalidResponse(format!("bad block number: {hex}")))
    }

    async fn get_logs(
        &self,
        range: LogRange,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, ChainError> {
        tracing::debug!(%range, url = self.transport.url(), "eth_getLogs");
        self.transport
            .call("eth_getLogs", vec![log_filter_params(range, filter)])
            .await
            .map_err(chain_error)
    }

    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        let params = vec![
            json!({ "to": to, "data": format!("0x{}", hex::encode(data)) }),
            json!("latest"),
        ];
        let ret: String = self
            .transport
            .call("eth_call", params)
            .await
            .map_err(chain_error)?;
        hex::decode(ret.strip_prefix("0x").unwrap_or(&ret))
            .map_err(|e| ChainError::InvalidResponse(format!("eth_call returned bad hex: {e}")))
    }
}

/// Build the `eth_getLogs` filter object.
pub fn log_filter_params(range: LogRange, filter: &EventFilter) -> Value {
    let mut params = json!({
        "fromBlock": format!("0x{:x}", range.from_block),
        "toBlock": format!("0x{:x}", range.to_block),
    });
    match filter.addresses.as_slice() {
        [] => {}
        [single] => params["address"] = json!(single),
        many => params["address"] = json!(many),
    }
    if !filter.topic0_values.is_empty() {
        params["topics"] = json!([filter.topic0_values]);
    }
    params
}

fn chain_error(err: TransportError) -> ChainError {
    match err {
        TransportError::Rpc(e) if e.is_revert() => ChainError::Reverted {
            data: e.revert_data(),
            message: e.message,
        },
        TransportError::Deserialization(e) => ChainError::InvalidResponse(e.to_string()),
        other => ChainError::Rpc(other.to_string()),
    }
}
