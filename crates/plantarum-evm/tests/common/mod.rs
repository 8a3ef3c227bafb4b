//! In-memory `ChainReader` for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use plantarum_core::{ChainError, EventFilter, LogRange};
use plantarum_evm::{ChainReader, RawLog};

/// Canned answer for one `eth_call`.
#[derive(Clone)]
pub enum CallReply {
    Return(Vec<u8>),
    Revert(String),
    Down,
}

#[derive(Default)]
pub struct MockReader {
    pub head: u64,
    pub logs: Vec<RawLog>,
    /// Sub-range starts that fail with a transport error.
    pub failing_from: Vec<u64>,
    /// `(contract, calldata)` → reply. Unmatched calls revert.
    pub calls: HashMap<(String, Vec<u8>), CallReply>,
    pub queried: Mutex<Vec<LogRange>>,
    pub call_count: Mutex<usize>,
}

impl MockReader {
    pub fn with_logs(logs: Vec<RawLog>) -> Self {
        Self {
            logs,
            ..Default::default()
        }
    }

    pub fn queried(&self) -> Vec<LogRange> {
        self.queried.lock().unwrap().clone()
    }

    pub fn reply(mut self, contract: &str, calldata: Vec<u8>, reply: CallReply) -> Self {
        self.calls.insert((contract.to_string(), calldata), reply);
        self
    }
}

#[async_trait]
impl ChainReader for MockReader {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }

    async fn get_logs(
        &self,
        range: LogRange,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, ChainError> {
        self.queried.lock().unwrap().push(range);
        if self.failing_from.contains(&range.from_block) {
            return Err(ChainError::Rpc("HTTP 503: upstream unavailable".into()));
        }
        Ok(self
            .logs
            .iter()
            .filter(|l| {
                let Some(block) = l.block_number_u64() else {
                    return false;
                };
                block >= range.from_block && block <= range.to_block
            })
            .filter(|l| filter.matches_address(&l.address))
            .filter(|l| l.topics.first().map_or(false, |t| filter.matches_topic0(t)))
            .cloned()
            .collect())
    }

    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        *self.call_count.lock().unwrap() += 1;
        match self.calls.get(&(to.to_string(), data.to_vec())) {
            Some(CallReply::Return(bytes)) => Ok(bytes.clone()),
            Some(CallReply::Revert(msg)) => Err(ChainError::Reverted {
                message: msg.clone(),
                data: None,
            }),
            Some(CallReply::Down) => Err(ChainError::Rpc("connection refused".into())),
            None => Err(ChainError::Reverted {
                message: "execution reverted".into(),
                data: None,
            }),
        }
    }
}

/// A log at `(block, index)` with the given topics and data.
pub fn log(block: u64, index: u32, address: &str, topics: Vec<String>, data: &str) -> RawLog {
    RawLog {
        address: address.to_string(),
        topics,
        data: data.to_string(),
        block_number: format!("0x{block:x}"),
        block_hash: format!("0x{:064x}", block),
        tx_hash: format!("0x{:062x}{index:02x}", block),
        log_index: format!("0x{index:x}"),
        removed: None,
    }
}
