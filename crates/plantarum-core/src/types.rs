//! Shared types for log reconciliation, token aggregation and pinning.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::ChainError;

/// Named on-chain or decoded fields, in declaration order.
pub type Fields = IndexMap<String, Value>;

// ─── LogRange ────────────────────────────────────────────────────────────────

/// A closed block range `[from_block, to_block]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRange {
    pub from_block: u64,
    pub to_block: u64,
}

impl LogRange {
    /// Build a range, rejecting `from > to`.
    pub fn new(from_block: u64, to_block: u64) -> Result<Self, ChainError> {
        if from_block > to_block {
            return Err(ChainError::InvalidRange {
                from: from_block,
                to: to_block,
            });
        }
        Ok(Self {
            from_block,
            to_block,
        })
    }

    /// The `count` most recent blocks ending at `head` (clamped at genesis).
    pub fn trailing(head: u64, count: u64) -> Self {
        Self {
            from_block: head.saturating_sub(count),
            to_block: head,
        }
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> u64 {
        (self.to_block - self.from_block).saturating_add(1)
    }

    /// Split into consecutive closed sub-ranges no wider than `step` blocks.
    ///
    /// Sub-ranges are produced lazily, so the width of `self` never drives an
    /// allocation.
    pub fn split(&self, step: u64) -> Result<SubRanges, ChainError> {
        if step == 0 {
            return Err(ChainError::InvalidStep);
        }
        Ok(SubRanges {
            next: Some(self.from_block),
            to_block: self.to_block,
            step,
        })
    }

    /// Number of sub-ranges [`split`](Self::split) yields for `step`.
    pub fn chunk_count(&self, step: u64) -> u64 {
        if step == 0 {
            return 0;
        }
        let span = self.to_block - self.from_block;
        span / step + 1
    }
}

/// Iterator over the sub-ranges of a [`LogRange`], in ascending order.
#[derive(Debug, Clone)]
pub struct SubRanges {
    next: Option<u64>,
    to_block: u64,
    step: u64,
}

impl Iterator for SubRanges {
    type Item = LogRange;

    fn next(&mut self) -> Option<LogRange> {
        let start = self.next?;
        let end = start.saturating_add(self.step - 1).min(self.to_block);
        self.next = if end == self.to_block { None } else { Some(end + 1) };
        Some(LogRange {
            from_block: start,
            to_block: end,
        })
    }
}

impl fmt::Display for LogRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.from_block, self.to_block)
    }
}

// ─── EventFilter ─────────────────────────────────────────────────────────────

/// Which logs to request from the node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFilter {
    /// Contract addresses (empty = all addresses).
    pub addresses: Vec<String>,
    /// Accepted topic0 values, i.e. event signature hashes (empty = all events).
    pub topic0_values: Vec<String>,
}

impl EventFilter {
    /// Create a filter for a single contract address.
    pub fn address(addr: impl Into<String>) -> Self {
        Self {
            addresses: vec![addr.into()],
            ..Default::default()
        }
    }

    /// Add a topic0 filter (event signature hash).
    pub fn topic0(mut self, topic: impl Into<String>) -> Self {
        self.topic0_values.push(topic.into());
        self
    }

    /// Returns `true` if `address` matches this filter.
    pub fn matches_address(&self, address: &str) -> bool {
        self.addresses.is_empty()
            || self.addresses.iter().any(|a| a.eq_ignore_ascii_case(address))
    }

    /// Returns `true` if `topic0` matches this filter.
    pub fn matches_topic0(&self, topic0: &str) -> bool {
        self.topic0_values.is_empty()
            || self.topic0_values.iter().any(|t| t.eq_ignore_ascii_case(topic0))
    }
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Asset category a token id was found to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// ERC-721 forest asset (`getTokenMeta`).
    Forest,
    /// ERC-1155 forestry project (`getProjectMeta`).
    Project,
    /// ERC-1155 carbon credit (`getCarbonMeta`).
    Carbon,
    /// No probe matched.
    Unknown,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forest => write!(f, "forest"),
            Self::Project => write!(f, "project"),
            Self::Carbon => write!(f, "carbon"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One aggregated token, rebuilt on every aggregation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: u64,
    pub kind: TokenKind,
    pub onchain_fields: Option<Fields>,
    pub offchain_metadata: Option<Value>,
    #[serde(rename = "tokenURI")]
    pub token_uri: Option<String>,
}

impl TokenRecord {
    /// A record for an id no probe recognised.
    pub fn unknown(id: u64) -> Self {
        Self {
            id,
            kind: TokenKind::Unknown,
            onchain_fields: None,
            offchain_metadata: None,
            token_uri: None,
        }
    }

    /// The on-chain `listed` flag, if the accessor exposes one.
    pub fn is_listed(&self) -> Option<bool> {
        self.onchain_fields
            .as_ref()?
            .get("listed")
            .and_then(Value::as_bool)
    }
}

// ─── Pinning ─────────────────────────────────────────────────────────────────

/// Outcome of pinning a payload to content-addressed storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinResult {
    /// Content identifier (CID) assigned by the pinning service.
    pub content_id: String,
    /// Pinned size in bytes.
    pub size: u64,
    pub mime_type: Option<String>,
    /// RFC 3339 timestamp.
    pub timestamp: String,
}

impl PinResult {
    /// The `ipfs://` URI for this content.
    pub fn uri(&self) -> String {
        format!("ipfs://{}", self.content_id)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
