//! Error taxonomy shared by the chain, metadata and pinning layers.

use thiserror::Error;

use crate::types::TokenKind;

/// Errors raised while reading from the chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Transport or node failure (connection refused, rate limit, HTTP 5xx...).
    #[error("RPC error: {0}")]
    Rpc(String),

    /// `eth_call` reverted. Expected when probing an id of another kind.
    #[error("execution reverted: {message}")]
    Reverted {
        message: String,
        data: Option<String>,
    },

    #[error("invalid block range: from {from} > to {to}")]
    InvalidRange { from: u64, to: u64 },

    #[error("invalid step: must be greater than zero")]
    InvalidStep,

    /// A caller-supplied account is not a 20-byte hex address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The node answered with something that is not the expected shape.
    #[error("invalid RPC response: {0}")]
    InvalidResponse(String),

    /// A signature or calldata could not be built.
    #[error("ABI error: {0}")]
    Abi(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ChainError {
    /// Returns `true` if the node reverted the call (a negative answer, not a failure).
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }

    /// Returns `true` if the operation was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A probe found that the token id is not of the probed kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("token is not a {kind} asset: {reason}")]
pub struct ProbeMiss {
    pub kind: TokenKind,
    pub reason: String,
}

impl ProbeMiss {
    pub fn new(kind: TokenKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Errors from resolving a content-addressed URI to a JSON document.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("unsupported URI: {uri}")]
    UnsupportedUri { uri: String },

    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid JSON from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl ResolveError {
    /// Returns `true` for network-level failures that another gateway might not have.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }
}

/// Errors from the third-party pinning service.
#[derive(Debug, Error)]
pub enum PinError {
    #[error("pinning service credentials are not configured")]
    NotConfigured,

    #[error("pinning request failed: {0}")]
    Http(String),

    /// Non-success answer from the pinning API, body kept verbatim.
    #[error("pinning service returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("unexpected pinning response: {0}")]
    InvalidResponse(String),
}
