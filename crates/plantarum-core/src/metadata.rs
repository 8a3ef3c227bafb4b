//! The off-chain metadata seam used by the aggregator.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ResolveError;

/// Resolves a token URI to its parsed JSON document.
///
/// Implemented by `plantarum_ipfs::GatewayResolver`; tests plug in fixtures.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn resolve(&self, uri: &str) -> Result<Value, ResolveError>;
}
