//! `GatewayResolver` — fetches token metadata JSON through IPFS gateways.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use plantarum_core::config::DEFAULT_GATEWAY;
use plantarum_core::{MetadataSource, ResolveError};

use crate::uri::ContentUri;

/// Resolves `ipfs://` and `http(s)://` URIs to parsed JSON.
///
/// Gateways are tried in order; the next one is used only after a fetch
/// failure. A gateway that answers with invalid JSON ends the attempt.
#[derive(Debug, Clone)]
pub struct GatewayResolver {
    http: Client,
    gateways: Vec<String>,
}

impl GatewayResolver {
    pub fn new(gateways: Vec<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("plantarum-ipfs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let gateways = if gateways.is_empty() {
            vec![DEFAULT_GATEWAY.to_string()]
        } else {
            gateways
        };
        Ok(Self { http, gateways })
    }

    /// Single public gateway, 15 s timeout.
    pub fn public() -> Result<Self, reqwest::Error> {
        Self::new(vec![DEFAULT_GATEWAY.into()], Duration::from_secs(15))
    }

    pub fn gateways(&self) -> &[String] {
        &self.gateways
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, ResolveError> {
        let fetch_err = |reason: String| ResolveError::Fetch {
            url: url.to_string(),
            reason,
        };
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let body = resp.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| ResolveError::Parse {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl MetadataSource for GatewayResolver {
    async fn resolve(&self, uri: &str) -> Result<Value, ResolveError> {
        let content = ContentUri::parse(uri)?;
        if !content.is_ipfs() {
            return self.fetch_json(&content.gateway_url("")).await;
        }

        let mut last_err = None;
        for (i, gateway) in self.gateways.iter().enumerate() {
            let url = content.gateway_url(gateway);
            match self.fetch_json(&url).await {
                Ok(doc) => return Ok(doc),
                Err(e) if e.is_fetch() && i + 1 < self.gateways.len() => {
                    tracing::warn!(%url, error = %e, "gateway failed, trying next");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or_else(|| ResolveError::UnsupportedUri {
            uri: uri.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn metadata_gateway() -> Router {
        Router::new()
            .route(
                "/ipfs/:cid",
                get(|Path(cid): Path<String>| async move {
                    Json(json!({ "name": "Selva Norte", "cid": cid }))
                }),
            )
            .route("/ipfs/:cid/broken.json", get(|| async { "{not json" }))
    }

    fn down_gateway() -> Router {
        Router::new().fallback(|| async { (StatusCode::BAD_GATEWAY, "upstream down") })
    }

    #[tokio::test]
    async fn resolves_and_is_idempotent() {
        let gw = serve(metadata_gateway()).await;
        let resolver = GatewayResolver::new(vec![gw], Duration::from_secs(5)).unwrap();
        let first = resolver.resolve("ipfs://QmForest").await.unwrap();
        let second = resolver.resolve("ipfs://QmForest").await.unwrap();
        assert_eq!(first, json!({ "name": "Selva Norte", "cid": "QmForest" }));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn falls_back_after_fetch_error() {
        let down = serve(down_gateway()).await;
        let up = serve(metadata_gateway()).await;
        let resolver = GatewayResolver::new(vec![down, up], Duration::from_secs(5)).unwrap();
        let doc = resolver.resolve("ipfs://QmCarbon").await.unwrap();
        assert_eq!(doc["cid"], "QmCarbon");
    }

    #[tokio::test]
    async fn non_success_status_is_fetch_error() {
        let down = serve(down_gateway()).await;
        let resolver = GatewayResolver::new(vec![down], Duration::from_secs(5)).unwrap();
        let err = resolver.resolve("ipfs://QmGone").await.unwrap_err();
        assert!(err.is_fetch());
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn invalid_json_is_parse_error() {
        let gw = serve(metadata_gateway()).await;
        let resolver = GatewayResolver::new(vec![gw], Duration::from_secs(5)).unwrap();
        let err = resolver
            .resolve("ipfs://QmBad/broken.json")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Parse { .. }));
    }

    #[tokio::test]
    async fn http_uri_fetched_directly() {
        let gw = serve(metadata_gateway()).await;
        let resolver = GatewayResolver::public().unwrap();
        let doc = resolver.resolve(&format!("{gw}/ipfs/QmDirect")).await.unwrap();
        assert_eq!(doc["cid"], "QmDirect");
    }

    #[tokio::test]
    async fn unsupported_scheme() {
        let resolver = GatewayResolver::public().unwrap();
        let err = resolver.resolve("ar://tx").await.unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedUri { .. }));
    }
}
