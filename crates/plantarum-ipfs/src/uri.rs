//! Content-addressed URI → HTTP gateway URL rewriting.

use plantarum_core::ResolveError;
use url::Url;

/// A token URI after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentUri {
    /// `ipfs://<cid>[/path]`, stored without the scheme or a leading `ipfs/`.
    Ipfs(String),
    /// Plain `http(s)://` URL, fetched as is.
    Http(Url),
}

impl ContentUri {
    pub fn parse(uri: &str) -> Result<Self, ResolveError> {
        let uri = uri.trim();
        if let Some(rest) = uri.strip_prefix("ipfs://") {
            let path = rest.strip_prefix("ipfs/").unwrap_or(rest).trim_start_matches('/');
            if path.is_empty() {
                return Err(unsupported(uri));
            }
            return Ok(Self::Ipfs(path.to_string()));
        }
        match Url::parse(uri) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Http(url)),
            _ => Err(unsupported(uri)),
        }
    }

    /// The URL to fetch through `gateway` (ignored for HTTP URIs).
    pub fn gateway_url(&self, gateway: &str) -> String {
        match self {
            Self::Ipfs(path) => format!("{}/ipfs/{path}", gateway.trim_end_matches('/')),
            Self::Http(url) => url.to_string(),
        }
    }

    pub fn is_ipfs(&self) -> bool {
        matches!(self, Self::Ipfs(_))
    }
}

/// Rewrite `uri` for a single gateway.
pub fn to_gateway_url(uri: &str, gateway: &str) -> Result<String, ResolveError> {
    ContentUri::parse(uri).map(|c| c.gateway_url(gateway))
}

fn unsupported(uri: &str) -> ResolveError {
    ResolveError::UnsupportedUri {
        uri: uri.to_string(),
    }
}
