//! Pinning to IPFS through Pinata.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use plantarum_core::{PinError, PinResult, PinataConfig};

/// Pinata's public API.
pub const PINATA_API_BASE: &str = "https://api.pinata.cloud";

/// One uploaded file, buffered in memory.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, mime_type: Option<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Pins JSON documents and files to content-addressed storage.
#[async_trait]
pub trait PinningClient: Send + Sync {
    async fn pin_json(&self, content: &Value, name: Option<&str>) -> Result<PinResult, PinError>;

    async fn pin_file(&self, file: FileUpload) -> Result<PinResult, PinError>;
}

#[derive(Clone)]
enum PinataAuth {
    Jwt(String),
    KeyPair { key: String, secret: String },
}

/// Pinata response body for both pin endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PinataResponse {
    ipfs_hash: String,
    #[serde(default)]
    pin_size: u64,
    #[serde(default)]
    timestamp: Option<String>,
}

/// `PinningClient` for Pinata's `pinJSONToIPFS` / `pinFileToIPFS`.
#[derive(Clone)]
pub struct PinataClient {
    http: Client,
    api_base: String,
    auth: Option<PinataAuth>,
}

impl std::fmt::Debug for PinataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataClient")
            .field("api_base", &self.api_base)
            .field("configured", &self.auth.is_some())
            .finish()
    }
}

impl PinataClient {
    /// Build from config. Missing credentials are allowed; every pin then
    /// fails with `PinError::NotConfigured`.
    pub fn new(config: &PinataConfig) -> Result<Self, PinError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(concat!("plantarum-ipfs/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PinError::Http(format!("failed to build HTTP client: {e}")))?;

        let auth = match (&config.jwt, &config.api_key, &config.secret_api_key) {
            (Some(jwt), _, _) => Some(PinataAuth::Jwt(jwt.clone())),
            (None, Some(key), Some(secret)) => Some(PinataAuth::KeyPair {
                key: key.clone(),
                secret: secret.clone(),
            }),
            _ => {
                tracing::warn!("Pinata credentials missing; pin requests will fail");
                None
            }
        };

        Ok(Self {
            http,
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| PINATA_API_BASE.into())
                .trim_end_matches('/')
                .to_string(),
            auth,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.auth.is_some()
    }

    fn post(&self, path: &str) -> Result<RequestBuilder, PinError> {
        let req = self.http.post(format!("{}{path}", self.api_base));
        match &self.auth {
            Some(PinataAuth::Jwt(jwt)) => Ok(req.bearer_auth(jwt)),
            Some(PinataAuth::KeyPair { key, secret }) => Ok(req
                .header("pinata_api_key", key)
                .header("pinata_secret_api_key", secret)),
            None => Err(PinError::NotConfigured),
        }
    }

    async fn send(req: RequestBuilder) -> Result<PinataResponse, PinError> {
        let resp = req.send().await.map_err(|e| PinError::Http(e.to_string()))?;
        let resp = check_status(resp).await?;
        resp.json::<PinataResponse>()
            .await
            .map_err(|e| PinError::InvalidResponse(e.to_string()))
    }
}

/// Non-2xx → `Upstream` with `"<status> <reason> :: <body>"`.
async fn check_status(resp: Response) -> Result<Response, PinError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(PinError::Upstream {
        status: status.as_u16(),
        message: format!(
            "{} {} :: {body}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        ),
    })
}

fn pin_result(resp: PinataResponse, mime_type: Option<String>) -> PinResult {
    PinResult {
        content_id: resp.ipfs_hash,
        size: resp.pin_size,
        mime_type,
        timestamp: resp
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
    }
}

#[async_trait]
impl PinningClient for PinataClient {
    async fn pin_json(&self, content: &Value, name: Option<&str>) -> Result<PinResult, PinError> {
        let mut body = json!({ "pinataContent": content });
        if let Some(name) = name {
            body["pinataMetadata"] = json!({ "name": name });
        }
        let resp = Self::send(self.post("/pinning/pinJSONToIPFS")?.json(&body)).await?;
        tracing::info!(cid = %resp.ipfs_hash, size = resp.pin_size, "pinned JSON");
        Ok(pin_result(resp, Some("application/json".into())))
    }

    async fn pin_file(&self, file: FileUpload) -> Result<PinResult, PinError> {
        let req = self.post("/pinning/pinFileToIPFS")?;
        let mut part = multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name.clone());
        if let Some(mime) = &file.mime_type {
            part = part
                .mime_str(mime)
                .map_err(|e| PinError::Http(format!("invalid mime type {mime}: {e}")))?;
        }
        let form = multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", json!({ "name": file.file_name }).to_string());

        let resp = Self::send(req.multipart(form)).await?;
        tracing::info!(
            cid = %resp.ipfs_hash,
            file = %file.file_name,
            bytes = file.size(),
            "pinned file"
        );
        Ok(pin_result(resp, file.mime_type))
    }
}
