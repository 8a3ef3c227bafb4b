//! Fakes and request helpers shared by the route tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use plantarum_core::{ChainError, EventFilter, LogRange, PinError, PinResult};
use plantarum_evm::{ChainReader, RawLog};
use plantarum_ipfs::{FileUpload, PinningClient};
use plantarum_midd::{router, AppState, ChainContext, Contracts};

pub const TIMESTAMP: &str = "2026-01-01T00:00:00Z";

/// Records every pin and answers with deterministic CIDs.
#[derive(Default)]
pub struct FakePinning {
    pub unconfigured: bool,
    pub json: Mutex<Vec<(Value, Option<String>)>>,
    pub files: Mutex<Vec<String>>,
}

impl FakePinning {
    pub fn pinned_json(&self) -> Vec<(Value, Option<String>)> {
        self.json.lock().unwrap().clone()
    }

    pub fn pinned_files(&self) -> Vec<String> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait]
impl PinningClient for FakePinning {
    async fn pin_json(&self, content: &Value, name: Option<&str>) -> Result<PinResult, PinError> {
        if self.unconfigured {
            return Err(PinError::NotConfigured);
        }
        let mut pinned = self.json.lock().unwrap();
        pinned.push((content.clone(), name.map(str::to_string)));
        Ok(PinResult {
            content_id: format!("QmJson{}", pinned.len()),
            size: content.to_string().len() as u64,
            mime_type: Some("application/json".into()),
            timestamp: TIMESTAMP.into(),
        })
    }

    async fn pin_file(&self, file: FileUpload) -> Result<PinResult, PinError> {
        if self.unconfigured {
            return Err(PinError::NotConfigured);
        }
        self.files.lock().unwrap().push(file.file_name.clone());
        Ok(PinResult {
            content_id: format!("QmFile-{}", file.file_name),
            size: file.size() as u64,
            mime_type: file.mime_type.clone(),
            timestamp: TIMESTAMP.into(),
        })
    }
}

/// In-memory node: fixed head, canned logs, `eth_call` replies keyed by calldata.
#[derive(Default)]
pub struct StubReader {
    pub head: u64,
    pub logs: Vec<RawLog>,
    pub calls: HashMap<(String, Vec<u8>), Vec<u8>>,
}

impl StubReader {
    pub fn reply(mut self, contract: &str, calldata: Vec<u8>, ret: Vec<u8>) -> Self {
        self.calls.insert((contract.to_string(), calldata), ret);
        self
    }
}

#[async_trait]
impl ChainReader for StubReader {
    async fn block_number(&self) -> Result<u64, ChainError> {
        Ok(self.head)
    }

    async fn get_logs(
        &self,
        range: LogRange,
        filter: &EventFilter,
    ) -> Result<Vec<RawLog>, ChainError> {
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
            .cloned()
            .collect())
    }

    async fn call(&self, to: &str, data: &[u8]) -> Result<Vec<u8>, ChainError> {
        self.calls
            .get(&(to.to_string(), data.to_vec()))
            .cloned()
            .ok_or_else(|| ChainError::Reverted {
                message: "execution reverted".into(),
                data: None,
            })
    }
}

pub fn log(block: u64, index: u32, address: &str, topics: Vec<String>, data: String) -> RawLog {
    RawLog {
        address: address.to_string(),
        topics,
        data,
        block_number: format!("0x{block:x}"),
        block_hash: format!("0x{block:064x}"),
        tx_hash: format!("0x{block:062x}{index:02x}"),
        log_index: format!("0x{index:x}"),
        removed: None,
    }
}

/// A 32-byte word holding `n`, without `0x`.
pub fn word(n: u64) -> String {
    format!("{n:064x}")
}

/// An address left-padded to a topic.
pub fn address_topic(address: &str) -> String {
    format!("0x{:0>64}", address.trim_start_matches("0x").to_lowercase())
}

pub fn app(pinning: Arc<FakePinning>) -> Router {
    router(AppState::new("plantarum-midd", pinning))
}

pub fn chain_app(reader: StubReader, contracts: Contracts) -> Router {
    let ctx = ChainContext::new(Arc::new(reader), contracts).unwrap();
    router(AppState::new("plantarum-midd", Arc::new(FakePinning::default())).with_chain(ctx))
}

pub async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub const BOUNDARY: &str = "plantarum-test-boundary";

/// One multipart part: `(name, filename, content type, bytes)`.
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub bytes: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            content_type: None,
            bytes: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, content_type: &'a str, bytes: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            content_type: Some(content_type),
            bytes,
        }
    }
}

pub fn post_multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let mut disposition = format!("Content-Disposition: form-data; name=\"{}\"", part.name);
        if let Some(file_name) = part.file_name {
            disposition.push_str(&format!("; filename=\"{file_name}\""));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"\r\n");
        if let Some(ct) = part.content_type {
            body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
        }
        body.extend_from_slice(b"\r\n");
        body.extend_from_slice(part.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}
