//! `/ipfs/*` and `/token/*`: thin proxies to the pinning service.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use serde_json::{json, Value};

use plantarum_core::PinResult;
use plantarum_ipfs::FileUpload;

use crate::error::ApiError;
use crate::routes::upload::single_file;
use crate::state::AppState;

/// Pin name used for `/ipfs/json` payloads without an explicit `name`.
const DEFAULT_JSON_NAME: &str = "plantarum-json";

/// `data` (required, non-null) and optional `name` from a JSON body.
fn json_payload(
    body: Result<Json<Value>, JsonRejection>,
    missing: &str,
) -> Result<(Value, Option<String>), ApiError> {
    let Json(mut body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let data = match body.get_mut("data").map(Value::take) {
        Some(Value::Null) | None => return Err(ApiError::bad_request(missing)),
        Some(data) => data,
    };
    let name = body.get("name").and_then(Value::as_str).map(str::to_string);
    Ok((data, name))
}

async fn uploaded_file(form: Result<Multipart, MultipartRejection>) -> Result<FileUpload, ApiError> {
    let mut form = form.map_err(|_| ApiError::bad_request("no file uploaded"))?;
    single_file(&mut form, "file")
        .await?
        .ok_or_else(|| ApiError::bad_request("no file uploaded"))
}

fn file_body(pinned: &PinResult, file: &FileUpload) -> Value {
    json!({
        "ok": true,
        "IpfsHash": pinned.content_id,
        "Name": file.file_name,
        "Size": file.size(),
        "MimeType": file.mime_type,
        "Timestamp": pinned.timestamp,
    })
}

pub async fn ipfs_json(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (data, name) = json_payload(body, "missing data in body")?;
    let name = name.unwrap_or_else(|| DEFAULT_JSON_NAME.into());
    let pinned = state.pinning.pin_json(&data, Some(&name)).await?;
    Ok(Json(json!({
        "ok": true,
        "IpfsHash": pinned.content_id,
        "Timestamp": pinned.timestamp,
    })))
}

pub async fn ipfs_file(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let file = uploaded_file(form).await?;
    let pinned = state.pinning.pin_file(file.clone()).await?;
    Ok(Json(file_body(&pinned, &file)))
}

pub async fn token_json(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let (data, name) = json_payload(body, "missing metadata JSON")?;
    let pinned = state.pinning.pin_json(&data, name.as_deref()).await?;
    Ok(Json(json!({
        "ok": true,
        "IpfsHash": pinned.content_id,
        "PinSize": pinned.size,
        "Timestamp": pinned.timestamp,
    })))
}

pub async fn token_file(
    State(state): State<AppState>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let file = uploaded_file(form).await?;
    let pinned = state.pinning.pin_file(file.clone()).await?;
    let mut body = file_body(&pinned, &file);
    body["PinSize"] = json!(pinned.size);
    Ok(Json(body))
}
