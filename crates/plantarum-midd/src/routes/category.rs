//! `/api/{category}`: pin every uploaded file, then pin the assembled metadata.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde_json::{json, Map, Value};

use crate::error::{ApiError, CategoryError};
use crate::routes::health::{health_body, now_ms};
use crate::routes::upload::tokenization_form;
use crate::state::AppState;

/// Asset categories accepted by the tokenization routes.
pub const CATEGORIES: &[&str] = &["forest", "carbon", "conservation", "projects"];

fn known_category(category: &str) -> Result<(), CategoryError> {
    if CATEGORIES.contains(&category) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("unknown category '{category}'")).with_type(category))
    }
}

pub async fn health(Path(category): Path<String>) -> Result<Json<Value>, CategoryError> {
    known_category(&category)?;
    Ok(Json(health_body(&category)))
}

pub async fn tokenize(
    State(state): State<AppState>,
    Path(category): Path<String>,
    form: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, CategoryError> {
    known_category(&category)?;
    let typed = |e: ApiError| e.with_type(&category);

    let mut form = form.map_err(|_| typed(ApiError::bad_request("missing metadata")))?;
    let upload = tokenization_form(&mut form).await.map_err(typed)?;
    let metadata = upload
        .metadata
        .ok_or_else(|| typed(ApiError::bad_request("missing metadata")))?;
    let metadata: Map<String, Value> = serde_json::from_str(&metadata)
        .map_err(|e| typed(ApiError::bad_request(format!("metadata is not a JSON object: {e}"))))?;

    let mut files = Vec::with_capacity(upload.files.len());
    for file in upload.files {
        let name = file.file_name.clone();
        let mime = file.mime_type.clone();
        let pinned = state
            .pinning
            .pin_file(file)
            .await
            .map_err(|e| typed(e.into()))?;
        files.push(json!({ "name": name, "type": mime, "IpfsHash": pinned.content_id }));
    }

    let document = assemble(&category, metadata, files);
    let pinned = state
        .pinning
        .pin_json(&document, Some(&format!("plantarum-{category}")))
        .await
        .map_err(|e| typed(e.into()))?;
    tracing::info!(%category, cid = %pinned.content_id, "tokenization metadata pinned");

    Ok(Json(json!({
        "ok": true,
        "type": category,
        "IpfsHash": pinned.content_id,
    })))
}

/// `{type, ...metadata, files, ts}`; `files` and `ts` override same-named keys.
fn assemble(category: &str, metadata: Map<String, Value>, files: Vec<Value>) -> Value {
    let mut doc = Map::new();
    doc.insert("type".into(), json!(category));
    doc.extend(metadata);
    doc.insert("files".into(), Value::Array(files));
    doc.insert("ts".into(), json!(now_ms()));
    Value::Object(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembled_document_layout() {
        let meta: Map<String, Value> =
            serde_json::from_value(json!({ "name": "Selva", "price": "10", "files": "stale" }))
                .unwrap();
        let doc = assemble("forest", meta, vec![json!({ "name": "a.png" })]);
        assert_eq!(doc["type"], "forest");
        assert_eq!(doc["name"], "Selva");
        assert_eq!(doc["files"][0]["name"], "a.png");
        assert!(doc["ts"].as_i64().unwrap() > 0);
    }

    #[test]
    fn metadata_may_override_type() {
        let meta: Map<String, Value> = serde_json::from_value(json!({ "type": "custom" })).unwrap();
        assert_eq!(assemble("carbon", meta, vec![])["type"], "custom");
    }
}
