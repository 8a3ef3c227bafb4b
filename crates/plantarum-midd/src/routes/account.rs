//! `/api/kyc/*` and `/api/reputation/*`: per-account reads from the KYC and
//! reputation contracts.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::routes::{configured, health::health_body};
use crate::state::AppState;

pub async fn kyc_health() -> Json<Value> {
    Json(health_body("kyc"))
}

/// `{ok, user, status}` with the contract's textual KYC status.
pub async fn kyc_status(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chain = state.chain()?;
    let contract = configured(&chain.contracts.kyc, "KYC_ADDRESS")?;
    let status = chain.kyc_status(contract, &user).await?;
    Ok(Json(json!({ "ok": true, "user": user, "status": status })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KycRegistration {
    pub user: Option<String>,
    pub hash_id: Option<String>,
}

/// Echoes a registration request; the wallet signs `registerKYC` itself.
pub async fn kyc_register(
    body: Result<Json<KycRegistration>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let (Some(user), Some(hash_id)) = (
        body.user.filter(|u| !u.is_empty()),
        body.hash_id.filter(|h| !h.is_empty()),
    ) else {
        return Err(ApiError::bad_request("missing user or hashId"));
    };
    Ok(Json(json!({
        "ok": true,
        "user": user,
        "hashId": hash_id,
        "note": "registerKYC() must be signed from the user's wallet",
    })))
}

/// `{ok, reputation}`, the score as a decimal string.
pub async fn reputation(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let chain = state.chain()?;
    let contract = configured(&chain.contracts.reputation, "REPUTATION_ADDRESS")?;
    let reputation = chain.reputation(contract, &user).await?;
    Ok(Json(json!({ "ok": true, "reputation": reputation })))
}
