//! Route table.

mod account;
mod category;
mod chain;
mod health;
mod pinning;
mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::state::AppState;

pub use category::CATEGORIES;

/// Build the full router with CORS, request tracing and the body limit.
pub fn router(state: AppState) -> Router {
    let body_limit = match state.max_body_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/health", get(health::service))
        .route("/ipfs/json", post(pinning::ipfs_json))
        .route("/ipfs/file", post(pinning::ipfs_file))
        .route("/token/json", post(pinning::token_json))
        .route("/token/file", post(pinning::token_file))
        .route("/token/health", get(health::tokenization))
        .route("/api/kyc/health", get(account::kyc_health))
        .route("/api/kyc/register", post(account::kyc_register))
        .route("/api/kyc/:address", get(account::kyc_status))
        .route("/api/reputation/get/:user", get(account::reputation))
        .route("/api/:category", post(category::tokenize))
        .route("/api/:category/health", get(category::health))
        .route("/dao/events", get(chain::dao_events))
        .route("/treasury/history", get(chain::treasury_history))
        .route("/marketplace/assets", get(chain::marketplace_assets))
        .layer(body_limit)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The configured contract address, or 503 naming the missing variable.
fn configured<'a>(address: &'a Option<String>, var: &str) -> Result<&'a str, ApiError> {
    address
        .as_deref()
        .ok_or_else(|| ApiError::Unavailable(format!("{var} is not configured")))
}
