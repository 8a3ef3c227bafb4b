//! Chain-backed routes: DAO events, treasury history, marketplace assets.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use plantarum_core::TokenRecord;
use plantarum_evm::Catalog;

use crate::error::ApiError;
use crate::routes::configured;
use crate::state::{AppState, EventPage};

/// `{ok: true, data}`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self { ok: true, data })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRangeQuery {
    pub from_block: Option<u64>,
    pub to_block: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceQuery {
    #[serde(default)]
    pub listed_only: bool,
    #[serde(default)]
    pub retain_unknown: bool,
}

fn query<T>(q: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    q.map(|Query(q)| q)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}


async fn history(
    state: AppState,
    catalog: Catalog,
    q: Result<Query<BlockRangeQuery>, QueryRejection>,
) -> Result<Json<Envelope<EventPage>>, ApiError> {
    let q = query(q)?;
    let chain = state.chain()?;
    let address = match catalog {
        Catalog::Dao => configured(&chain.contracts.dao, "DAO_ADDRESS")?,
        Catalog::Treasury => configured(&chain.contracts.treasury, "TREASURY_ADDRESS")?,
    };
    let cancel = state.shutdown.child_token();
    let page = chain
        .events(catalog, address, q.from_block, q.to_block, &cancel)
        .await?;
    Ok(Envelope::ok(page))
}

pub async fn dao_events(
    State(state): State<AppState>,
    q: Result<Query<BlockRangeQuery>, QueryRejection>,
) -> Result<Json<Envelope<EventPage>>, ApiError> {
    history(state, Catalog::Dao, q).await
}

pub async fn treasury_history(
    State(state): State<AppState>,
    q: Result<Query<BlockRangeQuery>, QueryRejection>,
) -> Result<Json<Envelope<EventPage>>, ApiError> {
    history(state, Catalog::Treasury, q).await
}

pub async fn marketplace_assets(
    State(state): State<AppState>,
    q: Result<Query<MarketplaceQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<TokenRecord>>>, ApiError> {
    let q = query(q)?;
    let chain = state.chain()?;
    if chain.contracts.token1155.is_none() && chain.contracts.token721.is_none() {
        return Err(ApiError::Unavailable(
            "PLANTARUM1155_ADDRESS / PLANTARUM721_ADDRESS are not configured".into(),
        ));
    }
    let cancel = state.shutdown.child_token();
    let records = chain
        .marketplace(q.listed_only, q.retain_unknown, &cancel)
        .await?;
    Ok(Envelope::ok(records))
}
