//! plantarum-midd — HTTP middleware in front of IPFS pinning and the
//! Plantarum contracts.
//!
//! Routes:
//! - `/health`, `/token/health`, `/api/{category}/health`, `/api/kyc/health`
//! - `/ipfs/json`, `/ipfs/file`, `/token/json`, `/token/file`: pinning proxy
//! - `/api/{forest,carbon,conservation,projects}`: files + metadata tokenization
//! - `/dao/events`, `/treasury/history`: decoded event history
//! - `/marketplace/assets`: multi-contract token aggregation
//! - `/api/kyc/*`, `/api/reputation/get/:user`: per-account contract reads

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, CategoryError};
pub use routes::{router, CATEGORIES};
pub use state::{AppState, ChainContext, Contracts, EventPage};
