//! plantarum-core — shared foundation for the Plantarum chain toolkit.
//!
//! # Architecture
//!
//! ```text
//! plantarum-midd / cli
//!        ├── plantarum-evm   (LogFetcher, EventDecoder, Aggregator)
//!        │       └── plantarum-rpc (JSON-RPC transport)
//!        └── plantarum-ipfs  (GatewayResolver, PinataClient)
//!                    all on top of plantarum-core
//!                    (types, errors, config, tracing)
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod telemetry;
pub mod types;

pub use config::{ChainConfig, ConfigError, LogConfig, MiddConfig, PinataConfig, DEFAULT_LOG_STEP};
pub use error::{ChainError, PinError, ProbeMiss, ResolveError};
pub use metadata::MetadataSource;
pub use telemetry::init_tracing;
pub use types::{EventFilter, Fields, LogRange, PinResult, SubRanges, TokenKind, TokenRecord};
