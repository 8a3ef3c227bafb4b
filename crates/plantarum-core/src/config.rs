//! Configuration for the chain reader, the pinning client and the middleware.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Blocks per `eth_getLogs` call; stays under common provider limits.
pub const DEFAULT_LOG_STEP: u64 = 2000;

/// Public gateway used when none is configured.
pub const DEFAULT_GATEWAY: &str = "https://ipfs.io";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    Invalid { key: String, value: String },
}

/// Log level per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Global default level: "trace" | "debug" | "info" | "warn" | "error"
    #[serde(default = "default_level")]
    pub level: String,
    /// Override per component: component_name → level
    #[serde(default)]
    pub components: HashMap<String, String>,
    /// Emit JSON structured logs (true) or human-readable text (false)
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            components: HashMap::new(),
            json: false,
        }
    }
}

/// Read-only chain connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Blocks per `eth_getLogs` sub-range.
    pub log_step: u64,
    /// Sub-range queries in flight at once (1 = strictly sequential).
    pub fetch_concurrency: usize,
    /// Token ids probed concurrently during aggregation.
    pub probe_concurrency: usize,
    pub request_timeout_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".into(),
            log_step: DEFAULT_LOG_STEP,
            fetch_concurrency: 1,
            probe_concurrency: 8,
            request_timeout_ms: 30_000,
        }
    }
}

/// Pinata credentials. Either a JWT or an API key/secret pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinataConfig {
    pub jwt: Option<String>,
    pub api_key: Option<String>,
    pub secret_api_key: Option<String>,
    /// Override for tests or self-hosted deployments.
    pub api_base: Option<String>,
}

impl PinataConfig {
    /// Returns `true` if some form of credentials is present.
    pub fn is_configured(&self) -> bool {
        self.jwt.is_some() || (self.api_key.is_some() && self.secret_api_key.is_some())
    }
}

/// Middleware configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiddConfig {
    pub port: u16,
    pub service_name: String,
    /// `None` disables the chain-backed routes.
    pub chain: Option<ChainConfig>,
    pub dao_address: Option<String>,
    pub treasury_address: Option<String>,
    pub token721_address: Option<String>,
    pub token1155_address: Option<String>,
    pub kyc_address: Option<String>,
    pub reputation_address: Option<String>,
    /// Blocks scanned by `/dao/events` when no range is given.
    pub default_event_window: u64,
    pub pinata: PinataConfig,
    /// Gateway base URLs tried in order.
    pub gateways: Vec<String>,
    /// Request body cap in bytes; `None` leaves uploads unbounded.
    pub max_body_bytes: Option<usize>,
    pub log: LogConfig,
}

impl Default for MiddConfig {
    fn default() -> Self {
        Self {
            port: 4000,
            service_name: "plantarum-midd".into(),
            chain: None,
            dao_address: None,
            treasury_address: None,
            token721_address: None,
            token1155_address: None,
            kyc_address: None,
            reputation_address: None,
            default_event_window: 100,
            pinata: PinataConfig::default(),
            gateways: vec![DEFAULT_GATEWAY.into()],
            max_body_bytes: None,
            log: LogConfig::default(),
        }
    }
}

impl MiddConfig {
    /// Load from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup (environment, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(port) = get("PORT") {
            config.port = parse(&port, "PORT")?;
        }
        if let Some(rpc_url) = get("RPC_URL") {
            let mut chain = ChainConfig {
                rpc_url,
                ..ChainConfig::default()
            };
            if let Some(step) = get("LOG_STEP") {
                chain.log_step = parse(&step, "LOG_STEP")?;
                if chain.log_step == 0 {
                    return Err(ConfigError::Invalid {
                        key: "LOG_STEP".into(),
                        value: step,
                    });
                }
            }
            if let Some(n) = get("FETCH_CONCURRENCY") {
                chain.fetch_concurrency = parse::<usize>(&n, "FETCH_CONCURRENCY")?.max(1);
            }
            config.chain = Some(chain);
        }

        config.dao_address = get("DAO_ADDRESS");
        config.treasury_address = get("TREASURY_ADDRESS");
        config.token721_address = get("PLANTARUM721_ADDRESS");
        config.token1155_address = get("PLANTARUM1155_ADDRESS");
        config.kyc_address = get("KYC_ADDRESS");
        config.reputation_address = get("REPUTATION_ADDRESS");

        config.pinata = PinataConfig {
            jwt: get("PINATA_JWT"),
            api_key: get("PINATA_API_KEY"),
            secret_api_key: get("PINATA_SECRET_API_KEY"),
            api_base: get("PINATA_API_BASE"),
        };

        if let Some(gateways) = get("IPFS_GATEWAYS") {
            config.gateways = gateways
                .split(',')
                .map(|g| g.trim().trim_end_matches('/').to_string())
                .filter(|g| !g.is_empty())
                .collect();
        }
        if let Some(limit) = get("MAX_BODY_BYTES") {
            config.max_body_bytes = Some(parse(&limit, "MAX_BODY_BYTES")?);
        }
        if let Some(level) = get("LOG_LEVEL") {
            config.log.level = level;
        }
        if let Some(json) = get("LOG_JSON") {
            config.log.json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        Ok(config)
    }
}

fn parse<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key: key.into(),
        value: value.into(),
    })
}
