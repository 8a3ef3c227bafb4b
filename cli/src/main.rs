//! Plantarum CLI — read-only access to the Plantarum contracts and metadata.
//!
//! # Commands
//! ```text
//! plantarum events   --rpc <url> --address <addr> [--from N] [--to N] [--catalog dao|treasury]
//! plantarum assets   --rpc <url> --erc1155 <addr> [--erc721 <addr>] [--listed-only]
//! plantarum resolve  <uri> [--gateway <url>...]
//! plantarum topics   [--catalog dao|treasury]
//! plantarum info
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use plantarum_core::{init_tracing, LogConfig, MetadataSource, DEFAULT_LOG_STEP};
use plantarum_evm::{Catalog, ChainReader, RpcChainReader};
use plantarum_ipfs::GatewayResolver;
use plantarum_rpc::HttpRpcClient;

mod cmd_assets;
mod cmd_events;

#[derive(Parser)]
#[command(
    name = "plantarum",
    about = "Plantarum chain toolkit CLI",
    long_about = "
Plantarum CLI: query DAO and treasury event history, classify marketplace
tokens across the ERC-1155 and ERC-721 contracts, and resolve IPFS metadata.
All chain access is read-only (eth_blockNumber, eth_getLogs, eth_call).
",
    version
)]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and decode a contract's event history
    Events {
        /// JSON-RPC endpoint
        #[arg(long)]
        rpc: String,
        /// Contract address
        #[arg(long)]
        address: String,
        /// First block (default: `to - window`)
        #[arg(long)]
        from: Option<u64>,
        /// Last block (default: chain head)
        #[arg(long)]
        to: Option<u64>,
        /// Blocks per eth_getLogs request
        #[arg(long, default_value_t = DEFAULT_LOG_STEP)]
        step: u64,
        /// Sub-range requests in flight
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
        /// Event signature set
        #[arg(long, default_value = "dao")]
        catalog: Catalog,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify every marketplace token
    Assets {
        #[arg(long)]
        rpc: String,
        /// ERC-1155 contract (projects and carbon credits)
        #[arg(long)]
        erc1155: String,
        /// ERC-721 contract (forests)
        #[arg(long)]
        erc721: Option<String>,
        /// Keep ids no probe recognised
        #[arg(long)]
        retain_unknown: bool,
        /// Only tokens whose on-chain `listed` flag is set
        #[arg(long)]
        listed_only: bool,
        /// Gateway base URL, tried in order (repeatable)
        #[arg(long)]
        gateway: Vec<String>,
        /// Do not fetch off-chain metadata
        #[arg(long)]
        no_metadata: bool,
        /// Token ids probed concurrently
        #[arg(long, default_value_t = plantarum_evm::aggregator::DEFAULT_PROBE_CONCURRENCY)]
        concurrency: usize,
    },

    /// Fetch a JSON document by ipfs:// or http(s):// URI
    Resolve {
        uri: String,
        /// Gateway base URL, tried in order (repeatable)
        #[arg(long)]
        gateway: Vec<String>,
    },

    /// Print known event signatures and their topic0 hashes
    Topics {
        /// Limit to one catalog
        #[arg(long)]
        catalog: Option<Catalog>,
    },

    /// Show defaults and build info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&LogConfig {
        level: if cli.verbose { "debug" } else { "warn" }.into(),
        ..LogConfig::default()
    });

    match cli.command {
        Commands::Events { rpc, address, from, to, step, concurrency, catalog, json } => {
            let reader = connect(&rpc)?;
            let opts = cmd_events::Options {
                address,
                from,
                to,
                step,
                concurrency,
                catalog,
                json,
            };
            cmd_events::run(reader, opts, &interrupt()).await
        }

        Commands::Assets {
            rpc,
            erc1155,
            erc721,
            retain_unknown,
            listed_only,
            gateway,
            no_metadata,
            concurrency,
        } => {
            let reader = connect(&rpc)?;
            let metadata: Option<Arc<dyn MetadataSource>> = if no_metadata {
                None
            } else {
                Some(Arc::new(resolver(gateway)?))
            };
            let opts = cmd_assets::Options {
                erc1155,
                erc721,
                retain_unknown,
                listed_only,
                concurrency,
            };
            cmd_assets::run(reader, metadata, opts, &interrupt()).await
        }

        Commands::Resolve { uri, gateway } => cmd_resolve(&uri, gateway).await,

        Commands::Topics { catalog } => cmd_topics(catalog),

        Commands::Info => cmd_info(),
    }
}

fn connect(rpc: &str) -> Result<Arc<dyn ChainReader>> {
    let client = HttpRpcClient::default_for(rpc).context("build RPC client")?;
    Ok(Arc::new(RpcChainReader::new(client)))
}

fn resolver(gateways: Vec<String>) -> Result<GatewayResolver> {
    GatewayResolver::new(gateways, Duration::from_secs(15)).context("build gateway client")
}

/// A token cancelled on Ctrl-C.
fn interrupt() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

// ─── Command implementations ─────────────────────────────────────────────────

async fn cmd_resolve(uri: &str, gateways: Vec<String>) -> Result<()> {
    let resolver = resolver(gateways)?;
    tracing::debug!(uri, gateways = ?resolver.gateways(), "resolving");
    let doc = resolver
        .resolve(uri)
        .await
        .with_context(|| format!("resolve '{uri}'"))?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn cmd_topics(catalog: Option<Catalog>) -> Result<()> {
    let catalogs = match catalog {
        Some(c) => vec![c],
        None => vec![Catalog::Dao, Catalog::Treasury],
    };
    for catalog in catalogs {
        println!("[{catalog}]");
        let decoder = catalog.decoder()?;
        for sig in decoder.signatures() {
            println!("  {:#x}  {}", sig.topic0(), sig.canonical());
        }
    }
    Ok(())
}

fn cmd_info() -> Result<()> {
    println!("Plantarum CLI v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Defaults:");
    println!("  Log step (blocks/request):   {DEFAULT_LOG_STEP}");
    println!("  Event window (blocks):       {}", plantarum_evm::builder::DEFAULT_WINDOW);
    println!(
        "  Probe concurrency:           {}",
        plantarum_evm::aggregator::DEFAULT_PROBE_CONCURRENCY
    );
    println!("  IPFS gateway:                {}", plantarum_core::config::DEFAULT_GATEWAY);
    println!("  Pinata API:                  {}", plantarum_ipfs::PINATA_API_BASE);
    println!();
    println!("Token probes (priority order):");
    println!("  ERC-1155  getProjectMeta(uint256) → project, getCarbonMeta(uint256) → carbon");
    println!("  ERC-721   getTokenMeta(uint256)   → forest");
    Ok(())
}
