//! `plantarum events`

use anyhow::{Context, Result};
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use plantarum_evm::{
    decoder::sort_recent_first, Catalog, ChainReader, EventBody, LogFetcher, LogQuery,
};

pub struct Options {
    pub address: String,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub step: u64,
    pub concurrency: usize,
    pub catalog: Catalog,
    pub json: bool,
}

pub async fn run(
    reader: Arc<dyn ChainReader>,
    opts: Options,
    cancel: &CancellationToken,
) -> Result<()> {
    let decoder = opts.catalog.decoder()?;
    let fetcher = LogFetcher::new(reader);

    let (range, logs) = LogQuery::new()
        .address(opts.address.as_str())
        .bounds(opts.from, opts.to)
        .step(opts.step)
        .concurrency(opts.concurrency)
        .run(&fetcher, cancel)
        .await
        .with_context(|| format!("fetch logs of {}", opts.address))?;

    let mut events = decoder.decode_all(&logs);
    if opts.catalog == Catalog::Treasury {
        sort_recent_first(&mut events);
    }

    if opts.json {
        let page = json!({
            "fromBlock": range.from_block,
            "toBlock": range.to_block,
            "events": events,
        });
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("Blocks {range}: {} event(s)", events.len());
    for event in &events {
        match &event.body {
            EventBody::Known { name, args } => {
                println!("#{} [{}] {}", event.block_number, event.log_index, name);
                for (key, value) in args {
                    println!("    {key}: {value}");
                }
            }
            EventBody::Undecoded { raw } => {
                let topic0 = raw.topics.first().map(String::as_str).unwrap_or("-");
                println!(
                    "#{} [{}] <undecoded> topic0={topic0}",
                    event.block_number, event.log_index
                );
            }
        }
    }
    Ok(())
}
