//! `plantarum assets`

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use plantarum_core::{MetadataSource, TokenRecord};
use plantarum_evm::{enumerate_tokens, Aggregator, ChainReader, ContractProbe, UnknownPolicy};

pub struct Options {
    pub erc1155: String,
    pub erc721: Option<String>,
    pub retain_unknown: bool,
    pub listed_only: bool,
    pub concurrency: usize,
}

pub async fn run(
    reader: Arc<dyn ChainReader>,
    metadata: Option<Arc<dyn MetadataSource>>,
    opts: Options,
    cancel: &CancellationToken,
) -> Result<()> {
    let policy = if opts.retain_unknown {
        UnknownPolicy::Retain
    } else {
        UnknownPolicy::Exclude
    };
    let builder = || {
        let b = Aggregator::builder()
            .unknown_policy(policy)
            .listed_only(opts.listed_only)
            .concurrency(opts.concurrency);
        match &metadata {
            Some(source) => b.metadata(source.clone()),
            None => b,
        }
    };

    let mut records: Vec<TokenRecord> = Vec::new();

    let ids = enumerate_tokens(&*reader, &opts.erc1155)
        .await
        .with_context(|| format!("getAllTokens on {}", opts.erc1155))?;
    let aggregator = builder()
        .probe(ContractProbe::project(reader.clone(), opts.erc1155.as_str())?)
        .probe(ContractProbe::carbon(reader.clone(), opts.erc1155.as_str())?)
        .build();
    records.extend(aggregator.aggregate(&ids, cancel).await?);

    if let Some(erc721) = &opts.erc721 {
        let ids = enumerate_tokens(&*reader, erc721)
            .await
            .with_context(|| format!("getAllTokens on {erc721}"))?;
        let aggregator = builder()
            .probe(ContractProbe::forest(reader.clone(), erc721.as_str())?)
            .build();
        records.extend(aggregator.aggregate(&ids, cancel).await?);
    }

    println!("{}", serde_json::to_string_pretty(&records)?);
    eprintln!("{} token(s)", records.len());
    Ok(())
}
