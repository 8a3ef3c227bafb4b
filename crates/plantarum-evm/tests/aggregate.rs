//! Probe-and-miss aggregation scenarios.

mod common;

use alloy_core::dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use common::{CallReply, MockReader};
use plantarum_core::{
    ChainError, Fields, MetadataSource, ProbeMiss, ResolveError, TokenKind,
};
use plantarum_evm::{
    enumerate_tokens, Accessor, Aggregator, ContractProbe, KindProbe, ProbeHit, ProbeOutcome,
    UnknownPolicy,
};

/// Hits for a fixed set of ids, misses for the rest.
struct TableProbe {
    kind: TokenKind,
    hits: HashMap<u64, bool>,
    down: bool,
}

impl TableProbe {
    fn new(kind: TokenKind, ids: &[(u64, bool)]) -> Self {
        Self {
            kind,
            hits: ids.iter().copied().collect(),
            down: false,
        }
    }
}

#[async_trait]
impl KindProbe for TableProbe {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    async fn probe(&self, id: u64) -> Result<ProbeOutcome, ChainError> {
        if self.down {
            return Err(ChainError::Rpc("connection refused".into()));
        }
        Ok(match self.hits.get(&id) {
            Some(listed) => {
                let mut fields = Fields::new();
                fields.insert("listed".into(), json!(listed));
                fields.insert("probe".into(), json!(self.kind.to_string()));
                Ok(ProbeHit {
                    fields,
                    token_uri: Some(format!("ipfs://Qm{id}")),
                })
            }
            None => Err(ProbeMiss::new(self.kind, "execution reverted")),
        })
    }
}

struct FixtureMetadata;

#[async_trait]
impl MetadataSource for FixtureMetadata {
    async fn resolve(&self, uri: &str) -> Result<Value, ResolveError> {
        if uri == "ipfs://Qm2" {
            return Err(ResolveError::Fetch {
                url: "https://ipfs.io/ipfs/Qm2".into(),
                reason: "HTTP 504".into(),
            });
        }
        Ok(json!({ "name": format!("asset from {uri}") }))
    }
}

fn project_carbon() -> (TableProbe, TableProbe) {
    (
        TableProbe::new(TokenKind::Project, &[(1, true)]),
        TableProbe::new(TokenKind::Carbon, &[(2, true)]),
    )
}

#[tokio::test]
async fn first_matching_probe_decides_kind() {
    let (project, carbon) = project_carbon();
    let agg = Aggregator::builder().probe(project).probe(carbon).build();

    let records = agg
        .aggregate(&[1, 2, 3], &CancellationToken::new())
        .await
        .unwrap();
    let kinds: Vec<_> = records.iter().map(|r| (r.id, r.kind)).collect();
    assert_eq!(kinds, vec![(1, TokenKind::Project), (2, TokenKind::Carbon)]);
}

#[tokio::test]
async fn unknown_ids_can_be_retained() {
    let (project, carbon) = project_carbon();
    let agg = Aggregator::builder()
        .probe(project)
        .probe(carbon)
        .unknown_policy(UnknownPolicy::Retain)
        .build();

    let records = agg
        .aggregate(&[3, 1, 2], &CancellationToken::new())
        .await
        .unwrap();
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, vec![TokenKind::Unknown, TokenKind::Project, TokenKind::Carbon]);
    assert!(records[0].onchain_fields.is_none());
    assert!(records[0].token_uri.is_none());
}

#[tokio::test]
async fn priority_order_wins_when_both_hit() {
    let agg = Aggregator::builder()
        .probe(TableProbe::new(TokenKind::Project, &[(5, true)]))
        .probe(TableProbe::new(TokenKind::Carbon, &[(5, true)]))
        .build();
    let records = agg.aggregate(&[5], &CancellationToken::new()).await.unwrap();
    assert_eq!(records[0].kind, TokenKind::Project);
    assert_eq!(records[0].onchain_fields.as_ref().unwrap()["probe"], json!("project"));
}

#[tokio::test]
async fn listed_only_drops_unlisted_hits() {
    let agg = Aggregator::builder()
        .probe(TableProbe::new(TokenKind::Forest, &[(1, true), (2, false)]))
        .listed_only(true)
        .build();
    let records = agg.aggregate(&[1, 2], &CancellationToken::new()).await.unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);
}

#[tokio::test]
async fn unlisted_hit_falls_through_to_next_probe() {
    let agg = Aggregator::builder()
        .probe(TableProbe::new(TokenKind::Project, &[(1, false), (2, false)]))
        .probe(TableProbe::new(TokenKind::Carbon, &[(1, true)]))
        .listed_only(true)
        .unknown_policy(UnknownPolicy::Retain)
        .build();
    let records = agg.aggregate(&[1, 2], &CancellationToken::new()).await.unwrap();
    let kinds: Vec<_> = records.iter().map(|r| (r.id, r.kind)).collect();
    assert_eq!(kinds, vec![(1, TokenKind::Carbon)]);
    assert_eq!(records[0].onchain_fields.as_ref().unwrap()["listed"], json!(true));
}

#[tokio::test]
async fn unlisted_hits_kept_without_listed_only() {
    let agg = Aggregator::builder()
        .probe(TableProbe::new(TokenKind::Project, &[(1, false)]))
        .probe(TableProbe::new(TokenKind::Carbon, &[(1, true)]))
        .build();
    let records = agg.aggregate(&[1], &CancellationToken::new()).await.unwrap();
    assert_eq!(records[0].kind, TokenKind::Project);
}

#[tokio::test]
async fn transport_failure_aborts_aggregation() {
    let mut broken = TableProbe::new(TokenKind::Project, &[]);
    broken.down = true;
    let agg = Aggregator::builder().probe(broken).build();
    let err = agg
        .aggregate(&[1, 2], &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ChainError::Rpc(_)));
}

#[tokio::test]
async fn cancelled_aggregation() {
    let (project, _) = project_carbon();
    let agg = Aggregator::builder().probe(project).build();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = agg.aggregate(&[1], &cancel).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn metadata_failures_leave_null_metadata() {
    let (project, carbon) = project_carbon();
    let agg = Aggregator::builder()
        .probe(project)
        .probe(carbon)
        .metadata(Arc::new(FixtureMetadata))
        .build();
    let records = agg.aggregate(&[1, 2], &CancellationToken::new()).await.unwrap();
    assert_eq!(
        records[0].offchain_metadata,
        Some(json!({ "name": "asset from ipfs://Qm1" }))
    );
    assert_eq!(records[1].offchain_metadata, None);
    assert_eq!(records[1].token_uri.as_deref(), Some("ipfs://Qm2"));
}

#[tokio::test]
async fn output_follows_input_order_under_concurrency() {
    let ids: Vec<u64> = (1..=50).collect();
    let table: Vec<(u64, bool)> = ids.iter().map(|id| (*id, true)).collect();
    let agg = Aggregator::builder()
        .probe(TableProbe::new(TokenKind::Carbon, &table))
        .concurrency(16)
        .build();
    let records = agg.aggregate(&ids, &CancellationToken::new()).await.unwrap();
    let got: Vec<_> = records.iter().map(|r| r.id).collect();
    assert_eq!(got, ids);
}

// ─── Chain-backed probes ─────────────────────────────────────────────────────

const ERC1155: &str = "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9";

fn returns(values: Vec<DynSolValue>) -> Vec<u8> {
    DynSolValue::Tuple(values).abi_encode_params()
}

fn project_struct(listed: bool) -> Vec<u8> {
    let creator: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
    let uint = |n: u64| DynSolValue::Uint(U256::from(n), 256);
    returns(vec![DynSolValue::Tuple(vec![
        DynSolValue::Address(creator),
        DynSolValue::String("QmProject".into()),
        DynSolValue::String("-34.6,-58.4".into()),
        uint(1_000),
        uint(25),
        uint(1_900_000_000),
        uint(12),
        uint(3),
        DynSolValue::Bool(listed),
    ])])
}

#[tokio::test]
async fn contract_probes_over_eth_call() {
    let project = Accessor::project().unwrap();
    let carbon = Accessor::carbon().unwrap();
    let uri = Accessor::single("uri", "string").unwrap();

    let reader = MockReader::default()
        .reply(ERC1155, project.calldata(1), CallReply::Return(project_struct(true)))
        .reply(
            ERC1155,
            uri.calldata(1),
            CallReply::Return(returns(vec![DynSolValue::String(
                "ipfs://QmMeta/{id}.json".into(),
            )])),
        )
        .reply(ERC1155, project.calldata(2), CallReply::Revert("not a project".into()))
        .reply(ERC1155, carbon.calldata(2), CallReply::Return(Vec::new()));
    let reader = Arc::new(reader);

    let agg = Aggregator::builder()
        .probe(ContractProbe::project(reader.clone(), ERC1155).unwrap())
        .probe(ContractProbe::carbon(reader.clone(), ERC1155).unwrap())
        .unknown_policy(UnknownPolicy::Retain)
        .build();
    let records = agg.aggregate(&[1, 2], &CancellationToken::new()).await.unwrap();

    assert_eq!(records[0].kind, TokenKind::Project);
    let fields = records[0].onchain_fields.as_ref().unwrap();
    assert_eq!(fields["hashId"], json!("QmProject"));
    assert_eq!(fields["yieldPercent"], json!("12"));
    assert_eq!(records[0].is_listed(), Some(true));
    assert_eq!(
        records[0].token_uri,
        Some(format!("ipfs://QmMeta/{:064x}.json", 1))
    );

    // revert on project, empty return on carbon
    assert_eq!(records[1].kind, TokenKind::Unknown);
}

#[tokio::test]
async fn contract_probe_transport_error_propagates() {
    let project = Accessor::project().unwrap();
    let reader = MockReader::default().reply(ERC1155, project.calldata(4), CallReply::Down);
    let probe = ContractProbe::project(reader, ERC1155).unwrap();
    assert!(matches!(probe.probe(4).await, Err(ChainError::Rpc(_))));
}

#[tokio::test]
async fn token_enumeration() {
    let ids = DynSolValue::Array(vec![
        DynSolValue::Uint(U256::from(1), 256),
        DynSolValue::Uint(U256::from(2), 256),
        DynSolValue::Uint(U256::from(9), 256),
    ]);
    let selector = alloy_primitives::keccak256("getAllTokens()")[..4].to_vec();
    let reader = MockReader::default().reply(ERC1155, selector, CallReply::Return(returns(vec![ids])));
    assert_eq!(enumerate_tokens(&reader, ERC1155).await.unwrap(), vec![1, 2, 9]);

    let empty = MockReader::default();
    assert!(enumerate_tokens(&empty, ERC1155).await.unwrap_err().is_revert());
}
