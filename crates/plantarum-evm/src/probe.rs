//! Contract probes: "is token `id` a project / carbon credit / forest?"
//!
//! A probe calls one kind-specific accessor via `eth_call`. A revert, an empty
//! return or an output that does not fit the accessor's layout is a
//! [`ProbeMiss`]; only transport-level failures surface as `ChainError`.

use alloy_core::dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::{keccak256, U256};
use async_trait::async_trait;

use plantarum_core::{ChainError, Fields, ProbeMiss, TokenKind};

use crate::reader::ChainReader;
use crate::value::to_json;

/// Fields and URI of a token that matched a probe.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeHit {
    pub fields: Fields,
    pub token_uri: Option<String>,
}

/// `Ok(hit)` when the token is of the probed kind, `Err(miss)` otherwise.
pub type ProbeOutcome = Result<ProbeHit, ProbeMiss>;

/// A typed, fallible "is this token of kind K" query.
#[async_trait]
pub trait KindProbe: Send + Sync {
    fn kind(&self) -> TokenKind;

    async fn probe(&self, id: u64) -> Result<ProbeOutcome, ChainError>;
}

// ─── Accessor ────────────────────────────────────────────────────────────────

/// A one-argument view function (`name(uint256)` unless retyped with
/// [`taking`](Accessor::taking)) and the layout of what it returns.
#[derive(Debug, Clone)]
pub struct Accessor {
    name: String,
    input: String,
    selector: [u8; 4],
    fields: Vec<(String, DynSolType)>,
    returns_struct: bool,
}

impl Accessor {
    /// An accessor returning a struct with the given `(field, type)` layout.
    pub fn new(name: &str, layout: &[(&str, &str)]) -> Result<Self, ChainError> {
        let fields = layout
            .iter()
            .map(|(field, ty)| {
                ty.parse::<DynSolType>()
                    .map(|t| (field.to_string(), t))
                    .map_err(|e| ChainError::Abi(format!("{name}.{field}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.to_string(),
            input: "uint256".into(),
            selector: selector(&format!("{name}(uint256)")),
            fields,
            returns_struct: true,
        })
    }

    /// Change the argument type, e.g. `address` for per-account views.
    pub fn taking(mut self, input: &str) -> Result<Self, ChainError> {
        input
            .parse::<DynSolType>()
            .map_err(|e| ChainError::Abi(format!("{}({input}): {e}", self.name)))?;
        self.input = input.to_string();
        self.selector = selector(&self.signature());
        Ok(self)
    }

    /// An accessor returning a single value, e.g. `uri(uint256) returns (string)`.
    pub fn single(name: &str, ty: &str) -> Result<Self, ChainError> {
        let mut accessor = Self::new(name, &[(name, ty)])?;
        accessor.returns_struct = false;
        Ok(accessor)
    }

    /// `getProjectMeta(uint256)` on the ERC-1155 contract.
    pub fn project() -> Result<Self, ChainError> {
        Self::new(
            "getProjectMeta",
            &[
                ("creator", "address"),
                ("hashId", "string"),
                ("coords", "string"),
                ("supply", "uint256"),
                ("price", "uint256"),
                ("maturityDate", "uint256"),
                ("yieldPercent", "uint256"),
                ("phases", "uint256"),
                ("listed", "bool"),
            ],
        )
    }

    /// `getCarbonMeta(uint256)` on the ERC-1155 contract.
    pub fn carbon() -> Result<Self, ChainError> {
        Self::new(
            "getCarbonMeta",
            &[
                ("creator", "address"),
                ("hashId", "string"),
                ("coords", "string"),
                ("supply", "uint256"),
                ("available", "uint256"),
                ("price", "uint256"),
                ("standard", "string"),
                ("projectType", "string"),
                ("vintage", "uint256"),
                ("verificationBody", "string"),
                ("expiryDate", "uint256"),
                ("listed", "bool"),
            ],
        )
    }

    /// `getTokenMeta(uint256)` on the ERC-721 contract.
    pub fn forest() -> Result<Self, ChainError> {
        Self::new(
            "getTokenMeta",
            &[
                ("walletOwner", "address"),
                ("hashId", "string"),
                ("coords", "string"),
                ("timestamp", "uint256"),
                ("price", "uint256"),
                ("listed", "bool"),
                ("isAuction", "bool"),
                ("auctionDeadline", "uint256"),
            ],
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical signature, e.g. `getProjectMeta(uint256)`.
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.input)
    }

    /// Selector followed by the ABI-encoded id.
    pub fn calldata(&self, id: u64) -> Vec<u8> {
        self.encode_call(DynSolValue::Uint(U256::from(id), 256))
    }

    /// Selector followed by the ABI-encoded argument.
    pub fn encode_call(&self, arg: DynSolValue) -> Vec<u8> {
        let mut data = self.selector.to_vec();
        data.extend(DynSolValue::Tuple(vec![arg]).abi_encode_params());
        data
    }

    /// Decode return data into named fields, in layout order.
    pub fn decode(&self, ret: &[u8]) -> Result<Fields, String> {
        let types: Vec<DynSolType> = self.fields.iter().map(|(_, t)| t.clone()).collect();
        let values = if self.returns_struct {
            match decode_returns(vec![DynSolType::Tuple(types)], ret)?.pop() {
                Some(DynSolValue::Tuple(values)) => values,
                _ => return Err("return value is not a struct".into()),
            }
        } else {
            decode_returns(types, ret)?
        };
        if values.len() != self.fields.len() {
            return Err(format!(
                "expected {} fields, got {}",
                self.fields.len(),
                values.len()
            ));
        }
        Ok(self
            .fields
            .iter()
            .zip(values)
            .map(|((name, _), v)| (name.clone(), to_json(v)))
            .collect())
    }
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Decode function return data as a parameter sequence.
fn decode_returns(types: Vec<DynSolType>, ret: &[u8]) -> Result<Vec<DynSolValue>, String> {
    match DynSolType::Tuple(types).abi_decode_params(ret) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Ok(vec![other]),
        Err(e) => Err(e.to_string()),
    }
}

// ─── ContractProbe ───────────────────────────────────────────────────────────

/// Chain-backed probe: one accessor on one contract, plus an optional URI accessor.
pub struct ContractProbe<R> {
    reader: R,
    contract: String,
    kind: TokenKind,
    accessor: Accessor,
    uri_accessor: Option<Accessor>,
}

impl<R: ChainReader> ContractProbe<R> {
    pub fn new(reader: R, contract: impl Into<String>, kind: TokenKind, accessor: Accessor) -> Self {
        Self {
            reader,
            contract: contract.into(),
            kind,
            accessor,
            uri_accessor: None,
        }
    }

    /// Read the token URI through `name(uint256) returns (string)` on a hit.
    pub fn with_uri_accessor(mut self, name: &str) -> Result<Self, ChainError> {
        self.uri_accessor = Some(Accessor::single(name, "string")?);
        Ok(self)
    }

    /// ERC-1155 forestry project probe (`getProjectMeta`, `uri`).
    pub fn project(reader: R, contract: impl Into<String>) -> Result<Self, ChainError> {
        Self::new(reader, contract, TokenKind::Project, Accessor::project()?).with_uri_accessor("uri")
    }

    /// ERC-1155 carbon credit probe (`getCarbonMeta`, `uri`).
    pub fn carbon(reader: R, contract: impl Into<String>) -> Result<Self, ChainError> {
        Self::new(reader, contract, TokenKind::Carbon, Accessor::carbon()?).with_uri_accessor("uri")
    }

    /// ERC-721 forest probe (`getTokenMeta`, `tokenURI`).
    pub fn forest(reader: R, contract: impl Into<String>) -> Result<Self, ChainError> {
        Self::new(reader, contract, TokenKind::Forest, Accessor::forest()?)
            .with_uri_accessor("tokenURI")
    }

    pub fn contract(&self) -> &str {
        &self.contract
    }

    fn miss(&self, reason: impl Into<String>) -> ProbeMiss {
        ProbeMiss::new(self.kind, reason)
    }

    async fn token_uri(&self, accessor: &Accessor, id: u64) -> Result<Option<String>, ChainError> {
        let ret = match self.reader.call(&self.contract, &accessor.calldata(id)).await {
            Ok(ret) => ret,
            Err(e) if e.is_revert() => {
                tracing::debug!(id, accessor = accessor.name(), error = %e, "token URI unavailable");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let uri = accessor
            .decode(&ret)
            .ok()
            .and_then(|fields| fields.values().next().and_then(|v| v.as_str().map(str::to_string)))
            .filter(|uri| !uri.is_empty())
            .map(|uri| expand_id_template(&uri, id));
        Ok(uri)
    }
}

#[async_trait]
impl<R: ChainReader> KindProbe for ContractProbe<R> {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    async fn probe(&self, id: u64) -> Result<ProbeOutcome, ChainError> {
        let ret = match self
            .reader
            .call(&self.contract, &self.accessor.calldata(id))
            .await
        {
            Ok(ret) => ret,
            Err(e) if e.is_revert() => return Ok(Err(self.miss(e.to_string()))),
            Err(e) => return Err(e),
        };
        if ret.is_empty() {
            return Ok(Err(self.miss("empty return data")));
        }
        let fields = match self.accessor.decode(&ret) {
            Ok(fields) => fields,
            Err(reason) => return Ok(Err(self.miss(reason))),
        };
        let token_uri = match &self.uri_accessor {
            Some(accessor) => self.token_uri(accessor, id).await?,
            None => None,
        };
        Ok(Ok(ProbeHit { fields, token_uri }))
    }
}

/// ERC-1155 `{id}` substitution: lowercase hex, zero-padded to 64 chars.
pub fn expand_id_template(uri: &str, id: u64) -> String {
    if uri.contains("{id}") {
        uri.replace("{id}", &format!("{id:064x}"))
    } else {
        uri.to_string()
    }
}

/// List every token id via `getAllTokens() returns (uint256[])`.
pub async fn enumerate_tokens<R: ChainReader + ?Sized>(
    reader: &R,
    contract: &str,
) -> Result<Vec<u64>, ChainError> {
    let ret = reader.call(contract, &selector("getAllTokens()")).await?;
    let values = decode_returns(vec![DynSolType::Array(Box::new(DynSolType::Uint(256)))], &ret)
        .map_err(|e| ChainError::InvalidResponse(format!("getAllTokens: {e}")))?;
    let ids = match values.into_iter().next() {
        Some(DynSolValue::Array(ids)) => ids,
        _ => return Err(ChainError::InvalidResponse("getAllTokens: not an array".into())),
    };
    ids.into_iter()
        .map(|v| match v {
            DynSolValue::Uint(u, _) => u64::try_from(u)
                .map_err(|_| ChainError::InvalidResponse(format!("token id {u} exceeds u64"))),
            other => Err(ChainError::InvalidResponse(format!("unexpected id value {other:?}"))),
        })
        .collect()
}
