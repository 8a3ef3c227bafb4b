//! `EventDecoder` — decodes raw logs against a fixed set of event signatures.
//!
//! Decoding never fails outward: a log that matches no signature, or whose
//! topics/data do not fit the matched signature, becomes an
//! [`EventBody::Undecoded`] carrying the raw log.

use alloy_core::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::Event;
use alloy_primitives::B256;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use plantarum_core::Fields;

use crate::fetcher::RawLog;
use crate::value::{hex_string, to_json};

/// Errors from building a decoder or decoding a single log.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid event signature '{signature}': {reason}")]
    InvalidSignature { signature: String, reason: String },

    #[error("log has no topic0")]
    MissingTopic0,

    #[error("no signature for topic0 {0}")]
    UnknownTopic(String),

    #[error("indexed parameter '{param}' has no topic")]
    MissingTopic { param: String },

    #[error("invalid hex in {field}: {reason}")]
    InvalidHex { field: &'static str, reason: String },

    #[error("ABI decode failed: {0}")]
    Abi(String),
}

/// A parsed event signature with its topic0 hash.
#[derive(Debug, Clone)]
pub struct EventSignature {
    event: Event,
    topic0: B256,
    param_types: Vec<DynSolType>,
}

impl EventSignature {
    /// Parse a human-readable signature such as
    /// `event VoteCast(address indexed voter, uint256 indexed id, bool support, uint256 weight)`.
    pub fn parse(signature: &str) -> Result<Self, DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidSignature {
            signature: signature.to_string(),
            reason,
        };
        let event = Event::parse(signature).map_err(|e| invalid(e.to_string()))?;
        if event.anonymous {
            return Err(invalid("anonymous events have no topic0".into()));
        }
        let param_types = event
            .inputs
            .iter()
            .map(|p| p.resolve().map_err(|e| invalid(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        let topic0 = event.selector();
        Ok(Self {
            event,
            topic0,
            param_types,
        })
    }

    pub fn name(&self) -> &str {
        &self.event.name
    }

    /// `keccak256` of the canonical signature.
    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    /// Canonical form, e.g. `VoteCast(address,uint256,bool,uint256)`.
    pub fn canonical(&self) -> String {
        self.event.signature()
    }

    fn decode(&self, raw: &RawLog) -> Result<Fields, DecodeError> {
        let mut topics = raw.topics.iter().skip(1);
        let mut data_types = Vec::new();
        let mut indexed: Vec<Option<Value>> = Vec::with_capacity(self.param_types.len());

        for (param, ty) in self.event.inputs.iter().zip(&self.param_types) {
            if param.indexed {
                let topic = topics.next().ok_or_else(|| DecodeError::MissingTopic {
                    param: param.name.clone(),
                })?;
                indexed.push(Some(decode_topic(topic, ty)?));
            } else {
                data_types.push(ty.clone());
                indexed.push(None);
            }
        }

        let data = decode_hex(&raw.data, "data")?;
        let data_values = if data_types.is_empty() {
            Vec::new()
        } else {
            match DynSolType::Tuple(data_types)
                .abi_decode_params(&data)
                .map_err(|e| DecodeError::Abi(e.to_string()))?
            {
                DynSolValue::Tuple(vals) => vals,
                other => vec![other],
            }
        };
        let mut data_values = data_values.into_iter();

        let mut args = Fields::with_capacity(indexed.len());
        for (i, (param, slot)) in self.event.inputs.iter().zip(indexed).enumerate() {
            let value = match slot {
                Some(v) => v,
                None => data_values
                    .next()
                    .map(to_json)
                    .ok_or_else(|| DecodeError::Abi("data ended early".into()))?,
            };
            let name = if param.name.is_empty() {
                format!("arg{i}")
            } else {
                param.name.clone()
            };
            args.insert(name, value);
        }
        Ok(args)
    }
}

/// Decode a single indexed topic.
///
/// Value types are padded to 32 bytes and recoverable. Reference types
/// (string, bytes, arrays, tuples) are stored as their keccak256 hash, so the
/// hash itself is returned as hex.
fn decode_topic(topic: &str, ty: &DynSolType) -> Result<Value, DecodeError> {
    let bytes = decode_hex(topic, "topic")?;
    match ty {
        DynSolType::String
        | DynSolType::Bytes
        | DynSolType::Array(_)
        | DynSolType::FixedArray(..)
        | DynSolType::Tuple(_) => Ok(Value::String(hex_string(&bytes))),
        _ => ty
            .abi_decode(&bytes)
            .map(to_json)
            .map_err(|e| DecodeError::Abi(format!("topic decode: {e}"))),
    }
}

fn decode_hex(s: &str, field: &'static str) -> Result<Vec<u8>, DecodeError> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s)).map_err(|e| DecodeError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

// ─── Decoded events ──────────────────────────────────────────────────────────

/// Outcome of decoding one log.
#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    Known { name: String, args: Fields },
    Undecoded { raw: RawLog },
}

/// A log with chain position and decoded body.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEvent {
    pub block_number: u64,
    pub log_index: u32,
    pub tx_hash: String,
    pub body: EventBody,
}

impl DecodedEvent {
    /// Event name, `None` for undecoded logs.
    pub fn event_name(&self) -> Option<&str> {
        match &self.body {
            EventBody::Known { name, .. } => Some(name),
            EventBody::Undecoded { .. } => None,
        }
    }

    pub fn args(&self) -> Option<&Fields> {
        match &self.body {
            EventBody::Known { args, .. } => Some(args),
            EventBody::Undecoded { .. } => None,
        }
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self.body, EventBody::Known { .. })
    }
}

/// `{blockNumber, logIndex, txHash, event, args}` or `{blockNumber, logIndex, txHash, raw}`.
impl Serialize for DecodedEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("blockNumber", &self.block_number)?;
        map.serialize_entry("logIndex", &self.log_index)?;
        map.serialize_entry("txHash", &self.tx_hash)?;
        match &self.body {
            EventBody::Known { name, args } => {
                map.serialize_entry("event", name)?;
                map.serialize_entry("args", args)?;
            }
            EventBody::Undecoded { raw } => {
                map.serialize_entry("raw", raw)?;
            }
        }
        map.end()
    }
}

// ─── Decoder ─────────────────────────────────────────────────────────────────

/// Decodes logs against a set of signatures keyed by topic0.
#[derive(Debug, Clone, Default)]
pub struct EventDecoder {
    by_topic: HashMap<B256, EventSignature>,
    order: Vec<B256>,
}

impl EventDecoder {
    /// Build a decoder from human-readable event signatures.
    pub fn from_signatures<I, S>(signatures: I) -> Result<Self, DecodeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut decoder = Self::default();
        for sig in signatures {
            decoder.add(EventSignature::parse(sig.as_ref())?);
        }
        Ok(decoder)
    }

    pub fn add(&mut self, signature: EventSignature) {
        let topic0 = signature.topic0();
        if self.by_topic.insert(topic0, signature).is_none() {
            self.order.push(topic0);
        }
    }

    /// Signatures in insertion order.
    pub fn signatures(&self) -> impl Iterator<Item = &EventSignature> {
        self.order.iter().filter_map(|t| self.by_topic.get(t))
    }

    /// topic0 hashes as `0x` hex, for building an `EventFilter`.
    pub fn topic0s(&self) -> Vec<String> {
        self.order.iter().map(|t| format!("{t:#x}")).collect()
    }

    /// Decode one log. Never fails: unmatched or malformed logs come back undecoded.
    pub fn decode(&self, raw: &RawLog) -> DecodedEvent {
        let body = match self.try_decode(raw) {
            Ok((name, args)) => EventBody::Known { name, args },
            Err(e) => {
                tracing::debug!(
                    tx = %raw.tx_hash,
                    log_index = %raw.log_index,
                    error = %e,
                    "log left undecoded"
                );
                EventBody::Undecoded { raw: raw.clone() }
            }
        };
        DecodedEvent {
            block_number: raw.block_number_u64().unwrap_or_default(),
            log_index: raw.log_index_u32().unwrap_or_default(),
            tx_hash: raw.tx_hash.clone(),
            body,
        }
    }

    /// Decode a batch, preserving input order.
    pub fn decode_all(&self, raws: &[RawLog]) -> Vec<DecodedEvent> {
        raws.iter().map(|r| self.decode(r)).collect()
    }

    /// Decode one log, reporting why it could not be decoded.
    pub fn try_decode(&self, raw: &RawLog) -> Result<(String, Fields), DecodeError> {
        let topic0 = raw.topics.first().ok_or(DecodeError::MissingTopic0)?;
        let key: B256 = topic0
            .parse()
            .map_err(|_| DecodeError::UnknownTopic(topic0.clone()))?;
        let sig = self
            .by_topic
            .get(&key)
            .ok_or_else(|| DecodeError::UnknownTopic(topic0.clone()))?;
        let args = sig.decode(raw)?;
        Ok((sig.name().to_string(), args))
    }
}

/// Sort most recent first: descending `(block, logIndex)`.
pub fn sort_recent_first(events: &mut [DecodedEvent]) {
    events.sort_by(|a, b| {
        (b.block_number, b.log_index).cmp(&(a.block_number, a.log_index))
    });
}

/// Topic0 hash of a human-readable event signature.
pub fn topic0_of(signature: &str) -> Result<String, DecodeError> {
    EventSignature::parse(signature).map(|s| format!("{:#x}", s.topic0()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOTE_CAST: &str =
        "event VoteCast(address indexed voter, uint256 indexed id, bool support, uint256 weight)";

    #[test]
    fn parse_signature() {
        let sig = EventSignature::parse(VOTE_CAST).unwrap();
        assert_eq!(sig.name(), "VoteCast");
        assert_eq!(sig.canonical(), "VoteCast(address,uint256,bool,uint256)");
    }

    #[test]
    fn transfer_topic0_matches_known_hash() {
        assert_eq!(
            topic0_of("event Transfer(address indexed from, address indexed to, uint256 value)")
                .unwrap(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn bad_signature_is_rejected() {
        assert!(matches!(
            EventSignature::parse("event Broken(uint256"),
            Err(DecodeError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn log_without_topics_is_undecoded() {
        let decoder = EventDecoder::from_signatures([VOTE_CAST]).unwrap();
        let raw = RawLog {
            address: "0x0".into(),
            topics: vec![],
            data: "0x".into(),
            block_number: "0x10".into(),
            block_hash: "0x0".into(),
            tx_hash: "0xabc".into(),
            log_index: "0x2".into(),
            removed: None,
        };
        let event = decoder.decode(&raw);
        assert!(!event.is_decoded());
        assert_eq!(event.block_number, 16);
        assert_eq!(event.log_index, 2);
    }

    #[test]
    fn sort_orders_descending() {
        let mk = |block, idx| DecodedEvent {
            block_number: block,
            log_index: idx,
            tx_hash: String::new(),
            body: EventBody::Known {
                name: "Deposit".into(),
                args: Fields::new(),
            },
        };
        let mut events = vec![mk(1, 0), mk(3, 1), mk(3, 4), mk(2, 0)];
        sort_recent_first(&mut events);
        let order: Vec<_> = events.iter().map(|e| (e.block_number, e.log_index)).collect();
        assert_eq!(order, vec![(3, 4), (3, 1), (2, 0), (1, 0)]);
    }
}
