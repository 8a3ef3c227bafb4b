//! Converts alloy `DynSolValue` into JSON for API responses.
//!
//! Integers become decimal strings so 256-bit values survive JSON clients.

use alloy_core::dyn_abi::DynSolValue;
use serde_json::Value;

/// Convert a decoded `DynSolValue` into a JSON value.
pub fn to_json(val: DynSolValue) -> Value {
    match val {
        DynSolValue::Bool(b) => Value::Bool(b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex_string(&word[..size])),
        DynSolValue::Bytes(b) => Value::String(hex_string(&b)),
        DynSolValue::String(s) => Value::String(s),
        // EIP-55 checksum encoding
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Array(vals) | DynSolValue::FixedArray(vals) | DynSolValue::Tuple(vals) => {
            Value::Array(vals.into_iter().map(to_json).collect())
        }
        DynSolValue::Function(f) => Value::String(hex_string(f.as_slice())),
    }
}

/// `0x`-prefixed lowercase hex.
pub fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
