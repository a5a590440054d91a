//! Content hashes over canonical JSON.
//!
//! Canonical form sorts object keys and rounds every non-integer number to
//! 1e-9, so tensors, grids and spectra that differ only in last-bit noise
//! hash identically.

use std::collections::BTreeMap;

use nmr_core::errors::NmrError;
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};

use crate::serde::serde_error;

/// Rounds a float to 1e-9 so that last-bit noise does not leak into hashes.
pub fn round_for_hash(value: f64) -> f64 {
    if value.is_finite() {
        (value * 1e9).round() / 1e9
    } else {
        value
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect::<BTreeMap<_, _>>();
            Value::Object(ordered.into_iter().collect::<Map<_, _>>())
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        Value::Number(number) if number.is_f64() => {
            let rounded = number
                .as_f64()
                .map(round_for_hash)
                .and_then(Number::from_f64);
            Value::Number(rounded.unwrap_or(number))
        }
        other => other,
    }
}

/// Serializes a value into canonical JSON bytes.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, NmrError> {
    let value = serde_json::to_value(value).map_err(|err| serde_error("json_serialize", err))?;
    let mut bytes = Vec::new();
    serde_json::to_writer(&mut bytes, &canonicalize(value))
        .map_err(|err| serde_error("json_write", err))?;
    Ok(bytes)
}

/// SHA-256 of the canonical JSON form, as lowercase hex.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, NmrError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
