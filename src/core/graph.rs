//! Purpose: Reconstruct nested values from a flattened reference-graph pool.
//! Exports: `DecodedValue`, `decode`, `MAX_DECODE_DEPTH`.
//! Role: The core decoder; everything else in the crate is glue around it.
//! Invariants: Decoding is pure and deterministic for a given pool and index.
//! Invariants: Errors abort the whole decode call; no partial results escape.
//! Invariants: Recursion never exceeds `MAX_DECODE_DEPTH` levels.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};
use crate::core::pool::{Pool, parse_ref_key, type_name};

/// Depth cap for the recursive decode. The upstream format is a tree in
/// practice; a pool containing a reference cycle trips this limit instead of
/// overflowing the stack.
pub const MAX_DECODE_DEPTH: usize = 512;

/// A fully dereferenced pool entry.
///
/// `Empty` marks entries that are not containers and not terminal values
/// (numbers, booleans, null). It renders as `""` when converted back to JSON,
/// matching the source format, but stays a distinct variant so callers can
/// tell "no data" apart from a genuine empty string.
#[derive(Clone, Debug, PartialEq)]
pub enum DecodedValue {
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, DecodedValue>),
    Empty,
}

impl DecodedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            DecodedValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, DecodedValue>> {
        match self {
            DecodedValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a key on a `Map` variant.
    pub fn get(&self, key: &str) -> Option<&DecodedValue> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Render back to plain JSON, with `Empty` as `""`.
    pub fn to_value(&self) -> Value {
        match self {
            DecodedValue::Str(s) => Value::String(s.clone()),
            DecodedValue::List(items) => Value::Array(items.clone()),
            DecodedValue::Map(map) => {
                let mut object = Map::new();
                for (key, value) in map {
                    object.insert(key.clone(), value.to_value());
                }
                Value::Object(object)
            }
            DecodedValue::Empty => Value::String(String::new()),
        }
    }
}

/// Decode the pool entry at `index` into a nested value.
///
/// Strings and arrays are terminal and come back verbatim. Objects are
/// index-map entries: each `_<n>` key names its field via the string at pool
/// position `n`, and its value is the pool index of the field's value, which
/// is decoded recursively. Keys without the marker are skipped. Any other
/// entry type decodes to `DecodedValue::Empty`.
pub fn decode(pool: &Pool, index: usize) -> Result<DecodedValue, Error> {
    decode_at(pool, index, 0)
}

fn decode_at(pool: &Pool, index: usize, depth: usize) -> Result<DecodedValue, Error> {
    if depth > MAX_DECODE_DEPTH {
        return Err(Error::new(ErrorKind::Internal)
            .with_message("reference depth limit exceeded")
            .with_index(index)
            .with_hint("The pool likely contains a reference cycle."));
    }

    match pool.get(index)? {
        Value::String(s) => Ok(DecodedValue::Str(s.clone())),
        Value::Array(items) => Ok(DecodedValue::List(items.clone())),
        Value::Object(entry) => {
            let mut result = BTreeMap::new();
            for (raw_key, value) in entry {
                let Some(key_index) = parse_ref_key(raw_key) else {
                    continue;
                };
                let key_name = pool.key_name(key_index?)?.to_string();
                let value_index = ref_index(value, raw_key)?;
                result.insert(key_name, decode_at(pool, value_index, depth + 1)?);
            }
            Ok(DecodedValue::Map(result))
        }
        _ => Ok(DecodedValue::Empty),
    }
}

/// An index-map entry's value is the pool index to recurse into, so it must
/// be a non-negative integer.
pub(crate) fn ref_index(value: &Value, raw_key: &str) -> Result<usize, Error> {
    value
        .as_u64()
        .map(|index| index as usize)
        .ok_or_else(|| {
            Error::new(ErrorKind::TypeMismatch).with_message(format!(
                "value of back-reference key {raw_key:?} is {}, expected a pool index",
                type_name(value)
            ))
        })
}
