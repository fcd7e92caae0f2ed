//! Purpose: Hold the flat value pool backing a flattened-reference payload.
//! Exports: `Pool`, `REF_MARKER`, `parse_ref_key`.
//! Role: Immutable, index-addressed store shared by the decoder and the extractor.
//! Invariants: The pool is never mutated after construction.
//! Invariants: Out-of-range lookups fail with `IndexOutOfRange`, never panic.

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};

/// Marker prefix for back-reference keys in index-map entries.
pub const REF_MARKER: char = '_';

const CDATA_OPEN: &str = "<! [CDATA[";
const CDATA_CLOSE: &str = "]]>";

/// Flat ordered sequence of JSON values, indexed by position.
///
/// Plain entries (strings, arrays) are stored verbatim. Objects are index-map
/// entries: their keys are `_<pool-index>` back-references naming the field and
/// their values are pool indices pointing at the field's value.
#[derive(Clone, Debug)]
pub struct Pool {
    entries: Vec<Value>,
}

impl Pool {
    pub fn new(entries: Vec<Value>) -> Self {
        Self { entries }
    }

    /// Parse a pool from raw payload text, stripping the `<! [CDATA[ ... ]]>`
    /// wrapper markers some captures carry. The top level must be a JSON array.
    pub fn from_json_text(text: &str) -> Result<Self, Error> {
        let cleaned = text.trim().replace(CDATA_OPEN, "").replace(CDATA_CLOSE, "");
        let value: Value = serde_json::from_str(&cleaned).map_err(|err| {
            Error::new(ErrorKind::Parse)
                .with_message("payload is not valid JSON")
                .with_source(err)
        })?;
        match value {
            Value::Array(entries) => Ok(Self { entries }),
            other => Err(Error::new(ErrorKind::Parse)
                .with_message(format!(
                    "payload top level must be an array, got {}",
                    type_name(&other)
                ))
                .with_hint("Expected the flattened pool format: a single JSON array.")),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Value, Error> {
        self.entries.get(index).ok_or_else(|| {
            Error::new(ErrorKind::IndexOutOfRange)
                .with_message(format!(
                    "pool reference {index} is out of range (pool has {} entries)",
                    self.entries.len()
                ))
                .with_index(index)
        })
    }

    /// Resolve a pool entry that names a map key. Map keys must be strings.
    pub fn key_name(&self, index: usize) -> Result<&str, Error> {
        match self.get(index)? {
            Value::String(name) => Ok(name.as_str()),
            other => Err(Error::new(ErrorKind::TypeMismatch)
                .with_message(format!(
                    "key reference {index} resolved to {}, expected a string",
                    type_name(other)
                ))
                .with_index(index)),
        }
    }
}

/// Parse a raw index-map key. Returns `None` for keys without the marker
/// (decoration keys, skipped silently) and `MalformedKey` when the suffix is
/// not a valid pool index.
pub fn parse_ref_key(raw: &str) -> Option<Result<usize, Error>> {
    let suffix = raw.strip_prefix(REF_MARKER)?;
    Some(suffix.parse::<usize>().map_err(|err| {
        Error::new(ErrorKind::MalformedKey)
            .with_message(format!("back-reference key {raw:?} has a non-numeric suffix"))
            .with_source(err)
    }))
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
