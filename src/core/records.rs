//! Purpose: Extract catalog image records from a decoded search page payload.
//! Exports: `ExtractConfig`, `Record`, `extract_records`, `extract_records_at_offset`,
//! `localize_timestamp`, `local_offset`.
//! Role: One-level (shallow) extraction layered on the graph decoder.
//! Invariants: Extraction is pure and idempotent; the pool and root are never mutated.
//! Invariants: Output order preserves the results list order; `seq` is 1-based.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use time::UtcOffset;
use time::format_description::well_known::Rfc3339;

use crate::core::error::{Error, ErrorKind};
use crate::core::graph::{DecodedValue, ref_index};
use crate::core::pool::{Pool, parse_ref_key, type_name};

/// Navigation path from the decoded root to the per-record index list, as the
/// Docker Hub search page currently lays it out.
pub const DEFAULT_ROUTE: [&str; 4] = ["routes/_layout.search", "data", "searchResults", "results"];

/// Field allow-list, case-sensitive.
pub const DEFAULT_FIELDS: [&str; 7] = [
    "id",
    "name",
    "created_at",
    "updated_at",
    "short_description",
    "pull_count",
    "star_count",
];

const ID_FALLBACK: &str = "not found";

/// Where to find records and which fields to keep. Injected rather than
/// hardcoded so a page format drift only needs a config change.
#[derive(Clone, Debug)]
pub struct ExtractConfig {
    pub route: Vec<String>,
    pub fields: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            route: DEFAULT_ROUTE.iter().map(|key| key.to_string()).collect(),
            fields: DEFAULT_FIELDS.iter().map(|key| key.to_string()).collect(),
        }
    }
}

/// One extracted catalog image.
///
/// `pull_count` and `star_count` stay raw JSON values because the upstream
/// page serves them as numbers or pre-formatted strings depending on size.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
    pub seq: u64,
    pub id: String,
    pub created_at_local: String,
    pub updated_at_local: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub short_description: Option<String>,
    pub pull_count: Value,
    pub star_count: Value,
}

/// Extract records using the machine's local UTC offset for the localized
/// timestamp columns. Falls back to UTC when the offset is indeterminate.
pub fn extract_records(
    root: &DecodedValue,
    pool: &Pool,
    config: &ExtractConfig,
) -> Result<Vec<Record>, Error> {
    extract_records_at_offset(root, pool, config, local_offset())
}

/// Offset-explicit form of [`extract_records`]; pure and deterministic.
pub fn extract_records_at_offset(
    root: &DecodedValue,
    pool: &Pool,
    config: &ExtractConfig,
    offset: UtcOffset,
) -> Result<Vec<Record>, Error> {
    let indices = record_indices(root, config)?;

    let mut records = Vec::with_capacity(indices.len());
    for (position, index) in indices.into_iter().enumerate() {
        let fields = shallow_fields(pool, index, config)?;
        records.push(build_record(position as u64 + 1, fields, offset));
    }
    Ok(records)
}

/// Walk the decoded root along the configured route to the list of record
/// pool indices.
fn record_indices(root: &DecodedValue, config: &ExtractConfig) -> Result<Vec<usize>, Error> {
    let mut cursor = root;
    for key in &config.route {
        cursor = cursor.get(key).ok_or_else(|| {
            Error::new(ErrorKind::StructureMismatch)
                .with_message(format!("expected key {key:?} is missing from the decoded payload"))
                .with_hint("The upstream page format may have changed.")
        })?;
    }

    let Some(items) = cursor.as_list() else {
        return Err(Error::new(ErrorKind::StructureMismatch).with_message(format!(
            "route target {:?} is not a list",
            config.route.last().map(String::as_str).unwrap_or("")
        )));
    };

    items
        .iter()
        .map(|item| {
            item.as_u64().map(|index| index as usize).ok_or_else(|| {
                Error::new(ErrorKind::StructureMismatch).with_message(format!(
                    "results entry is {}, expected a pool index",
                    type_name(item)
                ))
            })
        })
        .collect()
}

/// Decode ONE level of the index-map entry at `index`: resolve each marker
/// key's name and take the raw pool value it points at. Record fields are
/// terminal pool entries, so no recursion is needed here.
fn shallow_fields(
    pool: &Pool,
    index: usize,
    config: &ExtractConfig,
) -> Result<BTreeMap<String, Value>, Error> {
    let Value::Object(entry) = pool.get(index)? else {
        return Err(Error::new(ErrorKind::StructureMismatch)
            .with_message("record entry is not an index-map object")
            .with_index(index));
    };

    let mut fields = BTreeMap::new();
    for (raw_key, value) in entry {
        let Some(key_index) = parse_ref_key(raw_key) else {
            continue;
        };
        let key_name = pool.key_name(key_index?)?;
        if !config.fields.iter().any(|field| field == key_name) {
            continue;
        }
        let value_index = ref_index(value, raw_key)?;
        fields.insert(key_name.to_string(), pool.get(value_index)?.clone());
    }
    Ok(fields)
}

fn build_record(seq: u64, mut fields: BTreeMap<String, Value>, offset: UtcOffset) -> Record {
    let name = fields.get("name").map(display_string);
    let id = fields
        .get("id")
        .map(display_string)
        .or_else(|| name.clone())
        .unwrap_or_else(|| ID_FALLBACK.to_string());
    let created_at = fields.get("created_at").map(display_string);
    let updated_at = fields.get("updated_at").map(display_string);

    Record {
        seq,
        id,
        created_at_local: created_at
            .as_deref()
            .map(|value| localize_timestamp(value, offset))
            .unwrap_or_default(),
        updated_at_local: updated_at
            .as_deref()
            .map(|value| localize_timestamp(value, offset))
            .unwrap_or_default(),
        name,
        created_at,
        updated_at,
        short_description: fields.get("short_description").map(display_string),
        pull_count: fields.remove("pull_count").unwrap_or_else(|| json!(0)),
        star_count: fields.remove("star_count").unwrap_or_else(|| json!(0)),
    }
}

fn display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reformat an ISO-8601 timestamp (trailing `Z` = UTC) into a display string
/// at the given offset. Values that do not look like ISO timestamps, or fail
/// to parse as RFC 3339, pass through unchanged.
pub fn localize_timestamp(value: &str, offset: UtcOffset) -> String {
    if !looks_like_iso(value) {
        return value.to_string();
    }
    let Ok(parsed) = time::OffsetDateTime::parse(value, &Rfc3339) else {
        return value.to_string();
    };
    let shifted = parsed.to_offset(offset);
    let format =
        time::format_description::parse("[year]-[month]-[day] [hour]:[minute]:[second]");
    let Ok(format) = format else {
        return value.to_string();
    };
    shifted.format(&format).unwrap_or_else(|_| value.to_string())
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

fn looks_like_iso(value: &str) -> bool {
    let year_like = value.len() >= 4 && value.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    year_like && value.contains('T')
}
