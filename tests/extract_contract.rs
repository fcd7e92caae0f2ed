//! Purpose: Contract coverage for the decode + extract pipeline on payload text.
//! Exports: Integration tests only.
//! Role: Exercise the public library API end to end, without the CLI.
//! Invariants: Decoding is deterministic; extraction preserves results order.
//! Invariants: Route drift surfaces as StructureMismatch, never a partial result.

use hublens::core::error::ErrorKind;
use hublens::core::graph::{DecodedValue, decode};
use hublens::core::pool::Pool;
use hublens::core::records::{ExtractConfig, extract_records_at_offset};
use serde_json::json;
use time::UtcOffset;

/// Payload shaped like a captured search page: CDATA wrapper, route from the
/// root down to a results list, two records with partial fields.
fn search_payload() -> String {
    let pool = json!([
        {"_1": 2},
        "routes/_layout.search",
        {"_3": 4},
        "data",
        {"_5": 6},
        "searchResults",
        {"_7": 8},
        "results",
        [9, 13],
        {"_10": 11, "_12": 14, "_16": 18},
        "id",
        "img1",
        "pull_count",
        {"_10": 15},
        42,
        "img2",
        "created_at",
        "unused",
        "2024-01-01T00:00:00Z"
    ]);
    format!("<! [CDATA[ {pool} ]]>")
}

#[test]
fn payload_decodes_and_extracts_in_order() {
    let pool = Pool::from_json_text(&search_payload()).expect("pool");
    let root = decode(&pool, 0).expect("root");
    let records =
        extract_records_at_offset(&root, &pool, &ExtractConfig::default(), UtcOffset::UTC)
            .expect("records");

    assert_eq!(records.len(), 2);

    assert_eq!(records[0].seq, 1);
    assert_eq!(records[0].id, "img1");
    assert_eq!(records[0].pull_count, json!(42));
    assert_eq!(records[0].created_at.as_deref(), Some("2024-01-01T00:00:00Z"));
    assert_eq!(records[0].created_at_local, "2024-01-01 00:00:00");

    assert_eq!(records[1].seq, 2);
    assert_eq!(records[1].id, "img2");
    assert_eq!(records[1].pull_count, json!(0));
    assert_eq!(records[1].star_count, json!(0));
    assert_eq!(records[1].created_at, None);
    assert_eq!(records[1].created_at_local, "");
}

#[test]
fn decode_is_deterministic_across_calls() {
    let pool = Pool::from_json_text(&search_payload()).expect("pool");
    assert_eq!(decode(&pool, 0).unwrap(), decode(&pool, 0).unwrap());
}

#[test]
fn terminal_entries_decode_to_themselves() {
    let pool = Pool::from_json_text(&search_payload()).expect("pool");
    // Index 1 is a plain string, index 8 a plain list.
    assert_eq!(
        decode(&pool, 1).unwrap(),
        DecodedValue::Str("routes/_layout.search".to_string())
    );
    assert_eq!(
        decode(&pool, 8).unwrap(),
        DecodedValue::List(vec![json!(9), json!(13)])
    );
}

#[test]
fn missing_search_route_is_a_structure_mismatch() {
    let payload = json!(["something_else", {"_0": 2}, "value"]).to_string();
    let pool = Pool::from_json_text(&payload).expect("pool");
    let root = decode(&pool, 1).expect("root");
    let err = extract_records_at_offset(&root, &pool, &ExtractConfig::default(), UtcOffset::UTC)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StructureMismatch);
}

#[test]
fn extraction_is_idempotent_on_the_same_inputs() {
    let pool = Pool::from_json_text(&search_payload()).expect("pool");
    let root = decode(&pool, 0).expect("root");
    let config = ExtractConfig::default();
    let first = extract_records_at_offset(&root, &pool, &config, UtcOffset::UTC).unwrap();
    let second = extract_records_at_offset(&root, &pool, &config, UtcOffset::UTC).unwrap();
    assert_eq!(first, second);
}

#[test]
fn injected_route_and_fields_change_navigation_not_behavior() {
    let payload = json!([
        {"_1": 2},
        "items",
        [3],
        {"_4": 5},
        "name",
        "solo"
    ])
    .to_string();
    let pool = Pool::from_json_text(&payload).expect("pool");
    let root = decode(&pool, 0).expect("root");
    let config = ExtractConfig {
        route: vec!["items".to_string()],
        fields: vec!["name".to_string()],
    };
    let records = extract_records_at_offset(&root, &pool, &config, UtcOffset::UTC).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "solo");
    assert_eq!(records[0].name.as_deref(), Some("solo"));
}
