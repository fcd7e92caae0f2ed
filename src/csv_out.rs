//! Purpose: Render extracted records as CSV text for the `search` command.
//! Exports: `CSV_HEADERS`, `records_to_csv`.
//! Role: Output-side formatting only; never inspects the pool or decoded graph.
//! Invariants: Column order matches `CSV_HEADERS` and is stable once published.
//! Invariants: Fields containing separators, quotes, or newlines are quoted with
//! doubled quotes; everything else is written bare.

use serde_json::Value;

use hublens::core::records::Record;

pub const CSV_HEADERS: [&str; 10] = [
    "seq",
    "id",
    "created_at_local",
    "updated_at_local",
    "name",
    "created_at",
    "updated_at",
    "short_description",
    "pull_count",
    "star_count",
];

pub fn records_to_csv(records: &[Record]) -> String {
    let mut out = String::new();
    out.push_str(&CSV_HEADERS.join(","));
    out.push('\n');

    for record in records {
        let row = [
            record.seq.to_string(),
            record.id.clone(),
            record.created_at_local.clone(),
            record.updated_at_local.clone(),
            option_field(&record.name),
            option_field(&record.created_at),
            option_field(&record.updated_at),
            option_field(&record.short_description),
            value_field(&record.pull_count),
            value_field(&record.star_count),
        ];
        let escaped: Vec<String> = row.iter().map(|field| escape_field(field)).collect();
        out.push_str(&escaped.join(","));
        out.push('\n');
    }
    out
}

fn option_field(field: &Option<String>) -> String {
    field.clone().unwrap_or_default()
}

fn value_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
