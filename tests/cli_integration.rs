// CLI integration tests for the search/tags/completion surface.
use std::path::Path;
use std::process::Command;

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_hublens");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn write_payload(dir: &Path) -> std::path::PathBuf {
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
        {"_10": 11, "_12": 14},
        "id",
        "img1",
        "pull_count",
        {"_10": 15},
        42,
        "img2"
    ]);
    let path = dir.join("search.txt");
    std::fs::write(&path, format!("<! [CDATA[ {pool} ]]>")).expect("write payload");
    path
}

#[test]
fn search_emits_records_and_writes_artifacts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let payload = write_payload(temp.path());

    let output = cmd()
        .current_dir(temp.path())
        .args(["search", payload.to_str().unwrap()])
        .output()
        .expect("search");
    assert!(output.status.success());

    // Non-tty stdout carries the JSON array of records.
    let records = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("seq").unwrap(), 1);
    assert_eq!(records[0].get("id").unwrap(), "img1");
    assert_eq!(records[0].get("pull_count").unwrap(), 42);
    assert_eq!(records[1].get("id").unwrap(), "img2");
    assert_eq!(records[1].get("pull_count").unwrap(), 0);

    // Artifacts land next to the working directory with the default prefix.
    let json_artifact =
        std::fs::read_to_string(temp.path().join("images_info.json")).expect("json artifact");
    let saved = parse_json(&json_artifact);
    assert_eq!(saved.as_array().expect("array").len(), 2);

    let csv_artifact =
        std::fs::read_to_string(temp.path().join("images_info.csv")).expect("csv artifact");
    let mut lines = csv_artifact.lines();
    assert_eq!(
        lines.next().unwrap(),
        "seq,id,created_at_local,updated_at_local,name,created_at,updated_at,short_description,pull_count,star_count"
    );
    assert!(lines.next().unwrap().starts_with("1,img1,"));
    assert!(lines.next().unwrap().starts_with("2,img2,"));

    // Non-tty stderr carries structured notices for each artifact.
    let stderr = String::from_utf8_lossy(&output.stderr);
    let notices: Vec<&str> = stderr.lines().filter(|l| l.contains("\"notice\"")).collect();
    assert_eq!(notices.len(), 2);
    let first = parse_json(notices[0]);
    assert_eq!(first["notice"]["kind"], "saved");
    assert_eq!(first["notice"]["cmd"], "search");
}

#[test]
fn search_no_files_skips_artifacts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let payload = write_payload(temp.path());

    let output = cmd()
        .current_dir(temp.path())
        .args(["search", payload.to_str().unwrap(), "--no-files"])
        .output()
        .expect("search");
    assert!(output.status.success());
    assert!(!temp.path().join("images_info.json").exists());
    assert!(!temp.path().join("images_info.csv").exists());
}

#[test]
fn search_prefix_controls_artifact_names() {
    let temp = tempfile::tempdir().expect("tempdir");
    let payload = write_payload(temp.path());

    let output = cmd()
        .current_dir(temp.path())
        .args([
            "search",
            payload.to_str().unwrap(),
            "--prefix",
            "llama_cpp",
        ])
        .output()
        .expect("search");
    assert!(output.status.success());
    assert!(temp.path().join("llama_cpp_info.json").exists());
    assert!(temp.path().join("llama_cpp_info.csv").exists());
}

#[test]
fn search_dump_root_prints_the_decoded_graph() {
    let temp = tempfile::tempdir().expect("tempdir");
    let payload = write_payload(temp.path());

    let output = cmd()
        .current_dir(temp.path())
        .args(["search", payload.to_str().unwrap(), "--dump-root"])
        .output()
        .expect("search");
    assert!(output.status.success());

    let root = parse_json(std::str::from_utf8(&output.stdout).expect("utf8"));
    let results = &root["routes/_layout.search"]["data"]["searchResults"]["results"];
    assert_eq!(results, &json!([9, 13]));
    // --dump-root never writes artifacts.
    assert!(!temp.path().join("images_info.json").exists());
}

#[test]
fn structure_mismatch_maps_to_exit_code_6() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("drifted.txt");
    std::fs::write(&path, json!(["renamed_route", {"_0": 2}, "x"]).to_string())
        .expect("write payload");

    let output = cmd()
        .current_dir(temp.path())
        .args(["search", path.to_str().unwrap()])
        .output()
        .expect("search");
    assert_eq!(output.status.code(), Some(6));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let error_line = stderr
        .lines()
        .find(|l| l.contains("\"error\""))
        .expect("error json");
    let error = parse_json(error_line);
    assert_eq!(error["error"]["kind"], "StructureMismatch");
}

#[test]
fn invalid_payload_json_maps_to_exit_code_3() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("broken.txt");
    std::fs::write(&path, "[1, ").expect("write payload");

    let output = cmd()
        .args(["search", path.to_str().unwrap()])
        .output()
        .expect("search");
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn missing_payload_file_maps_to_exit_code_9() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("nope.txt");

    let output = cmd()
        .args(["search", path.to_str().unwrap()])
        .output()
        .expect("search");
    assert_eq!(output.status.code(), Some(9));
}

#[test]
fn tags_rejects_zero_limit_as_usage_error() {
    let output = cmd()
        .args(["tags", "nginx", "--limit", "0"])
        .output()
        .expect("tags");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn completion_generates_without_error() {
    let output = cmd().args(["completion", "bash"]).output().expect("completion");
    assert!(output.status.success());
    assert!(!output.stdout.is_empty());
}
