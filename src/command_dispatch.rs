//! Purpose: Hold top-level CLI command dispatch for `hublens`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Command behavior, output envelopes, and exit code semantics stay unchanged.
//! Invariants: Helpers in `main.rs` remain the source of output formatting.

use super::*;

use clap::CommandFactory;
use hublens::core::graph::decode;
use hublens::core::records::{ExtractConfig, extract_records};
use hublens::core::pool::Pool;

use crate::csv_out::records_to_csv;
use crate::fetch::{FetchConfig, collect_arm64_tags, http_fetcher};

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "hublens", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Search {
            file,
            prefix,
            no_files,
            dump_root,
            route_key,
            field,
        } => {
            let text = read_payload_file(&file)?;
            let pool = Pool::from_json_text(&text)?;
            let root = decode(&pool, 0)?;

            if dump_root {
                emit_json(root.to_value());
                return Ok(RunOutcome::ok());
            }

            let mut config = ExtractConfig::default();
            if !route_key.is_empty() {
                config.route = route_key;
            }
            if !field.is_empty() {
                config.fields = field;
            }

            let records = extract_records(&root, &pool, &config)?;

            if io::stdout().is_terminal() {
                emit_records_human(&records);
            } else {
                emit_json(json!(records));
            }

            if !no_files {
                let json_path = PathBuf::from(format!("{prefix}_info.json"));
                let json_text = serde_json::to_string_pretty(&records).map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to encode records as JSON")
                        .with_source(err)
                })?;
                write_text_file(&json_path, &json_text)?;
                emit_notice(&saved_notice("search", &json_path, records.len()));

                let csv_path = PathBuf::from(format!("{prefix}_info.csv"));
                write_text_file(&csv_path, &records_to_csv(&records))?;
                emit_notice(&saved_notice("search", &csv_path, records.len()));
            }

            Ok(RunOutcome::ok())
        }
        Command::Tags {
            image,
            limit,
            page_size,
            save,
        } => {
            if limit == 0 {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("--limit must be at least 1")
                    .with_hint("Use `--limit 20` to collect up to 20 matching tags."));
            }
            let config = FetchConfig {
                image,
                page_size,
                limit,
            };
            let tags = collect_arm64_tags(&config, http_fetcher())?;

            match save {
                Some(path) => {
                    let text = serde_json::to_string_pretty(&tags).map_err(|err| {
                        Error::new(ErrorKind::Internal)
                            .with_message("failed to encode tags as JSON")
                            .with_source(err)
                    })?;
                    write_text_file(&path, &text)?;
                    emit_notice(&saved_notice("tags", &path, tags.len()));
                }
                None => emit_json(json!(tags)),
            }

            Ok(RunOutcome::ok())
        }
    }
}
