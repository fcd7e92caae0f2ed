//! Purpose: `hublens` CLI entry point and argument surface.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (human on a tty, JSON otherwise).
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `core::error::to_exit_code`.

use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod csv_out;
mod fetch;

use hublens::core::error::{Error, ErrorKind, to_exit_code};
use hublens::core::records::Record;
use hublens::notice::{Notice, notice_json};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let rendered = err.to_string();
                let summary = rendered.lines().next().unwrap_or("bad arguments").to_string();
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(summary)
                    .with_hint("Run `hublens --help` for usage."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "hublens",
    version,
    about = "Decode Docker Hub flattened search payloads and filter tag metadata",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Search pages ship their data as a flat pool of JSON values where nested
objects are encoded as `_<n>` back-references into the pool. `search` decodes
that format; `tags` talks to the public tags endpoint.
"#,
    after_help = r#"EXAMPLES
  $ hublens search llama.cpp.search.txt
  $ hublens search llama.cpp.search.txt --prefix llama_cpp
  $ hublens search llama.cpp.search.txt --dump-root | jq .
  $ hublens tags yusiwen/llama.cpp --limit 20

  $ hublens <command> --help"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Decode a saved search page payload and extract image records",
        long_about = r#"Load a flattened search payload (optionally wrapped in `<! [CDATA[ ... ]]>`
markers), decode the reference graph from pool index 0, and extract one record
per catalog image.

Prints a human table on a tty, a JSON array otherwise, and writes
`<prefix>_info.json` and `<prefix>_info.csv` unless --no-files is given."#
    )]
    Search {
        #[arg(help = "Path to the saved payload file", value_hint = ValueHint::FilePath)]
        file: PathBuf,
        #[arg(
            long,
            default_value = "images",
            help = "Output file prefix for the JSON/CSV artifacts"
        )]
        prefix: String,
        #[arg(long, help = "Skip writing the JSON/CSV artifacts")]
        no_files: bool,
        #[arg(long, help = "Print the fully decoded root as JSON and exit")]
        dump_root: bool,
        #[arg(
            long = "route-key",
            help = "Override the navigation path to the results list (repeatable, in order)"
        )]
        route_key: Vec<String>,
        #[arg(
            long = "field",
            help = "Override the record field allow-list (repeatable)"
        )]
        field: Vec<String>,
    },
    #[command(
        about = "Fetch tag metadata for an image and keep tags with ARM64 variants",
        long_about = r#"Query the public tags endpoint, follow pagination, and keep only tags that
carry at least one arm64 image variant. An image id without a namespace gets
the implicit `library/` prefix."#
    )]
    Tags {
        #[arg(help = "Image id, e.g. yusiwen/llama.cpp or nginx")]
        image: String,
        #[arg(
            long,
            default_value_t = 20,
            help = "Stop paginating once this many matching tags are collected"
        )]
        limit: usize,
        #[arg(long, default_value_t = 100, help = "Tags per page requested upstream")]
        page_size: u32,
        #[arg(
            long,
            help = "Write the matching tags to this path instead of stdout",
            value_hint = ValueHint::FilePath
        )]
        save: Option<PathBuf>,
    },
    #[command(about = "Generate shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn read_payload_file(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read payload file")
            .with_path(path)
            .with_source(err)
    })
}

fn write_text_file(path: &Path, text: &str) -> Result<(), Error> {
    std::fs::write(path, text).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write output file")
            .with_path(path)
            .with_source(err)
    })
}

fn emit_json(value: Value) {
    let text = serde_json::to_string_pretty(&value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{text}");
}

fn emit_records_human(records: &[Record]) {
    const SEQ_WIDTH: usize = 6;
    const ID_WIDTH: usize = 40;
    const TIME_WIDTH: usize = 21;

    println!("{}", "=".repeat(SEQ_WIDTH + ID_WIDTH + 2 * TIME_WIDTH));
    println!("image records ({} total)", records.len());
    println!("{}", "=".repeat(SEQ_WIDTH + ID_WIDTH + 2 * TIME_WIDTH));
    println!(
        "{:<SEQ_WIDTH$}{:<ID_WIDTH$}{:<TIME_WIDTH$}{:<TIME_WIDTH$}",
        "seq", "id", "created (local)", "updated (local)"
    );
    println!("{}", "-".repeat(SEQ_WIDTH + ID_WIDTH + 2 * TIME_WIDTH));
    for record in records {
        println!(
            "{:<SEQ_WIDTH$}{:<ID_WIDTH$}{:<TIME_WIDTH$}{:<TIME_WIDTH$}",
            record.seq, record.id, record.created_at_local, record.updated_at_local
        );
    }
}

fn notice_time_now() -> Option<String> {
    use time::format_description::well_known::Rfc3339;
    let duration = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
    let ts = time::OffsetDateTime::from_unix_timestamp_nanos(duration.as_nanos() as i128).ok()?;
    ts.format(&Rfc3339).ok()
}

fn emit_notice(notice: &Notice) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("notice: {} ({})", notice.message, notice.subject);
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn saved_notice(cmd: &str, path: &Path, records: usize) -> Notice {
    let mut details = Map::new();
    details.insert("path".to_string(), json!(path.display().to_string()));
    details.insert("records".to_string(), json!(records));
    Notice {
        kind: "saved".to_string(),
        time: notice_time_now().unwrap_or_default(),
        cmd: cmd.to_string(),
        subject: path.display().to_string(),
        message: format!("wrote {records} records"),
        details,
    }
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Parse => "parse error".to_string(),
        ErrorKind::IndexOutOfRange => "pool reference out of range".to_string(),
        ErrorKind::MalformedKey => "malformed back-reference key".to_string(),
        ErrorKind::StructureMismatch => "payload structure mismatch".to_string(),
        ErrorKind::TypeMismatch => "payload type mismatch".to_string(),
        ErrorKind::Http => "http request failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(index) = err.index() {
        inner.insert("index".to_string(), json!(index));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn emit_error(err: &Error) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("error: {}", error_message(err));
        for cause in error_causes(err) {
            eprintln!("  caused by: {cause}");
        }
        if let Some(hint) = err.hint() {
            eprintln!("  hint: {hint}");
        }
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}
