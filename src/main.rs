//! Purpose: `markergeom` CLI entry point and command definitions.
//! Role: Binary crate root; parses args, loads calibration files, emits JSON on stdout.
//! Invariants: Commands emit stable stdout formats (JSON, pretty when requested or on a TTY).
//! Invariants: Non-interactive errors and notices are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Logging goes to stderr through `tracing`, filtered by `RUST_LOG` (default `error`; notices are emitted separately).
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod geometry_json;
mod pretty_json;

use markergeom::api::{DEFAULT_MAX_TOKENS, Error, ErrorKind, LoadOptions, Notice, to_exit_code};
use markergeom::notice::notice_json;
use pretty_json::render_pretty;

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
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
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
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `markergeom --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    if cli.max_tokens == 0 {
        return Err((
            Error::new(ErrorKind::Usage)
                .with_message("--max-tokens must be at least 1")
                .with_hint(format!("The default is {DEFAULT_MAX_TOKENS}.")),
            color_mode,
        ));
    }
    let options = LoadOptions::default().with_max_tokens(cli.max_tokens);
    command_dispatch::dispatch_command(cli.command, options, color_mode)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "markergeom",
    version,
    about = "Load marker calibration geometry from JSON",
    long_about = None,
    before_help = r#"Reads a calibration file describing marker positions across rotation angles and
prints the flattened, coordinate-major arrays a vision pipeline consumes."#,
    after_help = r#"EXAMPLES
  $ markergeom inspect marker.json --pretty
  $ markergeom check marker.json
  $ markergeom tokens marker.json | head
  $ RUST_LOG=debug markergeom check marker.json

FILE SHAPE
  {"num_angles": A, "num_markers": M,
   "angles": [A ints], "marker_color": [M ints],
   "marker_start" | "marker_mid" | "marker_end": [A rows of 2*M ints]}"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value_t = DEFAULT_MAX_TOKENS,
        help = "Maximum number of JSON tokens a document may produce"
    )]
    max_tokens: usize,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Load a calibration file and print its arrays",
        long_about = r#"Load a calibration file and print dimensions plus all five arrays.

Location arrays are printed flat in storage order: value k of angle j sits at k * num_angles + j."#,
        after_help = r#"EXAMPLES
  $ markergeom inspect marker.json
  $ markergeom inspect marker.json --pretty"#
    )]
    Inspect {
        #[arg(help = "Calibration JSON file", value_hint = ValueHint::FilePath)]
        path: PathBuf,
        #[arg(long, help = "Pretty-print JSON output")]
        pretty: bool,
    },
    #[command(
        arg_required_else_help = true,
        about = "Validate a calibration file",
        after_help = r#"EXAMPLES
  $ markergeom check marker.json && echo ok"#
    )]
    Check {
        #[arg(help = "Calibration JSON file", value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    #[command(
        arg_required_else_help = true,
        about = "Print the token stream of a JSON file (JSON Lines)",
        after_help = r#"EXAMPLES
  $ markergeom tokens marker.json"#
    )]
    Tokens {
        #[arg(help = "JSON file", value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
    #[command(about = "Print version info as JSON")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ markergeom completion bash > ~/.local/share/bash-completion/completions/markergeom
  $ markergeom completion zsh > ~/.zfunc/_markergeom"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_json(value: Value, pretty: bool, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let use_color = color_mode.use_color(is_tty);
    let json = if pretty || is_tty {
        render_pretty(&value, use_color)
    } else {
        serde_json::to_string(&value)
            .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    };
    println!("{json}");
}

fn emit_json_line(value: &Value) {
    let json = serde_json::to_string(value)
        .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output(color_mode: ColorMode) {
    if io::stdout().is_terminal() {
        println!("markergeom {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(
            json!({
                "name": "markergeom",
                "version": env!("CARGO_PKG_VERSION"),
            }),
            false,
            color_mode,
        );
    }
}

fn emit_notice(notice: &Notice, path: &Path, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {} ({})", notice.message, path.display());
        return;
    }

    let value = notice_json(notice);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"notice\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Syntax => "malformed JSON".to_string(),
        ErrorKind::TokenLimit => "token capacity exceeded".to_string(),
        ErrorKind::Schema => "unexpected document shape".to_string(),
        ErrorKind::Dimension => "dimension mismatch".to_string(),
        ErrorKind::Alloc => "allocation failed".to_string(),
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
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(key) = err.key() {
        inner.insert("key".to_string(), json!(key));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(key) = err.key() {
        lines.push(format!(
            "{} {key}",
            colorize_label("key:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!(
            "{} {offset}",
            colorize_label("offset:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, error_text};
    use clap::Parser;
    use markergeom::api::{Error, ErrorKind};

    #[test]
    fn cli_parses_global_options_after_subcommand() {
        let cli = Cli::try_parse_from(["markergeom", "check", "m.json", "--max-tokens", "32"])
            .expect("parse");
        assert_eq!(cli.max_tokens, 32);
        assert!(matches!(cli.command, Command::Check { .. }));
    }

    #[test]
    fn error_json_carries_context() {
        let err = Error::new(ErrorKind::Dimension)
            .with_message("angles has 3 entries, expected 2 (num_angles)")
            .with_key("angles")
            .with_offset(12)
            .with_path("marker.json");
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Dimension");
        assert_eq!(value["error"]["key"], "angles");
        assert_eq!(value["error"]["offset"], 12);
        assert_eq!(value["error"]["path"], "marker.json");
    }

    #[test]
    fn error_text_falls_back_to_kind_message() {
        let text = error_text(&Error::new(ErrorKind::TokenLimit), false);
        assert_eq!(text, "error: token capacity exceeded");
    }
}
