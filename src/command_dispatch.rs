//! Purpose: Hold top-level CLI command dispatch for `markergeom`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Notices go to stderr before the command's stdout payload is written.
//! Invariants: Library errors propagate unchanged so exit codes follow `ErrorKind`.

use super::*;
use crate::geometry_json::{check_json, geometry_json, token_json};
use markergeom::api::{load_marker_geometry_with, read_whole_file, tokenize};

pub(super) fn dispatch_command(
    command: Command,
    options: LoadOptions,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    match command {
        Command::Inspect { path, pretty } => {
            let outcome = load_marker_geometry_with(&path, &options)?;
            for notice in &outcome.notices {
                emit_notice(notice, &path, color_mode);
            }
            emit_json(geometry_json(&path, &outcome), pretty, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Check { path } => {
            let outcome = load_marker_geometry_with(&path, &options)?;
            for notice in &outcome.notices {
                emit_notice(notice, &path, color_mode);
            }
            emit_json(check_json(&path, &outcome), false, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Tokens { path } => {
            let bytes = read_whole_file(&path)?;
            let tokens = tokenize(&bytes, options.max_tokens).map_err(|err| err.with_path(&path))?;
            for (index, token) in tokens.iter().enumerate() {
                emit_json_line(&token_json(index, token));
            }
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output(color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "markergeom", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
    }
}
