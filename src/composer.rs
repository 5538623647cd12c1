//! Builds the `appcenter test run` command line from a [`Configuration`].
//!
//! The committed argument order is:
//!
//! ```text
//! test run <framework>
//!   --token <token> --app <app> --devices <devices> --test-series <series>
//!   --locale <locale> --app-path <app_path>
//!   [--dsym-dir <dsym_dir>]
//!   [--async]
//!   (--project-dir | --build-dir) <test_dir>
//!   [additional options...]
//! ```
//!
//! `--async` sits between the app flags and the directory flag, matching the
//! end-to-end argument vector the upload step documents; the tool itself accepts
//! flags in any order after `test run <framework>`.
//!
//! Calabash projects are uploaded as a project directory; every other framework
//! uploads a build directory.

use crate::command::Invocation;
use crate::config::{Configuration, TestFramework};
use crate::lexer::{self, LexingError};

/// Binary name of the upload tool.
pub const TOOL_NAME: &str = "appcenter";

/// Flag whose value must never be printed.
pub const TOKEN_FLAG: &str = "--token";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComposeError {
    #[error("invalid additional options: {0}")]
    Options(#[from] LexingError),
}

/// Compose the upload tool's argument vector.
///
/// The configuration is trusted as validated; the only failure is an options string
/// that can't be split, in which case no arguments are returned at all.
///
/// # Errors
///
/// Returns [`ComposeError::Options`] for an unbalanced quote or trailing escape in
/// `additional_options`.
pub fn compose(cfg: &Configuration) -> Result<Vec<String>, ComposeError> {
    let mut args: Vec<String> = [
        "test",
        "run",
        cfg.framework.as_str(),
        TOKEN_FLAG,
        cfg.token.as_str(),
        "--app",
        cfg.app.as_str(),
        "--devices",
        cfg.devices.as_str(),
        "--test-series",
        cfg.series.as_str(),
        "--locale",
        cfg.locale.as_str(),
        "--app-path",
        cfg.app_path.as_str(),
    ]
    .into_iter()
    .map(String::from)
    .collect();

    if !cfg.dsym_dir.is_empty() {
        args.push("--dsym-dir".to_string());
        args.push(cfg.dsym_dir.clone());
    }
    if cfg.is_async() {
        args.push("--async".to_string());
    }

    let dir_flag = match cfg.framework {
        TestFramework::Calabash => "--project-dir",
        _ => "--build-dir",
    };
    args.push(dir_flag.to_string());
    args.push(cfg.test_dir.clone());

    if !cfg.additional_options.is_empty() {
        args.extend(lexer::split_words(&cfg.additional_options)?);
    }

    Ok(args)
}

/// The full upload command, program name included.
pub fn upload_invocation(cfg: &Configuration) -> Result<Invocation, ComposeError> {
    Ok(Invocation::new(TOOL_NAME, compose(cfg)?))
}
