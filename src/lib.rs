//! Uploads a mobile test build to App Center Test and schedules a run.
//!
//! The step loads its inputs from the environment ([`config`]), makes sure the
//! `appcenter` command-line client is installed ([`tool`]), composes its
//! `test run` command line ([`composer`]) and runs it with the step's own output
//! streams ([`command`]). [`Orchestrator`] ties those phases together.
//!
//! Free-form extra options are split with a small quote-aware word splitter
//! ([`lexer`]) rather than a host shell.

pub mod command;
pub mod composer;
pub mod config;
pub mod env;
pub mod lexer;
mod orchestrator;
pub mod tool;

pub use orchestrator::{Orchestrator, Stage, StepError};
