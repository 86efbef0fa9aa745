//! Library interface for qarun-cli
//!
//! The binary is a thin wrapper; argument parsing, the session definitions and
//! terminal output live here so they can be tested directly.
#![cfg_attr(
    test,
    allow(
        dead_code,
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        clippy::print_stdout,
        clippy::print_stderr,
        reason = "Allow for tests"
    )
)]

/// Command-line arguments.
pub mod cli;
/// Command handlers.
pub mod handlers;
/// Listing and summary output.
pub mod report;
/// Session definitions.
pub mod sessions;

pub use cli::Cli;
