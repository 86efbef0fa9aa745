//! Process tooling for the qarun task runner.
//!
//! This crate provides the layer every session phase goes through to reach an
//! external executable:
//! - `CommandLine` describing one invocation (program, arguments, environment)
//! - `ProcessRunner` trait so orchestration code can be exercised without real tools
//! - `SystemRunner` spawning real processes on the tokio runtime
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

/// Command-line description and process output types.
mod command;
/// Runner trait, errors and the system implementation.
mod runner;

pub use command::{CommandLine, OutputMode, ProcessOutput, output_tail};
pub use runner::{ProcessRunner, SystemRunner, ToolError, ToolResult};
