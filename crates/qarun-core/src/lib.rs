//! Session orchestration for the qarun task runner.
//!
//! A run selects sessions from a [`SessionRegistry`] and executes each one in
//! its own environment: the environment is created, the project and the
//! session's tools are installed against a manifest exported from the lock
//! file, and finally the session command runs with the forwarded arguments.
//! Manifests live in [`ScratchFile`]s that are removed on every exit path.
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

/// Configuration file schema and loading.
pub mod config;
/// Per-session target environments.
pub mod environment;
/// Error types and result definitions.
pub mod error;
/// Lock resolver export.
pub mod exporter;
/// Constrained installation.
pub mod installer;
/// Exported manifests.
pub mod manifest;
/// Session lookup and selection.
pub mod registry;
/// Run loop and reports.
pub mod runner;
/// Temporary files with guaranteed cleanup.
pub mod scratch;
/// Session definitions.
pub mod session;

#[cfg(test)]
mod testing;

pub use config::{CONFIG_FILE_NAME, Config, EnvironmentConfig, ProjectConfig, ResolverConfig};
pub use environment::{Backend, Environment};
pub use error::{Error, Phase, ResourceAction, Result, SessionError};
pub use exporter::{ConstraintExporter, ExportOptions};
pub use installer::{EnvironmentInstaller, InstallOptions};
pub use manifest::Manifest;
pub use registry::SessionRegistry;
pub use runner::{
    INTERRUPTED_EXIT_CODE, Invocation, RunReport, Runner, SessionOutcome, SessionStatus,
};
pub use scratch::ScratchFile;
pub use session::{CommandArg, DependencyGroup, Session, SessionBuilder, SessionContext};
