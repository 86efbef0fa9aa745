use core::fmt::{Display, Formatter, Result as FmtResult};
use core::result::Result as CoreResult;
use std::io::Error as IoError;
use std::path::PathBuf;

use qarun_tooling::ToolError;
use thiserror::Error;
use toml::de::Error as TomlError;

/// Result type for core operations.
pub type Result<T, E = Error> = CoreResult<T, E>;

/// What was being done to a scratch file when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceAction {
    /// Creating the file
    Create,
    /// Deleting the file
    Delete,
}

impl Display for ResourceAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(match self {
            Self::Create => "create",
            Self::Delete => "delete",
        })
    }
}

/// Errors that can occur while orchestrating sessions.
#[derive(Debug, Error)]
pub enum Error {
    /// A scratch file could not be created or deleted.
    #[error("failed to {action} scratch file {}: {source}", .path.display())]
    Resource {
        /// Operation that failed
        action: ResourceAction,
        /// File (or directory, for creation) involved
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: IoError,
    },

    /// The lock resolver or a task command exited unsuccessfully.
    #[error("`{program}` failed with {}", describe_exit(.code.as_ref()))]
    ExternalTool {
        /// Program that failed
        program: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Captured tool output
        output: String,
    },

    /// The package installer exited unsuccessfully.
    #[error("installation into `{environment}` failed with {}", describe_exit(.code.as_ref()))]
    Install {
        /// Environment being installed into
        environment: String,
        /// Exit code, `None` when killed by a signal
        code: Option<i32>,
        /// Captured installer output
        output: String,
    },

    /// The invocation names a session that is not registered.
    #[error("Unknown session: {0}")]
    UnknownSession(String),

    /// A session with the same name is already registered.
    #[error("Session already registered: {0}")]
    DuplicateSession(String),

    /// A session definition is inconsistent.
    #[error("Invalid session `{name}`: {reason}")]
    InvalidSession {
        /// Session name
        name: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A process could not be run at all.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// TOML deserialization failed.
    #[error("TOML deserialization error: {0}")]
    Toml(#[from] TomlError),
}

impl Error {
    /// Short stable label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Resource { .. } => "resource",
            Self::ExternalTool { .. } => "external-tool",
            Self::Install { .. } => "install",
            Self::UnknownSession(_) => "unknown-session",
            Self::DuplicateSession(_) => "duplicate-session",
            Self::InvalidSession { .. } => "invalid-session",
            Self::Config(_) | Self::Toml(_) => "config",
            Self::Tool(_) => "spawn",
            Self::Io(_) => "io",
        }
    }

    /// Output captured from the failing tool, if any.
    pub fn tool_output(&self) -> Option<&str> {
        match self {
            Self::ExternalTool { output, .. } | Self::Install { output, .. } => Some(output),
            _ => None,
        }
    }
}

fn describe_exit(code: Option<&i32>) -> String {
    code.map_or_else(
        || "termination by signal".to_owned(),
        |value| format!("exit code {value}"),
    )
}

/// Stage of a session's execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Creating the target environment
    Environment,
    /// Installing the project itself into the environment
    InstallProject,
    /// Exporting a constraint manifest from the lock file
    ResolveManifest,
    /// Installing constrained tool dependencies
    Install,
    /// Running the session command
    Command,
}

impl Display for Phase {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(match self {
            Self::Environment => "create-environment",
            Self::InstallProject => "install-project",
            Self::ResolveManifest => "resolve-manifest",
            Self::Install => "install",
            Self::Command => "command",
        })
    }
}

/// A session failure attributed to the phase it happened in.
#[derive(Debug, Error)]
#[error("{phase} phase failed: {source}")]
pub struct SessionError {
    /// Phase that failed
    pub phase: Phase,
    /// What went wrong
    #[source]
    pub source: Error,
}

impl SessionError {
    /// Returns a closure tagging errors with `phase`, for use with `map_err`.
    pub fn at<E>(phase: Phase) -> impl Fn(E) -> Self
    where
        E: Into<Error>,
    {
        move |source| Self {
            phase,
            source: source.into(),
        }
    }
}
