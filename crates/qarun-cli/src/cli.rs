use std::path::PathBuf;

use clap::{ArgAction, Parser};
use qarun_core::{Backend, Config, Invocation};

/// Command-line arguments for qarun
#[derive(Debug, Parser)]
#[command(name = "qarun", version)]
#[command(
    about = "Run quality-assurance sessions in isolated, lock-pinned environments",
    long_about = None
)]
pub struct Cli {
    /// Sessions to run, in order (default: the default sessions)
    #[arg(value_name = "SESSIONS")]
    pub sessions: Vec<String>,

    /// Arguments forwarded verbatim to every selected session's command
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,

    /// List sessions and exit
    #[arg(short, long)]
    pub list: bool,

    /// Project root directory
    #[arg(short, long, default_value = ".")]
    pub project: PathBuf,

    /// Configuration file (default: <project>/qarun.toml if present)
    #[arg(short = 'f', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the session environments
    #[arg(long, value_name = "DIR")]
    pub envdir: Option<PathBuf>,

    /// Reuse existing environments instead of recreating them
    #[arg(short = 'r', long = "reuse-existing-virtualenvs")]
    pub reuse: bool,

    /// Run sessions in the ambient interpreter
    #[arg(long)]
    pub no_venv: bool,

    /// Default target runtime version
    #[arg(long, value_name = "VERSION")]
    pub python: Option<String>,

    /// More log output (repeatable)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Applies command-line overrides on top of file configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(dir) = &self.envdir {
            config.environment.dir.clone_from(dir);
        }
        if self.reuse {
            config.environment.reuse = true;
        }
        if self.no_venv {
            config.environment.backend = Backend::None;
        }
        if let Some(python) = &self.python {
            config.project.python.clone_from(python);
        }
    }

    /// Sessions and forwarded arguments to run.
    pub fn invocation(&self) -> Invocation {
        Invocation {
            sessions: self.sessions.clone(),
            args: self.args.clone(),
        }
    }

    /// Default log filter for the verbosity flags.
    pub const fn log_level(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}
