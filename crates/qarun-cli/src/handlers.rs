//! Command handlers for CLI operations

use std::io::stderr;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use qarun_core::{Config, Runner, SessionContext};
use qarun_tooling::{ProcessRunner, SystemRunner};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

use crate::cli::Cli;
use crate::report::{listing, summary, write_lines};
use crate::sessions;

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "QARUN_LOG";

/// Installs the stderr log subscriber.
///
/// `QARUN_LOG` takes precedence over the verbosity flags.
pub fn init_logging(cli: &Cli) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let initialized = Registry::default()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(stderr)
                .without_time()
                .with_target(false),
        )
        .try_init();
    if initialized.is_err() {
        tracing::debug!("Log subscriber already installed");
    }
}

/// Loads the configuration file (explicit or from the project root) and applies flags.
///
/// # Errors
/// Returns an error if the configuration file cannot be read or is invalid.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&cli.project)?,
    };
    cli.apply_overrides(&mut config);
    Ok(config)
}

/// Lists sessions or runs the selected ones, returning the process exit code.
///
/// # Errors
/// Returns an error if configuration is invalid, a named session is unknown,
/// or output cannot be written. Session failures are reported through the
/// exit code instead.
pub async fn handle(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let registry = sessions::registry(&config)?;

    if cli.list {
        write_lines(&listing(&registry, &cli.project))?;
        return Ok(ExitCode::SUCCESS);
    }

    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner);
    let context = SessionContext::new(runner, config, &cli.project)?;
    let report = Runner::new(&registry, context)
        .run(&cli.invocation())
        .await?;

    write_lines(&summary(&report))?;
    Ok(ExitCode::from(u8::try_from(report.exit_code()).unwrap_or(1)))
}
