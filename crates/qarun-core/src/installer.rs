//! Constrained package installation into session environments.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qarun_tooling::{CommandLine, ProcessRunner};
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};

/// Recognized installer options, applied to every constrained install.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallOptions {
    /// Package index overriding the installer's default
    pub index_url: Option<String>,
    /// Allow pre-release versions
    pub pre: bool,
    /// Additional constraint files, applied after the exported manifest
    pub extra_constraints: Vec<PathBuf>,
}

impl InstallOptions {
    /// Installer flags for these options. Unset options add nothing.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        for constraint in &self.extra_constraints {
            args.push(format!("--constraint={}", constraint.display()));
        }
        if let Some(url) = &self.index_url {
            args.push(format!("--index-url={url}"));
        }
        if self.pre {
            args.push("--pre".to_owned());
        }
        args
    }
}

/// Installs packages into an environment, pinned by a constraint manifest.
#[derive(Clone)]
pub struct EnvironmentInstaller {
    runner: Arc<dyn ProcessRunner>,
    project_dir: PathBuf,
}

impl EnvironmentInstaller {
    /// Creates an installer running processes from `project_dir`.
    pub fn new(runner: Arc<dyn ProcessRunner>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            project_dir: project_dir.into(),
        }
    }

    /// Installs `packages` in one installer invocation, constrained to `manifest_path`.
    ///
    /// An empty package list is a no-op. The manifest is not inspected here;
    /// malformed lines surface as installer failures.
    ///
    /// # Errors
    /// Returns `Error::Install` if the installer exits unsuccessfully, or
    /// `Error::Tool` if it cannot be started.
    pub async fn install(
        &self,
        environment: &Environment,
        manifest_path: &Path,
        packages: &[String],
        options: &InstallOptions,
    ) -> Result<()> {
        if packages.is_empty() {
            tracing::debug!("Nothing to install into {}", environment.name());
            return Ok(());
        }

        let command = CommandLine::new(environment.python_executable())
            .args(["-m", "pip", "install"])
            .arg(format!("--constraint={}", manifest_path.display()))
            .args(options.to_args())
            .args(packages.iter().cloned())
            .envs(environment.vars())
            .current_dir(&self.project_dir);

        tracing::info!(
            "Installing {} into {}",
            packages.join(" "),
            environment.name()
        );
        self.run_install(environment, &command).await
    }

    /// Installs the project itself, without development dependencies.
    ///
    /// # Errors
    /// Returns `Error::Install` if the resolver exits unsuccessfully, or
    /// `Error::Tool` if it cannot be started.
    pub async fn install_project(
        &self,
        environment: &Environment,
        resolver: &ResolverConfig,
    ) -> Result<()> {
        let command = CommandLine::new(&resolver.program)
            .args(resolver.args.iter().cloned())
            .args(["install", "--no-dev"])
            .envs(environment.vars())
            .current_dir(&self.project_dir);

        tracing::info!("Installing project into {}", environment.name());
        self.run_install(environment, &command).await
    }

    async fn run_install(&self, environment: &Environment, command: &CommandLine) -> Result<()> {
        let output = self.runner.run(command).await?;
        if output.success() {
            return Ok(());
        }
        Err(Error::Install {
            environment: environment.name().to_owned(),
            code: output.code,
            output: output.output,
        })
    }
}
