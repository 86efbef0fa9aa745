//! Session definitions and their phase-by-phase execution.

use std::path::{Path, PathBuf, absolute};
use std::sync::Arc;

use qarun_tooling::{CommandLine, ProcessRunner};

use crate::config::Config;
use crate::environment::Environment;
use crate::error::{Error, Phase, Result, SessionError};
use crate::exporter::{ConstraintExporter, ExportOptions};
use crate::installer::EnvironmentInstaller;
use crate::manifest::Manifest;

/// One argument of a session command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandArg {
    /// Passed as written
    Literal(String),
    /// Path of the session's command manifest, after `prefix`
    ManifestPath {
        /// Text placed before the path, such as `--file=`
        prefix: String,
    },
}

impl CommandArg {
    fn render(&self, manifest: Option<&Path>) -> Option<String> {
        match self {
            Self::Literal(value) => Some(value.clone()),
            Self::ManifestPath { prefix } => {
                manifest.map(|path| format!("{prefix}{}", path.display()))
            }
        }
    }
}

/// Packages installed together against one exported manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyGroup {
    /// Package requirements, installed in this order
    pub packages: Vec<String>,
    /// Manifest flavour constraining the install
    pub export: ExportOptions,
}

/// A named, independently runnable task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    name: String,
    description: String,
    python: Option<String>,
    is_default: bool,
    install_project: bool,
    groups: Vec<DependencyGroup>,
    command_manifest: Option<ExportOptions>,
    program: String,
    leading_args: Vec<CommandArg>,
    default_args: Vec<String>,
    accepts_args: bool,
}

impl Session {
    /// Starts defining a session called `name`.
    pub fn builder(name: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(name.into())
    }

    /// Unique session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// One-line description for listings.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target runtime, when the session pins one.
    pub fn python(&self) -> Option<&str> {
        self.python.as_deref()
    }

    /// Whether the session runs when no sessions are named.
    pub const fn is_default(&self) -> bool {
        self.is_default
    }

    /// Arguments used when none are forwarded.
    pub fn default_args(&self) -> &[String] {
        &self.default_args
    }

    /// Dependency groups, installed in order.
    pub fn groups(&self) -> &[DependencyGroup] {
        &self.groups
    }

    /// Arguments the command phase receives for forwarded `args`.
    pub fn effective_args<'args>(&'args self, args: &'args [String]) -> &'args [String] {
        if !self.accepts_args {
            if !args.is_empty() {
                tracing::info!(
                    "Session {} does not take arguments, ignoring {}",
                    self.name,
                    args.join(" ")
                );
            }
            return &self.default_args;
        }
        if args.is_empty() {
            &self.default_args
        } else {
            args
        }
    }

    /// Runs every phase in order and stops at the first failure.
    ///
    /// Manifests are released as soon as their install (or the command that
    /// reads them) finishes, on every exit path. The target environment is
    /// left as it is after a failure.
    ///
    /// # Errors
    /// Returns a `SessionError` naming the phase that failed.
    pub async fn run(
        &self,
        context: &SessionContext,
        args: &[String],
    ) -> Result<(), SessionError> {
        let effective = self.effective_args(args);
        let environment = context.environment_for(self);
        let config = &context.config;

        environment
            .prepare(context.runner.as_ref(), config.environment.reuse)
            .await
            .map_err(SessionError::at(Phase::Environment))?;

        if self.install_project {
            context
                .installer
                .install_project(&environment, &config.resolver)
                .await
                .map_err(SessionError::at(Phase::InstallProject))?;
        }

        for group in &self.groups {
            let manifest = context
                .exporter
                .export(&environment, group.export)
                .await
                .map_err(SessionError::at(Phase::ResolveManifest))?;
            let installed = context
                .installer
                .install(&environment, manifest.path(), &group.packages, &config.installer)
                .await
                .map_err(SessionError::at(Phase::Install));
            settle(installed, manifest.release(), Phase::Install)?;
        }

        let manifest = match self.command_manifest {
            Some(options) => Some(
                context
                    .exporter
                    .export(&environment, options)
                    .await
                    .map_err(SessionError::at(Phase::ResolveManifest))?,
            ),
            None => None,
        };

        let command = self
            .command_line(effective, manifest.as_ref().map(Manifest::path))
            .envs(environment.vars())
            .current_dir(&context.project_dir)
            .streaming();
        tracing::info!("{command}");

        let executed = self.execute(context.runner.as_ref(), &command).await;
        let released = manifest.map_or(Ok(()), Manifest::release);
        settle(executed, released, Phase::Command)
    }

    fn command_line(&self, effective: &[String], manifest: Option<&Path>) -> CommandLine {
        CommandLine::new(&self.program)
            .args(
                self.leading_args
                    .iter()
                    .filter_map(|arg| arg.render(manifest)),
            )
            .args(effective.iter().cloned())
    }

    async fn execute(
        &self,
        runner: &dyn ProcessRunner,
        command: &CommandLine,
    ) -> Result<(), SessionError> {
        let output = runner
            .run(command)
            .await
            .map_err(SessionError::at(Phase::Command))?;
        if output.success() {
            return Ok(());
        }
        Err(SessionError {
            phase: Phase::Command,
            source: Error::ExternalTool {
                program: self.program.clone(),
                code: output.code,
                output: output.output,
            },
        })
    }
}

/// Combines a phase result with the release of its manifest.
///
/// The phase's own error wins; a release failure behind it is only logged.
fn settle<T>(
    body: Result<T, SessionError>,
    released: Result<()>,
    phase: Phase,
) -> Result<T, SessionError> {
    match (body, released) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(error)) => Err(SessionError {
            phase,
            source: error,
        }),
        (Err(error), released) => {
            if let Err(cleanup) = released {
                tracing::warn!("{cleanup}");
            }
            Err(error)
        }
    }
}

/// Incrementally defines a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    session: Session,
}

impl SessionBuilder {
    fn new(name: String) -> Self {
        Self {
            session: Session {
                program: String::new(),
                name,
                description: String::new(),
                python: None,
                is_default: false,
                install_project: false,
                groups: Vec::new(),
                command_manifest: None,
                leading_args: Vec::new(),
                default_args: Vec::new(),
                accepts_args: true,
            },
        }
    }

    /// Sets the listing description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.session.description = description.into();
        self
    }

    /// Pins the target runtime instead of using the configured default.
    #[must_use]
    pub fn python(mut self, version: impl Into<String>) -> Self {
        self.session.python = Some(version.into());
        self
    }

    /// Runs the session when no sessions are named.
    #[must_use]
    pub fn run_by_default(mut self) -> Self {
        self.session.is_default = true;
        self
    }

    /// Installs the project itself before any dependency group.
    #[must_use]
    pub fn install_project(mut self) -> Self {
        self.session.install_project = true;
        self
    }

    /// Adds a dependency group constrained by a full development manifest.
    #[must_use]
    pub fn install<I, S>(self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_with(packages, ExportOptions::default())
    }

    /// Adds a dependency group constrained by a manifest exported with `export`.
    #[must_use]
    pub fn install_with<I, S>(mut self, packages: I, export: ExportOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session.groups.push(DependencyGroup {
            packages: packages.into_iter().map(Into::into).collect(),
            export,
        });
        self
    }

    /// Exports a manifest that stays available for the whole command phase.
    #[must_use]
    pub fn command_manifest(mut self, export: ExportOptions) -> Self {
        self.session.command_manifest = Some(export);
        self
    }

    /// Sets the executable of the command phase.
    #[must_use]
    pub fn command(mut self, program: impl Into<String>) -> Self {
        self.session.program = program.into();
        self
    }

    /// Adds arguments always passed before the effective arguments.
    #[must_use]
    pub fn leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session
            .leading_args
            .extend(args.into_iter().map(|arg| CommandArg::Literal(arg.into())));
        self
    }

    /// Adds the command manifest path as a leading argument.
    #[must_use]
    pub fn manifest_arg(mut self, prefix: impl Into<String>) -> Self {
        self.session.leading_args.push(CommandArg::ManifestPath {
            prefix: prefix.into(),
        });
        self
    }

    /// Sets the arguments used when none are forwarded.
    #[must_use]
    pub fn default_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.session.default_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Ignores forwarded arguments.
    #[must_use]
    pub fn ignore_args(mut self) -> Self {
        self.session.accepts_args = false;
        self
    }

    /// Validates and returns the session.
    ///
    /// # Errors
    /// Returns `Error::InvalidSession` if the name or command is missing, or
    /// the command references a manifest the session never exports.
    pub fn build(self) -> Result<Session> {
        let session = self.session;
        let invalid = |reason: &str| Error::InvalidSession {
            name: session.name.clone(),
            reason: reason.to_owned(),
        };

        if session.name.is_empty() || session.name.chars().any(char::is_whitespace) {
            return Err(invalid("name must be a non-empty word"));
        }
        if session.program.is_empty() {
            return Err(invalid("no command"));
        }
        let wants_manifest = session
            .leading_args
            .iter()
            .any(|arg| matches!(arg, CommandArg::ManifestPath { .. }));
        if wants_manifest && session.command_manifest.is_none() {
            return Err(invalid("command uses a manifest path but exports none"));
        }
        if session.groups.iter().any(|group| group.packages.is_empty()) {
            return Err(invalid("empty dependency group"));
        }
        Ok(session)
    }
}

/// Everything a session needs to run: process runner, configuration and project root.
#[derive(Clone)]
pub struct SessionContext {
    runner: Arc<dyn ProcessRunner>,
    exporter: ConstraintExporter,
    installer: EnvironmentInstaller,
    config: Config,
    project_dir: PathBuf,
}

impl SessionContext {
    /// Creates a context for the project at `project_dir`.
    ///
    /// A relative `project_dir` is resolved against the current directory, so
    /// environment paths stay valid inside processes that run from the project root.
    ///
    /// # Errors
    /// Returns an error if `project_dir` is empty or the current directory
    /// cannot be determined.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        config: Config,
        project_dir: impl AsRef<Path>,
    ) -> Result<Self> {
        let project_dir = absolute(project_dir)?;
        let exporter = ConstraintExporter::new(
            Arc::clone(&runner),
            config.resolver.clone(),
            project_dir.clone(),
        );
        let installer = EnvironmentInstaller::new(Arc::clone(&runner), project_dir.clone());
        Ok(Self {
            runner,
            exporter,
            installer,
            config,
            project_dir,
        })
    }

    /// Places exported manifests in `dir` instead of the system temporary directory.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exporter = self.exporter.with_scratch_dir(dir);
        self
    }

    /// Environment `session` runs inside.
    pub fn environment_for(&self, session: &Session) -> Environment {
        let project = &self.config.project;
        let (python, interpreter) = match session.python() {
            Some(version) => (version, None),
            None => (project.python.as_str(), project.interpreter.as_deref()),
        };
        Environment::new(
            session.name(),
            python,
            interpreter,
            self.config.environment.backend,
            &self.project_dir.join(&self.config.environment.dir),
        )
    }
}
