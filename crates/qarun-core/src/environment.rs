//! Disposable per-session execution environments.

use std::env;
use std::path::{Path, PathBuf};

use qarun_tooling::{CommandLine, ProcessRunner};
use serde::{Deserialize, Serialize};
use tokio::fs::{create_dir_all, remove_dir_all, try_exists};

use crate::error::{Error, Result};

#[cfg(windows)]
const BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
const BIN_DIR: &str = "bin";

/// How session environments are provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// A fresh virtual environment per session, created with `<interpreter> -m venv`
    #[default]
    Venv,
    /// No isolation; commands run against the ambient interpreter
    None,
}

/// The target runtime a session's processes run inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    name: String,
    python: String,
    interpreter: String,
    location: Option<PathBuf>,
}

impl Environment {
    /// Describes the environment for session `name` under `root`.
    ///
    /// `interpreter` defaults to `python<python>`.
    pub fn new(
        name: &str,
        python: &str,
        interpreter: Option<&str>,
        backend: Backend,
        root: &Path,
    ) -> Self {
        let interpreter = interpreter.map_or_else(|| format!("python{python}"), str::to_owned);
        let location = match backend {
            Backend::Venv => Some(root.join(name)),
            Backend::None => None,
        };
        Self {
            name: name.to_owned(),
            python: python.to_owned(),
            interpreter,
            location,
        }
    }

    /// Environment name (the session name).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target runtime version.
    pub fn python(&self) -> &str {
        &self.python
    }

    /// Directory of the environment, `None` without isolation.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Directory holding the environment's executables.
    pub fn bin_dir(&self) -> Option<PathBuf> {
        self.location.as_ref().map(|location| location.join(BIN_DIR))
    }

    /// Interpreter to run installers with.
    pub fn python_executable(&self) -> String {
        self.bin_dir().map_or_else(
            || self.interpreter.clone(),
            |bin| {
                let executable = if cfg!(windows) { "python.exe" } else { "python" };
                bin.join(executable).to_string_lossy().into_owned()
            },
        )
    }

    /// Variables activating the environment for child processes.
    pub fn vars(&self) -> Vec<(String, String)> {
        let (Some(location), Some(bin)) = (self.location(), self.bin_dir()) else {
            return Vec::new();
        };

        let mut paths = vec![bin.clone()];
        if let Some(existing) = env::var_os("PATH") {
            paths.extend(env::split_paths(&existing));
        }
        let path = env::join_paths(paths).unwrap_or_else(|_| bin.into_os_string());

        vec![
            (
                "VIRTUAL_ENV".to_owned(),
                location.to_string_lossy().into_owned(),
            ),
            ("PATH".to_owned(), path.to_string_lossy().into_owned()),
        ]
    }

    /// Creates the environment, recreating it unless `reuse` is set.
    ///
    /// # Errors
    /// Returns an error if the old environment cannot be removed or the
    /// interpreter fails to create the new one.
    pub async fn prepare(&self, runner: &dyn ProcessRunner, reuse: bool) -> Result<()> {
        let Some(location) = self.location() else {
            tracing::debug!("Session {} runs without an isolated environment", self.name);
            return Ok(());
        };

        if try_exists(location).await? {
            if reuse {
                tracing::info!("Re-using existing environment at {}", location.display());
                return Ok(());
            }
            remove_dir_all(location).await?;
        }
        if let Some(parent) = location.parent() {
            create_dir_all(parent).await?;
        }

        tracing::info!(
            "Creating environment for {} with {} in {}",
            self.name,
            self.interpreter,
            location.display()
        );
        let command = CommandLine::new(&self.interpreter)
            .args(["-m", "venv"])
            .arg(location.to_string_lossy());
        let output = runner.run(&command).await?;
        if !output.success() {
            return Err(Error::ExternalTool {
                program: self.interpreter.clone(),
                code: output.code,
                output: output.output,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingRunner;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_interpreter_follows_version() {
        let environment = Environment::new("lint", "3.8", None, Backend::None, Path::new(".qarun"));
        assert_eq!(environment.python_executable(), "python3.8");
        assert!(environment.vars().is_empty());
        assert!(environment.location().is_none());
    }

    #[test]
    fn test_venv_paths_and_activation_vars() {
        let environment = Environment::new(
            "tests",
            "3.8",
            Some("/opt/python/bin/python3"),
            Backend::Venv,
            Path::new("/work/.qarun"),
        );

        assert_eq!(environment.location(), Some(Path::new("/work/.qarun/tests")));
        let bin = environment.bin_dir().unwrap();
        assert!(environment.python_executable().starts_with(&*bin.to_string_lossy()));

        let vars = environment.vars();
        assert_eq!(vars[0].0, "VIRTUAL_ENV");
        assert!(vars[0].1.ends_with("tests"));
        assert_eq!(vars[1].0, "PATH");
        assert!(vars[1].1.starts_with(&*bin.to_string_lossy()));
    }

    #[tokio::test]
    async fn test_prepare_creates_venv_with_interpreter() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new();
        let environment = Environment::new("mypy", "3.8", None, Backend::Venv, temp.path());

        environment.prepare(&runner, false).await.unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "python3.8");
        assert_eq!(calls[0].args[..2], ["-m", "venv"]);
        assert!(calls[0].args[2].ends_with("mypy"));
    }

    #[tokio::test]
    async fn test_prepare_recreates_existing_environment() {
        let temp = TempDir::new().unwrap();
        let stale = temp.path().join("docs").join("stale-marker");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let runner = RecordingRunner::new();
        let environment = Environment::new("docs", "3.8", None, Backend::Venv, temp.path());
        environment.prepare(&runner, false).await.unwrap();

        assert!(!stale.exists());
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_reuses_existing_environment() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("docs").join("marker");
        fs::create_dir_all(marker.parent().unwrap()).unwrap();
        fs::write(&marker, "keep").unwrap();

        let runner = RecordingRunner::new();
        let environment = Environment::new("docs", "3.8", None, Backend::Venv, temp.path());
        environment.prepare(&runner, true).await.unwrap();

        assert!(marker.exists());
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_reports_interpreter_failure() {
        let temp = TempDir::new().unwrap();
        let runner = RecordingRunner::new().failing("python3.8", 1);
        let environment = Environment::new("lint", "3.8", None, Backend::Venv, temp.path());

        let result = environment.prepare(&runner, false).await;
        assert!(matches!(
            result,
            Err(Error::ExternalTool { ref program, .. }) if program == "python3.8"
        ));
    }

    #[tokio::test]
    async fn test_prepare_without_isolation_runs_nothing() {
        let runner = RecordingRunner::new();
        let environment = Environment::new("lint", "3.8", None, Backend::None, Path::new("."));
        environment.prepare(&runner, false).await.unwrap();
        assert!(runner.calls().is_empty());
    }
}
