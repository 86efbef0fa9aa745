//! Manifest export through the lock resolver.

use std::path::PathBuf;
use std::sync::Arc;

use qarun_tooling::{CommandLine, ProcessRunner};

use crate::config::ResolverConfig;
use crate::environment::Environment;
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::scratch::ScratchFile;

/// Which parts of the lock state go into an exported manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    /// Include development-only dependencies
    pub dev: bool,
    /// Embed content hashes
    pub with_hashes: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            dev: true,
            with_hashes: true,
        }
    }
}

impl ExportOptions {
    /// Development dependencies without hashes, as consumed by scanners.
    pub const fn without_hashes() -> Self {
        Self {
            dev: true,
            with_hashes: false,
        }
    }
}

/// Writes the project's pinned dependency set into a fresh scratch file.
#[derive(Clone)]
pub struct ConstraintExporter {
    runner: Arc<dyn ProcessRunner>,
    resolver: ResolverConfig,
    project_dir: PathBuf,
    scratch_dir: Option<PathBuf>,
}

impl ConstraintExporter {
    /// Creates an exporter invoking `resolver` from `project_dir`.
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        resolver: ResolverConfig,
        project_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            resolver,
            project_dir: project_dir.into(),
            scratch_dir: None,
        }
    }

    /// Places manifests in `dir` instead of the system temporary directory.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    /// Exports a manifest for use inside `environment`.
    ///
    /// The returned manifest is deleted when released or dropped, including
    /// when the export itself fails.
    ///
    /// # Errors
    /// Returns `Error::Resource` if the scratch file cannot be created,
    /// `Error::ExternalTool` if the resolver exits unsuccessfully, or
    /// `Error::Tool` if it cannot be started.
    pub async fn export(
        &self,
        environment: &Environment,
        options: ExportOptions,
    ) -> Result<Manifest> {
        let file = match &self.scratch_dir {
            Some(dir) => ScratchFile::acquire_in(dir, Some(".txt"))?,
            None => ScratchFile::acquire(Some(".txt"))?,
        };

        let mut command = CommandLine::new(&self.resolver.program)
            .args(self.resolver.args.iter().cloned())
            .arg("export");
        if options.dev {
            command = command.arg("--dev");
        }
        command = command.arg("--format=requirements.txt");
        if !options.with_hashes {
            command = command.arg("--without-hashes");
        }
        let command = command
            .arg(format!("--output={}", file.path().display()))
            .envs(environment.vars())
            .current_dir(&self.project_dir);

        let output = self.runner.run(&command).await?;
        if !output.success() {
            return Err(Error::ExternalTool {
                program: self.resolver.program.clone(),
                code: output.code,
                output: output.output,
            });
        }

        let manifest = Manifest::new(file);
        match manifest.pins() {
            Ok(pins) => tracing::debug!(
                "Exported {} pins to {}",
                pins.len(),
                manifest.path().display()
            ),
            Err(error) => tracing::debug!("Could not inspect exported manifest: {error}"),
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Backend;
    use crate::testing::RecordingRunner;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn exporter_for(runner: &Arc<RecordingRunner>, scratch: &Path) -> ConstraintExporter {
        ConstraintExporter::new(
            Arc::clone(runner) as Arc<dyn ProcessRunner>,
            ResolverConfig::default(),
            ".",
        )
        .with_scratch_dir(scratch)
    }

    fn ambient() -> Environment {
        Environment::new("safety", "3.8", None, Backend::None, Path::new("."))
    }

    fn scratch_entries(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_export_passes_flags_and_output_path() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new().with_manifest("black==19.10b0\n"));
        let exporter = exporter_for(&runner, temp.path());

        let manifest = exporter
            .export(&ambient(), ExportOptions::default())
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "poetry");
        assert_eq!(
            calls[0].args[..3],
            ["export", "--dev", "--format=requirements.txt"]
        );
        assert_eq!(
            calls[0].args[3],
            format!("--output={}", manifest.path().display())
        );
        assert_eq!(manifest.pins().unwrap()["black"], "19.10b0");

        let path = manifest.path().to_path_buf();
        manifest.release().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_export_without_hashes() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let exporter = exporter_for(&runner, temp.path());

        let _manifest = exporter
            .export(&ambient(), ExportOptions::without_hashes())
            .await
            .unwrap();

        let calls = runner.calls();
        let args = &calls[0].args;
        assert!(args.iter().any(|arg| arg == "--without-hashes"));
        assert!(args.iter().any(|arg| arg == "--dev"));
    }

    #[tokio::test]
    async fn test_export_without_dev() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let exporter = exporter_for(&runner, temp.path());
        let options = ExportOptions {
            dev: false,
            with_hashes: true,
        };

        let _manifest = exporter.export(&ambient(), options).await.unwrap();

        let calls = runner.calls();
        let args = &calls[0].args;
        assert!(!args.iter().any(|arg| arg == "--dev"));
        assert!(!args.iter().any(|arg| arg == "--without-hashes"));
    }

    #[tokio::test]
    async fn test_resolver_failure_removes_scratch_file() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new().failing("poetry", 1));
        let exporter = exporter_for(&runner, temp.path());

        let result = exporter.export(&ambient(), ExportOptions::default()).await;

        assert!(matches!(
            result,
            Err(Error::ExternalTool { ref program, code: Some(1), .. }) if program == "poetry"
        ));
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_resolver_args_precede_export_verb() {
        let temp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::new());
        let resolver = ResolverConfig {
            program: "poetry".to_owned(),
            args: vec!["--no-interaction".to_owned()],
        };
        let exporter =
            ConstraintExporter::new(Arc::clone(&runner) as Arc<dyn ProcessRunner>, resolver, ".")
                .with_scratch_dir(temp.path());

        let manifest = exporter
            .export(&ambient(), ExportOptions::default())
            .await
            .unwrap();
        drop(manifest);

        assert_eq!(runner.calls()[0].args[..2], ["--no-interaction", "export"]);
        assert_eq!(scratch_entries(temp.path()), 0);
    }
}
