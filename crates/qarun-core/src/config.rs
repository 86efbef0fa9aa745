//! Configuration for the project, its environments, the lock resolver and the installer.
//!
//! Loaded from an optional `qarun.toml` at the project root. Every field has a
//! default, so an absent file behaves like an empty one.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::environment::Backend;
use crate::error::{Error, Result};
use crate::installer::InstallOptions;

/// Name of the configuration file looked up in the project root.
pub const CONFIG_FILE_NAME: &str = "qarun.toml";

/// Complete runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Project layout and default runtime
    pub project: ProjectConfig,
    /// Where and how session environments are created
    pub environment: EnvironmentConfig,
    /// Lock resolver command
    pub resolver: ResolverConfig,
    /// Options forwarded to every constrained install
    pub installer: InstallOptions,
}

/// Project layout settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Importable package name, used by runtime type checking and doctests
    pub package: String,
    /// Paths checked by formatters, linters and type checkers when no args are given
    pub locations: Vec<String>,
    /// Default target runtime version
    pub python: String,
    /// Interpreter used to create environments, `python<version>` when unset
    pub interpreter: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            package: "hypermodern_python".to_owned(),
            locations: ["src", "tests", "noxfile.py", "docs/conf.py"]
                .map(str::to_owned)
                .into(),
            python: "3.8".to_owned(),
            interpreter: None,
        }
    }
}

/// Session environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Directory holding one environment per session, relative to the project root
    pub dir: PathBuf,
    /// Environment backend
    pub backend: Backend,
    /// Reuse existing environments instead of recreating them
    pub reuse: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".qarun"),
            backend: Backend::default(),
            reuse: false,
        }
    }
}

/// Lock resolver command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    /// Resolver executable
    pub program: String,
    /// Arguments inserted before the resolver verb
    pub args: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            program: "poetry".to_owned(),
            args: Vec::new(),
        }
    }
}

impl Config {
    /// Parses configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from an explicit file, which must exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|error| {
            Error::Config(format!("Failed to read {}: {error}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `qarun.toml` from the project root, or defaults when it is absent.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_or_default(project_dir: &Path) -> Result<Self> {
        let path = project_dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            tracing::debug!("No {CONFIG_FILE_NAME} in {}, using defaults", project_dir.display());
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.project.python.trim().is_empty() {
            return Err(Error::Config("project.python must not be empty".to_owned()));
        }
        if self.resolver.program.trim().is_empty() {
            return Err(Error::Config("resolver.program must not be empty".to_owned()));
        }
        if self.environment.dir.as_os_str().is_empty() {
            return Err(Error::Config("environment.dir must not be empty".to_owned()));
        }
        Ok(())
    }
}
