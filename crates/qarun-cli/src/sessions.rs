//! The project's quality-assurance sessions.

use qarun_core::{Config, ExportOptions, Result, Session, SessionRegistry};

/// Builds the registry of every session, in listing order.
///
/// Sessions that check source files default to the configured locations;
/// `typeguard` and `xdoctest` target the configured package.
///
/// # Errors
/// Returns an error if a session definition is invalid or duplicated.
pub fn registry(config: &Config) -> Result<SessionRegistry> {
    let locations = &config.project.locations;
    let package = &config.project.package;

    let sessions = [
        Session::builder("black")
            .description("Run black code formatter.")
            .install(["black"])
            .command("black")
            .default_args(locations.iter().cloned()),
        Session::builder("lint")
            .description("Lint using flake8.")
            .run_by_default()
            .install([
                "flake8",
                "flake8-annotations",
                "flake8-bandit",
                "flake8-black",
                "flake8-bugbear",
                "flake8-docstrings",
                "flake8-import-order",
                "darglint",
            ])
            .command("flake8")
            .default_args(locations.iter().cloned()),
        Session::builder("safety")
            .description("Scan dependencies for insecure packages.")
            .run_by_default()
            .install(["safety"])
            .command_manifest(ExportOptions::without_hashes())
            .command("safety")
            .leading_args(["check"])
            .manifest_arg("--file=")
            .leading_args(["--full-report"])
            .ignore_args(),
        Session::builder("mypy")
            .description("Type-check using mypy.")
            .run_by_default()
            .install(["mypy"])
            .command("mypy")
            .default_args(locations.iter().cloned()),
        Session::builder("tests")
            .description("Run the test suite.")
            .run_by_default()
            .install_project()
            .install(["coverage[toml]", "pytest", "pytest-cov", "pytest-mock"])
            .command("pytest")
            .default_args(["--cov", "-m", "not e2e"]),
        Session::builder("typeguard")
            .description("Runtime type checking using typeguard.")
            .install_project()
            .install(["pytest", "pytest-mock", "typeguard"])
            .command("pytest")
            .leading_args([format!("--typeguard-packages={package}")])
            .default_args(["-m", "not e2e"]),
        Session::builder("xdoctest")
            .description("Run examples with xdoctest.")
            .install_project()
            .install(["xdoctest"])
            .command("python")
            .leading_args(["-m", "xdoctest", package.as_str()])
            .default_args(["all"]),
        Session::builder("docs")
            .description("Build the documentation.")
            .install_project()
            .install(["sphinx", "sphinx-autodoc-typehints"])
            .command("sphinx-build")
            .leading_args(["docs", "docs/_build"])
            .ignore_args(),
    ];

    let mut registry = SessionRegistry::new();
    for builder in sessions {
        registry.register(builder.build()?)?;
    }
    Ok(registry)
}
