//! End-to-end CLI tests using `assert_cmd`
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
        clippy::tests_outside_test_module,
        reason = "Test allows"
    )
)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper to get cargo binary or fail test
fn cargo_bin() -> Command {
    Command::cargo_bin("qarun").unwrap_or_else(|err| panic!("Binary not found: {err}"))
}

/// Helper to create temp dir or fail test
fn temp_dir() -> TempDir {
    TempDir::new().unwrap_or_else(|err| panic!("Failed to create temp dir: {err}"))
}

#[test]
fn test_cli_help() {
    cargo_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--list"));
}

#[test]
fn test_cli_list_marks_default_sessions() {
    let temp = temp_dir();

    cargo_bin()
        .current_dir(temp.path())
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("* lint -> Lint using flake8."))
        .stdout(predicate::str::contains("- docs -> Build the documentation."));
}

#[test]
fn test_cli_unknown_session_fails_before_running() {
    let temp = temp_dir();

    cargo_bin()
        .current_dir(temp.path())
        .arg("nope")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Unknown session: nope"));

    assert!(!temp.path().join(".qarun").exists());
}

#[test]
fn test_cli_rejects_invalid_config() {
    let temp = temp_dir();
    fs::write(temp.path().join("qarun.toml"), "[installer]\nprerelease = true\n")
        .unwrap_or_else(|err| panic!("Failed to write config: {err}"));

    cargo_bin()
        .current_dir(temp.path())
        .arg("--list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("TOML"));
}

#[cfg(unix)]
mod with_fake_tools {
    use super::*;
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::Path;

    fn script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}"))
            .unwrap_or_else(|err| panic!("Failed to write {name}: {err}"));
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .unwrap_or_else(|err| panic!("Failed to chmod {name}: {err}"));
    }

    /// Interpreter creating an environment with its own `python` and `sphinx-build`.
    const VENV_BOOTSTRAP: &str = r#"PATH="/bin:/usr/bin:$PATH"
test "$1 $2" = "-m venv" || exit 2
mkdir -p "$3/bin"
printf '#!/bin/sh\nexit 0\n' > "$3/bin/python"
printf '#!/bin/sh\necho "venv sphinx $*"\n' > "$3/bin/sphinx-build"
chmod +x "$3/bin/python" "$3/bin/sphinx-build"
"#;

    /// A project whose resolver, interpreter and tools are shell scripts.
    fn fake_project() -> TempDir {
        let temp = temp_dir();
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap_or_else(|err| panic!("Failed to create bin: {err}"));

        script(&bin, "resolver", "exit 0\n");
        script(&bin, "python", "exit 0\n");
        script(&bin, "sphinx-build", "echo \"building $*\"\n");
        script(&bin, "flake8", "echo \"src/app.py:1:1: E999 $*\"\nexit 1\n");
        script(&bin, "bootstrap", VENV_BOOTSTRAP);

        let config = format!(
            "[project]\ninterpreter = \"{python}\"\n\n[resolver]\nprogram = \"{resolver}\"\n",
            python = bin.join("python").display(),
            resolver = bin.join("resolver").display(),
        );
        fs::write(temp.path().join("qarun.toml"), config)
            .unwrap_or_else(|err| panic!("Failed to write config: {err}"));
        temp
    }

    /// Points the configured interpreter at `bootstrap` so the default venv backend is used.
    fn use_venv_backend(project: &TempDir) {
        let path = project.path().join("qarun.toml");
        let config = fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("Failed to read config: {err}"))
            .replace("/bin/python\"", "/bin/bootstrap\"");
        fs::write(&path, config).unwrap_or_else(|err| panic!("Failed to write config: {err}"));
    }

    fn run_in(project: &TempDir) -> Command {
        let mut command = cargo_bin();
        command
            .current_dir(project.path())
            .env("PATH", project.path().join("bin"))
            .arg("--no-venv");
        command
    }

    #[test]
    fn test_cli_successful_session() {
        let project = fake_project();

        run_in(&project)
            .arg("docs")
            .assert()
            .success()
            .stdout(predicate::str::contains("building docs docs/_build"))
            .stdout(predicate::str::contains("* docs: success"));
    }

    #[test]
    fn test_cli_failed_session_is_reported() {
        let project = fake_project();

        run_in(&project)
            .args(["docs", "lint", "--", "src"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("* docs: success"))
            .stdout(predicate::str::contains("* lint: failed"))
            .stdout(predicate::str::contains("lint failed in command phase"))
            .stdout(predicate::str::contains("E999 src"))
            .stdout(predicate::str::contains("Failed sessions: lint"));
    }

    #[test]
    fn test_cli_venv_backend_with_relative_project() {
        let project = fake_project();
        use_venv_backend(&project);
        let parent = project.path().parent().unwrap();
        let name = project.path().file_name().unwrap();

        cargo_bin()
            .current_dir(parent)
            .env("PATH", project.path().join("bin"))
            .arg("-p")
            .arg(name)
            .arg("docs")
            .assert()
            .success()
            .stdout(predicate::str::contains("venv sphinx docs docs/_build"))
            .stdout(predicate::str::contains("* docs: success"));

        assert!(project.path().join(".qarun/docs/bin/python").exists());
    }
}
