//! Terminal output for listings and run summaries.

use std::io::Result as IoResult;
use std::path::Path;

use console::{Term, style};
use qarun_core::{RunReport, SessionRegistry, SessionStatus};
use qarun_tooling::output_tail;

/// Captured output lines shown for each failed session.
const FAILURE_TAIL_LINES: usize = 20;

/// Lines of the session listing.
pub fn listing(registry: &SessionRegistry, project: &Path) -> Vec<String> {
    let mut lines = vec![format!("Sessions defined in {}:", project.display()), String::new()];
    for session in registry.sessions() {
        let marker = if session.is_default() {
            style("*").green()
        } else {
            style("-").dim()
        };
        lines.push(format!(
            "{marker} {} -> {}",
            style(session.name()).bold(),
            session.description()
        ));
    }
    lines.push(String::new());
    lines.push(
        "sessions marked with * are selected, sessions marked with - are skipped.".to_owned(),
    );
    lines
}

/// Lines of the end-of-run summary.
pub fn summary(report: &RunReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.outcomes().is_empty() {
        lines.push("No sessions were run.".to_owned());
        return lines;
    }

    lines.push("Ran sessions:".to_owned());
    for outcome in report.outcomes() {
        let status = match &outcome.status {
            SessionStatus::Success => style("success").green(),
            SessionStatus::Failed(_) => style("failed").red(),
            SessionStatus::Interrupted => style("interrupted").yellow(),
        };
        lines.push(format!(
            "* {}: {status} ({:.1}s)",
            outcome.name,
            outcome.duration.as_secs_f64()
        ));
    }

    for outcome in report.outcomes() {
        let SessionStatus::Failed(error) = &outcome.status else {
            continue;
        };
        lines.push(String::new());
        lines.push(format!(
            "{} {} failed in {} phase: {}",
            style("error:").red().bold(),
            outcome.name,
            error.phase,
            error.source
        ));
        if let Some(output) = error.source.tool_output() {
            lines.extend(
                output_tail(output, FAILURE_TAIL_LINES)
                    .into_iter()
                    .map(|line| format!("    {line}")),
            );
        }
    }

    let failed = report.failed();
    if !failed.is_empty() {
        lines.push(String::new());
        lines.push(format!("Failed sessions: {}", failed.join(", ")));
    }
    if report.interrupted() {
        lines.push("Interrupted; remaining sessions were not run.".to_owned());
    }
    lines
}

/// Writes lines to stdout.
///
/// # Errors
/// Returns an error if stdout cannot be written.
pub fn write_lines(lines: &[String]) -> IoResult<()> {
    let term = Term::stdout();
    for line in lines {
        term.write_line(line)?;
    }
    Ok(())
}
