//! Sequential execution of selected sessions.

use std::future::{Future, pending};
use std::pin::pin;
use std::time::{Duration, Instant};

use tokio::signal;

use crate::error::{Result, SessionError};
use crate::registry::SessionRegistry;
use crate::session::SessionContext;

/// Exit code reported when a run is interrupted.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What to run: session names (empty for the defaults) and forwarded arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    /// Sessions to run, in order
    pub sessions: Vec<String>,
    /// Arguments forwarded to every selected session's command
    pub args: Vec<String>,
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionStatus {
    /// Every phase succeeded
    Success,
    /// A phase failed
    Failed(SessionError),
    /// The run was interrupted while the session was in progress
    Interrupted,
}

/// Result of one started session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Session name
    pub name: String,
    /// How it ended
    pub status: SessionStatus,
    /// Wall-clock time spent
    pub duration: Duration,
}

impl SessionOutcome {
    /// Whether the session succeeded.
    pub const fn success(&self) -> bool {
        matches!(self.status, SessionStatus::Success)
    }
}

/// Aggregate result of a run, one outcome per started session.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<SessionOutcome>,
}

impl RunReport {
    /// Outcomes in execution order.
    pub fn outcomes(&self) -> &[SessionOutcome] {
        &self.outcomes
    }

    /// Names of sessions that failed.
    pub fn failed(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome.status, SessionStatus::Failed(_)))
            .map(|outcome| outcome.name.as_str())
            .collect()
    }

    /// Whether the run was cut short by an interrupt.
    pub fn interrupted(&self) -> bool {
        self.outcomes
            .iter()
            .any(|outcome| matches!(outcome.status, SessionStatus::Interrupted))
    }

    /// Whether every started session succeeded.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(SessionOutcome::success)
    }

    /// Process exit code: 0 on success, 1 on failure, 130 on interrupt.
    pub fn exit_code(&self) -> i32 {
        if self.interrupted() {
            INTERRUPTED_EXIT_CODE
        } else if self.success() {
            0
        } else {
            1
        }
    }
}

/// Runs selected sessions one after another.
pub struct Runner<'registry> {
    registry: &'registry SessionRegistry,
    context: SessionContext,
}

impl<'registry> Runner<'registry> {
    /// Creates a runner over `registry`.
    pub fn new(registry: &'registry SessionRegistry, context: SessionContext) -> Self {
        Self { registry, context }
    }

    /// Runs the invocation, stopping early on Ctrl-C.
    ///
    /// # Errors
    /// Returns `Error::UnknownSession` before anything runs if a name is not
    /// registered. Session failures are reported, not returned.
    pub async fn run(&self, invocation: &Invocation) -> Result<RunReport> {
        self.run_until(invocation, ctrl_c()).await
    }

    /// Runs the invocation until `interrupt` completes.
    ///
    /// Every selected session runs even when an earlier one failed. When
    /// `interrupt` fires, the session in progress is dropped (releasing its
    /// scratch files and killing its processes) and no further session starts.
    ///
    /// # Errors
    /// Returns `Error::UnknownSession` before anything runs if a name is not
    /// registered.
    pub async fn run_until<F>(&self, invocation: &Invocation, interrupt: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let selected = self.registry.select(&invocation.sessions)?;
        if selected.is_empty() {
            tracing::warn!("No sessions selected");
        }

        let mut interrupt = pin!(interrupt);
        let mut report = RunReport::default();
        for session in selected {
            tracing::info!("Running session {}", session.name());
            let started = Instant::now();

            let status = tokio::select! {
                result = session.run(&self.context, &invocation.args) => match result {
                    Ok(()) => SessionStatus::Success,
                    Err(error) => SessionStatus::Failed(error),
                },
                () = &mut interrupt => SessionStatus::Interrupted,
            };

            let outcome = SessionOutcome {
                name: session.name().to_owned(),
                status,
                duration: started.elapsed(),
            };
            match &outcome.status {
                SessionStatus::Success => tracing::info!("Session {} was successful", outcome.name),
                SessionStatus::Failed(error) => {
                    tracing::error!("Session {} failed: {error}", outcome.name);
                }
                SessionStatus::Interrupted => {
                    tracing::warn!("Session {} interrupted", outcome.name);
                }
            }

            let stop = matches!(outcome.status, SessionStatus::Interrupted);
            report.outcomes.push(outcome);
            if stop {
                break;
            }
        }
        Ok(report)
    }
}

async fn ctrl_c() {
    if let Err(error) = signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {error}");
        pending::<()>().await;
    }
}
