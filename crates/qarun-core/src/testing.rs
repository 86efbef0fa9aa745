//! Scripted process runner for unit tests.

use std::collections::HashMap;
use std::fs;
use std::future::pending;
use std::sync::Mutex;

use async_trait::async_trait;
use qarun_tooling::{CommandLine, ProcessOutput, ProcessRunner, ToolResult};

/// Records every command and answers with scripted exit codes.
///
/// Programs succeed unless marked failing. A hanging program never finishes,
/// which lets tests cancel a session mid-command. When manifest contents are
/// set, they are written to any `--output=<path>` argument.
#[derive(Debug, Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandLine>>,
    failures: HashMap<String, i32>,
    hanging: Option<String>,
    manifest: Option<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, program: &str, code: i32) -> Self {
        self.failures.insert(program.to_owned(), code);
        self
    }

    pub fn hanging(mut self, program: &str) -> Self {
        self.hanging = Some(program.to_owned());
        self
    }

    pub fn with_manifest(mut self, contents: &str) -> Self {
        self.manifest = Some(contents.to_owned());
        self
    }

    pub fn calls(&self) -> Vec<CommandLine> {
        self.calls.lock().unwrap().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .map(|command| command.program)
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, command: &CommandLine) -> ToolResult<ProcessOutput> {
        self.calls.lock().unwrap().push(command.clone());

        if self.hanging.as_deref() == Some(command.program.as_str()) {
            pending::<()>().await;
        }

        if let Some(contents) = &self.manifest {
            for arg in &command.args {
                if let Some(path) = arg.strip_prefix("--output=") {
                    fs::write(path, contents)?;
                }
            }
        }

        Ok(match self.failures.get(&command.program) {
            Some(code) => ProcessOutput {
                code: Some(*code),
                output: format!("{} exited with {code}", command.program),
            },
            None => ProcessOutput {
                code: Some(0),
                output: String::new(),
            },
        })
    }
}
