use std::collections::VecDeque;
use std::io::{Error as IoError, Write as _, stderr, stdout};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt as _, AsyncRead, BufReader};
use tokio::process::Command;

use crate::command::{CommandLine, OutputMode, ProcessOutput};

/// Lines of streamed output kept for failure reports.
const STREAM_TAIL_LINES: usize = 40;

/// Errors that can occur while running an external process.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The executable could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying OS error
        #[source]
        source: IoError,
    },

    /// An I/O operation on the process pipes failed.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

/// Result type for process operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Executes external commands on behalf of sessions.
///
/// A non-zero exit is not an error at this level; callers decide what a
/// failing exit code means for their phase.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Runs the command to completion.
    ///
    /// # Errors
    ///
    /// Returns a `ToolError` when the process cannot be spawned or its output
    /// cannot be read.
    async fn run(&self, command: &CommandLine) -> ToolResult<ProcessOutput>;
}

/// Runs commands as real child processes.
///
/// Children are killed when the returned future is dropped, so cancelling a
/// session never leaves a tool running behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &CommandLine) -> ToolResult<ProcessOutput> {
        tracing::debug!("Executing: {command}");

        let mut process = Command::new(&command.program);
        process
            .args(&command.args)
            .envs(command.envs.iter().map(|(key, value)| (key, value)))
            .kill_on_drop(true);
        if let Some(dir) = &command.cwd {
            process.current_dir(dir);
        }

        let output = match command.output {
            OutputMode::Capture => capture(process, &command.program).await?,
            OutputMode::Stream => stream(process, &command.program).await?,
        };

        tracing::debug!(
            "Command exited with code {:?}: {}",
            output.code,
            command.program
        );
        Ok(output)
    }
}

async fn capture(mut process: Command, program: &str) -> ToolResult<ProcessOutput> {
    let output = process.output().await.map_err(|source| ToolError::Spawn {
        program: program.to_owned(),
        source,
    })?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    if !text.is_empty() && !text.ends_with('\n') && !output.stderr.is_empty() {
        text.push('\n');
    }
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    Ok(ProcessOutput {
        code: output.status.code(),
        output: text,
    })
}

async fn stream(mut process: Command, program: &str) -> ToolResult<ProcessOutput> {
    process.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = process.spawn().map_err(|source| ToolError::Spawn {
        program: program.to_owned(),
        source,
    })?;

    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();

    let (out_tail, err_tail, status) = tokio::join!(
        forward_lines(child_stdout, Sink::Stdout),
        forward_lines(child_stderr, Sink::Stderr),
        child.wait(),
    );
    let status = status?;

    let mut lines = out_tail?;
    lines.extend(err_tail?);
    let mut output = lines.into_iter().collect::<Vec<_>>().join("\n");
    if !output.is_empty() {
        output.push('\n');
    }

    Ok(ProcessOutput {
        code: status.code(),
        output,
    })
}

#[derive(Clone, Copy)]
enum Sink {
    Stdout,
    Stderr,
}

impl Sink {
    fn write_line(self, line: &str) {
        let result = match self {
            Self::Stdout => writeln!(stdout().lock(), "{line}"),
            Self::Stderr => writeln!(stderr().lock(), "{line}"),
        };
        if let Err(error) = result {
            tracing::debug!("failed to forward process output: {error}");
        }
    }
}

async fn forward_lines<R>(reader: Option<R>, sink: Sink) -> Result<VecDeque<String>, IoError>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(STREAM_TAIL_LINES);
    let Some(reader) = reader else {
        return Ok(tail);
    };

    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer).await? == 0 {
            break;
        }
        let bytes = buffer.strip_suffix(b"\n").unwrap_or(&buffer);
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        let line = String::from_utf8_lossy(bytes).into_owned();
        sink.write_line(&line);
        if tail.len() == STREAM_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(tail)
}
