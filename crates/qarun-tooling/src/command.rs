use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

/// How the output of a spawned process is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Collect stdout and stderr silently; they are surfaced only on failure.
    #[default]
    Capture,
    /// Forward output line by line to the terminal while keeping a tail for reports.
    Stream,
}

/// A single external process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Executable name or path
    pub program: String,
    /// Arguments passed verbatim, in order
    pub args: Vec<String>,
    /// Extra environment variables layered over the inherited environment
    pub envs: Vec<(String, String)>,
    /// Working directory, inherited when unset
    pub cwd: Option<PathBuf>,
    /// Output handling
    pub output: OutputMode,
}

impl CommandLine {
    /// Creates a command line for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            cwd: None,
            output: OutputMode::Capture,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments, preserving their order.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets an environment variable for the process.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    /// Sets several environment variables for the process.
    #[must_use]
    pub fn envs<I>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.envs.extend(vars);
        self
    }

    /// Sets the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Streams the process output instead of capturing it.
    #[must_use]
    pub fn streaming(mut self) -> Self {
        self.output = OutputMode::Stream;
        self
    }
}

impl Display for CommandLine {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(formatter, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty()
        && !word
            .chars()
            .any(|character| character.is_whitespace() || matches!(character, '\'' | '"'))
    {
        return word.to_owned();
    }
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when the process was terminated by a signal
    pub code: Option<i32>,
    /// Captured stdout followed by stderr (for streamed processes, only the tail)
    pub output: String,
}

impl ProcessOutput {
    /// Whether the process exited with code zero.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Returns at most the last `lines` lines of process output.
pub fn output_tail(output: &str, lines: usize) -> Vec<&str> {
    let all: Vec<&str> = output.lines().collect();
    let start = all.len().saturating_sub(lines);
    all[start..].to_vec()
}
