//! CI host surface: GitHub Actions workflow commands and step outputs.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bridge_core::exit::classify::ExitOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Error,
    Warning,
    Notice,
}

impl Annotation {
    fn command(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
        }
    }
}

/// Escape a message for use in a workflow command.
pub fn escape_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn workflow_command(kind: Annotation, message: &str) -> String {
    format!("::{}::{}", kind.command(), escape_data(message))
}

/// Writes annotations and step outputs for the CI host.
pub struct Host<W: Write> {
    out: W,
    output_file: Option<PathBuf>,
}

impl Host<io::Stdout> {
    /// Host bound to stdout and `$GITHUB_OUTPUT`.
    pub fn from_env() -> Self {
        Self::new(
            io::stdout(),
            std::env::var_os("GITHUB_OUTPUT").map(PathBuf::from),
        )
    }
}

impl<W: Write> Host<W> {
    pub fn new(out: W, output_file: Option<PathBuf>) -> Self {
        Self { out, output_file }
    }

    pub fn annotate(&mut self, kind: Annotation, message: &str) -> Result<()> {
        writeln!(self.out, "{}", workflow_command(kind, message))
            .context("failed to write workflow command")
    }

    /// Append `name=value` to the step output file, if the host provides one.
    pub fn set_output(&mut self, name: &str, value: &str) -> Result<()> {
        let Some(path) = &self.output_file else {
            return Ok(());
        };
        append_output(path, name, value)
    }

    /// Report a classified outcome: always record the raw exit code, then
    /// annotate according to whether the build fails.
    pub fn report_outcome(&mut self, outcome: &ExitOutcome) -> Result<()> {
        self.set_output("status", &outcome.reported_exit_code.to_string())?;

        let message = match &outcome.detail {
            Some(detail) if outcome.reported_exit_code != 0 => {
                format!("{} ({detail})", outcome.message)
            }
            _ => outcome.message.clone(),
        };
        let kind = if outcome.treated_as_failure {
            Annotation::Error
        } else if outcome.reported_exit_code != 0 {
            Annotation::Warning
        } else {
            Annotation::Notice
        };
        self.annotate(kind, &message)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn append_output(path: &Path, name: &str, value: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open step output file: {}", path.display()))?;
    writeln!(file, "{name}={value}")
        .with_context(|| format!("failed to write step output file: {}", path.display()))
}

/// Process exit code for the runner itself.
///
/// A failing outcome exits with the Bridge code when it fits in a process
/// status, and 1 otherwise; everything else exits 0.
pub fn runner_exit_code(outcome: &ExitOutcome) -> i32 {
    if !outcome.treated_as_failure {
        return 0;
    }
    match outcome.reported_exit_code {
        code @ 1..=255 => code,
        _ => 1,
    }
}
