use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::info;

use crate::exit::classify::SIGNALLED_EXIT_CODE;

#[derive(Debug, Error)]
#[error("failed to start {program}: {source}")]
pub struct SpawnError {
    pub program: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Runs the Bridge CLI and reports its exit code.
pub trait Executor {
    fn execute(&self, program: &Path, args: &[String]) -> Result<i32, SpawnError>;
}

/// Executes a real child process with inherited stdio.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    pub working_dir: Option<PathBuf>,
}

impl ProcessExecutor {
    pub fn in_dir(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(working_dir.into()),
        }
    }
}

impl Executor for ProcessExecutor {
    fn execute(&self, program: &Path, args: &[String]) -> Result<i32, SpawnError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let status = cmd.status().map_err(|source| SpawnError {
            program: program.to_path_buf(),
            source,
        })?;

        // No code means the child was killed by a signal.
        let code = status.code().unwrap_or(SIGNALLED_EXIT_CODE);
        info!(exit_code = code, "Bridge CLI exited");
        Ok(code)
    }
}
