use std::ffi::OsString;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use super::BuildError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// One toolchain process to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<OsString>,
    /// Bytes piped to the child's stdin.
    pub stdin: Option<Vec<u8>>,
    pub timeout: Duration,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            stdin: None,
            timeout,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Arguments as lossy strings, for logs and tests.
    pub fn argv(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Runs toolchain processes to completion.
pub trait ToolchainRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> Result<(), BuildError>;
}

/// Spawns the real toolchain through `duct`, polling until the process exits
/// or its timeout expires.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuctRunner;

impl ToolchainRunner for DuctRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), BuildError> {
        debug!(command = %invocation, "spawning toolchain");
        let mut expression = duct::cmd(invocation.program.as_str(), &invocation.args)
            .stdout_capture()
            .stderr_capture()
            .unchecked();
        if let Some(input) = &invocation.stdin {
            expression = expression.stdin_bytes(input.clone());
        }

        let handle = expression.start().map_err(|source| BuildError::Spawn {
            program: invocation.program.clone(),
            source,
        })?;

        let deadline = Instant::now() + invocation.timeout;
        loop {
            let finished = handle.try_wait().map_err(|source| BuildError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;
            if let Some(output) = finished {
                if output.status.success() {
                    return Ok(());
                }
                return Err(BuildError::ToolchainFailure {
                    program: invocation.program.clone(),
                    status: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            if Instant::now() >= deadline {
                if let Err(err) = handle.kill() {
                    debug!(error = %err, program = %invocation.program, "failed to kill toolchain");
                }
                return Err(BuildError::Timeout {
                    program: invocation.program.clone(),
                    timeout: invocation.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}
