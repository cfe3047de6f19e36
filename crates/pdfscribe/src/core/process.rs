//! Running external tools (`tesseract`, `pdftoppm`) with a deadline.

use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{Duration, timeout};

/// Failure modes of an external tool invocation.
#[derive(Debug)]
pub enum ProcessError {
    /// The executable could not be found on `PATH`.
    NotFound(String),
    /// The process did not finish before the deadline and was killed.
    TimedOut { program: String, seconds: u64 },
    /// The process exited with a non-zero status.
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    /// Spawning or waiting failed for another reason.
    Io(std::io::Error),
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::NotFound(program) => write!(f, "{} not found on PATH", program),
            ProcessError::TimedOut { program, seconds } => {
                write!(f, "{} timed out after {} seconds", program, seconds)
            }
            ProcessError::Failed { program, code, stderr } => match code {
                Some(code) => write!(f, "{} exited with status {}: {}", program, code, stderr.trim()),
                None => write!(f, "{} was terminated by a signal: {}", program, stderr.trim()),
            },
            ProcessError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ProcessError {}

/// Run `command` to completion, returning its stdout.
///
/// The child is killed if the deadline passes. Non-zero exit statuses are
/// reported with the captured stderr.
pub async fn run_with_timeout(mut command: Command, program: &str, timeout_secs: u64) -> Result<Vec<u8>, ProcessError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProcessError::NotFound(program.to_string())
        } else {
            ProcessError::Io(e)
        }
    })?;

    let output = match timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ProcessError::Io(e)),
        Err(_) => {
            // child was moved into wait_with_output; kill_on_drop reaps it
            return Err(ProcessError::TimedOut {
                program: program.to_string(),
                seconds: timeout_secs,
            });
        }
    };

    if !output.status.success() {
        return Err(ProcessError::Failed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(output.stdout)
}

/// Check whether `program` can be executed.
///
/// Only spawning matters; the exit status of the version flag is ignored
/// because tools disagree on it.
pub async fn check_binary(program: &str, version_flag: &str) -> bool {
    Command::new(program)
        .arg(version_flag)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .is_ok()
}
