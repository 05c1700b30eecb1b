//! External flashing tool invocation.
//!
//! Defines the `ToolRunner` trait so the flash path can be exercised in
//! tests without host binaries, plus the production implementation built on
//! `std::process::Command`. Tool results are discriminated: a missing
//! binary, an abnormal exit, and clean-exit-without-confirmation are three
//! different things to a caller.

use std::collections::VecDeque;
use std::env;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info};

/// Host utilities a flashing bench is expected to provide.
pub const REQUIRED_TOOLS: &[&str] = &["dfu-util", "openocd", "mspdebug", "lsusb"];

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found on PATH: {program}")]
    NotFound { program: String },

    #[error("{program} exited with status {status}: {stderr}")]
    Failed {
        program: String,
        /// Exit code, if the process exited normally.
        status: String,
        stderr: String,
    },

    #[error("Failed to invoke {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a completed, zero-status tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Interpretation of a flash attempt (see `Target::flash`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashOutcome {
    /// Tool exited cleanly and printed its documented success phrase.
    Confirmed,
    /// Tool exited cleanly but the phrase was absent. Indeterminate, not a
    /// failure; the phrase's absence does not prove the write failed.
    Unconfirmed,
}

/// Abstract tool invocation interface.
pub trait ToolRunner: Send + Sync {
    /// Locate a program on PATH.
    fn resolve(&self, program: &str) -> Result<PathBuf, ToolError>;

    /// Run a program synchronously and capture its output. A nonzero exit
    /// is an error; classification against the success phrase is the
    /// caller's job.
    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError>;
}

/// Production runner using the host PATH and `std::process::Command`.
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn resolve(&self, program: &str) -> Result<PathBuf, ToolError> {
        let path = env::var_os("PATH").unwrap_or_default();
        for dir in env::split_paths(&path) {
            let candidate = dir.join(program);
            if candidate.is_file() {
                debug!(program, path = %candidate.display(), "Resolved tool");
                return Ok(candidate);
            }
        }
        Err(ToolError::NotFound {
            program: program.to_string(),
        })
    }

    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        let resolved = self.resolve(program)?;
        info!(program, args = ?args, "Invoking tool");

        let output = Command::new(&resolved)
            .args(args)
            .output()
            .map_err(|source| ToolError::Io {
                program: program.to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let status = output
                .status
                .code()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string());
            return Err(ToolError::Failed {
                program: program.to_string(),
                status,
                stderr,
            });
        }

        debug!(program, stdout_len = stdout.len(), "Tool exited cleanly");
        Ok(ToolOutput { stdout, stderr })
    }
}

/// Mock runner for unit tests: canned results plus an invocation log.
pub struct MockToolRunner {
    results: Mutex<VecDeque<Result<ToolOutput, ToolError>>>,
    invocations: Mutex<Vec<(String, Vec<String>)>>,
    missing: Mutex<Vec<String>>,
}

impl MockToolRunner {
    pub fn new() -> Self {
        Self {
            results: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
            missing: Mutex::new(Vec::new()),
        }
    }

    /// Queue a clean exit with the given stdout.
    pub fn queue_stdout(&self, stdout: &str) {
        self.results.lock().unwrap().push_back(Ok(ToolOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
    }

    /// Queue a nonzero-exit failure.
    pub fn queue_failure(&self, program: &str, status: i32, stderr: &str) {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(ToolError::Failed {
                program: program.to_string(),
                status: status.to_string(),
                stderr: stderr.to_string(),
            }));
    }

    /// Make `resolve` (and `run`) report the program as missing.
    pub fn remove_program(&self, program: &str) {
        self.missing.lock().unwrap().push(program.to_string());
    }

    /// All `run` calls seen so far.
    pub fn invocations(&self) -> Vec<(String, Vec<String>)> {
        self.invocations.lock().unwrap().clone()
    }
}

impl Default for MockToolRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for MockToolRunner {
    fn resolve(&self, program: &str) -> Result<PathBuf, ToolError> {
        if self.missing.lock().unwrap().iter().any(|p| p == program) {
            return Err(ToolError::NotFound {
                program: program.to_string(),
            });
        }
        Ok(PathBuf::from("/usr/bin").join(program))
    }

    fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        self.resolve(program)?;
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_string(), args.to_vec()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ToolOutput::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_logs_invocations() {
        let mock = MockToolRunner::new();
        mock.queue_stdout("ok");
        mock.run("dfu-util", &["-l".into()]).unwrap();

        let calls = mock.invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "dfu-util");
    }

    #[test]
    fn test_mock_missing_program() {
        let mock = MockToolRunner::new();
        mock.remove_program("openocd");
        assert!(matches!(
            mock.run("openocd", &[]),
            Err(ToolError::NotFound { .. })
        ));
        assert!(mock.invocations().is_empty());
    }

    #[test]
    fn test_mock_queued_failure() {
        let mock = MockToolRunner::new();
        mock.queue_failure("mspdebug", 1, "could not open device");
        match mock.run("mspdebug", &[]) {
            Err(ToolError::Failed { status, stderr, .. }) => {
                assert_eq!(status, "1");
                assert!(stderr.contains("could not open"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
