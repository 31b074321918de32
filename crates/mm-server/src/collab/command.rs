//! Argument extraction through an external command.
//!
//! The configured program is run once per extraction with the measure
//! directory (and the model path, when there is one) appended to its
//! arguments. It must print an [`ArgumentInfo`] JSON document on stdout.
//! A run that outlives the timeout is terminated with SIGTERM, given the
//! grace period, then killed.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScriptFailure;
use crate::measure::{ArgumentInfo, MeasureMetadata};
use crate::model::{Model, Workspace};

use super::ArgumentExtractor;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Settings for [`CommandArgumentExtractor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Program to run. `None` selects the declared-metadata extractor.
    pub program: Option<String>,
    /// Arguments placed before the measure directory.
    pub args: Vec<String>,
    /// Hard limit on one extraction.
    pub timeout_seconds: u64,
    /// Grace period in seconds for SIGTERM before SIGKILL.
    pub termination_grace_seconds: u64,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_seconds: 120,
            termination_grace_seconds: 5,
        }
    }
}

/// Runs an external program to enumerate a measure's arguments.
#[derive(Debug, Clone)]
pub struct CommandArgumentExtractor {
    config: ExtractorConfig,
}

impl CommandArgumentExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    fn command(&self, measure: &MeasureMetadata, model: Option<&Model>) -> Result<Command, ScriptFailure> {
        let program = self
            .config
            .program
            .as_deref()
            .ok_or_else(|| ScriptFailure::Spawn("no extractor program configured".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(&self.config.args)
            .arg(&measure.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(model) = model {
            command.arg(&model.path);
        }
        Ok(command)
    }

    /// Wait for `child`, terminating it once the timeout passes.
    fn wait_with_timeout(&self, child: &mut Child) -> Result<Option<ExitStatus>, ScriptFailure> {
        let timeout = Duration::from_secs(self.config.timeout_seconds);
        let start = Instant::now();
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(Some(status)),
                Ok(None) if start.elapsed() >= timeout => {
                    self.terminate_child(child);
                    return Ok(None);
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(ScriptFailure::Spawn(e.to_string())),
            }
        }
    }

    /// Terminate a child process gracefully then forcefully.
    fn terminate_child(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = Pid::from_raw(child.id() as i32);
            let _ = signal::kill(pid, Signal::SIGTERM);
        }
        #[cfg(not(unix))]
        {
            let _ = child.kill();
        }

        let grace = Duration::from_secs(self.config.termination_grace_seconds);
        let start = Instant::now();
        while start.elapsed() < grace {
            match child.try_wait() {
                Ok(Some(_)) => return,
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(_) => break,
            }
        }

        let _ = child.kill();
        let _ = child.wait();
    }
}

impl ArgumentExtractor for CommandArgumentExtractor {
    fn extract(
        &self,
        measure: &MeasureMetadata,
        model: Option<&Model>,
        _workspace: Option<&Workspace>,
    ) -> Result<ArgumentInfo, ScriptFailure> {
        let mut child = self
            .command(measure, model)?
            .spawn()
            .map_err(|e| ScriptFailure::Spawn(e.to_string()))?;
        debug!(measure_dir = %measure.directory.display(), pid = child.id(), "running argument extractor");

        let stdout_handle = child.stdout.take().map(|mut out| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = out.read_to_end(&mut buf);
                buf
            })
        });
        let stderr_handle = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = err.read_to_end(&mut buf);
                buf
            })
        });

        // Reader threads are left detached on timeout; a grandchild may
        // still hold the pipes open.
        let status = match self.wait_with_timeout(&mut child)? {
            Some(status) => status,
            None => {
                warn!(
                    measure_dir = %measure.directory.display(),
                    timeout_seconds = self.config.timeout_seconds,
                    "argument extractor timed out"
                );
                return Err(ScriptFailure::TimedOut {
                    seconds: self.config.timeout_seconds,
                });
            }
        };
        let stdout = stdout_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            return Err(ScriptFailure::Exited {
                status: status.to_string(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        let info: ArgumentInfo = serde_json::from_slice(&stdout)
            .map_err(|e| ScriptFailure::InvalidOutput(e.to_string()))?;
        match info.error {
            Some(message) => Err(ScriptFailure::Raised(message)),
            None => Ok(info),
        }
    }
}
