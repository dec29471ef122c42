//! Command Execution
//!
//! The only seam between the exporter and the operating system. Every diagnostic
//! tool (`racadm`, `lsblk`, `nvme`) is run through a [`CommandExecutor`], which lets
//! tests substitute canned output for real hardware.
//!
//! # Output
//!
//! Diagnostic tools often report status on stderr, so the returned bytes are stdout
//! followed by stderr. A nonzero exit is a failure that still carries the captured
//! output for logging.
//!
//! # Timeouts
//!
//! Each invocation is bounded. A tool that hangs past the timeout is killed and
//! reported as [`ExporterError::Timeout`], together with its exit status and
//! whatever it printed before the kill. No retries happen here; the polling loop
//! simply tries again on its next tick.

use crate::error::{ExporterError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// How long the pipe readers may keep draining after a timed-out child is killed.
const DRAIN_AFTER_KILL: Duration = Duration::from_millis(200);

/// Runs an external program and returns its combined output.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<Vec<u8>>;
}

/// Executor backed by real child processes.
#[derive(Debug, Clone)]
pub struct SystemCommandExecutor {
    timeout: Duration,
}

impl SystemCommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl CommandExecutor for SystemCommandExecutor {
    async fn execute(&self, program: &str, args: &[&str]) -> Result<Vec<u8>> {
        debug!("Executing {} {}", program, args.join(" "));

        let spawn_error = |source| ExporterError::Spawn {
            program: program.to_string(),
            source,
        };

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let stdout = PipeBuffer::drain(child.stdout.take());
        let stderr = PipeBuffer::drain(child.stderr.take());

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(spawn_error)?,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out `{}`: {}", program, e);
                }
                let status = child.try_wait().ok().flatten();
                let output = combine(
                    stdout.finish(Some(DRAIN_AFTER_KILL)).await,
                    stderr.finish(Some(DRAIN_AFTER_KILL)).await,
                );
                return Err(ExporterError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                    status,
                    output: String::from_utf8_lossy(&output).trim().to_string(),
                });
            }
        };

        let combined = combine(stdout.finish(None).await, stderr.finish(None).await);

        if !status.success() {
            return Err(ExporterError::CommandFailed {
                program: program.to_string(),
                status,
                output: String::from_utf8_lossy(&combined).trim().to_string(),
            });
        }

        Ok(combined)
    }
}

fn combine(mut stdout: Vec<u8>, stderr: Vec<u8>) -> Vec<u8> {
    stdout.extend_from_slice(&stderr);
    stdout
}

/// One child pipe read into memory by a background task.
///
/// Bytes are appended as they arrive, so whatever was read before a kill is still
/// available even if a grandchild keeps the pipe open.
struct PipeBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl PipeBuffer {
    fn drain<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let bytes = Arc::new(Mutex::new(Vec::new()));
        let task = pipe.map(|mut pipe| {
            let bytes = Arc::clone(&bytes);
            tokio::spawn(async move {
                let mut chunk = [0u8; 4096];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            let mut bytes = bytes.lock().unwrap_or_else(|e| e.into_inner());
                            bytes.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
            })
        });
        Self { bytes, task }
    }

    /// Wait for the reader to hit end of file, or at most `limit`, then take the bytes.
    async fn finish(mut self, limit: Option<Duration>) -> Vec<u8> {
        if let Some(mut task) = self.task.take() {
            match limit {
                Some(limit) => {
                    if tokio::time::timeout(limit, &mut task).await.is_err() {
                        task.abort();
                    }
                }
                None => {
                    let _ = task.await;
                }
            }
        }
        std::mem::take(&mut *self.bytes.lock().unwrap_or_else(|e| e.into_inner()))
    }
}
