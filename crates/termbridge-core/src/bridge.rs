//! Scripting bridge: run an AppleScript source string against the host.
//!
//! This is the only place the engine performs I/O on the host application.
//! Every failure is logged and collapsed to an empty string so callers can
//! treat "no answer" uniformly.

use crate::error::BridgeError;
use std::future::Future;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default wall-clock limit for a single script.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Executes scripts against the host application.
///
/// Implementations must never fail: a script that cannot be run yields `""`.
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &str) -> impl Future<Output = String> + Send;
}

/// Runs scripts through the `osascript` interpreter.
#[derive(Debug, Clone)]
pub struct Osascript {
    program: String,
    timeout_secs: u64,
}

impl Default for Osascript {
    fn default() -> Self {
        Self::new("osascript", DEFAULT_TIMEOUT_SECS)
    }
}

impl Osascript {
    pub fn new(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            timeout_secs,
        }
    }

    /// Run a script and report which failure class occurred, if any.
    pub async fn run_checked(&self, script: &str) -> Result<String, BridgeError> {
        debug!(script = %preview(script), "executing AppleScript");

        let mut cmd = Command::new(&self.program);
        cmd.arg("-e").arg(script).kill_on_drop(true);

        let duration = Duration::from_secs(self.timeout_secs);
        let output = tokio::time::timeout(duration, cmd.output())
            .await
            .map_err(|_| BridgeError::Timeout(self.timeout_secs))??;

        if !output.status.success() {
            return Err(BridgeError::NonZeroExit {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(result = %preview(&stdout), "AppleScript result");
        Ok(stdout)
    }
}

impl ScriptRunner for Osascript {
    async fn run(&self, script: &str) -> String {
        match self.run_checked(script).await {
            Ok(out) => out,
            Err(e) => {
                warn!(class = e.class(), error = %e, "AppleScript execution failed");
                String::new()
            }
        }
    }
}

/// First 100 characters of a script, for log lines.
fn preview(s: &str) -> String {
    let mut out: String = s.trim().chars().take(100).collect();
    if s.trim().chars().count() > 100 {
        out.push_str("...");
    }
    out
}
