//! Shortcuts CLI executor
//!
//! Runs `shortcuts run <name> --input-path <file>`. The payload is written
//! to a temp file as JSON, the shortcut's stdout becomes the step output,
//! and a non-zero exit turns stderr into the failure detail.

use std::io::Write;
use std::process::{Command as StdCommand, Stdio};
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, instrument};
use wait_timeout::ChildExt;

use super::StepExecutor;
use crate::context::Context;

/// How long the availability probe may hang before the CLI counts as absent
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Executor backed by the platform `shortcuts` binary
pub struct ShortcutsExecutor {
    binary: String,
}

impl ShortcutsExecutor {
    /// Use the default binary, honoring the SHORTFLOW_SHORTCUTS_BIN override
    pub fn new() -> Self {
        Self {
            binary: std::env::var("SHORTFLOW_SHORTCUTS_BIN")
                .unwrap_or_else(|_| "shortcuts".to_string()),
        }
    }

    /// Use an explicit binary (tests point this at stand-ins)
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Names of the shortcuts installed on this machine (`shortcuts list`),
    /// one per line, blank lines skipped
    pub async fn list(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.binary)
            .arg("list")
            .output()
            .await
            .map_err(|e| anyhow!("failed to run {}: {e}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl Default for ShortcutsExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for ShortcutsExecutor {
    fn name(&self) -> &str {
        "shortcuts"
    }

    #[instrument(skip(self, payload), fields(shortcut = %shortcut_name))]
    async fn execute(&self, shortcut_name: &str, payload: &Context) -> Result<String> {
        // The temp file lives until end of scope, past process exit
        let mut input_file = NamedTempFile::new()?;
        serde_json::to_writer(&mut input_file, &payload.to_value())?;
        input_file.flush()?;

        debug!("Running shortcut");
        let output = Command::new(&self.binary)
            .arg("run")
            .arg(shortcut_name)
            .arg("--input-path")
            .arg(input_file.path())
            .output()
            .await
            .map_err(|e| anyhow!("failed to run {}: {e}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("{}", stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Probe the CLI with a bounded wait so a hung binary cannot stall startup
    fn is_available(&self) -> bool {
        let child = StdCommand::new(&self.binary)
            .arg("list")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        let Ok(mut child) = child else { return false };
        match child.wait_timeout(PROBE_TIMEOUT) {
            Ok(Some(status)) => status.success(),
            Ok(None) => {
                let _ = child.kill();
                false
            }
            Err(_) => false,
        }
    }
}
