//! Audio duration probing.

use crate::error::{CoreError, Result};
use crate::time::{secs_f64_to_micros, DurationExt};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Reports the total duration of an audio file
#[async_trait]
pub trait DurationProbe: Send + Sync {
    /// Duration of the audio file at `path` in microseconds.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its format is unsupported.
    async fn probe_duration(&self, path: &Path) -> Result<u64>;
}

/// Probes durations by running `ffprobe` and reading its JSON format section
pub struct FfprobeDurationProbe {
    program: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfprobeDurationProbe {
    /// Default executable name, resolved through `PATH`
    pub const DEFAULT_PROGRAM: &'static str = "ffprobe";

    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_program(Self::DEFAULT_PROGRAM, timeout)
    }

    /// Use a specific ffprobe executable
    #[must_use]
    pub fn with_program(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DurationProbe for FfprobeDurationProbe {
    async fn probe_duration(&self, path: &Path) -> Result<u64> {
        let failed = |reason: String| CoreError::ProbeFailed {
            path: path.to_path_buf(),
            reason,
        };

        let child = Command::new(&self.program)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                failed(format!(
                    "{} timed out after {}ms",
                    self.program,
                    self.timeout.as_millis_u64()
                ))
            })?
            .map_err(|e| failed(format!("failed to run {}: {e}", self.program)))?;

        if !output.status.success() {
            return Err(failed(format!("{} exited with {}", self.program, output.status)));
        }

        let duration_us = parse_probe_output(&output.stdout).map_err(failed)?;
        debug!("Probed {}: {}us", path.display(), duration_us);
        Ok(duration_us)
    }
}

/// Extract `format.duration` (seconds as a decimal string) as microseconds
fn parse_probe_output(stdout: &[u8]) -> std::result::Result<u64, String> {
    let parsed: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| format!("invalid probe output: {e}"))?;
    let duration = parsed
        .format
        .duration
        .ok_or_else(|| "probe output has no duration".to_string())?;
    let secs: f64 = duration
        .trim()
        .parse()
        .map_err(|e| format!("invalid duration {duration:?}: {e}"))?;
    Ok(secs_f64_to_micros(secs))
}
