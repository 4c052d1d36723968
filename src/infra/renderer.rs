//! Invocation boundary to the external handwriting-synthesis engine.

use std::{
    fs,
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time::Instant,
};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

use crate::application::generate::RenderJob;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to stage renderer input: {0}")]
    Io(io::Error),
    #[error("failed to encode renderer input: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("renderer CLI unavailable: {0}")]
    NotFound(io::Error),
    #[error("renderer exited with status {exit_code:?}: {stderr}")]
    Cli {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer exited successfully but wrote no artifact")]
    EmptyArtifact,
    #[error("renderer timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Boundary to the handwriting engine.
///
/// Implementations write a complete SVG for `job` to `output`, or fail. They
/// never remove `output` themselves; the caller's artifact handle owns the
/// path on every exit path.
pub trait HandRenderer: Send + Sync {
    fn render(&self, job: &RenderJob, output: &Path) -> Result<(), RenderError>;
}

/// Renders by invoking the configured handwriting CLI.
///
/// Contract: `<cli> --input <job.json> --output <file.svg>`, exit 0 with a
/// complete SVG at the output path, or non-zero with diagnostics on stderr.
#[derive(Debug, Clone)]
pub struct CliHandRenderer {
    cli_path: PathBuf,
}

impl CliHandRenderer {
    pub fn new(cli_path: PathBuf) -> Self {
        Self { cli_path }
    }
}

impl HandRenderer for CliHandRenderer {
    fn render(&self, job: &RenderJob, output: &Path) -> Result<(), RenderError> {
        let started_at = Instant::now();

        let mut input_file = NamedTempFile::new().map_err(RenderError::Io)?;
        serde_json::to_writer(&mut input_file, job)?;
        input_file.flush().map_err(RenderError::Io)?;

        let cli_output = Command::new(&self.cli_path)
            .arg("--input")
            .arg(input_file.path())
            .arg("--output")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|err| {
                warn!(
                    target = "infra::renderer",
                    op = "cli::render",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    error_code = "spawn_cli",
                    error = %err,
                    "Failed to spawn handwriting CLI"
                );
                if err.kind() == ErrorKind::NotFound {
                    RenderError::NotFound(err)
                } else {
                    RenderError::Io(err)
                }
            })?;

        if !cli_output.status.success() {
            let exit_code = cli_output.status.code();
            let stderr = String::from_utf8_lossy(&cli_output.stderr).into_owned();
            warn!(
                target = "infra::renderer",
                op = "cli::render",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                exit_code = exit_code.map(i64::from).unwrap_or(-1),
                error_code = "handwriting_cli",
                stderr = %stderr,
                "Handwriting CLI invocation failed"
            );
            return Err(RenderError::Cli { exit_code, stderr });
        }

        let artifact_bytes = fs::metadata(output).map(|m| m.len()).unwrap_or(0);
        if artifact_bytes == 0 {
            return Err(RenderError::EmptyArtifact);
        }

        info!(
            target = "infra::renderer",
            op = "cli::render",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            lines = job.lines.len(),
            artifact_bytes = artifact_bytes,
            "Handwriting CLI produced an artifact"
        );

        Ok(())
    }
}
