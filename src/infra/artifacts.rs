//! Ephemeral artifact spool: uniquely named SVG paths with removal
//! guaranteed on every exit path.

use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use metrics::counter;
use thiserror::Error;
use tracing::warn;

use super::telemetry::METRIC_CLEANUP_FAILURES;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to prepare spool directory: {0}")]
    SpoolInit(io::Error),
    #[error("failed to reserve an artifact path: {0}")]
    Create(io::Error),
    #[error("failed to read artifact: {0}")]
    Read(io::Error),
}

/// Hands out request-scoped artifact paths inside the spool directory.
///
/// Names are randomized by `tempfile`, so concurrent requests (including
/// requests for identical text) never share a path.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    spool_dir: PathBuf,
}

impl ArtifactStore {
    /// Initialise the store, creating the spool directory if necessary.
    pub fn new(spool_dir: PathBuf) -> Result<Self, ArtifactError> {
        fs::create_dir_all(&spool_dir).map_err(ArtifactError::SpoolInit)?;
        Ok(Self { spool_dir })
    }

    /// Reserve a uniquely named `.svg` path for one request.
    ///
    /// The returned handle owns the path for the remainder of the request;
    /// release is registered here, at acquisition, and runs exactly once.
    pub fn acquire(&self) -> Result<ArtifactHandle, ArtifactError> {
        let file = tempfile::Builder::new()
            .prefix("scrivano-")
            .suffix(".svg")
            .tempfile_in(&self.spool_dir)
            .map_err(ArtifactError::Create)?;

        // Detach tempfile's own delete-on-drop; the handle takes over.
        let (_, path) = file.keep().map_err(|err| ArtifactError::Create(err.error))?;
        Ok(ArtifactHandle {
            path,
            released: false,
        })
    }
}

/// Exclusive owner of one spooled artifact path.
///
/// Removal happens exactly once: synchronously via [`into_svg`], or in
/// `Drop` for every other exit path (render failure, delivery failure,
/// client abort mid-stream). A removal failure is logged and counted, never
/// surfaced.
///
/// [`into_svg`]: ArtifactHandle::into_svg
#[derive(Debug)]
pub struct ArtifactHandle {
    path: PathBuf,
    released: bool,
}

impl ArtifactHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the artifact into memory and release the spool entry before
    /// returning.
    pub fn into_svg(mut self) -> Result<String, ArtifactError> {
        let svg = fs::read_to_string(&self.path).map_err(ArtifactError::Read)?;
        self.release();
        Ok(svg)
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                counter!(METRIC_CLEANUP_FAILURES).increment(1);
                warn!(
                    target = "infra::artifacts",
                    path = %self.path.display(),
                    error = %err,
                    "Failed to remove spooled artifact"
                );
            }
        }
    }
}

impl Drop for ArtifactHandle {
    fn drop(&mut self) {
        self.release();
    }
}
