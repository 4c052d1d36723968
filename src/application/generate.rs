//! The generate pipeline: validation, segmentation, parameter broadcast and
//! bounded invocation of the external renderer.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::{task, time};
use tracing::info;

use crate::domain::request::{GenerateRequest, Limits, TextAlign};
use crate::infra::artifacts::{ArtifactHandle, ArtifactStore};
use crate::infra::renderer::{HandRenderer, RenderError};
use crate::infra::telemetry::{METRIC_GENERATE_ERRORS, METRIC_GENERATE_TOTAL, METRIC_RENDER_MS};

use super::error::AppError;

/// Stroke parameters are uniform across lines; the renderer still expects
/// them per line.
pub const STROKE_COLOR: &str = "black";
pub const STROKE_WIDTH: u32 = 1;

/// Renderer input: segmented lines plus the per-line parameter vectors
/// broadcast from the request scalars. The four vectors always match `lines`
/// in length.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderJob {
    pub lines: Vec<String>,
    pub biases: Vec<f64>,
    pub styles: Vec<u32>,
    pub stroke_colors: Vec<String>,
    pub stroke_widths: Vec<u32>,
    pub line_spacing: f64,
    pub font_size: f64,
    pub text_align: TextAlign,
}

impl RenderJob {
    /// Broadcast the request scalars across the segmented lines.
    pub fn broadcast(request: &GenerateRequest, lines: Vec<String>) -> Self {
        let n = lines.len();
        Self {
            biases: vec![request.bias; n],
            styles: vec![request.style; n],
            stroke_colors: vec![STROKE_COLOR.to_string(); n],
            stroke_widths: vec![STROKE_WIDTH; n],
            line_spacing: request.line_spacing,
            font_size: request.font_size,
            text_align: request.text_align,
            lines,
        }
    }
}

/// Orchestrates one generate request from raw input to a finished artifact.
///
/// Holds no per-request state; concurrent requests only share the spool
/// namespace, where [`ArtifactStore`] guarantees collision-free handles.
pub struct GenerateService {
    renderer: Arc<dyn HandRenderer>,
    artifacts: ArtifactStore,
    limits: Limits,
    render_timeout: Duration,
}

impl GenerateService {
    pub fn new(
        renderer: Arc<dyn HandRenderer>,
        artifacts: ArtifactStore,
        limits: Limits,
        render_timeout: Duration,
    ) -> Self {
        Self {
            renderer,
            artifacts,
            limits,
            render_timeout,
        }
    }

    /// Validate, segment, broadcast and render.
    ///
    /// On success the returned handle owns the finished SVG; on any failure
    /// the handle (if one was acquired) is dropped here, which removes the
    /// spool entry.
    pub async fn generate(&self, request: GenerateRequest) -> Result<ArtifactHandle, AppError> {
        let lines = match request.validated(&self.limits) {
            Ok(lines) => lines,
            Err(err) => {
                counter!(METRIC_GENERATE_ERRORS, "kind" => "validation").increment(1);
                return Err(AppError::from(err));
            }
        };

        let job = RenderJob::broadcast(&request, lines);
        let handle = self.artifacts.acquire().map_err(|err| {
            counter!(METRIC_GENERATE_ERRORS, "kind" => "internal").increment(1);
            AppError::from(crate::infra::error::InfraError::from(err))
        })?;

        match self.render_with_timeout(&job, &handle).await {
            Ok(()) => {
                counter!(METRIC_GENERATE_TOTAL).increment(1);
                Ok(handle)
            }
            Err(err) => {
                counter!(METRIC_GENERATE_ERRORS, "kind" => "render").increment(1);
                Err(err)
            }
        }
    }

    /// Run the blocking renderer on the blocking pool, bounded by the
    /// configured timeout. A timed-out renderer is not cancelled and may
    /// still write to the spool path afterwards; handle removal stays
    /// best-effort in that case.
    async fn render_with_timeout(
        &self,
        job: &RenderJob,
        handle: &ArtifactHandle,
    ) -> Result<(), AppError> {
        let started_at = Instant::now();
        let renderer = Arc::clone(&self.renderer);
        let job_input = job.clone();
        let output = handle.path().to_path_buf();

        let render = task::spawn_blocking(move || renderer.render(&job_input, &output));

        let result = match time::timeout(self.render_timeout, render).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => {
                return Err(AppError::unexpected(format!(
                    "renderer task failed: {join_error}"
                )));
            }
            Err(_) => Err(RenderError::Timeout {
                seconds: self.render_timeout.as_secs(),
            }),
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        match result {
            Ok(()) => {
                histogram!(METRIC_RENDER_MS).record(elapsed_ms as f64);
                info!(
                    target = "application::generate",
                    op = "generate::render",
                    result = "ok",
                    lines = job.lines.len(),
                    elapsed_ms = elapsed_ms,
                    "Handwriting artifact rendered"
                );
                Ok(())
            }
            Err(err) => Err(AppError::from(err)),
        }
    }
}
