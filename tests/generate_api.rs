use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use scrivano::application::generate::{GenerateService, RenderJob};
use scrivano::domain::request::Limits;
use scrivano::infra::artifacts::ArtifactStore;
use scrivano::infra::http::{AppState, build_router};
use scrivano::infra::renderer::{HandRenderer, RenderError};

/// In-process stand-in for the handwriting CLI: records every job and output
/// path it is handed, then writes a small SVG (or fails on demand).
#[derive(Default)]
struct ScriptedRenderer {
    jobs: Mutex<Vec<RenderJob>>,
    outputs: Mutex<Vec<PathBuf>>,
    fail_with: Option<&'static str>,
}

impl ScriptedRenderer {
    fn failing(stderr: &'static str) -> Self {
        Self {
            fail_with: Some(stderr),
            ..Self::default()
        }
    }

    fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().expect("jobs lock").clone()
    }

    fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().expect("outputs lock").clone()
    }
}

impl HandRenderer for ScriptedRenderer {
    fn render(&self, job: &RenderJob, output: &Path) -> Result<(), RenderError> {
        self.jobs.lock().expect("jobs lock").push(job.clone());
        self.outputs
            .lock()
            .expect("outputs lock")
            .push(output.to_path_buf());

        if let Some(stderr) = self.fail_with {
            return Err(RenderError::Cli {
                exit_code: Some(3),
                stderr: stderr.to_string(),
            });
        }

        std::fs::write(
            output,
            format!("<svg><desc>{} lines</desc></svg>", job.lines.len()),
        )
        .map_err(RenderError::Io)
    }
}

struct Harness {
    router: Router,
    renderer: Arc<ScriptedRenderer>,
    spool: TempDir,
}

impl Harness {
    fn new(renderer: ScriptedRenderer) -> Self {
        let spool = TempDir::new().expect("spool dir");
        let renderer = Arc::new(renderer);
        let artifacts = ArtifactStore::new(spool.path().to_path_buf()).expect("store");
        let generate = Arc::new(GenerateService::new(
            renderer.clone(),
            artifacts,
            Limits::default(),
            Duration::from_secs(5),
        ));
        let router = build_router(AppState {
            generate,
            default_delivery: Default::default(),
        });

        Self {
            router,
            renderer,
            spool,
        }
    }

    async fn post_generate(&self, body: serde_json::Value) -> (StatusCode, Vec<u8>, Option<String>) {
        let request = Request::builder()
            .method("POST")
            .uri("/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("response");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes()
            .to_vec();

        (status, bytes, content_type)
    }

    fn spool_entries(&self) -> usize {
        std::fs::read_dir(self.spool.path()).expect("read spool").count()
    }
}

fn error_body(bytes: &[u8]) -> serde_json::Value {
    serde_json::from_slice(bytes).expect("error json")
}

#[tokio::test]
async fn streamed_delivery_returns_svg_and_cleans_the_spool() {
    let harness = Harness::new(ScriptedRenderer::default());

    let (status, body, content_type) = harness
        .post_generate(serde_json::json!({ "text": "hello world" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("image/svg+xml"));
    assert_eq!(
        String::from_utf8(body).expect("utf8"),
        "<svg><desc>1 lines</desc></svg>"
    );
    assert_eq!(harness.spool_entries(), 0);
}

#[tokio::test]
async fn inline_delivery_embeds_the_svg_and_cleans_the_spool() {
    let harness = Harness::new(ScriptedRenderer::default());

    let (status, body, content_type) = harness
        .post_generate(serde_json::json!({ "text": "hello world", "delivery": "inline" }))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));

    let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(
        payload["svg"].as_str(),
        Some("<svg><desc>1 lines</desc></svg>")
    );
    assert_eq!(harness.spool_entries(), 0);
}

#[tokio::test]
async fn empty_text_is_rejected_before_the_renderer_runs() {
    let harness = Harness::new(ScriptedRenderer::default());

    for text in ["", "   \n\t "] {
        let (status, body, _) = harness
            .post_generate(serde_json::json!({ "text": text }))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error_body(&body)["error"], "Text is required");
    }

    assert!(harness.renderer.jobs().is_empty());
    assert_eq!(harness.spool_entries(), 0);
}

#[tokio::test]
async fn text_at_the_cap_renders_seven_lines() {
    let harness = Harness::new(ScriptedRenderer::default());
    let text = "a ".repeat(250);
    assert_eq!(text.chars().count(), 500);

    let (status, _, _) = harness
        .post_generate(serde_json::json!({ "text": text }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let jobs = harness.renderer.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].lines.len(), 7);
    assert!(jobs[0].lines.iter().all(|l| l.chars().count() <= 75));
}

#[tokio::test]
async fn text_over_the_cap_is_rejected_for_total_length() {
    let harness = Harness::new(ScriptedRenderer::default());
    let text = format!("{}a", "a ".repeat(250));
    assert_eq!(text.chars().count(), 501);

    let (status, body, _) = harness
        .post_generate(serde_json::json!({ "text": text }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_body(&body);
    assert_eq!(error["error"], "Text is too long: 501 characters (limit 500)");
    assert!(harness.renderer.jobs().is_empty());
}

#[tokio::test]
async fn broadcast_parameters_reach_the_renderer_per_line() {
    let harness = Harness::new(ScriptedRenderer::default());

    let (status, _, _) = harness
        .post_generate(serde_json::json!({
            "text": "the quick brown fox jumps over the lazy dog and keeps going until this wraps",
            "style": 3,
            "bias": 0.5,
        }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let jobs = harness.renderer.jobs();
    let job = &jobs[0];
    let n = job.lines.len();
    assert!(n > 1, "expected the text to wrap");
    assert_eq!(job.biases, vec![0.5; n]);
    assert_eq!(job.styles, vec![3; n]);
    assert_eq!(job.stroke_colors, vec!["black".to_string(); n]);
    assert_eq!(job.stroke_widths, vec![1; n]);
}

#[tokio::test]
async fn out_of_range_bias_names_the_field() {
    let harness = Harness::new(ScriptedRenderer::default());

    let (status, body, _) = harness
        .post_generate(serde_json::json!({ "text": "hello", "bias": 2.0 }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_body(&body);
    assert!(
        error["error"].as_str().expect("error").contains("bias"),
        "field not named: {error}"
    );
}

#[tokio::test]
async fn malformed_json_is_a_validation_error() {
    let harness = Harness::new(ScriptedRenderer::default());

    let (status, body, _) = harness
        .post_generate(serde_json::json!({ "text": "hi", "style": "calligraphy" }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_body(&body)["error"].is_string());
    assert!(harness.renderer.jobs().is_empty());
}

#[tokio::test]
async fn render_failure_maps_to_internal_error_with_details() {
    let harness = Harness::new(ScriptedRenderer::failing("sampler diverged"));

    let (status, body, _) = harness
        .post_generate(serde_json::json!({ "text": "hello" }))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = error_body(&body);
    assert_eq!(error["error"], "Handwriting rendering failed");
    assert!(
        error["details"]
            .as_str()
            .expect("details")
            .contains("sampler diverged")
    );
    assert_eq!(harness.spool_entries(), 0);
}

#[tokio::test]
async fn concurrent_identical_requests_use_distinct_handles() {
    let harness = Harness::new(ScriptedRenderer::default());
    let body = serde_json::json!({ "text": "same text", "delivery": "inline" });

    let (first, second) = tokio::join!(
        harness.post_generate(body.clone()),
        harness.post_generate(body.clone()),
    );
    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);

    let outputs = harness.renderer.outputs();
    assert_eq!(outputs.len(), 2);
    assert_ne!(outputs[0], outputs[1]);
    assert_eq!(harness.spool_entries(), 0);
}

#[tokio::test]
async fn health_endpoint_reports_liveness() {
    let harness = Harness::new(ScriptedRenderer::default());

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn responses_carry_permissive_cors_headers() {
    let harness = Harness::new(ScriptedRenderer::default());

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/generate")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn demo_page_is_served_at_the_root() {
    let harness = Harness::new(ScriptedRenderer::default());

    let response = harness
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("Scrivano"));
}
