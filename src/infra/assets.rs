//! Embedded static asset serving for the demo page.

use axum::{
    body::Body,
    extract::Path,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use include_dir::{Dir, include_dir};
use mime_guess::MimeGuess;

use crate::application::error::ErrorReport;

static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

/// Serve the demo page.
pub async fn serve_index() -> Response {
    serve("index.html", "infra::assets::serve_index")
}

/// Serve an embedded asset under `/static/`.
pub async fn serve_asset(Path(path): Path<String>) -> Response {
    serve(path.trim_start_matches('/'), "infra::assets::serve_asset")
}

fn serve(path: &str, source: &'static str) -> Response {
    match STATIC_ASSETS.get_file(path) {
        Some(file) => {
            let mime = MimeGuess::from_path(path).first_or_octet_stream();
            let header_value = HeaderValue::from_str(mime.essence_str())
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));

            let mut response = Body::from(Bytes::from_static(file.contents())).into_response();
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, header_value);
            response
        }
        None => {
            let mut response = StatusCode::NOT_FOUND.into_response();
            ErrorReport::from_message(source, StatusCode::NOT_FOUND, "Static asset not found")
                .attach(&mut response);
            response
        }
    }
}
