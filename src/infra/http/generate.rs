//! Outer request handler for `/generate`: pipeline invocation plus artifact
//! delivery in the two supported modes.

use async_stream::stream;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;
use tokio::io::AsyncReadExt;

use crate::application::error::AppError;
use crate::domain::request::{DeliveryMode, GenerateRequest};
use crate::infra::artifacts::ArtifactHandle;
use crate::infra::error::InfraError;

use super::AppState;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";
const STREAM_CHUNK_BYTES: usize = 16 * 1024;

#[derive(Debug, Serialize)]
struct InlineArtifact {
    svg: String,
}

pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => return AppError::validation(rejection.body_text()).into_response(),
    };

    let delivery = request.delivery.unwrap_or(state.default_delivery);
    match state.generate.generate(request).await {
        Ok(handle) => match delivery {
            DeliveryMode::Inline => inline_response(handle),
            DeliveryMode::Stream => stream_response(handle).await,
        },
        Err(err) => err.into_response(),
    }
}

/// Read the artifact back and embed it; the spool entry is released inside
/// `into_svg`, before the response exists.
fn inline_response(handle: ArtifactHandle) -> Response {
    match handle.into_svg() {
        Ok(svg) => Json(InlineArtifact { svg }).into_response(),
        Err(err) => AppError::from(InfraError::from(err)).into_response(),
    }
}

/// Send the artifact as the response body. The handle moves into the body
/// stream, so the spool entry is released when the body finishes or the
/// client goes away mid-transfer.
async fn stream_response(handle: ArtifactHandle) -> Response {
    let file = match tokio::fs::File::open(handle.path()).await {
        Ok(file) => file,
        Err(err) => return AppError::from(InfraError::Io(err)).into_response(),
    };

    let body_stream = stream! {
        let _spool_entry = handle;
        let mut file = file;
        let mut buf = [0u8; STREAM_CHUNK_BYTES];
        loop {
            match file.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => yield Ok::<Bytes, std::io::Error>(Bytes::copy_from_slice(&buf[..n])),
                Err(err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    };

    let mut response = Body::from_stream(body_stream).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(SVG_CONTENT_TYPE),
    );
    response
}
