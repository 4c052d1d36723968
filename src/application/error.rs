use std::error::Error as StdError;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{domain::error::DomainError, infra::error::InfraError, infra::renderer::RenderError};

/// Diagnostic payload attached to error responses as a request extension so
/// the logging middleware can emit the full error chain without the chain
/// ever reaching the caller.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Wire shape of every failure response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Domain(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Render(_) | AppError::Infra(_) | AppError::Unexpected(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Caller-facing body. Validation messages are actionable and pass
    /// through verbatim; everything else gets a generic `error` with the
    /// underlying message confined to `details`.
    fn wire_body(&self) -> ErrorBody {
        match self {
            AppError::Domain(err) => ErrorBody {
                error: err.to_string(),
                details: None,
            },
            AppError::Validation(message) => ErrorBody {
                error: message.clone(),
                details: None,
            },
            AppError::Render(err) => ErrorBody {
                error: "Handwriting rendering failed".to_string(),
                details: Some(err.to_string()),
            },
            AppError::Infra(err) => ErrorBody {
                error: "Internal error".to_string(),
                details: Some(err.to_string()),
            },
            AppError::Unexpected(message) => ErrorBody {
                error: "Unexpected error occurred".to_string(),
                details: Some(message.clone()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport::from_error("application::error::AppError", status, &self);
        let mut response = (status, Json(self.wire_body())).into_response();
        report.attach(&mut response);
        response
    }
}
