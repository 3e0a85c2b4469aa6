use crate::case::service::CaseError;
use crate::case::repository::RepositoryError;
use crate::config::ConfigError;
use crate::search::SearchError;
use crate::telemetry::{self, TelemetryError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;
use tracing::debug;

/// Message shown when a case is no longer in the state a page expects.
pub const PAGE_UNAVAILABLE: &str = "This page is no longer available";

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Case(CaseError),
    Search(SearchError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Case(err) => write!(f, "case error: {}", err),
            AppError::Search(err) => write!(f, "search error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Case(err) => Some(err),
            AppError::Search(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Case(err) => case_error_response(err),
            AppError::Search(err) => case_error_response(CaseError::Search(err)),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => {
                let body = Json(json!({ "error": self.to_string() }));
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

/// Maps a case workflow failure to its HTTP response.
///
/// Workflow state errors become a 403; only task errors are reported, the rest are routine.
pub fn case_error_response(err: CaseError) -> Response {
    let (status, body) = match &err {
        CaseError::Flow(flow) => {
            if flow.should_report() {
                telemetry::report(flow, "case workflow");
            } else {
                debug!(error = %flow, "case no longer in the expected state");
            }
            (StatusCode::FORBIDDEN, json!({ "error": PAGE_UNAVAILABLE }))
        }
        CaseError::Validation(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({ "error": err.to_string(), "fields": errors }),
        ),
        CaseError::Repository(RepositoryError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, json!({ "error": err.to_string() }))
        }
        CaseError::Repository(RepositoryError::Conflict(_)) => {
            (StatusCode::CONFLICT, json!({ "error": err.to_string() }))
        }
        CaseError::InvalidRequest(_) => {
            (StatusCode::BAD_REQUEST, json!({ "error": err.to_string() }))
        }
        CaseError::Repository(RepositoryError::Unavailable(_))
        | CaseError::DocumentPack(_)
        | CaseError::Reference(_)
        | CaseError::Chief(_)
        | CaseError::Search(_) => {
            tracing::error!(error = %err, "case operation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "error": err.to_string() }),
            )
        }
    };

    (status, Json(body)).into_response()
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CaseError> for AppError {
    fn from(value: CaseError) -> Self {
        Self::Case(value)
    }
}

impl From<SearchError> for AppError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}
