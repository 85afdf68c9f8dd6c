//! HTTP-facing error type shared by every handler.
//!
//! Handlers return `Result<HttpResponse, ApiError>`; actix renders the error
//! through [`ResponseError`] as
//!
//! ```json
//! { "status": "fail", "kind": "invalid_parameter", "message": "...", "parameter": "title" }
//! ```
//!
//! `status` is `"fail"` for client errors and `"error"` for server errors. In
//! production the message of a server error is replaced by a generic one.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::config::{self, Environment};
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The listing query string was rejected.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// A request body failed validation.
    #[error("Invalid input data: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// A unique column already holds this value.
    #[error("{field}: \"{value}\" already exists. Please try another!")]
    Duplicate { field: String, value: String },

    /// The JSON body could not be parsed into the expected shape.
    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    /// A path id is not a UUID.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Can't find {0} on the server")]
    RouteNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to serialize response: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// Machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Query(e) => e.kind(),
            Self::Validation(_) => "validation",
            Self::Duplicate { .. } => "duplicate",
            Self::InvalidBody(_) => "invalid_body",
            Self::InvalidId(_) => "invalid_id",
            Self::NotFound(_) | Self::RouteNotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Serialization(_) => "internal",
        }
    }

    fn client_message(&self) -> String {
        if self.status_code().is_server_error() && config::environment() == Environment::Production
        {
            "Something went very wrong!".to_string()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Query(_)
            | Self::Validation(_)
            | Self::Duplicate { .. }
            | Self::InvalidBody(_)
            | Self::InvalidId(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) | Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, kind = self.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self, kind = self.kind(), "Request rejected");
        }

        let mut body = json!({
            "status": if status.is_server_error() { "error" } else { "fail" },
            "kind": self.kind(),
            "message": self.client_message(),
        });
        if let Self::Query(query_error) = self {
            if let Some(parameter) = query_error.parameter() {
                body["parameter"] = json!(parameter);
            }
        }
        if let Self::Validation(errors) = self {
            body["errors"] = json!(errors);
        }

        HttpResponse::build(status).json(body)
    }
}
