//! # Error Types
//!
//! Every failure a request can hit ends up as a [`CertError`], which knows its
//! own HTTP status.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CertError {
    /// Missing or malformed request field
    #[error("{0}")]
    Validation(String),

    /// Extraction produced nothing to render
    #[error("No names found in the uploaded file")]
    NoNames,

    /// Template bytes are not a decodable image
    #[error("Failed to decode template image: {0}")]
    Template(String),

    /// Corrupt spreadsheet or document
    #[error("Failed to parse {what}: {cause}")]
    Parse { what: &'static str, cause: String },

    /// Every font fallback failed
    #[error("Font error: {0}")]
    Font(String),

    /// Image, PDF, or archive serialization failed
    #[error("Failed to build output: {0}")]
    Output(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CertError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CertError::Validation(msg.into())
    }

    pub fn parse(what: &'static str, cause: impl std::fmt::Display) -> Self {
        CertError::Parse {
            what,
            cause: cause.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CertError::Validation(_) | CertError::NoNames | CertError::Template(_) => {
                StatusCode::BAD_REQUEST
            }
            CertError::Parse { .. }
            | CertError::Font(_)
            | CertError::Output(_)
            | CertError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tokio::task::JoinError> for CertError {
    fn from(e: tokio::task::JoinError) -> Self {
        CertError::Internal(format!("processing task failed: {}", e))
    }
}

impl From<axum::extract::multipart::MultipartError> for CertError {
    fn from(e: axum::extract::multipart::MultipartError) -> Self {
        CertError::Validation(format!("Multipart error: {}", e))
    }
}

impl IntoResponse for CertError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
