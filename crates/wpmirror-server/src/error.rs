//! Error types for the HTTP server.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No page or asset at the given path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Render error from wpmirror-site.
    #[error("Render error: {0}")]
    Render(#[from] wpmirror_site::RenderError),

    /// The blocking render task panicked or was cancelled.
    #[error("Render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Render(e) => {
                tracing::warn!(error = %e, "Render failed");
                StatusCode::NOT_FOUND
            }
            Self::Task(e) => {
                tracing::error!(error = %e, "Render task failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, [(header::CONTENT_TYPE, "text/plain")], "").into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_plain_text() {
        let response = ServerError::NotFound("x".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
    }
}
