//! HTTP handlers for the server.

pub mod documents;
pub mod render;

use axum::http::StatusCode;

use crate::error::DocflowError;

/// Map a library error onto the handler error shape.
///
/// Backend errors keep their status; transport and decode failures talking
/// to the backend are reported as a bad gateway.
pub(crate) fn error_response(err: DocflowError) -> (StatusCode, String) {
    let status = match &err {
        DocflowError::Api { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        DocflowError::Transport(_) | DocflowError::Decode(_) => StatusCode::BAD_GATEWAY,
        DocflowError::NotFound(_) => StatusCode::NOT_FOUND,
        DocflowError::Field(_) | DocflowError::Workflow(_) => StatusCode::BAD_REQUEST,
        DocflowError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        DocflowError::Immutable(_) => StatusCode::CONFLICT,
        DocflowError::Render(_) | DocflowError::Image(_) | DocflowError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!("{}", err);
    }
    (status, err.to_string())
}
