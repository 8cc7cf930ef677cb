use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use fnd_core::Error;

/// Maps pipeline errors onto HTTP responses carrying `{"error", "kind"}`.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            Error::ModelUnavailable(_) | Error::OcrUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{} ({})", self.0, self.0.kind());
        } else {
            tracing::warn!("Rejected request: {}", self.0);
        }

        let mut body = json!({
            "error": self.0.to_string(),
            "kind": self.0.kind(),
        });
        if let Error::InsufficientText { length } = &self.0 {
            body["extracted_text_length"] = json!(length);
        }
        (status, Json(body)).into_response()
    }
}
