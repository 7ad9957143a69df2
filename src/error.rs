use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::config::ConfigError;
use crate::http::ServerError;
use crate::middleware::RequestId;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Error response that also names the request, for matching against logs.
    pub fn with_request_id(self, request_id: &RequestId) -> Response {
        let (status, mut body) = self.body();
        body["request_id"] = Value::String(request_id.0.to_string());
        (status, Json(body)).into_response()
    }

    fn body(&self) -> (StatusCode, Value) {
        let (status, message) = match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.body();
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = AppError::NotFound("/nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Not found: /nope");
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_not_found_carries_request_id() {
        let request_id = RequestId(uuid::Uuid::new_v4());
        let response = AppError::NotFound("/nope".to_string()).with_request_id(&request_id);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["request_id"], request_id.0.to_string());
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_startup_error_hides_detail() {
        let err: AppError = ConfigError::Validation("bad port".to_string()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn test_config_error_converts() {
        let err: AppError = ConfigError::Validation("missing cache.host".to_string()).into();
        assert_eq!(err.to_string(), "Configuration error: missing cache.host");
    }
}
