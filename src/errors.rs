use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Unprocessable Entity",
    "kind": "quantity_exceeded",
    "message": "Quantity exceeded: line SNX-A received 4 but only 3 were ordered",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category
    pub error: String,
    /// Machine-readable error kind
    pub kind: String,
    /// Human-readable error description
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error was produced
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Referential integrity error: {0}")]
    ReferentialIntegrity(String),

    #[error("Quantity exceeded: {0}")]
    QuantityExceeded(String),

    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Number generation conflict: {0}")]
    NumberGenerationConflict(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn db_error(error: DbErr) -> Self {
        ServiceError::DatabaseError(error)
    }

    /// Machine-readable kind reported to callers alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::ReferentialIntegrity(_) => "referential_integrity_error",
            Self::QuantityExceeded(_) => "quantity_exceeded",
            Self::StateConflict(_) => "state_conflict",
            Self::NumberGenerationConflict(_) => "number_generation_conflict",
            Self::DataIntegrity(_) => "data_integrity_error",
            Self::NotFound(_) => "not_found",
            Self::ServerError(_) => "server_error",
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ReferentialIntegrity(_) | Self::QuantityExceeded(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::StateConflict(_) => StatusCode::CONFLICT,
            Self::NumberGenerationConflict(_) | Self::ServerError(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::DataIntegrity(_)
            | Self::DatabaseError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::ServerError(_) | Self::NumberGenerationConflict(_) => {
                "Service temporarily unavailable, retry the request".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            kind: self.kind().to_string(),
            message: self.response_message(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(body)).into_response()
    }
}

/// API Error type for HTTP responses
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Service error: {0}")]
    ServiceError(#[from] ServiceError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::ServiceError(service_error) => service_error.into_response(),
            ApiError::ValidationError(msg) => ServiceError::ValidationError(msg).into_response(),
            ApiError::NotFound(msg) => ServiceError::NotFound(msg).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use test_case::test_case;

    #[tokio::test]
    async fn service_error_response_includes_request_id_and_kind() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::StateConflict("invoice is Paid".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
        assert_eq!(payload.kind, "state_conflict");
    }

    #[test_case(ServiceError::ValidationError("x".into()), StatusCode::BAD_REQUEST, "validation_error")]
    #[test_case(ServiceError::ReferentialIntegrity("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "referential_integrity_error")]
    #[test_case(ServiceError::QuantityExceeded("x".into()), StatusCode::UNPROCESSABLE_ENTITY, "quantity_exceeded")]
    #[test_case(ServiceError::StateConflict("x".into()), StatusCode::CONFLICT, "state_conflict")]
    #[test_case(ServiceError::DataIntegrity("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "data_integrity_error")]
    #[test_case(ServiceError::ServerError("x".into()), StatusCode::SERVICE_UNAVAILABLE, "server_error")]
    #[test_case(ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND, "not_found")]
    #[test_case(ServiceError::InternalError("x".into()), StatusCode::INTERNAL_SERVER_ERROR, "internal_error")]
    fn status_and_kind_mapping(err: ServiceError, status: StatusCode, kind: &str) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("secret dsn".into())).response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::InternalError("stack".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::QuantityExceeded("line A".into()).response_message(),
            "Quantity exceeded: line A"
        );
    }

    #[tokio::test]
    async fn api_error_delegates_to_service_error() {
        let response = ApiError::NotFound("quote".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
