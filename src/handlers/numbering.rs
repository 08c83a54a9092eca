use super::common::{map_service_error, success_response};
use crate::{
    errors::{ApiError, ServiceError},
    handlers::AppState,
    models::DocumentKind,
    services::quotes::NumberPreview,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::str::FromStr;

/// Number the next document of `kind` would receive
#[utoipa::path(
    get,
    path = "/api/v1/numbering/{kind}/next",
    params(("kind" = String, Path, description = "quote, purchase_order, aro, delivery_note or invoice")),
    responses(
        (status = 200, description = "Next number", body = NumberPreview),
        (status = 400, description = "Unknown document kind", body = crate::errors::ErrorResponse)
    ),
    tag = "numbering"
)]
pub async fn next_number(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let kind = DocumentKind::from_str(&kind).map_err(|_| {
        ApiError::ServiceError(ServiceError::ValidationError(format!(
            "unknown document kind '{}'",
            kind
        )))
    })?;
    let preview = state
        .services
        .quotes
        .next_number_preview(kind)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(preview))
}

pub fn numbering_routes() -> Router<AppState> {
    Router::new().route("/:kind/next", get(next_number))
}
