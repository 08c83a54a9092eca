use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::{
        quotes::{QuoteRequest, QuoteView},
        DeleteResult,
    },
    errors::ApiError,
    handlers::AppState,
    services::{
        calculator::Totals,
        quotes::{PreviewTotalsRequest, QuoteDocument},
    },
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::info;
use uuid::Uuid;

/// Create a quote with its line snapshots
#[utoipa::path(
    post,
    path = "/api/v1/quotes",
    request_body = QuoteRequest,
    responses(
        (status = 201, description = "Quote created", body = QuoteView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product cannot be quoted", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown customer or product", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn create_quote(
    State(state): State<AppState>,
    Json(payload): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .quotes
        .create_quote(payload)
        .await
        .map_err(map_service_error)?;

    info!(quote_id = %view.quote.id, "Quote created via API");
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote fetched", body = QuoteView),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .services
        .quotes
        .get_quote(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

/// Replace a quote's header and lines
#[utoipa::path(
    put,
    path = "/api/v1/quotes/{id}",
    request_body = QuoteRequest,
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote updated", body = QuoteView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quote already has purchase orders", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<QuoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .quotes
        .update_quote(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/quotes/{id}",
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote deleted", body = DeleteResult),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quote is referenced downstream", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .quotes
        .delete_quote(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

/// Total a set of lines without saving anything
#[utoipa::path(
    post,
    path = "/api/v1/quotes/preview-totals",
    request_body = PreviewTotalsRequest,
    responses(
        (status = 200, description = "Computed totals", body = Totals),
        (status = 400, description = "Invalid figures", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn preview_totals(
    State(state): State<AppState>,
    Json(payload): Json<PreviewTotalsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let totals = state
        .services
        .quotes
        .preview_totals(&payload)
        .map_err(map_service_error)?;
    Ok(success_response(totals))
}

/// Printable quote: header, customer snapshot and lines
#[utoipa::path(
    get,
    path = "/api/v1/quotes/{id}/document",
    params(("id" = Uuid, Path, description = "Quote ID")),
    responses(
        (status = 200, description = "Quote document", body = QuoteDocument),
        (status = 404, description = "Quote not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Quote has no lines", body = crate::errors::ErrorResponse)
    ),
    tag = "quotes"
)]
pub async fn quote_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .services
        .quotes
        .quote_document(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(document))
}

pub fn quote_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_quote))
        .route("/preview-totals", post(preview_totals))
        .route("/:id", get(get_quote).put(update_quote).delete(delete_quote))
        .route("/:id/document", get(quote_document))
}
