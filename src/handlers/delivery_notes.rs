use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::{
        delivery_notes::{
            CreateDeliveryNoteRequest, DeliveryNoteView, UpdateDeliveryNoteRequest,
        },
        DeleteResult,
    },
    errors::ApiError,
    handlers::AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Ship what an ARO received. Skipped lines come back in `warnings`.
#[utoipa::path(
    post,
    path = "/api/v1/delivery-notes",
    request_body = CreateDeliveryNoteRequest,
    responses(
        (status = 201, description = "Delivery note created", body = DeliveryNoteView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "ARO is cancelled", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown ARO or excess quantity", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn create_delivery_note(
    State(state): State<AppState>,
    Json(payload): Json<CreateDeliveryNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .delivery_notes
        .create_delivery_note(payload)
        .await
        .map_err(map_service_error)?;

    if !view.warnings.is_empty() {
        warn!(
            delivery_note_id = %view.delivery_note.id,
            skipped = view.warnings.len(),
            "Delivery note created with skipped lines"
        );
    }
    info!(delivery_note_id = %view.delivery_note.id, "Delivery note created via API");
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/delivery-notes/{id}",
    params(("id" = Uuid, Path, description = "Delivery note ID")),
    responses(
        (status = 200, description = "Delivery note fetched", body = DeliveryNoteView),
        (status = 404, description = "Delivery note not found", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn get_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .services
        .delivery_notes
        .get_delivery_note(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    put,
    path = "/api/v1/delivery-notes/{id}",
    request_body = UpdateDeliveryNoteRequest,
    params(("id" = Uuid, Path, description = "Delivery note ID")),
    responses(
        (status = 200, description = "Delivery note updated", body = DeliveryNoteView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Delivery note not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivery note already invoiced", body = crate::errors::ErrorResponse),
        (status = 422, description = "Shipped more than received", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn update_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDeliveryNoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .delivery_notes
        .update_delivery_note(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/delivery-notes/{id}",
    params(("id" = Uuid, Path, description = "Delivery note ID")),
    responses(
        (status = 200, description = "Delivery note deleted", body = DeleteResult),
        (status = 404, description = "Delivery note not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Delivered or invoiced", body = crate::errors::ErrorResponse)
    ),
    tag = "delivery-notes"
)]
pub async fn delete_delivery_note(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .delivery_notes
        .delete_delivery_note(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

pub fn delivery_note_routes() -> Router<AppState> {
    Router::new().route("/", post(create_delivery_note)).route(
        "/:id",
        get(get_delivery_note)
            .put(update_delivery_note)
            .delete(delete_delivery_note),
    )
}
