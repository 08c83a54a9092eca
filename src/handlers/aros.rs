use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::{
        aros::{AroView, CreateAroRequest, UpdateAroRequest},
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
use tracing::info;
use uuid::Uuid;

/// Record goods received against a purchase order
#[utoipa::path(
    post,
    path = "/api/v1/aros",
    request_body = CreateAroRequest,
    responses(
        (status = 201, description = "ARO created", body = AroView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Purchase order is cancelled", body = crate::errors::ErrorResponse),
        (status = 422, description = "Quantities exceed the order", body = crate::errors::ErrorResponse)
    ),
    tag = "aros"
)]
pub async fn create_aro(
    State(state): State<AppState>,
    Json(payload): Json<CreateAroRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .aros
        .create_aro(payload)
        .await
        .map_err(map_service_error)?;

    info!(aro_id = %view.aro.id, "ARO created via API");
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/aros/{id}",
    params(("id" = Uuid, Path, description = "ARO ID")),
    responses(
        (status = 200, description = "ARO fetched", body = AroView),
        (status = 404, description = "ARO not found", body = crate::errors::ErrorResponse)
    ),
    tag = "aros"
)]
pub async fn get_aro(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .services
        .aros
        .get_aro(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    put,
    path = "/api/v1/aros/{id}",
    request_body = UpdateAroRequest,
    params(("id" = Uuid, Path, description = "ARO ID")),
    responses(
        (status = 200, description = "ARO updated", body = AroView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "ARO not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "ARO already shipped", body = crate::errors::ErrorResponse),
        (status = 422, description = "Quantities exceed the order", body = crate::errors::ErrorResponse)
    ),
    tag = "aros"
)]
pub async fn update_aro(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAroRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .aros
        .update_aro(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/aros/{id}",
    params(("id" = Uuid, Path, description = "ARO ID")),
    responses(
        (status = 200, description = "ARO deleted", body = DeleteResult),
        (status = 404, description = "ARO not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "ARO already shipped", body = crate::errors::ErrorResponse)
    ),
    tag = "aros"
)]
pub async fn delete_aro(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .aros
        .delete_aro(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

pub fn aro_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_aro))
        .route("/:id", get(get_aro).put(update_aro).delete(delete_aro))
}
