use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    errors::ApiError,
    handlers::AppState,
    models::{customer_entity, product_entity},
    services::master_data::{CreateCustomerRequest, CreateProductRequest, UpdateProductRequest},
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{post, put},
    Router,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/customers",
    request_body = CreateCustomerRequest,
    responses(
        (status = 201, description = "Customer created", body = customer_entity::Model),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "master-data"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let customer = state
        .services
        .master_data
        .create_customer(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(customer))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = product_entity::Model),
        (status = 400, description = "Invalid request or duplicate code", body = crate::errors::ErrorResponse)
    ),
    tag = "master-data"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .master_data
        .create_product(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(product))
}

/// Changes the product master record. Existing snapshots are untouched.
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    request_body = UpdateProductRequest,
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product updated", body = product_entity::Model),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "master-data"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let product = state
        .services
        .master_data
        .update_product(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(product))
}

pub fn customer_routes() -> Router<AppState> {
    Router::new().route("/", post(create_customer))
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/:id", put(update_product))
}
