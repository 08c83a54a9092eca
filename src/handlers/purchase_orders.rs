use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::{
        purchase_orders::{
            CreatePurchaseOrderRequest, PurchaseOrderView, UpdatePurchaseOrderRequest,
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
use tracing::info;
use uuid::Uuid;

/// Create a purchase order from a quote, or directly for a customer
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = PurchaseOrderView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown quote or customer", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .purchase_orders
        .create_purchase_order(payload)
        .await
        .map_err(map_service_error)?;

    info!(purchase_order_id = %view.purchase_order.id, "Purchase order created via API");
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order fetched", body = PurchaseOrderView),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .services
        .purchase_orders
        .get_purchase_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}",
    request_body = UpdatePurchaseOrderRequest,
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order updated", body = PurchaseOrderView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Status change not allowed", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn update_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePurchaseOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .purchase_orders
        .update_purchase_order(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/purchase-orders/{id}",
    params(("id" = Uuid, Path, description = "Purchase order ID")),
    responses(
        (status = 200, description = "Purchase order deleted", body = DeleteResult),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Goods were already received", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn delete_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .purchase_orders
        .delete_purchase_order(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new().route("/", post(create_purchase_order)).route(
        "/:id",
        get(get_purchase_order)
            .put(update_purchase_order)
            .delete(delete_purchase_order),
    )
}
