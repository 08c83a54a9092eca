use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::{
        invoices::{CreateInvoiceRequest, InvoiceView, UpdateInvoiceRequest},
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

/// Invoice a quote or a delivery note (exactly one of the two ids)
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = CreateInvoiceRequest,
    responses(
        (status = 201, description = "Invoice created", body = InvoiceView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Source cannot be invoiced", body = crate::errors::ErrorResponse),
        (status = 422, description = "Unknown source document", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn create_invoice(
    State(state): State<AppState>,
    Json(payload): Json<CreateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .invoices
        .create_invoice(payload)
        .await
        .map_err(map_service_error)?;

    info!(invoice_id = %view.invoice.id, "Invoice created via API");
    Ok(created_response(view))
}

#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice fetched", body = InvoiceView),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let view = state
        .services
        .invoices
        .get_invoice(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    put,
    path = "/api/v1/invoices/{id}",
    request_body = UpdateInvoiceRequest,
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice updated", body = InvoiceView),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Invoice is no longer editable", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn update_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoiceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let view = state
        .services
        .invoices
        .update_invoice(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(view))
}

#[utoipa::path(
    delete,
    path = "/api/v1/invoices/{id}",
    params(("id" = Uuid, Path, description = "Invoice ID")),
    responses(
        (status = 200, description = "Invoice deleted", body = DeleteResult),
        (status = 404, description = "Invoice not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Only Draft or Cancelled invoices can be deleted", body = crate::errors::ErrorResponse)
    ),
    tag = "invoices"
)]
pub async fn delete_invoice(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let result = state
        .services
        .invoices
        .delete_invoice(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(result))
}

pub fn invoice_routes() -> Router<AppState> {
    Router::new().route("/", post(create_invoice)).route(
        "/:id",
        get(get_invoice).put(update_invoice).delete(delete_invoice),
    )
}
