use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Orderchain API",
        version = "0.1.0",
        description = r#"
# Commercial document chain

Quotes become purchase orders, purchase orders are received through AROs,
AROs ship on delivery notes, and quotes or delivery notes are invoiced.

Every derived document copies the data it needs from its predecessor, so later
edits to customers or products never change an issued document. When a
predecessor row is missing the derived line is skipped and reported in the
response's `warnings` list.

## Errors

Failures share one body: `error`, `kind`, `message`, `request_id`, `timestamp`.
`kind` is machine-readable, for example `quantity_exceeded` or `state_conflict`.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "quotes", description = "Quotes, previews and print projection"),
        (name = "purchase-orders", description = "Customer purchase orders"),
        (name = "aros", description = "Goods receipts against purchase orders"),
        (name = "delivery-notes", description = "Shipments of received goods"),
        (name = "invoices", description = "Invoices from quotes or delivery notes"),
        (name = "master-data", description = "Customers and products"),
        (name = "numbering", description = "Document number previews"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::quotes::create_quote,
        crate::handlers::quotes::get_quote,
        crate::handlers::quotes::update_quote,
        crate::handlers::quotes::delete_quote,
        crate::handlers::quotes::preview_totals,
        crate::handlers::quotes::quote_document,
        crate::handlers::numbering::next_number,

        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::update_purchase_order,
        crate::handlers::purchase_orders::delete_purchase_order,

        crate::handlers::aros::create_aro,
        crate::handlers::aros::get_aro,
        crate::handlers::aros::update_aro,
        crate::handlers::aros::delete_aro,

        crate::handlers::delivery_notes::create_delivery_note,
        crate::handlers::delivery_notes::get_delivery_note,
        crate::handlers::delivery_notes::update_delivery_note,
        crate::handlers::delivery_notes::delete_delivery_note,

        crate::handlers::invoices::create_invoice,
        crate::handlers::invoices::get_invoice,
        crate::handlers::invoices::update_invoice,
        crate::handlers::invoices::delete_invoice,

        crate::handlers::master_data::create_customer,
        crate::handlers::master_data::create_product,
        crate::handlers::master_data::update_product,

        crate::handlers::health::health_check,
        crate::handlers::health::api_status,
    ),
    components(
        schemas(
            crate::services::snapshot::SnapshotWarning,
            crate::services::snapshot::DnpLineOverride,
            crate::services::calculator::Totals,
            crate::commands::DeleteResult,
            crate::models::DocumentKind,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_chain_route() {
        let json = serde_json::to_string(&ApiDocV1::openapi()).unwrap();
        for path in [
            "/api/v1/quotes",
            "/api/v1/quotes/{id}/document",
            "/api/v1/purchase-orders/{id}",
            "/api/v1/aros",
            "/api/v1/delivery-notes",
            "/api/v1/invoices/{id}",
            "/api/v1/numbering/{kind}/next",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
    }
}
