pub mod create_purchase_order_command;
pub mod delete_purchase_order_command;
pub mod update_purchase_order_command;

pub use create_purchase_order_command::CreatePurchaseOrderCommand;
pub use delete_purchase_order_command::DeletePurchaseOrderCommand;
pub use update_purchase_order_command::UpdatePurchaseOrderCommand;

use crate::{
    commands::validate_money,
    errors::ServiceError,
    models::{
        customer_entity, po_customer_entity, po_product_entity,
        purchase_order_entity::{self, PurchaseOrderStatus},
        quote_entity,
    },
    services::snapshot::{self, SnapshotWarning},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Line for a purchase order placed without a quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PoLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i32,
    #[validate(custom = "validate_money")]
    pub unit_price: Option<Decimal>,
}

/// Either `quote_id`, or `customer_id` with `lines`
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    pub quote_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    #[validate]
    pub lines: Vec<PoLineRequest>,
    pub planned_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    #[validate(length(max = 255))]
    pub pdf_path: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdatePurchaseOrderRequest {
    /// Only Pending, Approved and Cancelled can be set directly
    pub status: Option<PurchaseOrderStatus>,
    pub planned_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    #[validate(length(max = 255))]
    pub pdf_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PurchaseOrderView {
    pub purchase_order: purchase_order_entity::Model,
    pub customer: Option<po_customer_entity::Model>,
    pub lines: Vec<po_product_entity::Model>,
    pub warnings: Vec<SnapshotWarning>,
}

/// Creates the PO's customer snapshot if it has none. An existing snapshot is
/// never overwritten.
pub(crate) async fn ensure_po_customer<C: ConnectionTrait>(
    conn: &C,
    purchase_order: &purchase_order_entity::Model,
) -> Result<(po_customer_entity::Model, Option<SnapshotWarning>), ServiceError> {
    let existing = po_customer_entity::Entity::find()
        .filter(po_customer_entity::Column::PurchaseOrderId.eq(purchase_order.id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if let Some(found) = existing {
        return Ok((found, None));
    }

    let now = Utc::now();
    let quote = match purchase_order.quote_id {
        Some(quote_id) => quote_entity::Entity::find_by_id(quote_id)
            .one(conn)
            .await
            .map_err(ServiceError::db_error)?,
        None => None,
    };

    let (record, warning) = match quote {
        Some(quote) => {
            let (source, warning) = snapshot::ensure_quote_customer(conn, &quote).await?;
            (
                snapshot::po_customer_from_quote_customer(purchase_order.id, &source, now),
                warning,
            )
        }
        None => {
            let customer = customer_entity::Entity::find_by_id(purchase_order.customer_id)
                .one(conn)
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| {
                    ServiceError::ReferentialIntegrity(format!(
                        "customer {} of purchase order {} no longer exists",
                        purchase_order.customer_id, purchase_order.po_number
                    ))
                })?;
            (
                snapshot::po_customer_from_customer(purchase_order.id, &customer, now),
                None,
            )
        }
    };

    let saved = record.insert(conn).await.map_err(ServiceError::db_error)?;
    Ok((saved, warning))
}

/// Sets `has_po` to whether any purchase order still references the quote.
/// Returns the new value when it changed.
pub(crate) async fn sync_has_po<C: ConnectionTrait>(
    conn: &C,
    quote_id: Uuid,
) -> Result<Option<bool>, ServiceError> {
    let Some(quote) = quote_entity::Entity::find_by_id(quote_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
    else {
        return Ok(None);
    };

    let remaining = purchase_order_entity::Entity::find()
        .filter(purchase_order_entity::Column::QuoteId.eq(quote_id))
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let has_po = remaining > 0;
    if quote.has_po == has_po {
        return Ok(None);
    }

    let mut active: quote_entity::ActiveModel = quote.into();
    active.has_po = Set(has_po);
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)?;
    Ok(Some(has_po))
}
