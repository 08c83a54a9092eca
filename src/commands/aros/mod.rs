pub mod create_aro_command;
pub mod delete_aro_command;
pub mod update_aro_command;

pub use create_aro_command::CreateAroCommand;
pub use delete_aro_command::DeleteAroCommand;
pub use update_aro_command::UpdateAroCommand;

use crate::{
    db::supports_row_locks,
    errors::ServiceError,
    models::{
        aro_entity::{self, AroStatus},
        aro_product_entity,
        purchase_order_entity::{self, PurchaseOrderStatus},
        quote_product_entity,
    },
    services::snapshot::SnapshotWarning,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct AroLineRequest {
    /// Quote line of the purchase order's quote
    pub quote_product_id: Uuid,
    #[validate(range(min = 0, max = 1000000))]
    pub quantity_received: i32,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAroRequest {
    pub purchase_order_id: Uuid,
    pub date_aro: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    #[validate]
    pub lines: Vec<AroLineRequest>,
}

/// Absent fields keep their value; `lines` replaces every line when given
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAroRequest {
    pub date_aro: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    /// Pending or Cancelled
    pub status: Option<AroStatus>,
    #[validate(length(min = 1, message = "At least one line is required"))]
    pub lines: Option<Vec<AroLineRequest>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AroView {
    pub aro: aro_entity::Model,
    pub lines: Vec<aro_product_entity::Model>,
    /// Status of the purchase order after this change
    pub purchase_order_status: PurchaseOrderStatus,
    pub warnings: Vec<SnapshotWarning>,
}

/// Checks requested receipts against the ordered quantities and against what
/// other AROs of the same purchase order already received.
pub fn check_receipt_bounds(
    lines: &[AroLineRequest],
    ordered: &HashMap<Uuid, i32>,
    already_received: &HashMap<Uuid, i32>,
) -> Result<(), ServiceError> {
    let mut seen = HashSet::new();
    for line in lines {
        if !seen.insert(line.quote_product_id) {
            return Err(ServiceError::ValidationError(format!(
                "quote line {} appears more than once",
                line.quote_product_id
            )));
        }
        if line.quantity_received < 0 {
            return Err(ServiceError::ValidationError(format!(
                "quantity_received for quote line {} must not be negative",
                line.quote_product_id
            )));
        }

        let Some(&quantity_ordered) = ordered.get(&line.quote_product_id) else {
            return Err(ServiceError::ReferentialIntegrity(format!(
                "quote line {} is not part of this purchase order",
                line.quote_product_id
            )));
        };
        if line.quantity_received > quantity_ordered {
            return Err(ServiceError::QuantityExceeded(format!(
                "quote line {} received {} but only {} were ordered",
                line.quote_product_id, line.quantity_received, quantity_ordered
            )));
        }

        let previous = already_received
            .get(&line.quote_product_id)
            .copied()
            .unwrap_or(0);
        let cumulative = previous.saturating_add(line.quantity_received);
        if cumulative > quantity_ordered {
            return Err(ServiceError::QuantityExceeded(format!(
                "quote line {} would reach {} received across AROs but only {} were ordered",
                line.quote_product_id, cumulative, quantity_ordered
            )));
        }
    }
    Ok(())
}

/// Loads the bounds for a purchase order and validates `lines` against them.
/// `exclude_aro` leaves an ARO's own previous lines out of the cumulative sum.
pub(crate) async fn validate_receipts<C: ConnectionTrait>(
    conn: &C,
    purchase_order: &purchase_order_entity::Model,
    lines: &[AroLineRequest],
    exclude_aro: Option<Uuid>,
) -> Result<(), ServiceError> {
    let Some(quote_id) = purchase_order.quote_id else {
        return Err(ServiceError::ReferentialIntegrity(format!(
            "purchase order {} has no quote lines to receive against",
            purchase_order.po_number
        )));
    };

    let ordered: HashMap<Uuid, i32> = quote_product_entity::Entity::find()
        .filter(quote_product_entity::Column::QuoteId.eq(quote_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|line| (line.id, line.quantity))
        .collect();

    let mut sibling_query = aro_entity::Entity::find()
        .filter(aro_entity::Column::PurchaseOrderId.eq(purchase_order.id))
        .filter(aro_entity::Column::Status.ne(AroStatus::Cancelled));
    if let Some(excluded) = exclude_aro {
        sibling_query = sibling_query.filter(aro_entity::Column::Id.ne(excluded));
    }
    let siblings: Vec<Uuid> = sibling_query
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|aro| aro.id)
        .collect();

    let mut already_received: HashMap<Uuid, i32> = HashMap::new();
    if !siblings.is_empty() {
        let previous = aro_product_entity::Entity::find()
            .filter(aro_product_entity::Column::AroId.is_in(siblings))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?;
        for line in previous {
            let received = already_received.entry(line.quote_product_id).or_default();
            *received = received.saturating_add(line.quantity_received);
        }
    }

    check_receipt_bounds(lines, &ordered, &already_received)
}

pub(crate) async fn write_aro_lines<C: ConnectionTrait>(
    conn: &C,
    aro_id: Uuid,
    lines: &[AroLineRequest],
    now: DateTime<Utc>,
) -> Result<Vec<aro_product_entity::Model>, ServiceError> {
    let mut saved = Vec::with_capacity(lines.len());
    for line in lines {
        let row = aro_product_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            aro_id: Set(aro_id),
            quote_product_id: Set(line.quote_product_id),
            quantity_received: Set(line.quantity_received),
            remarks: Set(line.remarks.clone()),
            created_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;
        saved.push(row);
    }
    Ok(saved)
}

/// Loads the purchase order and, where the database supports it, locks its
/// row so receipts against one order are bounded one transaction at a time.
pub(crate) async fn load_purchase_order<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<purchase_order_entity::Model, ServiceError> {
    let mut query = purchase_order_entity::Entity::find_by_id(id);
    if supports_row_locks(conn) {
        query = query.lock_exclusive();
    }
    query
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::ReferentialIntegrity(format!("purchase order {} does not exist", id))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn line(quote_product_id: Uuid, quantity_received: i32) -> AroLineRequest {
        AroLineRequest {
            quote_product_id,
            quantity_received,
            remarks: None,
        }
    }

    #[test]
    fn zero_and_full_receipts_are_accepted() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ordered = HashMap::from([(a, 3), (b, 1)]);
        assert!(check_receipt_bounds(&[line(a, 0), line(b, 1)], &ordered, &HashMap::new()).is_ok());
    }

    #[test]
    fn cumulative_sum_near_i32_max_is_rejected_without_overflow() {
        let a = Uuid::new_v4();
        let ordered = HashMap::from([(a, 10)]);
        let received = HashMap::from([(a, i32::MAX)]);
        assert_matches!(
            check_receipt_bounds(&[line(a, 5)], &ordered, &received),
            Err(ServiceError::QuantityExceeded(_))
        );
    }

    #[test]
    fn receipt_above_ordered_is_rejected() {
        let a = Uuid::new_v4();
        let ordered = HashMap::from([(a, 3)]);
        assert_matches!(
            check_receipt_bounds(&[line(a, 4)], &ordered, &HashMap::new()),
            Err(ServiceError::QuantityExceeded(_))
        );
    }

    #[test]
    fn cumulative_receipts_are_bounded() {
        let a = Uuid::new_v4();
        let ordered = HashMap::from([(a, 3)]);
        let previous = HashMap::from([(a, 2)]);
        assert!(check_receipt_bounds(&[line(a, 1)], &ordered, &previous).is_ok());
        assert_matches!(
            check_receipt_bounds(&[line(a, 2)], &ordered, &previous),
            Err(ServiceError::QuantityExceeded(_))
        );
    }

    #[test]
    fn foreign_quote_line_is_rejected() {
        let ordered = HashMap::from([(Uuid::new_v4(), 3)]);
        assert_matches!(
            check_receipt_bounds(&[line(Uuid::new_v4(), 1)], &ordered, &HashMap::new()),
            Err(ServiceError::ReferentialIntegrity(_))
        );
    }

    #[test]
    fn repeated_quote_line_is_rejected() {
        let a = Uuid::new_v4();
        let ordered = HashMap::from([(a, 3)]);
        assert_matches!(
            check_receipt_bounds(&[line(a, 1), line(a, 1)], &ordered, &HashMap::new()),
            Err(ServiceError::ValidationError(_))
        );
    }
}
