use super::{ensure_po_customer, PurchaseOrderView, UpdatePurchaseOrderRequest};
use crate::{
    commands::{begin, finish, snapshot_gap_events, track_failure, Command},
    db::{supports_row_locks, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        po_product_entity,
        purchase_order_entity::{self, PurchaseOrderStatus},
        DocumentKind,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::PurchaseOrder;

#[derive(Debug, Clone)]
pub struct UpdatePurchaseOrderCommand {
    pub id: Uuid,
    pub request: UpdatePurchaseOrderRequest,
}

struct Updated {
    view: PurchaseOrderView,
    status_change: Option<(PurchaseOrderStatus, PurchaseOrderStatus)>,
}

/// Checks a status the user asked for. Delivery progress is never set by hand
/// and a cancelled order stays cancelled.
pub fn check_status_change(
    current: PurchaseOrderStatus,
    requested: PurchaseOrderStatus,
) -> Result<(), ServiceError> {
    if !requested.is_user_settable() {
        return Err(ServiceError::ValidationError(format!(
            "status '{}' is derived from receipts and cannot be set directly",
            requested
        )));
    }
    if current == PurchaseOrderStatus::Cancelled && requested != current {
        return Err(ServiceError::StateConflict(
            "a cancelled purchase order cannot change status".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Command for UpdatePurchaseOrderCommand {
    type Result = PurchaseOrderView;

    #[instrument(skip(self, db_pool, event_sender), fields(purchase_order_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;

        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.write(&txn).await;
        let updated = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!(po_number = %updated.view.purchase_order.po_number, "Purchase order updated");

        let mut events = vec![Event::DocumentUpdated {
            kind: KIND,
            id: self.id,
        }];
        if let Some((old, new)) = updated.status_change {
            events.push(Event::PurchaseOrderStatusChanged {
                purchase_order_id: self.id,
                old_status: old.to_string(),
                new_status: new.to_string(),
            });
        }
        events.extend(snapshot_gap_events(KIND, self.id, &updated.view.warnings));
        event_sender.publish_all(events).await;

        Ok(updated.view)
    }
}

impl UpdatePurchaseOrderCommand {
    async fn write(&self, txn: &DatabaseTransaction) -> Result<Updated, ServiceError> {
        let mut query = purchase_order_entity::Entity::find_by_id(self.id);
        if supports_row_locks(txn) {
            query = query.lock_exclusive();
        }
        let purchase_order = query
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("purchase order {} not found", self.id))
            })?;

        let request = &self.request;
        let current = purchase_order.status;
        let status_change = match request.status {
            Some(requested) => {
                check_status_change(current, requested)?;
                (requested != current).then_some((current, requested))
            }
            None => None,
        };

        let (customer, warning) = ensure_po_customer(txn, &purchase_order).await?;

        let mut active: purchase_order_entity::ActiveModel = purchase_order.into();
        if let Some((_, new)) = status_change {
            active.status = Set(new);
        }
        if request.planned_delivery_date.is_some() {
            active.planned_delivery_date = Set(request.planned_delivery_date);
        }
        if request.actual_delivery_date.is_some() {
            active.actual_delivery_date = Set(request.actual_delivery_date);
        }
        if request.remarks.is_some() {
            active.remarks = Set(request.remarks.clone());
        }
        if request.pdf_path.is_some() {
            active.pdf_path = Set(request.pdf_path.clone());
        }
        active.updated_at = Set(Utc::now());
        let purchase_order = active.update(txn).await.map_err(ServiceError::db_error)?;

        let lines = po_product_entity::Entity::find()
            .filter(po_product_entity::Column::PurchaseOrderId.eq(self.id))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(Updated {
            view: PurchaseOrderView {
                purchase_order,
                customer: Some(customer),
                lines,
                warnings: warning.into_iter().collect(),
            },
            status_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case(PurchaseOrderStatus::Pending, PurchaseOrderStatus::Approved)]
    #[test_case(PurchaseOrderStatus::Delivered, PurchaseOrderStatus::Pending)]
    #[test_case(PurchaseOrderStatus::PartiallyDelivered, PurchaseOrderStatus::Cancelled)]
    fn user_settable_changes_pass(current: PurchaseOrderStatus, requested: PurchaseOrderStatus) {
        assert!(check_status_change(current, requested).is_ok());
    }

    #[test_case(PurchaseOrderStatus::Delivered)]
    #[test_case(PurchaseOrderStatus::PartiallyDelivered)]
    fn derived_statuses_are_rejected(requested: PurchaseOrderStatus) {
        assert_matches!(
            check_status_change(PurchaseOrderStatus::Pending, requested),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn cancelled_is_terminal() {
        assert_matches!(
            check_status_change(PurchaseOrderStatus::Cancelled, PurchaseOrderStatus::Pending),
            Err(ServiceError::StateConflict(_))
        );
        assert!(check_status_change(
            PurchaseOrderStatus::Cancelled,
            PurchaseOrderStatus::Cancelled
        )
        .is_ok());
    }
}
