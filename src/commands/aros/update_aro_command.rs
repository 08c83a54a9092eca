use super::{
    load_purchase_order, validate_receipts, write_aro_lines, AroView, UpdateAroRequest,
};
use crate::{
    commands::{begin, finish, track_failure, Command},
    db::{supports_row_locks, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        aro_entity::{self, AroStatus},
        aro_product_entity, delivery_note_entity,
        purchase_order_entity::PurchaseOrderStatus,
        DocumentKind,
    },
    services::status_propagation::{recompute_purchase_order_status, StatusChange},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::Aro;

#[derive(Debug, Clone)]
pub struct UpdateAroCommand {
    pub id: Uuid,
    pub request: UpdateAroRequest,
}

struct Updated {
    view: AroView,
    aro_status_change: Option<(AroStatus, AroStatus)>,
    purchase_order_change: Option<StatusChange<PurchaseOrderStatus>>,
}

/// A cancelled ARO stays cancelled; its receipts were released.
pub fn check_status_change(current: AroStatus, requested: AroStatus) -> Result<(), ServiceError> {
    if current == AroStatus::Cancelled && requested != current {
        return Err(ServiceError::StateConflict(
            "a cancelled ARO cannot change status".into(),
        ));
    }
    Ok(())
}

#[async_trait]
impl Command for UpdateAroCommand {
    type Result = AroView;

    #[instrument(skip(self, db_pool, event_sender), fields(aro_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate_request()
            .map_err(|e| track_failure(KIND, e))?;

        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.write(&txn).await;
        let updated = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!(
            aro_number = %updated.view.aro.aro_number,
            lines = updated.view.lines.len(),
            "ARO updated"
        );

        let mut events = vec![Event::DocumentUpdated {
            kind: KIND,
            id: self.id,
        }];
        if let Some((old, new)) = updated.aro_status_change {
            events.push(Event::AroStatusChanged {
                aro_id: self.id,
                old_status: old.to_string(),
                new_status: new.to_string(),
            });
        }
        events.extend(
            updated
                .purchase_order_change
                .map(|change| change.into_event()),
        );
        event_sender.publish_all(events).await;

        Ok(updated.view)
    }
}

impl UpdateAroCommand {
    fn validate_request(&self) -> Result<(), ServiceError> {
        self.request.validate()?;
        for line in self.request.lines.iter().flatten() {
            line.validate()?;
        }
        if let Some(status) = self.request.status {
            if !status.is_user_settable() {
                return Err(ServiceError::ValidationError(format!(
                    "status '{}' is derived from deliveries and cannot be set directly",
                    status
                )));
            }
        }
        Ok(())
    }

    async fn write(&self, txn: &DatabaseTransaction) -> Result<Updated, ServiceError> {
        let mut query = aro_entity::Entity::find_by_id(self.id);
        if supports_row_locks(txn) {
            query = query.lock_exclusive();
        }
        let aro = query
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("ARO {} not found", self.id)))?;

        let delivery_notes = delivery_note_entity::Entity::find()
            .filter(delivery_note_entity::Column::AroId.eq(aro.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if delivery_notes > 0 {
            return Err(ServiceError::StateConflict(format!(
                "ARO {} already has {} delivery note(s)",
                aro.aro_number, delivery_notes
            )));
        }

        let request = &self.request;
        let now = Utc::now();
        let current = aro.status;
        let aro_status_change = match request.status {
            Some(requested) => {
                check_status_change(current, requested)?;
                (requested != current).then_some((current, requested))
            }
            None => None,
        };
        let purchase_order = load_purchase_order(txn, aro.purchase_order_id).await?;

        let lines = match &request.lines {
            Some(replacement) => {
                let resulting = aro_status_change.map_or(current, |(_, new)| new);
                if resulting != AroStatus::Cancelled {
                    validate_receipts(txn, &purchase_order, replacement, Some(aro.id)).await?;
                }
                aro_product_entity::Entity::delete_many()
                    .filter(aro_product_entity::Column::AroId.eq(aro.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                write_aro_lines(txn, aro.id, replacement, now).await?
            }
            None => aro_product_entity::Entity::find()
                .filter(aro_product_entity::Column::AroId.eq(aro.id))
                .all(txn)
                .await
                .map_err(ServiceError::db_error)?,
        };

        let mut active: aro_entity::ActiveModel = aro.into();
        if let Some((_, new)) = aro_status_change {
            active.status = Set(new);
        }
        if let Some(date_aro) = request.date_aro {
            active.date_aro = Set(date_aro);
        }
        if request.remarks.is_some() {
            active.remarks = Set(request.remarks.clone());
        }
        active.updated_at = Set(now);
        let aro = active.update(txn).await.map_err(ServiceError::db_error)?;

        let purchase_order_change = recompute_purchase_order_status(txn, purchase_order.id).await?;
        let purchase_order_status = purchase_order_change
            .map(|change| change.to)
            .unwrap_or(purchase_order.status);

        Ok(Updated {
            view: AroView {
                aro,
                lines,
                purchase_order_status,
                warnings: Vec::new(),
            },
            aro_status_change,
            purchase_order_change,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case(AroStatus::Pending, AroStatus::Cancelled)]
    #[test_case(AroStatus::PartiallyDelivered, AroStatus::Cancelled)]
    #[test_case(AroStatus::Cancelled, AroStatus::Cancelled)]
    fn allowed_changes(current: AroStatus, requested: AroStatus) {
        assert!(check_status_change(current, requested).is_ok());
    }

    #[test]
    fn cancelled_aro_is_not_reopened() {
        assert_matches!(
            check_status_change(AroStatus::Cancelled, AroStatus::Pending),
            Err(ServiceError::StateConflict(_))
        );
    }
}
