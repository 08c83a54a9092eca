use super::{
    load_dnp_lines, load_shippable_aro, lock_aro, shipped_on_other_notes, write_dnp_lines,
    DeliveryNoteView, UpdateDeliveryNoteRequest,
};
use crate::{
    commands::{begin, finish, snapshot_gap_events, track_failure, Command},
    db::{supports_row_locks, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        aro_entity::AroStatus,
        aro_product_entity,
        delivery_note_entity::{self, DeliveryNoteStatus},
        dnp_product_entity, invoice_entity,
        purchase_order_entity, DocumentKind,
    },
    services::{
        calculator::line_total,
        status_propagation::{recompute_aro_status, StatusChange},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::DeliveryNote;

#[derive(Debug, Clone)]
pub struct UpdateDeliveryNoteCommand {
    pub id: Uuid,
    pub request: UpdateDeliveryNoteRequest,
}

/// Cancelled and returned notes are closed; their status never changes again.
pub fn check_status_change(
    current: DeliveryNoteStatus,
    requested: DeliveryNoteStatus,
) -> Result<(), ServiceError> {
    if current.is_terminal() && requested != current {
        return Err(ServiceError::StateConflict(format!(
            "a {} delivery note cannot become {}",
            current.to_string().to_lowercase(),
            requested
        )));
    }
    Ok(())
}

#[async_trait]
impl Command for UpdateDeliveryNoteCommand {
    type Result = DeliveryNoteView;

    #[instrument(skip(self, db_pool, event_sender), fields(delivery_note_id = %self.id))]
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
        let (view, aro_change) = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!(
            dnp_number = %view.delivery_note.dnp_number,
            status = %view.delivery_note.status,
            aro_status = %view.aro_status,
            "Delivery note updated"
        );

        let mut events = vec![Event::DocumentUpdated {
            kind: KIND,
            id: self.id,
        }];
        events.extend(snapshot_gap_events(KIND, self.id, &view.warnings));
        events.extend(aro_change.map(|change| change.into_event()));
        event_sender.publish_all(events).await;

        Ok(view)
    }
}

impl UpdateDeliveryNoteCommand {
    async fn write(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<(DeliveryNoteView, Option<StatusChange<AroStatus>>), ServiceError> {
        let mut query = delivery_note_entity::Entity::find_by_id(self.id);
        if supports_row_locks(txn) {
            query = query.lock_exclusive();
        }
        let delivery_note = query
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("delivery note {} not found", self.id))
            })?;

        let request = &self.request;
        if let Some(status) = request.status {
            check_status_change(delivery_note.status, status)?;
        }
        let now = Utc::now();
        let moved_to = request.aro_id.filter(|aro_id| *aro_id != delivery_note.aro_id);

        let mut active: delivery_note_entity::ActiveModel = delivery_note.clone().into();
        let (aro, lines, warnings) = match moved_to {
            Some(aro_id) => {
                if !request.lines.is_empty() {
                    return Err(ServiceError::ValidationError(
                        "line edits cannot be combined with a change of ARO".into(),
                    ));
                }
                self.ensure_not_invoiced(txn, &delivery_note).await?;

                let aro = load_shippable_aro(txn, aro_id).await?;
                let quote_id = purchase_order_entity::Entity::find_by_id(aro.purchase_order_id)
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .and_then(|po| po.quote_id);
                dnp_product_entity::Entity::delete_many()
                    .filter(dnp_product_entity::Column::DeliveryNoteId.eq(delivery_note.id))
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                let (lines, warnings) =
                    write_dnp_lines(txn, delivery_note.id, &aro, &[], now).await?;

                active.aro_id = Set(aro.id);
                active.purchase_order_id = Set(aro.purchase_order_id);
                active.quote_id = Set(quote_id);
                (aro, lines, warnings)
            }
            None => {
                let aro = lock_aro(txn, delivery_note.aro_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::DataIntegrity(format!(
                            "ARO {} of delivery note {} is missing",
                            delivery_note.aro_id, delivery_note.dnp_number
                        ))
                    })?;
                let lines = self.edit_lines(txn, &delivery_note).await?;
                (aro, lines, Vec::new())
            }
        };

        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(date) = request.date_delivery {
            active.date_delivery = Set(date);
        }
        if let Some(date) = request.planned_delivery_date {
            active.planned_delivery_date = Set(date);
        }
        if request.actual_delivery_date.is_some() {
            active.actual_delivery_date = Set(request.actual_delivery_date);
        }
        if let Some(address) = &request.delivery_address {
            active.delivery_address = Set(address.clone());
        }
        if request.incoterms.is_some() {
            active.incoterms = Set(request.incoterms.clone());
        }
        if request.packaging_details.is_some() {
            active.packaging_details = Set(request.packaging_details.clone());
        }
        if request.remarks.is_some() {
            active.remarks = Set(request.remarks.clone());
        }
        active.updated_at = Set(now);
        let delivery_note = active.update(txn).await.map_err(ServiceError::db_error)?;

        let aro_change = recompute_aro_status(txn, aro.id).await?;
        let aro_status = aro_change.map(|change| change.to).unwrap_or(aro.status);

        Ok((
            DeliveryNoteView {
                delivery_note,
                lines,
                aro_status,
                warnings,
            },
            aro_change,
        ))
    }

    async fn ensure_not_invoiced(
        &self,
        txn: &DatabaseTransaction,
        delivery_note: &delivery_note_entity::Model,
    ) -> Result<(), ServiceError> {
        let invoices = invoice_entity::Entity::find()
            .filter(invoice_entity::Column::DeliveryNoteId.eq(delivery_note.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if invoices > 0 {
            return Err(ServiceError::StateConflict(format!(
                "delivery note {} is invoiced; its lines cannot be rebuilt",
                delivery_note.dnp_number
            )));
        }
        Ok(())
    }

    /// Applies per-line edits. Every edited line must belong to this note and
    /// cannot ship more than its ARO line received less what the ARO's other
    /// open notes ship.
    async fn edit_lines(
        &self,
        txn: &DatabaseTransaction,
        delivery_note: &delivery_note_entity::Model,
    ) -> Result<Vec<dnp_product_entity::Model>, ServiceError> {
        let delivery_note_id = delivery_note.id;
        let lines = load_dnp_lines(txn, delivery_note_id).await?;
        if self.request.lines.is_empty() {
            return Ok(lines);
        }

        let received: HashMap<Uuid, i32> = aro_product_entity::Entity::find()
            .filter(
                aro_product_entity::Column::Id.is_in(lines.iter().map(|l| l.aro_product_id)),
            )
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|line| (line.id, line.quantity_received))
            .collect();
        let shipped_elsewhere =
            shipped_on_other_notes(txn, delivery_note.aro_id, delivery_note_id).await?;

        for edit in &self.request.lines {
            let Some(line) = lines.iter().find(|l| l.id == edit.id) else {
                return Err(ServiceError::ReferentialIntegrity(format!(
                    "line {} does not belong to this delivery note",
                    edit.id
                )));
            };

            let mut active: dnp_product_entity::ActiveModel = line.clone().into();
            if let Some(shipped) = edit.quantity_shipped {
                let received = received.get(&line.aro_product_id).copied().unwrap_or(0);
                let elsewhere = shipped_elsewhere
                    .get(&line.aro_product_id)
                    .copied()
                    .unwrap_or(0);
                let limit = received.saturating_sub(elsewhere).max(0);
                if shipped > limit {
                    return Err(ServiceError::QuantityExceeded(format!(
                        "line {} ships {} but only {} of {} received remain",
                        line.product_code, shipped, limit, received
                    )));
                }
                active.quantity_shipped = Set(shipped);
                active.total_line_price = Set(line_total(shipped, line.unit_price));
            }
            if edit.serial_numbers.is_some() {
                active.serial_numbers = Set(edit.serial_numbers.clone());
            }
            if edit.tracking_code.is_some() {
                active.tracking_code = Set(edit.tracking_code.clone());
            }
            active.update(txn).await.map_err(ServiceError::db_error)?;
        }

        load_dnp_lines(txn, delivery_note_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case(DeliveryNoteStatus::Pending, DeliveryNoteStatus::Delivered)]
    #[test_case(DeliveryNoteStatus::Delivered, DeliveryNoteStatus::Returned)]
    #[test_case(DeliveryNoteStatus::PartiallyDelivered, DeliveryNoteStatus::Cancelled)]
    #[test_case(DeliveryNoteStatus::Cancelled, DeliveryNoteStatus::Cancelled)]
    fn open_notes_move_freely(current: DeliveryNoteStatus, requested: DeliveryNoteStatus) {
        assert!(check_status_change(current, requested).is_ok());
    }

    #[test_case(DeliveryNoteStatus::Cancelled, DeliveryNoteStatus::Delivered)]
    #[test_case(DeliveryNoteStatus::Cancelled, DeliveryNoteStatus::Pending)]
    #[test_case(DeliveryNoteStatus::Returned, DeliveryNoteStatus::Delivered)]
    #[test_case(DeliveryNoteStatus::Returned, DeliveryNoteStatus::Cancelled)]
    fn closed_notes_stay_closed(current: DeliveryNoteStatus, requested: DeliveryNoteStatus) {
        assert_matches!(
            check_status_change(current, requested),
            Err(ServiceError::StateConflict(_))
        );
    }
}
