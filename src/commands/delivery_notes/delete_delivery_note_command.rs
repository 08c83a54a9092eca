use super::is_deletable;
use crate::{
    commands::{begin, finish, track_failure, Command, DeleteResult},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        aro_entity::AroStatus, delivery_note_entity, dnp_product_entity, invoice_entity,
        DocumentKind,
    },
    services::status_propagation::{recompute_aro_status, StatusChange},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const KIND: DocumentKind = DocumentKind::DeliveryNote;

#[derive(Debug, Clone)]
pub struct DeleteDeliveryNoteCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteDeliveryNoteCommand {
    type Result = DeleteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(delivery_note_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.delete_delivery_note(&txn).await;
        let aro_change = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!("Delivery note deleted");
        let mut events = vec![Event::DocumentDeleted {
            kind: KIND,
            id: self.id,
        }];
        events.extend(aro_change.map(|change| change.into_event()));
        event_sender.publish_all(events).await;

        Ok(DeleteResult {
            id: self.id,
            deleted: true,
        })
    }
}

impl DeleteDeliveryNoteCommand {
    async fn delete_delivery_note(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<Option<StatusChange<AroStatus>>, ServiceError> {
        let delivery_note = delivery_note_entity::Entity::find_by_id(self.id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("delivery note {} not found", self.id))
            })?;

        if !is_deletable(delivery_note.status) {
            return Err(ServiceError::StateConflict(format!(
                "delivery note {} is {} and cannot be deleted",
                delivery_note.dnp_number, delivery_note.status
            )));
        }

        let invoices = invoice_entity::Entity::find()
            .filter(invoice_entity::Column::DeliveryNoteId.eq(delivery_note.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if invoices > 0 {
            return Err(ServiceError::StateConflict(format!(
                "delivery note {} is referenced by {} invoice(s)",
                delivery_note.dnp_number, invoices
            )));
        }

        dnp_product_entity::Entity::delete_many()
            .filter(dnp_product_entity::Column::DeliveryNoteId.eq(delivery_note.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        delivery_note_entity::Entity::delete_by_id(delivery_note.id)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        recompute_aro_status(txn, delivery_note.aro_id).await
    }
}
