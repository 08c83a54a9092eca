use crate::{
    commands::{begin, finish, track_failure, Command, DeleteResult},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        aro_entity, aro_product_entity, delivery_note_entity,
        purchase_order_entity::PurchaseOrderStatus, DocumentKind,
    },
    services::status_propagation::{recompute_purchase_order_status, StatusChange},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const KIND: DocumentKind = DocumentKind::Aro;

#[derive(Debug, Clone)]
pub struct DeleteAroCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteAroCommand {
    type Result = DeleteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(aro_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.delete_aro(&txn).await;
        let status_change = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!("ARO deleted");
        let mut events = vec![Event::DocumentDeleted {
            kind: KIND,
            id: self.id,
        }];
        events.extend(status_change.map(|change| change.into_event()));
        event_sender.publish_all(events).await;

        Ok(DeleteResult {
            id: self.id,
            deleted: true,
        })
    }
}

impl DeleteAroCommand {
    async fn delete_aro(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<Option<StatusChange<PurchaseOrderStatus>>, ServiceError> {
        let aro = aro_entity::Entity::find_by_id(self.id)
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
                "ARO {} has {} delivery note(s)",
                aro.aro_number, delivery_notes
            )));
        }

        aro_product_entity::Entity::delete_many()
            .filter(aro_product_entity::Column::AroId.eq(aro.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        aro_entity::Entity::delete_by_id(aro.id)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        // Propagation never lowers a status, so this only matters when the
        // purchase order was still waiting on other receipts.
        recompute_purchase_order_status(txn, aro.purchase_order_id).await
    }
}
