use super::sync_has_po;
use crate::{
    commands::{begin, finish, track_failure, Command, DeleteResult},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{aro_entity, po_customer_entity, po_product_entity, purchase_order_entity, DocumentKind},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const KIND: DocumentKind = DocumentKind::PurchaseOrder;

#[derive(Debug, Clone)]
pub struct DeletePurchaseOrderCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeletePurchaseOrderCommand {
    type Result = DeleteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(purchase_order_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.delete_purchase_order(&txn).await;
        let has_po_changed = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!("Purchase order deleted");
        let mut events = vec![Event::DocumentDeleted {
            kind: KIND,
            id: self.id,
        }];
        if let Some((quote_id, has_po)) = has_po_changed {
            events.push(Event::QuoteHasPoChanged { quote_id, has_po });
        }
        event_sender.publish_all(events).await;

        Ok(DeleteResult {
            id: self.id,
            deleted: true,
        })
    }
}

impl DeletePurchaseOrderCommand {
    async fn delete_purchase_order(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<Option<(Uuid, bool)>, ServiceError> {
        let purchase_order = purchase_order_entity::Entity::find_by_id(self.id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("purchase order {} not found", self.id))
            })?;

        let aros = aro_entity::Entity::find()
            .filter(aro_entity::Column::PurchaseOrderId.eq(self.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if aros > 0 {
            return Err(ServiceError::StateConflict(format!(
                "purchase order {} has {} ARO(s)",
                purchase_order.po_number, aros
            )));
        }

        po_product_entity::Entity::delete_many()
            .filter(po_product_entity::Column::PurchaseOrderId.eq(self.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        po_customer_entity::Entity::delete_many()
            .filter(po_customer_entity::Column::PurchaseOrderId.eq(self.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        purchase_order_entity::Entity::delete_by_id(self.id)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        match purchase_order.quote_id {
            Some(quote_id) => Ok(sync_has_po(txn, quote_id)
                .await?
                .map(|has_po| (quote_id, has_po))),
            None => Ok(None),
        }
    }
}
