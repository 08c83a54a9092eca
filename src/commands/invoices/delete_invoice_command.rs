use crate::{
    commands::{begin, finish, track_failure, Command, DeleteResult},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{invoice_entity, invoice_line_entity, DocumentKind},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

const KIND: DocumentKind = DocumentKind::Invoice;

#[derive(Debug, Clone)]
pub struct DeleteInvoiceCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteInvoiceCommand {
    type Result = DeleteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(invoice_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.delete_invoice(&txn).await;
        finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!("Invoice deleted");
        event_sender
            .publish_all(vec![Event::DocumentDeleted {
                kind: KIND,
                id: self.id,
            }])
            .await;

        Ok(DeleteResult {
            id: self.id,
            deleted: true,
        })
    }
}

impl DeleteInvoiceCommand {
    async fn delete_invoice(&self, txn: &DatabaseTransaction) -> Result<(), ServiceError> {
        let invoice = invoice_entity::Entity::find_by_id(self.id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", self.id)))?;

        if !invoice.is_deletable() {
            return Err(ServiceError::StateConflict(format!(
                "invoice {} is {}; only Draft or Cancelled invoices can be deleted",
                invoice.invoice_number, invoice.status
            )));
        }

        invoice_line_entity::Entity::delete_many()
            .filter(invoice_line_entity::Column::InvoiceId.eq(invoice.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        invoice_entity::Entity::delete_by_id(invoice.id)
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(())
    }
}
