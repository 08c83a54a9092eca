use crate::{
    commands::{begin, finish, track_failure, Command, DeleteResult},
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        invoice_entity, purchase_order_entity, quote_customer_entity, quote_entity,
        quote_product_entity, DocumentKind,
    },
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;

const KIND: DocumentKind = DocumentKind::Quote;

#[derive(Debug, Clone)]
pub struct DeleteQuoteCommand {
    pub id: Uuid,
}

#[async_trait]
impl Command for DeleteQuoteCommand {
    type Result = DeleteResult;

    #[instrument(skip(self, db_pool, event_sender), fields(quote_id = %self.id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let txn = begin(db_pool.as_ref()).await?;
        let outcome = self.delete_quote(&txn).await;
        finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!("Quote deleted");
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

impl DeleteQuoteCommand {
    async fn delete_quote(&self, txn: &DatabaseTransaction) -> Result<(), ServiceError> {
        let quote = quote_entity::Entity::find_by_id(self.id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("quote {} not found", self.id)))?;

        let purchase_orders = purchase_order_entity::Entity::find()
            .filter(purchase_order_entity::Column::QuoteId.eq(quote.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if purchase_orders > 0 {
            return Err(ServiceError::StateConflict(format!(
                "quote {} has {} purchase order(s)",
                quote.quote_number, purchase_orders
            )));
        }

        let invoices = invoice_entity::Entity::find()
            .filter(invoice_entity::Column::QuoteId.eq(quote.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if invoices > 0 {
            return Err(ServiceError::StateConflict(format!(
                "quote {} has {} invoice(s)",
                quote.quote_number, invoices
            )));
        }

        quote_product_entity::Entity::delete_many()
            .filter(quote_product_entity::Column::QuoteId.eq(quote.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        quote_customer_entity::Entity::delete_many()
            .filter(quote_customer_entity::Column::QuoteId.eq(quote.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;
        quote_entity::Entity::delete_by_id(quote.id)
            .exec(txn)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete quote");
                ServiceError::db_error(e)
            })?;
        Ok(())
    }
}
