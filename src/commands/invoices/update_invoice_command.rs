use super::{InvoiceView, UpdateInvoiceRequest};
use crate::{
    commands::{begin, finish, today, track_failure, Command},
    db::{supports_row_locks, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{invoice_entity, invoice_line_entity, DocumentKind},
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

const KIND: DocumentKind = DocumentKind::Invoice;

/// Changes payment status, due date or remarks of an invoice that is still
/// Draft or Unpaid.
#[derive(Debug, Clone)]
pub struct UpdateInvoiceCommand {
    pub id: Uuid,
    pub request: UpdateInvoiceRequest,
}

#[async_trait]
impl Command for UpdateInvoiceCommand {
    type Result = InvoiceView;

    #[instrument(skip(self, db_pool, event_sender), fields(invoice_id = %self.id))]
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
        let view = finish(txn, outcome)
            .await
            .map_err(|e| track_failure(KIND, e))?;

        info!(
            invoice_number = %view.invoice.invoice_number,
            status = %view.invoice.status,
            "Invoice updated"
        );
        event_sender
            .publish_all(vec![Event::DocumentUpdated {
                kind: KIND,
                id: self.id,
            }])
            .await;

        Ok(view)
    }
}

impl UpdateInvoiceCommand {
    async fn write(&self, txn: &DatabaseTransaction) -> Result<InvoiceView, ServiceError> {
        let mut query = invoice_entity::Entity::find_by_id(self.id);
        if supports_row_locks(txn) {
            query = query.lock_exclusive();
        }
        let invoice = query
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", self.id)))?;

        if !invoice.is_editable() {
            return Err(ServiceError::StateConflict(format!(
                "invoice {} is {} and can no longer be edited",
                invoice.invoice_number, invoice.status
            )));
        }

        let request = &self.request;
        if let Some(due_date) = request.due_date {
            if due_date < invoice.issue_date {
                return Err(ServiceError::ValidationError(format!(
                    "due_date {} is before issue_date {}",
                    due_date, invoice.issue_date
                )));
            }
        }

        let mut active: invoice_entity::ActiveModel = invoice.into();
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        if let Some(due_date) = request.due_date {
            active.due_date = Set(due_date);
        }
        if request.remarks.is_some() {
            active.remarks = Set(request.remarks.clone());
        }
        active.updated_at = Set(Utc::now());
        let invoice = active.update(txn).await.map_err(ServiceError::db_error)?;

        let lines = invoice_line_entity::Entity::find()
            .filter(invoice_line_entity::Column::InvoiceId.eq(invoice.id))
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(InvoiceView::new(invoice, lines, Vec::new(), today()))
    }
}
