use crate::{
    commands::{
        invoices::{
            CreateInvoiceCommand, CreateInvoiceRequest, DeleteInvoiceCommand, InvoiceView,
            UpdateInvoiceCommand, UpdateInvoiceRequest,
        },
        today, Command, DeleteResult,
    },
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{invoice_entity, invoice_line_entity},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: DocumentSettings,
}

impl InvoiceService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: DocumentSettings,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            settings,
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create_invoice(
        &self,
        request: CreateInvoiceRequest,
    ) -> Result<InvoiceView, ServiceError> {
        CreateInvoiceCommand {
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_invoice(
        &self,
        id: Uuid,
        request: UpdateInvoiceRequest,
    ) -> Result<InvoiceView, ServiceError> {
        UpdateInvoiceCommand { id, request }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_invoice(&self, id: Uuid) -> Result<DeleteResult, ServiceError> {
        DeleteInvoiceCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(&self, id: Uuid) -> Result<InvoiceView, ServiceError> {
        let db = self.db_pool.as_ref();
        let invoice = invoice_entity::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("invoice {} not found", id)))?;
        let lines = invoice_line_entity::Entity::find()
            .filter(invoice_line_entity::Column::InvoiceId.eq(id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(InvoiceView::new(invoice, lines, Vec::new(), today()))
    }
}
