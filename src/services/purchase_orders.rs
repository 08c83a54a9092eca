use crate::{
    commands::{
        purchase_orders::{
            CreatePurchaseOrderCommand, CreatePurchaseOrderRequest, DeletePurchaseOrderCommand,
            PurchaseOrderView, UpdatePurchaseOrderCommand, UpdatePurchaseOrderRequest,
        },
        Command, DeleteResult,
    },
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{po_customer_entity, po_product_entity, purchase_order_entity},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: DocumentSettings,
}

impl PurchaseOrderService {
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

    /// Derives a purchase order from a quote, or records one directly
    /// against a customer.
    #[instrument(skip(self, request))]
    pub async fn create_purchase_order(
        &self,
        request: CreatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderView, ServiceError> {
        CreatePurchaseOrderCommand {
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_purchase_order(
        &self,
        id: Uuid,
        request: UpdatePurchaseOrderRequest,
    ) -> Result<PurchaseOrderView, ServiceError> {
        UpdatePurchaseOrderCommand { id, request }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_purchase_order(&self, id: Uuid) -> Result<DeleteResult, ServiceError> {
        DeletePurchaseOrderCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_purchase_order(&self, id: Uuid) -> Result<PurchaseOrderView, ServiceError> {
        let db = self.db_pool.as_ref();
        let purchase_order = purchase_order_entity::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("purchase order {} not found", id)))?;
        let customer = po_customer_entity::Entity::find()
            .filter(po_customer_entity::Column::PurchaseOrderId.eq(id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let lines = po_product_entity::Entity::find()
            .filter(po_product_entity::Column::PurchaseOrderId.eq(id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(PurchaseOrderView {
            purchase_order,
            customer,
            lines,
            warnings: Vec::new(),
        })
    }
}
