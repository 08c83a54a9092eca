use crate::{
    commands::{
        aros::{
            AroView, CreateAroCommand, CreateAroRequest, DeleteAroCommand, UpdateAroCommand,
            UpdateAroRequest,
        },
        Command, DeleteResult,
    },
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{aro_entity, aro_product_entity, purchase_order_entity},
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Goods receipts against purchase orders. Every write recomputes the
/// purchase order's delivery status.
#[derive(Clone)]
pub struct AroService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: DocumentSettings,
}

impl AroService {
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

    #[instrument(skip(self, request), fields(purchase_order_id = %request.purchase_order_id))]
    pub async fn create_aro(&self, request: CreateAroRequest) -> Result<AroView, ServiceError> {
        CreateAroCommand {
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_aro(
        &self,
        id: Uuid,
        request: UpdateAroRequest,
    ) -> Result<AroView, ServiceError> {
        UpdateAroCommand { id, request }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_aro(&self, id: Uuid) -> Result<DeleteResult, ServiceError> {
        DeleteAroCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_aro(&self, id: Uuid) -> Result<AroView, ServiceError> {
        let db = self.db_pool.as_ref();
        let aro = aro_entity::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("ARO {} not found", id)))?;
        let lines = aro_product_entity::Entity::find()
            .filter(aro_product_entity::Column::AroId.eq(id))
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;
        let purchase_order = purchase_order_entity::Entity::find_by_id(aro.purchase_order_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::DataIntegrity(format!(
                    "ARO {} points at missing purchase order {}",
                    aro.aro_number, aro.purchase_order_id
                ))
            })?;

        Ok(AroView {
            aro,
            lines,
            purchase_order_status: purchase_order.status,
            warnings: Vec::new(),
        })
    }
}
