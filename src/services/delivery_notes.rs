use crate::{
    commands::{
        delivery_notes::{
            load_dnp_lines, CreateDeliveryNoteCommand, CreateDeliveryNoteRequest,
            DeleteDeliveryNoteCommand, DeliveryNoteView, UpdateDeliveryNoteCommand,
            UpdateDeliveryNoteRequest,
        },
        Command, DeleteResult,
    },
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{aro_entity, delivery_note_entity},
};
use sea_orm::EntityTrait;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct DeliveryNoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: DocumentSettings,
}

impl DeliveryNoteService {
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

    /// Ships what an ARO received. Lines whose ARO or PO snapshot is gone
    /// are skipped and reported in `warnings`.
    #[instrument(skip(self, request), fields(aro_id = %request.aro_id))]
    pub async fn create_delivery_note(
        &self,
        request: CreateDeliveryNoteRequest,
    ) -> Result<DeliveryNoteView, ServiceError> {
        CreateDeliveryNoteCommand {
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_delivery_note(
        &self,
        id: Uuid,
        request: UpdateDeliveryNoteRequest,
    ) -> Result<DeliveryNoteView, ServiceError> {
        UpdateDeliveryNoteCommand { id, request }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn delete_delivery_note(&self, id: Uuid) -> Result<DeleteResult, ServiceError> {
        DeleteDeliveryNoteCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_delivery_note(&self, id: Uuid) -> Result<DeliveryNoteView, ServiceError> {
        let db = self.db_pool.as_ref();
        let delivery_note = delivery_note_entity::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("delivery note {} not found", id)))?;
        let lines = load_dnp_lines(db, id).await?;
        let aro = aro_entity::Entity::find_by_id(delivery_note.aro_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::DataIntegrity(format!(
                    "delivery note {} points at missing ARO {}",
                    delivery_note.dnp_number, delivery_note.aro_id
                ))
            })?;

        Ok(DeliveryNoteView {
            delivery_note,
            lines,
            aro_status: aro.status,
            warnings: Vec::new(),
        })
    }
}
