use super::{load_shippable_aro, write_dnp_lines, CreateDeliveryNoteRequest, DeliveryNoteView};
use crate::{
    commands::{begin, finish, snapshot_gap_events, today, track_failure, Command},
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        aro_entity::AroStatus,
        delivery_note_entity::{self, DeliveryNoteStatus},
        purchase_order_entity, DocumentKind,
    },
    services::{
        numbering::{current_year, map_insert_error, next_number, with_number_retry},
        status_propagation::{recompute_aro_status, StatusChange},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::DeliveryNote;

#[derive(Debug, Clone)]
pub struct CreateDeliveryNoteCommand {
    pub request: CreateDeliveryNoteRequest,
    pub settings: DocumentSettings,
}

#[async_trait]
impl Command for CreateDeliveryNoteCommand {
    type Result = DeliveryNoteView;

    #[instrument(skip(self, db_pool, event_sender), fields(aro_id = %self.request.aro_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;

        let db = db_pool.as_ref();
        let (view, aro_change) =
            with_number_retry(KIND, self.settings.number_retry_limit, |attempt| {
                debug!(attempt, "Creating delivery note");
                self.create_delivery_note(db)
            })
            .await
            .map_err(|e| track_failure(KIND, e))?;

        metrics::record_document_created(KIND);
        info!(
            delivery_note_id = %view.delivery_note.id,
            dnp_number = %view.delivery_note.dnp_number,
            lines = view.lines.len(),
            skipped = view.warnings.len(),
            "Delivery note created"
        );

        let mut events = vec![Event::DocumentCreated {
            kind: KIND,
            id: view.delivery_note.id,
            number: view.delivery_note.dnp_number.clone(),
        }];
        events.extend(snapshot_gap_events(
            KIND,
            view.delivery_note.id,
            &view.warnings,
        ));
        events.extend(aro_change.map(|change| change.into_event()));
        event_sender.publish_all(events).await;

        Ok(view)
    }
}

impl CreateDeliveryNoteCommand {
    async fn create_delivery_note(
        &self,
        db: &DbPool,
    ) -> Result<(DeliveryNoteView, Option<StatusChange<AroStatus>>), ServiceError> {
        let txn = begin(db).await?;
        let outcome = self.write(&txn).await;
        finish(txn, outcome).await
    }

    async fn write(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<(DeliveryNoteView, Option<StatusChange<AroStatus>>), ServiceError> {
        let request = &self.request;
        let aro = load_shippable_aro(txn, request.aro_id).await?;
        let quote_id = purchase_order_entity::Entity::find_by_id(aro.purchase_order_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .and_then(|po| po.quote_id);

        let dnp_number = next_number(txn, &self.settings.prefix, KIND, current_year()).await?;
        let now = Utc::now();
        let delivery_note = delivery_note_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            dnp_number: Set(dnp_number),
            purchase_order_id: Set(aro.purchase_order_id),
            quote_id: Set(quote_id),
            aro_id: Set(aro.id),
            status: Set(DeliveryNoteStatus::Pending),
            date_delivery: Set(request.date_delivery.unwrap_or_else(today)),
            planned_delivery_date: Set(request.planned_delivery_date),
            actual_delivery_date: Set(request.actual_delivery_date),
            delivery_address: Set(request.delivery_address.clone()),
            incoterms: Set(request.incoterms.clone()),
            packaging_details: Set(request.packaging_details.clone()),
            remarks: Set(request.remarks.clone()),
            created_by: Set(request.created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| map_insert_error(KIND, e))?;

        let (lines, warnings) =
            write_dnp_lines(txn, delivery_note.id, &aro, &request.lines, now).await?;
        let aro_change = recompute_aro_status(txn, aro.id).await?;
        let aro_status = aro_change.map(|change| change.to).unwrap_or(aro.status);

        Ok((
            DeliveryNoteView {
                delivery_note,
                lines,
                aro_status,
                warnings,
            },
            aro_change,
        ))
    }
}
