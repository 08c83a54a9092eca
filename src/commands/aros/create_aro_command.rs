use super::{load_purchase_order, validate_receipts, write_aro_lines, AroView, CreateAroRequest};
use crate::{
    commands::{begin, finish, today, track_failure, Command},
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        aro_entity::{self, AroStatus},
        purchase_order_entity::PurchaseOrderStatus,
        DocumentKind,
    },
    services::{
        numbering::{current_year, map_insert_error, next_number, with_number_retry},
        status_propagation::{recompute_purchase_order_status, StatusChange},
    },
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::Aro;

/// Records what was received against a purchase order, then lets the
/// purchase order status catch up.
#[derive(Debug, Clone)]
pub struct CreateAroCommand {
    pub request: CreateAroRequest,
    pub settings: DocumentSettings,
}

#[async_trait]
impl Command for CreateAroCommand {
    type Result = AroView;

    #[instrument(skip(self, db_pool, event_sender), fields(purchase_order_id = %self.request.purchase_order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;

        let db = db_pool.as_ref();
        let (view, status_change) =
            with_number_retry(KIND, self.settings.number_retry_limit, |attempt| {
                debug!(attempt, "Creating ARO");
                self.create_aro(db)
            })
            .await
            .map_err(|e| track_failure(KIND, e))?;

        metrics::record_document_created(KIND);
        info!(
            aro_id = %view.aro.id,
            aro_number = %view.aro.aro_number,
            lines = view.lines.len(),
            purchase_order_status = %view.purchase_order_status,
            "ARO created"
        );

        let mut events = vec![Event::DocumentCreated {
            kind: KIND,
            id: view.aro.id,
            number: view.aro.aro_number.clone(),
        }];
        events.extend(status_change.map(|change| change.into_event()));
        event_sender.publish_all(events).await;

        Ok(view)
    }
}

impl CreateAroCommand {
    async fn create_aro(
        &self,
        db: &DbPool,
    ) -> Result<(AroView, Option<StatusChange<PurchaseOrderStatus>>), ServiceError> {
        let txn = begin(db).await?;
        let outcome = self.write(&txn).await;
        finish(txn, outcome).await
    }

    async fn write(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<(AroView, Option<StatusChange<PurchaseOrderStatus>>), ServiceError> {
        let request = &self.request;
        let purchase_order = load_purchase_order(txn, request.purchase_order_id).await?;
        if purchase_order.status == PurchaseOrderStatus::Cancelled {
            return Err(ServiceError::StateConflict(format!(
                "purchase order {} is cancelled",
                purchase_order.po_number
            )));
        }
        validate_receipts(txn, &purchase_order, &request.lines, None).await?;

        let aro_number = next_number(txn, &self.settings.prefix, KIND, current_year()).await?;
        let now = Utc::now();
        let aro = aro_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            aro_number: Set(aro_number),
            purchase_order_id: Set(purchase_order.id),
            date_aro: Set(request.date_aro.unwrap_or_else(today)),
            status: Set(AroStatus::Pending),
            created_by: Set(request.created_by),
            remarks: Set(request.remarks.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| map_insert_error(KIND, e))?;

        let lines = write_aro_lines(txn, aro.id, &request.lines, now).await?;
        let status_change = recompute_purchase_order_status(txn, purchase_order.id).await?;
        let purchase_order_status = status_change
            .map(|change| change.to)
            .unwrap_or(purchase_order.status);

        Ok((
            AroView {
                aro,
                lines,
                purchase_order_status,
                warnings: Vec::new(),
            },
            status_change,
        ))
    }
}
