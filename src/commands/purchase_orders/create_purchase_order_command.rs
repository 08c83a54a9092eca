use super::{sync_has_po, CreatePurchaseOrderRequest, PurchaseOrderView};
use crate::{
    commands::{begin, finish, snapshot_gap_events, track_failure, Command},
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{
        customer_entity, po_product_entity,
        purchase_order_entity::{self, PurchaseOrderStatus},
        quote_entity, quote_product_entity, DocumentKind,
    },
    services::{
        master_data::{get_customer, get_product},
        numbering::{current_year, map_insert_error, next_number, with_number_retry},
        snapshot,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::PurchaseOrder;

/// Where the new purchase order takes its customer and lines from
enum PoSource {
    Quote(quote_entity::Model),
    Direct(customer_entity::Model),
}

#[derive(Debug, Clone)]
pub struct CreatePurchaseOrderCommand {
    pub request: CreatePurchaseOrderRequest,
    pub settings: DocumentSettings,
}

/// What the transaction produced, plus events it owes
struct Created {
    view: PurchaseOrderView,
    has_po_changed: Option<(Uuid, bool)>,
}

#[async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = PurchaseOrderView;

    #[instrument(skip(self, db_pool, event_sender), fields(quote_id = ?self.request.quote_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;
        self.check_shape().map_err(|e| track_failure(KIND, e))?;

        let db = db_pool.as_ref();
        let created = with_number_retry(KIND, self.settings.number_retry_limit, |attempt| {
            debug!(attempt, "Creating purchase order");
            self.create_purchase_order(db)
        })
        .await
        .map_err(|e| track_failure(KIND, e))?;

        let view = created.view;
        metrics::record_document_created(KIND);
        info!(
            purchase_order_id = %view.purchase_order.id,
            po_number = %view.purchase_order.po_number,
            lines = view.lines.len(),
            "Purchase order created"
        );

        let mut events = vec![Event::DocumentCreated {
            kind: KIND,
            id: view.purchase_order.id,
            number: view.purchase_order.po_number.clone(),
        }];
        if let Some((quote_id, has_po)) = created.has_po_changed {
            events.push(Event::QuoteHasPoChanged { quote_id, has_po });
        }
        events.extend(snapshot_gap_events(
            KIND,
            view.purchase_order.id,
            &view.warnings,
        ));
        event_sender.publish_all(events).await;

        Ok(view)
    }
}

impl CreatePurchaseOrderCommand {
    fn check_shape(&self) -> Result<(), ServiceError> {
        let request = &self.request;
        match request.quote_id {
            Some(_) if !request.lines.is_empty() => Err(ServiceError::ValidationError(
                "lines cannot be given when the purchase order is created from a quote".into(),
            )),
            None if request.customer_id.is_none() => Err(ServiceError::ValidationError(
                "customer_id is required without a quote".into(),
            )),
            None if request.lines.is_empty() => Err(ServiceError::ValidationError(
                "at least one line is required without a quote".into(),
            )),
            _ => Ok(()),
        }
    }

    async fn create_purchase_order(&self, db: &DbPool) -> Result<Created, ServiceError> {
        let txn = begin(db).await?;
        let outcome = self.write(&txn).await;
        finish(txn, outcome).await
    }

    async fn load_source(&self, txn: &DatabaseTransaction) -> Result<PoSource, ServiceError> {
        let Some(quote_id) = self.request.quote_id else {
            let customer_id = self.request.customer_id.ok_or_else(|| {
                ServiceError::ValidationError("customer_id is required without a quote".into())
            })?;
            return Ok(PoSource::Direct(get_customer(txn, customer_id).await?));
        };

        let quote = quote_entity::Entity::find_by_id(quote_id)
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::ReferentialIntegrity(format!("quote {} does not exist", quote_id))
            })?;
        if let Some(customer_id) = self.request.customer_id {
            if customer_id != quote.customer_id {
                return Err(ServiceError::ValidationError(format!(
                    "customer {} does not match the customer of quote {}",
                    customer_id, quote.quote_number
                )));
            }
        }
        Ok(PoSource::Quote(quote))
    }

    async fn write(&self, txn: &DatabaseTransaction) -> Result<Created, ServiceError> {
        let source = self.load_source(txn).await?;
        let customer_id = match &source {
            PoSource::Quote(quote) => quote.customer_id,
            PoSource::Direct(customer) => customer.id,
        };

        let po_number = next_number(txn, &self.settings.prefix, KIND, current_year()).await?;
        let now = Utc::now();
        let request = &self.request;

        let purchase_order = purchase_order_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            po_number: Set(po_number),
            customer_id: Set(customer_id),
            quote_id: Set(request.quote_id),
            created_by: Set(request.created_by),
            status: Set(PurchaseOrderStatus::Pending),
            planned_delivery_date: Set(request.planned_delivery_date),
            actual_delivery_date: Set(request.actual_delivery_date),
            remarks: Set(request.remarks.clone()),
            pdf_path: Set(request.pdf_path.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| map_insert_error(KIND, e))?;

        let (view, has_po_changed) = match source {
            PoSource::Quote(quote) => {
                let view = self.snapshot_quote(txn, purchase_order, &quote, now).await?;
                let changed = sync_has_po(txn, quote.id).await?;
                (view, changed.map(|has_po| (quote.id, has_po)))
            }
            PoSource::Direct(customer) => {
                let view = self
                    .snapshot_master_data(txn, purchase_order, &customer, now)
                    .await?;
                (view, None)
            }
        };

        Ok(Created {
            view,
            has_po_changed,
        })
    }

    /// PO snapshots copied from the quote's own snapshots.
    async fn snapshot_quote(
        &self,
        txn: &DatabaseTransaction,
        purchase_order: purchase_order_entity::Model,
        quote: &quote_entity::Model,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let quote_lines = quote_product_entity::Entity::find()
            .filter(quote_product_entity::Column::QuoteId.eq(quote.id))
            .order_by_asc(quote_product_entity::Column::CreatedAt)
            .all(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if quote_lines.is_empty() {
            return Err(ServiceError::StateConflict(format!(
                "quote {} has no lines to order",
                quote.quote_number
            )));
        }

        let (quote_customer, warning) = snapshot::ensure_quote_customer(txn, quote).await?;
        let customer = snapshot::po_customer_from_quote_customer(purchase_order.id, &quote_customer, now)
            .insert(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut lines = Vec::with_capacity(quote_lines.len());
        for quote_line in &quote_lines {
            let line = snapshot::po_product_from_quote_product(purchase_order.id, quote_line, now)
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?;
            lines.push(line);
        }

        Ok(PurchaseOrderView {
            purchase_order,
            customer: Some(customer),
            lines,
            warnings: warning.into_iter().collect(),
        })
    }

    async fn snapshot_master_data(
        &self,
        txn: &DatabaseTransaction,
        purchase_order: purchase_order_entity::Model,
        customer: &customer_entity::Model,
        now: DateTime<Utc>,
    ) -> Result<PurchaseOrderView, ServiceError> {
        let customer = snapshot::po_customer_from_customer(purchase_order.id, customer, now)
            .insert(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut lines: Vec<po_product_entity::Model> = Vec::with_capacity(self.request.lines.len());
        for requested in &self.request.lines {
            let product = get_product(txn, requested.product_id).await?;
            let unit_price = requested.unit_price.unwrap_or(product.unit_price);
            let line = snapshot::po_product_from_product(
                purchase_order.id,
                &product,
                requested.quantity,
                unit_price,
                now,
            )
            .insert(txn)
            .await
            .map_err(ServiceError::db_error)?;
            lines.push(line);
        }

        Ok(PurchaseOrderView {
            purchase_order,
            customer: Some(customer),
            lines,
            warnings: Vec::new(),
        })
    }
}
