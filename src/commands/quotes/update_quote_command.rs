use super::{store_totals, write_quote_lines, QuoteRequest, QuoteView};
use crate::{
    commands::{begin, finish, track_failure, Command},
    config::DocumentSettings,
    db::{supports_row_locks, DbPool},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{
        purchase_order_entity, quote_customer_entity, quote_entity, quote_product_entity,
        DocumentKind,
    },
    services::{master_data::get_customer, snapshot},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::Quote;

/// Replaces a quote's header and lines. Only possible before any purchase
/// order points at the quote's lines.
#[derive(Debug, Clone)]
pub struct UpdateQuoteCommand {
    pub id: Uuid,
    pub request: QuoteRequest,
    pub settings: DocumentSettings,
}

#[async_trait]
impl Command for UpdateQuoteCommand {
    type Result = QuoteView;

    #[instrument(skip(self, db_pool, event_sender), fields(quote_id = %self.id))]
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
            quote_number = %view.quote.quote_number,
            lines = view.lines.len(),
            grand_total = %view.quote.total_ttc,
            "Quote updated"
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

impl UpdateQuoteCommand {
    async fn write(&self, txn: &DatabaseTransaction) -> Result<QuoteView, ServiceError> {
        let mut query = quote_entity::Entity::find_by_id(self.id);
        if supports_row_locks(txn) {
            query = query.lock_exclusive();
        }
        let quote = query
            .one(txn)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("quote {} not found", self.id)))?;

        let purchase_orders = purchase_order_entity::Entity::find()
            .filter(purchase_order_entity::Column::QuoteId.eq(quote.id))
            .count(txn)
            .await
            .map_err(ServiceError::db_error)?;
        if quote.has_po || purchase_orders > 0 {
            return Err(ServiceError::StateConflict(format!(
                "quote {} has purchase orders and can no longer be edited",
                quote.quote_number
            )));
        }

        let header = self.request.resolve(&self.settings, quote.date_quote)?;
        let now = Utc::now();
        let request = &self.request;

        let mut warnings = Vec::new();
        let customer_snapshot = if request.customer_id != quote.customer_id {
            let customer = get_customer(txn, request.customer_id).await?;
            quote_customer_entity::Entity::delete_many()
                .filter(quote_customer_entity::Column::QuoteId.eq(quote.id))
                .exec(txn)
                .await
                .map_err(ServiceError::db_error)?;
            snapshot::quote_customer(quote.id, &customer, now)
                .insert(txn)
                .await
                .map_err(ServiceError::db_error)?
        } else {
            let (existing, warning) = snapshot::ensure_quote_customer(txn, &quote).await?;
            warnings.extend(warning);
            existing
        };

        quote_product_entity::Entity::delete_many()
            .filter(quote_product_entity::Column::QuoteId.eq(quote.id))
            .exec(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let mut active: quote_entity::ActiveModel = quote.into();
        active.customer_id = Set(request.customer_id);
        active.salesperson_id = Set(request.salesperson_id);
        active.date_quote = Set(header.date_quote);
        active.valid_until = Set(header.valid_until);
        active.status = Set(header.status);
        active.currency = Set(header.currency);
        active.reduction = Set(header.reduction);
        active.vat_rate = Set(header.vat_rate);
        active.payment_terms = Set(request.payment_terms.clone());
        active.delivery_terms = Set(request.delivery_terms.clone());
        active.discount_notes = Set(request.discount_notes.clone());
        active.signature_name = Set(request.signature_name.clone());
        active.signature_title = Set(request.signature_title.clone());
        active.updated_at = Set(now);
        let quote = active.update(txn).await.map_err(ServiceError::db_error)?;

        let (lines, amounts) = write_quote_lines(txn, quote.id, &request.products, now).await?;
        let (quote, _) = store_totals(txn, quote, &amounts).await?;

        Ok(QuoteView {
            is_expired: quote.is_expired(now.date_naive()),
            quote,
            customer: Some(customer_snapshot),
            lines,
            warnings,
        })
    }
}
