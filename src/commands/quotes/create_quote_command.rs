use super::{store_totals, write_quote_lines, QuoteHeader, QuoteRequest, QuoteView};
use crate::{
    commands::{begin, finish, today, track_failure, Command},
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::{quote_entity, DocumentKind},
    services::{
        master_data::get_customer,
        numbering::{current_year, map_insert_error, next_number, with_number_retry},
        snapshot,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;
use validator::Validate;

const KIND: DocumentKind = DocumentKind::Quote;

#[derive(Debug, Clone)]
pub struct CreateQuoteCommand {
    pub request: QuoteRequest,
    pub settings: DocumentSettings,
}

#[async_trait]
impl Command for CreateQuoteCommand {
    type Result = QuoteView;

    #[instrument(skip(self, db_pool, event_sender), fields(customer_id = %self.request.customer_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.request
            .validate()
            .map_err(|e| track_failure(KIND, e.into()))?;
        let header = self
            .request
            .resolve(&self.settings, today())
            .map_err(|e| track_failure(KIND, e))?;

        let db = db_pool.as_ref();
        let view = with_number_retry(KIND, self.settings.number_retry_limit, |attempt| {
            debug!(attempt, "Creating quote");
            self.create_quote(db, &header)
        })
        .await
        .map_err(|e| track_failure(KIND, e))?;

        metrics::record_document_created(KIND);
        info!(
            quote_id = %view.quote.id,
            quote_number = %view.quote.quote_number,
            lines = view.lines.len(),
            grand_total = %view.quote.total_ttc,
            "Quote created"
        );
        event_sender
            .publish_all(vec![Event::DocumentCreated {
                kind: KIND,
                id: view.quote.id,
                number: view.quote.quote_number.clone(),
            }])
            .await;

        Ok(view)
    }
}

impl CreateQuoteCommand {
    async fn create_quote(
        &self,
        db: &DbPool,
        header: &QuoteHeader,
    ) -> Result<QuoteView, ServiceError> {
        let txn = begin(db).await?;
        let outcome = self.write(&txn, header).await;
        finish(txn, outcome).await
    }

    async fn write(
        &self,
        txn: &DatabaseTransaction,
        header: &QuoteHeader,
    ) -> Result<QuoteView, ServiceError> {
        let request = &self.request;
        let customer = get_customer(txn, request.customer_id).await?;
        let quote_number = next_number(txn, &self.settings.prefix, KIND, current_year()).await?;
        let now = Utc::now();

        // Totals are filled in once the lines exist
        let quote = quote_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            quote_number: Set(quote_number),
            customer_id: Set(customer.id),
            salesperson_id: Set(request.salesperson_id),
            date_quote: Set(header.date_quote),
            valid_until: Set(header.valid_until),
            status: Set(header.status),
            has_po: Set(false),
            currency: Set(header.currency),
            reduction: Set(header.reduction),
            vat_rate: Set(header.vat_rate),
            total_amount: Set(Decimal::ZERO),
            total_ht: Set(Decimal::ZERO),
            vat: Set(Decimal::ZERO),
            total_ttc: Set(Decimal::ZERO),
            payment_terms: Set(request.payment_terms.clone()),
            delivery_terms: Set(request.delivery_terms.clone()),
            discount_notes: Set(request.discount_notes.clone()),
            signature_name: Set(request.signature_name.clone()),
            signature_title: Set(request.signature_title.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| map_insert_error(KIND, e))?;

        let customer_snapshot = snapshot::quote_customer(quote.id, &customer, now)
            .insert(txn)
            .await
            .map_err(ServiceError::db_error)?;

        let (lines, amounts) = write_quote_lines(txn, quote.id, &request.products, now).await?;
        let (quote, _) = store_totals(txn, quote, &amounts).await?;

        Ok(QuoteView {
            is_expired: quote.is_expired(now.date_naive()),
            quote,
            customer: Some(customer_snapshot),
            lines,
            warnings: Vec::new(),
        })
    }
}
