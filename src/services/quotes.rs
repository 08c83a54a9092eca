use crate::{
    commands::{
        begin, finish,
        quotes::{
            CreateQuoteCommand, DeleteQuoteCommand, QuoteRequest, QuoteView, UpdateQuoteCommand,
        },
        validate_money, validate_rate, Command, DeleteResult,
    },
    config::DocumentSettings,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    models::{quote_customer_entity, quote_entity, quote_product_entity, DocumentKind},
    services::{
        calculator::{calculate_totals, LineAmount, Totals},
        numbering::{current_year, peek_next_number},
        snapshot,
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PreviewLine {
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i32,
    #[validate(custom = "validate_money")]
    pub unit_price: Decimal,
}

/// Lines and header figures to total without saving anything
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PreviewTotalsRequest {
    #[validate]
    pub lines: Vec<PreviewLine>,
    #[validate(custom = "validate_money")]
    pub reduction: Option<Decimal>,
    #[validate(custom = "validate_rate")]
    pub vat_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NumberPreview {
    pub kind: DocumentKind,
    pub next_number: String,
}

/// Print projection of a quote
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteDocument {
    pub quote: quote_entity::Model,
    pub customer: quote_customer_entity::Model,
    pub lines: Vec<quote_product_entity::Model>,
    pub warnings: Vec<snapshot::SnapshotWarning>,
}

#[derive(Clone)]
pub struct QuoteService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    settings: DocumentSettings,
}

impl QuoteService {
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

    #[instrument(skip(self, request), fields(customer_id = %request.customer_id))]
    pub async fn create_quote(&self, request: QuoteRequest) -> Result<QuoteView, ServiceError> {
        CreateQuoteCommand {
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_quote(
        &self,
        id: Uuid,
        request: QuoteRequest,
    ) -> Result<QuoteView, ServiceError> {
        UpdateQuoteCommand {
            id,
            request,
            settings: self.settings.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_quote(&self, id: Uuid) -> Result<DeleteResult, ServiceError> {
        DeleteQuoteCommand { id }
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_quote(&self, id: Uuid) -> Result<QuoteView, ServiceError> {
        let db = self.db_pool.as_ref();
        let quote = find_quote(db, id).await?;
        let customer = quote_customer_entity::Entity::find()
            .filter(quote_customer_entity::Column::QuoteId.eq(id))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        let lines = quote_lines(db, id).await?;
        Ok(QuoteView {
            is_expired: quote.is_expired(Utc::now().date_naive()),
            quote,
            customer,
            lines,
            warnings: Vec::new(),
        })
    }

    /// Runs the calculator over unsaved figures. The result matches what a
    /// saved quote with the same lines would store.
    pub fn preview_totals(&self, request: &PreviewTotalsRequest) -> Result<Totals, ServiceError> {
        request.validate()?;
        let amounts: Vec<LineAmount> = request
            .lines
            .iter()
            .map(|line| LineAmount::new(line.quantity, line.unit_price))
            .collect();
        calculate_totals(
            &amounts,
            request.reduction.unwrap_or(Decimal::ZERO),
            request.vat_rate.unwrap_or(self.settings.default_vat_rate),
        )
    }

    /// Number the next `kind` document would receive. Nothing is consumed.
    pub async fn next_number_preview(
        &self,
        kind: DocumentKind,
    ) -> Result<NumberPreview, ServiceError> {
        let next_number = peek_next_number(
            self.db_pool.as_ref(),
            &self.settings.prefix,
            kind,
            current_year(),
        )
        .await?;
        Ok(NumberPreview { kind, next_number })
    }

    /// Quote, customer snapshot and lines for printing. A quote saved without
    /// a customer snapshot gets one here.
    #[instrument(skip(self))]
    pub async fn quote_document(&self, id: Uuid) -> Result<QuoteDocument, ServiceError> {
        let txn = begin(self.db_pool.as_ref()).await?;
        let outcome = async {
            let quote = find_quote(&txn, id).await?;
            let lines = quote_lines(&txn, id).await?;
            if lines.is_empty() {
                return Err(ServiceError::StateConflict(format!(
                    "quote {} has no lines to print",
                    quote.quote_number
                )));
            }
            let (customer, warning) = snapshot::ensure_quote_customer(&txn, &quote).await?;
            Ok(QuoteDocument {
                quote,
                customer,
                lines,
                warnings: warning.into_iter().collect(),
            })
        }
        .await;
        let document = finish(txn, outcome).await?;

        if !document.warnings.is_empty() {
            info!(quote_id = %id, "Customer snapshot restored for quote document");
        }
        Ok(document)
    }
}

async fn find_quote<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<quote_entity::Model, ServiceError> {
    quote_entity::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("quote {} not found", id)))
}

async fn quote_lines<C: ConnectionTrait>(
    conn: &C,
    quote_id: Uuid,
) -> Result<Vec<quote_product_entity::Model>, ServiceError> {
    quote_product_entity::Entity::find()
        .filter(quote_product_entity::Column::QuoteId.eq(quote_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn preview_request_rejects_negative_prices() {
        let request = PreviewTotalsRequest {
            lines: vec![PreviewLine {
                quantity: 1,
                unit_price: dec!(-1),
            }],
            reduction: None,
            vat_rate: None,
        };
        assert!(request.validate().is_err());
    }
}
