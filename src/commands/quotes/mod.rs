pub mod create_quote_command;
pub mod delete_quote_command;
pub mod update_quote_command;

pub use create_quote_command::CreateQuoteCommand;
pub use delete_quote_command::DeleteQuoteCommand;
pub use update_quote_command::UpdateQuoteCommand;

use crate::{
    commands::{validate_money, validate_rate},
    config::DocumentSettings,
    errors::ServiceError,
    models::{
        quote_customer_entity,
        quote_entity::{self, Currency, QuoteStatus},
        quote_product_entity,
    },
    services::{
        calculator::{calculate_totals, validate_vat_rate, LineAmount, Totals},
        master_data::get_quotable_product,
        snapshot::{self, SnapshotWarning},
    },
};
use chrono::{DateTime, Months, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteLineRequest {
    pub product_id: Uuid,
    #[validate(range(min = 1, max = 1000000))]
    pub quantity: i32,
    /// Defaults to the product's current list price
    #[validate(custom = "validate_money")]
    pub unit_price: Option<Decimal>,
}

/// Body for creating or replacing a quote
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct QuoteRequest {
    pub customer_id: Uuid,
    pub salesperson_id: Option<Uuid>,
    pub date_quote: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub status: Option<QuoteStatus>,
    pub currency: Option<Currency>,
    #[validate(custom = "validate_money")]
    pub reduction: Option<Decimal>,
    /// Decimal fraction, 0.20 for 20%
    #[validate(custom = "validate_rate")]
    pub vat_rate: Option<Decimal>,
    #[validate(length(max = 1000))]
    pub payment_terms: Option<String>,
    #[validate(length(max = 1000))]
    pub delivery_terms: Option<String>,
    #[validate(length(max = 1000))]
    pub discount_notes: Option<String>,
    #[validate(length(max = 255))]
    pub signature_name: Option<String>,
    #[validate(length(max = 255))]
    pub signature_title: Option<String>,
    #[validate(length(min = 1, message = "At least one product is required"))]
    #[validate]
    pub products: Vec<QuoteLineRequest>,
}

/// Header values after defaults have been applied
#[derive(Debug, Clone)]
pub(crate) struct QuoteHeader {
    pub date_quote: NaiveDate,
    pub valid_until: NaiveDate,
    pub status: QuoteStatus,
    pub currency: Currency,
    pub reduction: Decimal,
    pub vat_rate: Decimal,
}

impl QuoteRequest {
    pub(crate) fn resolve(
        &self,
        settings: &DocumentSettings,
        default_date: NaiveDate,
    ) -> Result<QuoteHeader, ServiceError> {
        let date_quote = self.date_quote.unwrap_or(default_date);
        let valid_until = match self.valid_until {
            Some(date) => date,
            None => date_quote.checked_add_months(Months::new(1)).ok_or_else(|| {
                ServiceError::ValidationError(format!("date_quote {} is out of range", date_quote))
            })?,
        };
        if valid_until <= date_quote {
            return Err(ServiceError::ValidationError(format!(
                "valid_until {} must be after date_quote {}",
                valid_until, date_quote
            )));
        }

        let vat_rate = self.vat_rate.unwrap_or(settings.default_vat_rate);
        validate_vat_rate(vat_rate)?;

        let mut seen = HashSet::new();
        for line in &self.products {
            if !seen.insert(line.product_id) {
                return Err(ServiceError::ValidationError(format!(
                    "product {} appears more than once",
                    line.product_id
                )));
            }
        }

        Ok(QuoteHeader {
            date_quote,
            valid_until,
            status: self.status.unwrap_or_default(),
            currency: self.currency.unwrap_or_default(),
            reduction: self.reduction.unwrap_or(Decimal::ZERO),
            vat_rate,
        })
    }
}

/// A quote with its snapshots
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct QuoteView {
    pub quote: quote_entity::Model,
    pub customer: Option<quote_customer_entity::Model>,
    pub lines: Vec<quote_product_entity::Model>,
    pub is_expired: bool,
    pub warnings: Vec<SnapshotWarning>,
}

/// Snapshots each requested product onto the quote, one row at a time.
pub(crate) async fn write_quote_lines<C: ConnectionTrait>(
    conn: &C,
    quote_id: Uuid,
    lines: &[QuoteLineRequest],
    now: DateTime<Utc>,
) -> Result<(Vec<quote_product_entity::Model>, Vec<LineAmount>), ServiceError> {
    let mut saved = Vec::with_capacity(lines.len());
    let mut amounts = Vec::with_capacity(lines.len());
    for line in lines {
        let product = get_quotable_product(conn, line.product_id).await?;
        let unit_price = line.unit_price.unwrap_or(product.unit_price);
        let row = snapshot::quote_product(quote_id, &product, line.quantity, unit_price, now)
            .insert(conn)
            .await
            .map_err(ServiceError::db_error)?;
        amounts.push(LineAmount::new(row.quantity, row.unit_price));
        saved.push(row);
    }
    Ok((saved, amounts))
}

/// Computes and stores the quote totals from its lines.
pub(crate) async fn store_totals<C: ConnectionTrait>(
    conn: &C,
    quote: quote_entity::Model,
    amounts: &[LineAmount],
) -> Result<(quote_entity::Model, Totals), ServiceError> {
    let totals = calculate_totals(amounts, quote.reduction, quote.vat_rate)?;
    let mut active: quote_entity::ActiveModel = quote.into();
    active.total_amount = Set(totals.subtotal);
    active.total_ht = Set(totals.after_reduction);
    active.vat = Set(totals.vat_amount);
    active.total_ttc = Set(totals.grand_total);
    let quote = active.update(conn).await.map_err(ServiceError::db_error)?;
    Ok((quote, totals))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn request(lines: Vec<QuoteLineRequest>) -> QuoteRequest {
        QuoteRequest {
            customer_id: Uuid::new_v4(),
            salesperson_id: None,
            date_quote: NaiveDate::from_ymd_opt(2024, 1, 31),
            valid_until: None,
            status: None,
            currency: None,
            reduction: None,
            vat_rate: None,
            payment_terms: None,
            delivery_terms: None,
            discount_notes: None,
            signature_name: None,
            signature_title: None,
            products: lines,
        }
    }

    fn line(product_id: Uuid) -> QuoteLineRequest {
        QuoteLineRequest {
            product_id,
            quantity: 1,
            unit_price: Some(dec!(10)),
        }
    }

    #[test]
    fn defaults_are_applied() {
        let req = request(vec![line(Uuid::new_v4())]);
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let header = req.resolve(&DocumentSettings::default(), today).unwrap();
        assert_eq!(header.date_quote, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(header.valid_until, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(header.vat_rate, dec!(0.20));
        assert_eq!(header.reduction, Decimal::ZERO);
        assert_eq!(header.status, QuoteStatus::SentSameDay);
        assert_eq!(header.currency, Currency::Eur);
    }

    #[test]
    fn valid_until_must_follow_date_quote() {
        let mut req = request(vec![line(Uuid::new_v4())]);
        req.valid_until = req.date_quote;
        assert_matches!(
            req.resolve(&DocumentSettings::default(), Utc::now().date_naive()),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn duplicate_products_are_rejected() {
        let product = Uuid::new_v4();
        let req = request(vec![line(product), line(product)]);
        assert_matches!(
            req.resolve(&DocumentSettings::default(), Utc::now().date_naive()),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn empty_product_list_fails_validation() {
        assert!(request(vec![]).validate().is_err());
    }
}
