use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// How quickly the quote was dispatched. Not an approval state.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum QuoteStatus {
    #[default]
    #[sea_orm(string_value = "Sent same day")]
    #[serde(rename = "Sent same day")]
    #[strum(serialize = "Sent same day")]
    SentSameDay,
    #[sea_orm(string_value = "Sent within 2-3 days")]
    #[serde(rename = "Sent within 2-3 days")]
    #[strum(serialize = "Sent within 2-3 days")]
    SentWithinThreeDays,
    #[sea_orm(string_value = "Sent after 4+ days")]
    #[serde(rename = "Sent after 4+ days")]
    #[strum(serialize = "Sent after 4+ days")]
    SentAfterFourDays,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema, strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(3))")]
pub enum Currency {
    #[default]
    #[sea_orm(string_value = "EUR")]
    #[serde(rename = "EUR")]
    #[strum(serialize = "EUR")]
    Eur,
    #[sea_orm(string_value = "USD")]
    #[serde(rename = "USD")]
    #[strum(serialize = "USD")]
    Usd,
    #[sea_orm(string_value = "MAD")]
    #[serde(rename = "MAD")]
    #[strum(serialize = "MAD")]
    Mad,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "quotes")]
#[schema(as = Quote)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub quote_number: String,
    pub customer_id: Uuid,
    pub salesperson_id: Option<Uuid>,
    pub date_quote: NaiveDate,
    pub valid_until: NaiveDate,
    pub status: QuoteStatus,
    pub has_po: bool,
    pub currency: Currency,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub reduction: Decimal,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub vat_rate: Decimal,
    /// Subtotal before reduction
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_ht: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub vat: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_ttc: Decimal,
    pub payment_terms: Option<String>,
    pub delivery_terms: Option<String>,
    pub discount_notes: Option<String>,
    pub signature_name: Option<String>,
    pub signature_title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Past its validity date.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.valid_until < today
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::customer_entity::Entity",
        from = "Column::CustomerId",
        to = "super::customer_entity::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::quote_product_entity::Entity")]
    QuoteProducts,
}

impl Related<super::customer_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::quote_product_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::QuoteProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn quote(valid_until: NaiveDate) -> Model {
        Model {
            id: Uuid::new_v4(),
            quote_number: "SNXQT203000001".to_string(),
            customer_id: Uuid::new_v4(),
            salesperson_id: None,
            date_quote: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            valid_until,
            status: QuoteStatus::default(),
            has_po: false,
            currency: Currency::default(),
            reduction: Decimal::ZERO,
            vat_rate: Decimal::new(20, 2),
            total_amount: Decimal::ZERO,
            total_ht: Decimal::ZERO,
            vat: Decimal::ZERO,
            total_ttc: Decimal::ZERO,
            payment_terms: None,
            delivery_terms: None,
            discount_notes: None,
            signature_name: None,
            signature_title: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test_case(-1, false ; "before validity date")]
    #[test_case(0, false ; "on validity date")]
    #[test_case(1, true ; "after validity date")]
    fn expires_after_valid_until(days_after: i64, expired: bool) {
        let valid_until = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        let today = valid_until + chrono::Duration::days(days_after);
        assert_eq!(quote(valid_until).is_expired(today), expired);
    }
}
