use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::quote_entity::Currency;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "Draft")]
    Draft,
    #[sea_orm(string_value = "Unpaid")]
    Unpaid,
    #[sea_orm(string_value = "Partially Paid")]
    #[serde(rename = "Partially Paid")]
    #[strum(serialize = "Partially Paid")]
    PartiallyPaid,
    #[sea_orm(string_value = "Paid")]
    Paid,
    #[sea_orm(string_value = "Overdue")]
    Overdue,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl InvoiceStatus {
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft | Self::Unpaid)
    }

    pub fn is_deletable(self) -> bool {
        matches!(self, Self::Draft | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "invoices")]
#[schema(as = Invoice)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub quote_id: Uuid,
    pub delivery_note_id: Option<Uuid>,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub currency: Currency,
    pub payment_terms: Option<String>,
    pub customer_name: String,
    pub customer_contact_person: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub customer_vat: Option<String>,
    pub supplier_vat_number: Option<String>,
    pub supplier_iso_certification: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((5, 4)))")]
    pub vat_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub sub_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub discount_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub tax_total: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub grand_total: Decimal,
    pub notes: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_editable(&self) -> bool {
        self.status.is_editable()
    }

    pub fn is_deletable(&self) -> bool {
        self.status.is_deletable()
    }

    /// Unpaid and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Unpaid && self.due_date < today
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote_entity::Entity",
        from = "Column::QuoteId",
        to = "super::quote_entity::Column::Id"
    )]
    Quote,
    #[sea_orm(has_many = "super::invoice_line_entity::Entity")]
    Lines,
}

impl Related<super::quote_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl Related<super::invoice_line_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(InvoiceStatus::Draft, true, true)]
    #[test_case(InvoiceStatus::Unpaid, true, false)]
    #[test_case(InvoiceStatus::PartiallyPaid, false, false)]
    #[test_case(InvoiceStatus::Paid, false, false)]
    #[test_case(InvoiceStatus::Overdue, false, false)]
    #[test_case(InvoiceStatus::Cancelled, false, true)]
    fn edit_and_delete_windows(status: InvoiceStatus, editable: bool, deletable: bool) {
        assert_eq!(status.is_editable(), editable);
        assert_eq!(status.is_deletable(), deletable);
    }

    fn invoice(status: InvoiceStatus, due_date: NaiveDate) -> Model {
        Model {
            id: Uuid::new_v4(),
            invoice_number: "SNX-INV-2030-00001".to_string(),
            quote_id: Uuid::new_v4(),
            delivery_note_id: None,
            status,
            issue_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            due_date,
            currency: Currency::Eur,
            payment_terms: None,
            customer_name: "Acme".to_string(),
            customer_contact_person: None,
            customer_email: None,
            customer_phone: None,
            customer_address: None,
            customer_vat: None,
            supplier_vat_number: None,
            supplier_iso_certification: None,
            vat_rate: Decimal::new(20, 2),
            sub_total: Decimal::ZERO,
            discount_total: Decimal::ZERO,
            tax_total: Decimal::ZERO,
            grand_total: Decimal::ZERO,
            notes: None,
            remarks: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test_case(InvoiceStatus::Unpaid, 1, true ; "unpaid past due")]
    #[test_case(InvoiceStatus::Unpaid, 0, false ; "unpaid on due date")]
    #[test_case(InvoiceStatus::Paid, 1, false ; "paid past due")]
    #[test_case(InvoiceStatus::Draft, 1, false ; "draft past due")]
    fn overdue_only_when_unpaid_after_due_date(status: InvoiceStatus, days_late: i64, overdue: bool) {
        let due = NaiveDate::from_ymd_opt(2030, 1, 31).unwrap();
        let today = due + chrono::Duration::days(days_late);
        assert_eq!(invoice(status, due).is_overdue(today), overdue);
    }

    #[test]
    fn status_strings_match_storage_values() {
        assert_eq!(InvoiceStatus::PartiallyPaid.to_string(), "Partially Paid");
        assert_eq!(
            serde_json::to_string(&InvoiceStatus::PartiallyPaid).unwrap(),
            "\"Partially Paid\""
        );
    }
}
