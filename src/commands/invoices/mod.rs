pub mod create_invoice_command;
pub mod delete_invoice_command;
pub mod update_invoice_command;

pub use create_invoice_command::CreateInvoiceCommand;
pub use delete_invoice_command::DeleteInvoiceCommand;
pub use update_invoice_command::UpdateInvoiceCommand;

use crate::{
    models::{
        invoice_entity::{self, InvoiceStatus},
        invoice_line_entity,
    },
    services::snapshot::SnapshotWarning,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Exactly one of `quote_id` and `delivery_note_id`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateInvoiceRequest {
    pub quote_id: Option<Uuid>,
    pub delivery_note_id: Option<Uuid>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub payment_terms: Option<String>,
    #[validate(length(max = 255))]
    pub customer_contact_person: Option<String>,
    #[validate(email)]
    pub customer_email: Option<String>,
    #[validate(length(max = 50))]
    pub customer_phone: Option<String>,
    #[validate(length(max = 50))]
    pub customer_vat: Option<String>,
    #[validate(length(max = 50))]
    pub supplier_vat_number: Option<String>,
    #[validate(length(max = 255))]
    pub supplier_iso_certification: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateInvoiceRequest {
    pub status: Option<InvoiceStatus>,
    pub due_date: Option<NaiveDate>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InvoiceView {
    pub invoice: invoice_entity::Model,
    pub lines: Vec<invoice_line_entity::Model>,
    pub is_overdue: bool,
    pub warnings: Vec<SnapshotWarning>,
}

impl InvoiceView {
    pub fn new(
        invoice: invoice_entity::Model,
        lines: Vec<invoice_line_entity::Model>,
        warnings: Vec<SnapshotWarning>,
        today: NaiveDate,
    ) -> Self {
        Self {
            is_overdue: invoice.is_overdue(today),
            invoice,
            lines,
            warnings,
        }
    }
}
