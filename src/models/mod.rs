// Master data
pub mod customer_entity;
pub mod product_entity;

// Quote and its snapshots
pub mod quote_customer_entity;
pub mod quote_entity;
pub mod quote_product_entity;

// Purchase order and its snapshots
pub mod po_customer_entity;
pub mod po_product_entity;
pub mod purchase_order_entity;

// Receipts and deliveries
pub mod aro_entity;
pub mod aro_product_entity;
pub mod delivery_note_entity;
pub mod dnp_product_entity;

// Billing
pub mod invoice_entity;
pub mod invoice_line_entity;

// Numbering
pub mod document_sequence_entity;

pub use aro_entity::AroStatus;
pub use customer_entity::PerformanceFlag;
pub use delivery_note_entity::DeliveryNoteStatus;
pub use document_sequence_entity::DocumentKind;
pub use invoice_entity::InvoiceStatus;
pub use product_entity::ProductStatus;
pub use purchase_order_entity::PurchaseOrderStatus;
pub use quote_entity::{Currency, QuoteStatus};
