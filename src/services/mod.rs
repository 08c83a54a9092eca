// Engines shared by every document command
pub mod calculator;
pub mod numbering;
pub mod snapshot;
pub mod status_propagation;

// Master data read by the chain
pub mod master_data;

// Document facades
pub mod aros;
pub mod delivery_notes;
pub mod invoices;
pub mod purchase_orders;
pub mod quotes;

pub use aros::AroService;
pub use delivery_notes::DeliveryNoteService;
pub use invoices::InvoiceService;
pub use master_data::MasterDataService;
pub use purchase_orders::PurchaseOrderService;
pub use quotes::QuoteService;
