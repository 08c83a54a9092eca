pub mod aros;
pub mod common;
pub mod delivery_notes;
pub mod health;
pub mod invoices;
pub mod master_data;
pub mod numbering;
pub mod purchase_orders;
pub mod quotes;

use crate::{
    config::DocumentSettings,
    db::DbPool,
    events::EventSender,
    services::{
        AroService, DeliveryNoteService, InvoiceService, MasterDataService, PurchaseOrderService,
        QuoteService,
    },
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub quotes: Arc<QuoteService>,
    pub purchase_orders: Arc<PurchaseOrderService>,
    pub aros: Arc<AroService>,
    pub delivery_notes: Arc<DeliveryNoteService>,
    pub invoices: Arc<InvoiceService>,
    pub master_data: Arc<MasterDataService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        settings: DocumentSettings,
    ) -> Self {
        Self {
            quotes: Arc::new(QuoteService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings.clone(),
            )),
            purchase_orders: Arc::new(PurchaseOrderService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings.clone(),
            )),
            aros: Arc::new(AroService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings.clone(),
            )),
            delivery_notes: Arc::new(DeliveryNoteService::new(
                db_pool.clone(),
                event_sender.clone(),
                settings.clone(),
            )),
            invoices: Arc::new(InvoiceService::new(
                db_pool.clone(),
                event_sender,
                settings,
            )),
            master_data: Arc::new(MasterDataService::new(db_pool)),
        }
    }
}
