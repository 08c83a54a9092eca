use crate::models::DocumentKind;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Sender half of the domain event channel
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends events emitted by a committed transaction. The documents already
    /// exist, so a closed channel is only logged.
    pub async fn publish_all(&self, events: Vec<Event>) {
        for event in events {
            if let Err(e) = self.send(event).await {
                error!(error = %e, "Dropping domain event after commit");
            }
        }
    }
}

// Events emitted along the document chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    DocumentCreated {
        kind: DocumentKind,
        id: Uuid,
        number: String,
    },
    DocumentUpdated {
        kind: DocumentKind,
        id: Uuid,
    },
    DocumentDeleted {
        kind: DocumentKind,
        id: Uuid,
    },
    PurchaseOrderStatusChanged {
        purchase_order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    AroStatusChanged {
        aro_id: Uuid,
        old_status: String,
        new_status: String,
    },
    QuoteHasPoChanged {
        quote_id: Uuid,
        has_po: bool,
    },
    SnapshotGapDetected {
        kind: DocumentKind,
        document_id: Uuid,
        source_id: Uuid,
        reason: String,
    },
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::DocumentCreated { kind, id, number } => {
                info!(%kind, document_id = %id, %number, "Document created");
            }
            Event::DocumentUpdated { kind, id } => {
                info!(%kind, document_id = %id, "Document updated");
            }
            Event::DocumentDeleted { kind, id } => {
                info!(%kind, document_id = %id, "Document deleted");
            }
            Event::PurchaseOrderStatusChanged {
                purchase_order_id,
                old_status,
                new_status,
            } => {
                info!(
                    %purchase_order_id,
                    %old_status,
                    %new_status,
                    "Purchase order status changed"
                );
            }
            Event::AroStatusChanged {
                aro_id,
                old_status,
                new_status,
            } => {
                info!(%aro_id, %old_status, %new_status, "ARO status changed");
            }
            Event::QuoteHasPoChanged { quote_id, has_po } => {
                info!(%quote_id, has_po, "Quote purchase order flag changed");
            }
            Event::SnapshotGapDetected {
                kind,
                document_id,
                source_id,
                reason,
            } => {
                warn!(%kind, %document_id, %source_id, %reason, "Snapshot gap reported");
            }
        }
    }

    info!("Event processing loop stopped");
}
