//! Prometheus counters for the document chain, rendered at `/metrics`.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use prometheus::{core::Collector, Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::error;

use crate::models::DocumentKind;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    static ref DOCUMENTS_CREATED: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new("documents_created_total", "Documents created, by kind"),
            &["kind"]
        )
        .expect("metric can be created")
    );
    static ref DOCUMENT_FAILURES: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "document_command_failures_total",
                "Rejected or failed document commands, by kind and error kind"
            ),
            &["kind", "error"]
        )
        .expect("metric can be created")
    );
    static ref NUMBER_RETRIES: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "document_number_retries_total",
                "Transactions retried after a document number conflict"
            ),
            &["kind"]
        )
        .expect("metric can be created")
    );
    static ref SNAPSHOT_GAPS: IntCounterVec = register(
        IntCounterVec::new(
            Opts::new(
                "snapshot_gaps_total",
                "Lines skipped because predecessor data was missing"
            ),
            &["kind"]
        )
        .expect("metric can be created")
    );
}

fn register<C: Collector + Clone + 'static>(collector: C) -> C {
    if let Err(e) = REGISTRY.register(Box::new(collector.clone())) {
        error!(error = %e, "Failed to register collector");
    }
    collector
}

pub fn record_document_created(kind: DocumentKind) {
    DOCUMENTS_CREATED
        .with_label_values(&[&kind.to_string()])
        .inc();
}

pub fn record_command_failure(kind: DocumentKind, error_kind: &str) {
    DOCUMENT_FAILURES
        .with_label_values(&[&kind.to_string(), error_kind])
        .inc();
}

pub fn record_number_retry(kind: DocumentKind) {
    NUMBER_RETRIES.with_label_values(&[&kind.to_string()]).inc();
}

pub fn record_snapshot_gaps(kind: DocumentKind, count: usize) {
    if count > 0 {
        SNAPSHOT_GAPS
            .with_label_values(&[&kind.to_string()])
            .inc_by(count as u64);
    }
}

pub fn documents_created(kind: DocumentKind) -> u64 {
    DOCUMENTS_CREATED
        .with_label_values(&[&kind.to_string()])
        .get()
}

/// Renders the registry in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

// HTTP endpoint handler for metrics
pub async fn metrics_handler() -> Response {
    match gather_text() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let before = documents_created(DocumentKind::DeliveryNote);
        record_document_created(DocumentKind::DeliveryNote);
        record_number_retry(DocumentKind::DeliveryNote);
        assert_eq!(documents_created(DocumentKind::DeliveryNote), before + 1);

        let text = gather_text().unwrap();
        assert!(text.contains("documents_created_total"));
        assert!(text.contains("kind=\"delivery_note\""));
    }
}
