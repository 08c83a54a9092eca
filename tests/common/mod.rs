#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use orderchain_api::{
    build_router,
    commands::{
        aros::{AroLineRequest, CreateAroRequest},
        delivery_notes::CreateDeliveryNoteRequest,
        invoices::CreateInvoiceRequest,
        purchase_orders::CreatePurchaseOrderRequest,
        quotes::{QuoteLineRequest, QuoteRequest},
    },
    config::AppConfig,
    db::{self, DbConfig, DbPool},
    events::{self, EventSender},
    handlers::AppServices,
    models::{customer_entity, product_entity},
    services::master_data::{CreateCustomerRequest, CreateProductRequest},
    AppState,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Application wired to a private in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::single_connection(
            "sqlite::memory:",
        ))
        .await
        .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DbPool {
        self.state.db.as_ref()
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request builds")).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router responds")
    }

    pub async fn seed_customer(&self, company_name: &str) -> customer_entity::Model {
        self.services()
            .master_data
            .create_customer(CreateCustomerRequest {
                company_name: company_name.to_string(),
                contact_name: Some("Nadia Berrada".to_string()),
                email: Some("purchasing@example.com".to_string()),
                phone: Some("+212 522 000 000".to_string()),
                address: Some("12 Rue des Entrepreneurs, Casablanca".to_string()),
                vat_number: Some("MA-000123".to_string()),
                performance_flag: None,
            })
            .await
            .expect("customer seeded")
    }

    pub async fn seed_product(&self, code: &str, unit_price: Decimal) -> product_entity::Model {
        self.services()
            .master_data
            .create_product(CreateProductRequest {
                product_code: code.to_string(),
                name: format!("Product {}", code),
                description: Some(format!("Description of {}", code)),
                technical_specs: None,
                commercial_terms: None,
                payment_terms: None,
                min_delivery_day: Some(5),
                max_delivery_day: Some(15),
                availability_yrs: None,
                unit_price,
                status: None,
            })
            .await
            .expect("product seeded")
    }
}

pub async fn response_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response is JSON")
    };
    (status, json)
}

/// Reads a decimal the API wrote either as a string or as a number.
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {}", other),
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn quote_request(customer_id: Uuid, lines: &[(Uuid, i32, Option<Decimal>)]) -> QuoteRequest {
    QuoteRequest {
        customer_id,
        salesperson_id: None,
        date_quote: None,
        valid_until: None,
        status: None,
        currency: None,
        reduction: None,
        vat_rate: None,
        payment_terms: Some("30 days end of month".to_string()),
        delivery_terms: None,
        discount_notes: None,
        signature_name: None,
        signature_title: None,
        products: lines
            .iter()
            .map(|&(product_id, quantity, unit_price)| QuoteLineRequest {
                product_id,
                quantity,
                unit_price,
            })
            .collect(),
    }
}

pub fn po_from_quote(quote_id: Uuid) -> CreatePurchaseOrderRequest {
    CreatePurchaseOrderRequest {
        quote_id: Some(quote_id),
        customer_id: None,
        lines: Vec::new(),
        planned_delivery_date: None,
        actual_delivery_date: None,
        remarks: None,
        pdf_path: None,
        created_by: None,
    }
}

pub fn aro_request(purchase_order_id: Uuid, lines: &[(Uuid, i32)]) -> CreateAroRequest {
    CreateAroRequest {
        purchase_order_id,
        date_aro: None,
        remarks: None,
        created_by: None,
        lines: lines
            .iter()
            .map(|&(quote_product_id, quantity_received)| AroLineRequest {
                quote_product_id,
                quantity_received,
                remarks: None,
            })
            .collect(),
    }
}

pub fn delivery_note_request(aro_id: Uuid) -> CreateDeliveryNoteRequest {
    CreateDeliveryNoteRequest {
        aro_id,
        date_delivery: None,
        planned_delivery_date: date(2030, 1, 15),
        actual_delivery_date: None,
        delivery_address: "Zone Industrielle, Lot 7, Tanger".to_string(),
        incoterms: Some("DAP".to_string()),
        packaging_details: None,
        remarks: None,
        created_by: None,
        lines: Vec::new(),
    }
}

pub fn invoice_from_quote(quote_id: Uuid) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        quote_id: Some(quote_id),
        ..invoice_request()
    }
}

pub fn invoice_from_delivery_note(delivery_note_id: Uuid) -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        delivery_note_id: Some(delivery_note_id),
        ..invoice_request()
    }
}

fn invoice_request() -> CreateInvoiceRequest {
    CreateInvoiceRequest {
        quote_id: None,
        delivery_note_id: None,
        issue_date: None,
        due_date: None,
        payment_terms: None,
        customer_contact_person: None,
        customer_email: None,
        customer_phone: None,
        customer_vat: None,
        supplier_vat_number: None,
        supplier_iso_certification: None,
        notes: None,
        remarks: None,
        created_by: None,
    }
}
