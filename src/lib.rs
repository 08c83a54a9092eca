//! Orderchain API
//!
//! Backend for a commercial document chain: quotes, purchase orders, AROs,
//! delivery notes and invoices, each carrying frozen snapshots of the data
//! it was derived from.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, routing::get, Router};
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(
        db: Arc<db::DbPool>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let services = handlers::AppServices::new(
            db.clone(),
            Arc::new(event_sender.clone()),
            config.document_settings(),
        );
        Self {
            db,
            config,
            event_sender,
            services,
        }
    }
}

pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::health::api_status))
        .route("/health", get(handlers::health::health_check))
        .nest("/quotes", handlers::quotes::quote_routes())
        .nest("/numbering", handlers::numbering::numbering_routes())
        .nest(
            "/purchase-orders",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest("/aros", handlers::aros::aro_routes())
        .nest(
            "/delivery-notes",
            handlers::delivery_notes::delivery_note_routes(),
        )
        .nest("/invoices", handlers::invoices::invoice_routes())
        .nest("/customers", handlers::master_data::customer_routes())
        .nest("/products", handlers::master_data::product_routes())
}

/// Explicit origins when configured, permissive in development, same-origin otherwise.
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cfg
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

/// Full application router: `/api/v1`, `/metrics`, Swagger UI and the
/// OpenAPI document, wrapped in timeout, request-id, tracing and CORS layers.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);
    Router::new()
        .route("/metrics", get(metrics::metrics_handler))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        .layer(TimeoutLayer::new(timeout))
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(crate::tracing::request_id_middleware))
        .layer(cors)
        .with_state(state)
}
