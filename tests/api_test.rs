mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, response_json, TestApp};
use orderchain_api::services::numbering::current_year;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn post(app: &TestApp, path: &str, body: Value) -> (StatusCode, Value) {
    response_json(app.request(Method::POST, path, Some(body)).await).await
}

async fn get(app: &TestApp, path: &str) -> (StatusCode, Value) {
    response_json(app.request(Method::GET, path, None).await).await
}

/// Customer plus products A (100.00) and B (50.00), created over HTTP.
async fn seed_over_http(app: &TestApp) -> (String, String, String) {
    let (status, customer) = post(
        app,
        "/api/v1/customers",
        json!({ "company_name": "Http Buyer", "email": "buyer@example.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let mut products = Vec::new();
    for (code, price) in [("HTTP-A", "100.00"), ("HTTP-B", "50.00")] {
        let (status, product) = post(
            app,
            "/api/v1/products",
            json!({ "product_code": code, "name": format!("Item {}", code), "unit_price": price }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        products.push(product["id"].as_str().unwrap().to_string());
    }

    (
        customer["id"].as_str().unwrap().to_string(),
        products[0].clone(),
        products[1].clone(),
    )
}

fn sample_quote(customer: &str, product_a: &str, product_b: &str) -> Value {
    json!({
        "customer_id": customer,
        "reduction": "20.00",
        "vat_rate": "0.20",
        "products": [
            { "product_id": product_a, "quantity": 3 },
            { "product_id": product_b, "quantity": 1 }
        ]
    })
}

#[tokio::test]
async fn health_and_status_respond() {
    let app = TestApp::new().await;

    let (status, body) = get(&app, "/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
    assert_eq!(body["database"]["status"], "up");

    let (status, body) = get(&app, "/api/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["document_prefix"], "SNX");
}

#[tokio::test]
async fn preview_matches_saved_quote() {
    let app = TestApp::new().await;
    let (customer, a, b) = seed_over_http(&app).await;

    let (status, preview) = post(
        &app,
        "/api/v1/quotes/preview-totals",
        json!({
            "lines": [
                { "quantity": 3, "unit_price": "100.00" },
                { "quantity": 1, "unit_price": "50.00" }
            ],
            "reduction": "20.00",
            "vat_rate": "0.20"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&preview["subtotal"]), dec!(350.00));
    assert_eq!(decimal(&preview["after_reduction"]), dec!(330.00));
    assert_eq!(decimal(&preview["vat_amount"]), dec!(66.00));
    assert_eq!(decimal(&preview["grand_total"]), dec!(396.00));

    let (status, quote) = post(&app, "/api/v1/quotes", sample_quote(&customer, &a, &b)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(decimal(&quote["quote"]["total_amount"]), decimal(&preview["subtotal"]));
    assert_eq!(decimal(&quote["quote"]["total_ht"]), decimal(&preview["after_reduction"]));
    assert_eq!(decimal(&quote["quote"]["vat"]), decimal(&preview["vat_amount"]));
    assert_eq!(decimal(&quote["quote"]["total_ttc"]), decimal(&preview["grand_total"]));
    assert_eq!(quote["lines"].as_array().unwrap().len(), 2);
    assert_eq!(quote["is_expired"], false);
}

#[tokio::test]
async fn preview_without_vat_uses_default_rate() {
    let app = TestApp::new().await;
    let (status, preview) = post(
        &app,
        "/api/v1/quotes/preview-totals",
        json!({ "lines": [{ "quantity": 2, "unit_price": "10.00" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&preview["vat_amount"]), dec!(4.00));
    assert_eq!(decimal(&preview["grand_total"]), dec!(24.00));
}

#[tokio::test]
async fn preview_rejects_figures_that_do_not_fit_storage() {
    let app = TestApp::new().await;
    let lines = [
        json!({ "quantity": 0, "unit_price": "10.00" }),
        json!({ "quantity": 1000001, "unit_price": "10.00" }),
        json!({ "quantity": 3, "unit_price": "0.335" }),
        json!({ "quantity": 1000000, "unit_price": "100000000000000" }),
    ];
    for line in lines {
        let (status, error) = post(
            &app,
            "/api/v1/quotes/preview-totals",
            json!({ "lines": [line] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", line);
        assert_eq!(error["kind"], "validation_error");
    }

    // Largest accepted figures still total without overflowing
    let (status, preview) = post(
        &app,
        "/api/v1/quotes/preview-totals",
        json!({ "lines": [{ "quantity": 1000000, "unit_price": "9999999999999.99" }] }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&preview["subtotal"]), dec!(9999999999999990000.00));
}

#[tokio::test]
async fn next_number_preview_follows_created_documents() {
    let app = TestApp::new().await;
    let (customer, a, b) = seed_over_http(&app).await;
    let year = current_year();

    let (status, body) = get(&app, "/api/v1/numbering/quote/next").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["next_number"], format!("SNXQT{}00001", year));

    post(&app, "/api/v1/quotes", sample_quote(&customer, &a, &b)).await;
    let (_, body) = get(&app, "/api/v1/numbering/quote/next").await;
    assert_eq!(body["next_number"], format!("SNXQT{}00002", year));

    let (_, body) = get(&app, "/api/v1/numbering/purchase_order/next").await;
    assert_eq!(body["next_number"], format!("SNX-PO-{}-00001", year));

    let (status, body) = get(&app, "/api/v1/numbering/packing_slip/next").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn chain_over_http_reports_error_kinds() {
    let app = TestApp::new().await;
    let (customer, a, b) = seed_over_http(&app).await;

    let (_, quote) = post(&app, "/api/v1/quotes", sample_quote(&customer, &a, &b)).await;
    let quote_id = quote["quote"]["id"].as_str().unwrap().to_string();
    let line_a = quote["lines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["product_id"] == a.as_str())
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, po) = post(&app, "/api/v1/purchase-orders", json!({ "quote_id": quote_id })).await;
    assert_eq!(status, StatusCode::CREATED);
    let po_id = po["purchase_order"]["id"].as_str().unwrap().to_string();
    assert_eq!(po["purchase_order"]["status"], "Pending");

    let (status, error) = post(
        &app,
        "/api/v1/aros",
        json!({
            "purchase_order_id": po_id,
            "lines": [{ "quote_product_id": line_a, "quantity_received": 4 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "quantity_exceeded");

    let (status, aro) = post(
        &app,
        "/api/v1/aros",
        json!({
            "purchase_order_id": po_id,
            "lines": [{ "quote_product_id": line_a, "quantity_received": 3 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(aro["purchase_order_status"], "Partially Delivered");

    let response = app
        .request(Method::DELETE, &format!("/api/v1/quotes/{}", quote_id), None)
        .await;
    let (status, error) = response_json(response).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error["kind"], "state_conflict");

    let (status, error) = get(&app, &format!("/api/v1/purchase-orders/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["kind"], "not_found");
}

#[tokio::test]
async fn invalid_payloads_are_rejected_before_any_write() {
    let app = TestApp::new().await;
    let (customer, a, _) = seed_over_http(&app).await;

    let (status, error) = post(
        &app,
        "/api/v1/quotes",
        json!({
            "customer_id": customer,
            "products": [{ "product_id": a, "quantity": 0 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["kind"], "validation_error");

    let (status, error) = post(
        &app,
        "/api/v1/quotes",
        json!({
            "customer_id": customer,
            "vat_rate": "20",
            "products": [{ "product_id": a, "quantity": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["kind"], "validation_error");

    let (status, error) = post(
        &app,
        "/api/v1/quotes",
        json!({
            "customer_id": Uuid::new_v4(),
            "products": [{ "product_id": a, "quantity": 1 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["kind"], "referential_integrity_error");

    let (_, body) = get(&app, "/api/v1/numbering/quote/next").await;
    assert_eq!(body["next_number"], format!("SNXQT{}00001", current_year()));
}

#[tokio::test]
async fn quote_document_carries_snapshots() {
    let app = TestApp::new().await;
    let (customer, a, b) = seed_over_http(&app).await;
    let (_, quote) = post(&app, "/api/v1/quotes", sample_quote(&customer, &a, &b)).await;
    let quote_id = quote["quote"]["id"].as_str().unwrap();

    let (status, document) = get(&app, &format!("/api/v1/quotes/{}/document", quote_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["customer"]["company_name"], "Http Buyer");
    assert_eq!(document["lines"].as_array().unwrap().len(), 2);
    assert!(document["warnings"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn request_id_is_echoed() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .uri("/api/v1/status")
        .header("x-request-id", "test-request-42")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "test-request-42"
    );
}

#[tokio::test]
async fn metrics_and_openapi_are_served() {
    let app = TestApp::new().await;
    let (customer, a, b) = seed_over_http(&app).await;
    post(&app, "/api/v1/quotes", sample_quote(&customer, &a, &b)).await;

    let response = app.request(Method::GET, "/metrics", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("documents_created_total"));

    let (status, document) = get(&app, "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(document["paths"]["/api/v1/quotes"].is_object());
}
