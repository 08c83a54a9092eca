mod common;

use assert_matches::assert_matches;
use common::{aro_request, delivery_note_request, po_from_quote, quote_request, TestApp};
use orderchain_api::{
    commands::{
        aros::{AroLineRequest, UpdateAroRequest},
        delivery_notes::{DnpLineUpdate, UpdateDeliveryNoteRequest},
        purchase_orders::{CreatePurchaseOrderRequest, PoLineRequest},
        quotes::QuoteView,
    },
    errors::ServiceError,
    models::{AroStatus, DeliveryNoteStatus},
    services::snapshot::DnpLineOverride,
};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Quote with a single product line of `quantity` units, ordered.
async fn ordered_quote(app: &TestApp, code: &str, quantity: i32) -> (QuoteView, Uuid) {
    let customer = app.seed_customer(&format!("Buyer {}", code)).await;
    let product = app.seed_product(code, dec!(10.00)).await;
    let quote = app
        .services()
        .quotes
        .create_quote(quote_request(customer.id, &[(product.id, quantity, None)]))
        .await
        .unwrap();
    let po = app
        .services()
        .purchase_orders
        .create_purchase_order(po_from_quote(quote.quote.id))
        .await
        .unwrap();
    (quote, po.purchase_order.id)
}

#[tokio::test]
async fn direct_purchase_order_snapshots_products() {
    let app = TestApp::new().await;
    let customer = app.seed_customer("Walk-in Buyer").await;
    let product = app.seed_product("DIR-1", dec!(18.00)).await;

    let po = app
        .services()
        .purchase_orders
        .create_purchase_order(CreatePurchaseOrderRequest {
            quote_id: None,
            customer_id: Some(customer.id),
            lines: vec![PoLineRequest {
                product_id: product.id,
                quantity: 2,
                unit_price: None,
            }],
            planned_delivery_date: None,
            actual_delivery_date: None,
            remarks: None,
            pdf_path: None,
            created_by: None,
        })
        .await
        .unwrap();

    assert!(po.purchase_order.quote_id.is_none());
    assert_eq!(
        po.purchase_order.attachment_file_name(),
        format!("{}.pdf", po.purchase_order.po_number)
    );
    assert_eq!(po.lines.len(), 1);
    assert_eq!(po.lines[0].quote_product_id, None);
    assert_eq!(po.lines[0].unit_price, dec!(18.00));
    assert_eq!(po.lines[0].total_line_price, dec!(36.00));
    assert_eq!(
        po.customer.as_ref().map(|c| c.company_name.as_str()),
        Some("Walk-in Buyer")
    );

    // Nothing on a quote-less order can be received against quote lines
    assert_matches!(
        app.services()
            .aros
            .create_aro(aro_request(po.purchase_order.id, &[(Uuid::new_v4(), 1)]))
            .await,
        Err(ServiceError::ReferentialIntegrity(_))
    );
}

#[tokio::test]
async fn purchase_order_shape_is_checked() {
    let app = TestApp::new().await;
    let (quote, _) = ordered_quote(&app, "SHP-1", 1).await;

    let mut mixed = po_from_quote(quote.quote.id);
    mixed.lines = vec![PoLineRequest {
        product_id: quote.lines[0].product_id,
        quantity: 1,
        unit_price: None,
    }];
    assert_matches!(
        app.services().purchase_orders.create_purchase_order(mixed).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut empty = po_from_quote(Uuid::new_v4());
    empty.quote_id = None;
    assert_matches!(
        app.services().purchase_orders.create_purchase_order(empty).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_matches!(
        app.services()
            .purchase_orders
            .create_purchase_order(po_from_quote(Uuid::new_v4()))
            .await,
        Err(ServiceError::ReferentialIntegrity(_))
    );
}

#[tokio::test]
async fn aro_update_is_bounded_without_counting_itself() {
    let app = TestApp::new().await;
    let (quote, po_id) = ordered_quote(&app, "UPD-1", 3).await;
    let line = quote.lines[0].id;

    let aro = app
        .services()
        .aros
        .create_aro(aro_request(po_id, &[(line, 2)]))
        .await
        .unwrap();

    let raised = app
        .services()
        .aros
        .update_aro(
            aro.aro.id,
            UpdateAroRequest {
                lines: Some(vec![AroLineRequest {
                    quote_product_id: line,
                    quantity_received: 3,
                    remarks: Some("Remaining unit arrived".to_string()),
                }]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(raised.lines.len(), 1);
    assert_eq!(raised.lines[0].quantity_received, 3);

    assert_matches!(
        app.services()
            .aros
            .update_aro(
                aro.aro.id,
                UpdateAroRequest {
                    lines: Some(vec![AroLineRequest {
                        quote_product_id: line,
                        quantity_received: 4,
                        remarks: None,
                    }]),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::QuantityExceeded(_))
    );
}

#[tokio::test]
async fn concurrent_aros_cannot_both_receive_the_full_order() {
    let app = TestApp::new().await;
    let (quote, po_id) = ordered_quote(&app, "RCV-1", 2).await;
    let line = quote.lines[0].id;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let aros = app.services().aros.clone();
        let request = aro_request(po_id, &[(line, 2)]);
        handles.push(tokio::spawn(async move { aros.create_aro(request).await }));
    }

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(err) => assert_matches!(err, ServiceError::QuantityExceeded(_)),
        }
    }
    assert_eq!(created, 1);
}

#[tokio::test]
async fn cancelled_aro_frees_its_receipts() {
    let app = TestApp::new().await;
    let (quote, po_id) = ordered_quote(&app, "CNL-1", 2).await;
    let line = quote.lines[0].id;

    let aro = app
        .services()
        .aros
        .create_aro(aro_request(po_id, &[(line, 2)]))
        .await
        .unwrap();
    let cancelled = app
        .services()
        .aros
        .update_aro(
            aro.aro.id,
            UpdateAroRequest {
                status: Some(AroStatus::Cancelled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(cancelled.aro.status, AroStatus::Cancelled);

    assert_matches!(
        app.services()
            .delivery_notes
            .create_delivery_note(delivery_note_request(aro.aro.id))
            .await,
        Err(ServiceError::StateConflict(_))
    );

    // The full quantity can be received again
    app.services()
        .aros
        .create_aro(aro_request(po_id, &[(line, 2)]))
        .await
        .unwrap();

    // A cancelled ARO stays cancelled
    assert_matches!(
        app.services()
            .aros
            .update_aro(
                aro.aro.id,
                UpdateAroRequest {
                    status: Some(AroStatus::Pending),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::StateConflict(_))
    );
}

#[tokio::test]
async fn delivery_note_quantities_stay_within_receipts() {
    let app = TestApp::new().await;
    let (quote, po_id) = ordered_quote(&app, "DNQ-1", 5).await;
    let aro = app
        .services()
        .aros
        .create_aro(aro_request(po_id, &[(quote.lines[0].id, 4)]))
        .await
        .unwrap();
    let aro_line = aro.lines[0].id;

    let mut too_many = delivery_note_request(aro.aro.id);
    too_many.lines = vec![DnpLineOverride {
        aro_product_id: aro_line,
        quantity_shipped: Some(5),
        serial_numbers: None,
        tracking_code: None,
    }];
    assert_matches!(
        app.services().delivery_notes.create_delivery_note(too_many).await,
        Err(ServiceError::QuantityExceeded(_))
    );

    let mut partial = delivery_note_request(aro.aro.id);
    partial.lines = vec![DnpLineOverride {
        aro_product_id: aro_line,
        quantity_shipped: Some(1),
        serial_numbers: Some("SN-0001".to_string()),
        tracking_code: Some("TRK-77".to_string()),
    }];
    let note = app
        .services()
        .delivery_notes
        .create_delivery_note(partial)
        .await
        .unwrap();
    assert_eq!(note.lines[0].quantity_shipped, 1);
    assert_eq!(note.lines[0].total_line_price, dec!(10.00));
    assert_eq!(note.lines[0].serial_numbers.as_deref(), Some("SN-0001"));

    let edited = app
        .services()
        .delivery_notes
        .update_delivery_note(
            note.delivery_note.id,
            UpdateDeliveryNoteRequest {
                lines: vec![DnpLineUpdate {
                    id: note.lines[0].id,
                    quantity_shipped: Some(4),
                    serial_numbers: None,
                    tracking_code: None,
                }],
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(edited.lines[0].quantity_shipped, 4);
    assert_eq!(edited.lines[0].total_line_price, dec!(40.00));

    assert_matches!(
        app.services()
            .delivery_notes
            .update_delivery_note(
                note.delivery_note.id,
                UpdateDeliveryNoteRequest {
                    lines: vec![DnpLineUpdate {
                        id: note.lines[0].id,
                        quantity_shipped: Some(6),
                        serial_numbers: None,
                        tracking_code: None,
                    }],
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::QuantityExceeded(_))
    );

    // Pending notes can still be withdrawn
    app.services()
        .delivery_notes
        .delete_delivery_note(note.delivery_note.id)
        .await
        .unwrap();
}

fn ship(aro_line: Uuid, quantity: i32) -> Vec<DnpLineOverride> {
    vec![DnpLineOverride {
        aro_product_id: aro_line,
        quantity_shipped: Some(quantity),
        serial_numbers: None,
        tracking_code: None,
    }]
}

fn set_status(status: DeliveryNoteStatus) -> UpdateDeliveryNoteRequest {
    UpdateDeliveryNoteRequest {
        status: Some(status),
        ..Default::default()
    }
}

#[tokio::test]
async fn notes_on_one_aro_share_its_receipts() {
    let app = TestApp::new().await;
    let services = app.services();
    let (quote, po_id) = ordered_quote(&app, "SHR-1", 3).await;
    let aro = services
        .aros
        .create_aro(aro_request(po_id, &[(quote.lines[0].id, 3)]))
        .await
        .unwrap();
    let aro_line = aro.lines[0].id;

    let first = services
        .delivery_notes
        .create_delivery_note(delivery_note_request(aro.aro.id))
        .await
        .unwrap();
    assert_eq!(first.lines[0].quantity_shipped, 3);

    // Everything received is already on the first note
    assert_matches!(
        services
            .delivery_notes
            .create_delivery_note(delivery_note_request(aro.aro.id))
            .await,
        Err(ServiceError::StateConflict(_))
    );

    let cancelled = services
        .delivery_notes
        .update_delivery_note(first.delivery_note.id, set_status(DeliveryNoteStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(cancelled.delivery_note.status, DeliveryNoteStatus::Cancelled);

    let mut too_many = delivery_note_request(aro.aro.id);
    too_many.lines = ship(aro_line, 4);
    assert_matches!(
        services.delivery_notes.create_delivery_note(too_many).await,
        Err(ServiceError::QuantityExceeded(_))
    );

    let mut one = delivery_note_request(aro.aro.id);
    one.lines = ship(aro_line, 1);
    let second = services
        .delivery_notes
        .create_delivery_note(one)
        .await
        .unwrap();
    assert_eq!(second.lines[0].quantity_shipped, 1);

    // The rest defaults to what the second note leaves over
    let third = services
        .delivery_notes
        .create_delivery_note(delivery_note_request(aro.aro.id))
        .await
        .unwrap();
    assert_eq!(third.lines[0].quantity_shipped, 2);
    assert_eq!(third.lines[0].total_line_price, dec!(20.00));

    // Raising the second note would ship more than was received
    assert_matches!(
        services
            .delivery_notes
            .update_delivery_note(
                second.delivery_note.id,
                UpdateDeliveryNoteRequest {
                    lines: vec![DnpLineUpdate {
                        id: second.lines[0].id,
                        quantity_shipped: Some(2),
                        serial_numbers: None,
                        tracking_code: None,
                    }],
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::QuantityExceeded(_))
    );
}

#[tokio::test]
async fn closed_notes_keep_their_status() {
    let app = TestApp::new().await;
    let services = app.services();
    let (quote, po_id) = ordered_quote(&app, "CLS-1", 2).await;
    let aro = services
        .aros
        .create_aro(aro_request(po_id, &[(quote.lines[0].id, 2)]))
        .await
        .unwrap();

    let cancelled = services
        .delivery_notes
        .create_delivery_note(delivery_note_request(aro.aro.id))
        .await
        .unwrap();
    let cancelled = services
        .delivery_notes
        .update_delivery_note(
            cancelled.delivery_note.id,
            set_status(DeliveryNoteStatus::Cancelled),
        )
        .await
        .unwrap();
    assert_matches!(
        services
            .delivery_notes
            .update_delivery_note(
                cancelled.delivery_note.id,
                set_status(DeliveryNoteStatus::Delivered),
            )
            .await,
        Err(ServiceError::StateConflict(_))
    );

    let returned = services
        .delivery_notes
        .create_delivery_note(delivery_note_request(aro.aro.id))
        .await
        .unwrap();
    services
        .delivery_notes
        .update_delivery_note(returned.delivery_note.id, set_status(DeliveryNoteStatus::Delivered))
        .await
        .unwrap();
    let returned = services
        .delivery_notes
        .update_delivery_note(returned.delivery_note.id, set_status(DeliveryNoteStatus::Returned))
        .await
        .unwrap();
    let aro_status = returned.aro_status;
    assert_matches!(
        services
            .delivery_notes
            .update_delivery_note(
                returned.delivery_note.id,
                set_status(DeliveryNoteStatus::Delivered),
            )
            .await,
        Err(ServiceError::StateConflict(_))
    );

    // Returned goods can be shipped again on a fresh note
    let reshipped = services
        .delivery_notes
        .create_delivery_note(delivery_note_request(aro.aro.id))
        .await
        .unwrap();
    assert_eq!(reshipped.lines[0].quantity_shipped, 2);
    assert_eq!(reshipped.aro_status, aro_status);
}
