//! Snapshot builders. Each one copies a fixed field list from its source at
//! call time; later edits to the source never reach the copy.
//!
//! Predecessor data that cannot be found is handled in exactly two places:
//! [`collect_snapshots`] for line items and [`ensure_quote_customer`] for the
//! one-per-quote customer copy. Both report what they did as
//! [`SnapshotWarning`]s instead of failing the document.

use crate::{
    errors::ServiceError,
    models::{
        aro_product_entity, customer_entity, dnp_product_entity, invoice_line_entity,
        po_customer_entity, po_product_entity, product_entity, quote_customer_entity,
        quote_entity, quote_product_entity,
    },
    services::calculator::{line_total, line_vat},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A predecessor record that was missing while a document was derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SnapshotWarning {
    /// Id of the source row that could not be snapshotted
    pub source_id: Uuid,
    pub message: String,
}

#[derive(Debug)]
pub struct SnapshotOutcome<T> {
    pub records: Vec<T>,
    pub warnings: Vec<SnapshotWarning>,
}

/// Builds one snapshot per source. `resolve` looks up whatever else the
/// snapshot needs; when it comes back empty the source is skipped and a
/// warning is recorded.
pub fn collect_snapshots<S, P, R>(
    sources: &[S],
    source_id: impl Fn(&S) -> Uuid,
    resolve: impl Fn(&S) -> Result<P, String>,
    mut build: impl FnMut(&S, P) -> R,
) -> SnapshotOutcome<R> {
    let mut records = Vec::with_capacity(sources.len());
    let mut warnings = Vec::new();

    for source in sources {
        match resolve(source) {
            Ok(resolved) => records.push(build(source, resolved)),
            Err(message) => {
                let id = source_id(source);
                warn!(source_id = %id, %message, "Skipping line with missing predecessor data");
                warnings.push(SnapshotWarning {
                    source_id: id,
                    message,
                });
            }
        }
    }

    SnapshotOutcome { records, warnings }
}

pub fn quote_customer(
    quote_id: Uuid,
    customer: &customer_entity::Model,
    now: DateTime<Utc>,
) -> quote_customer_entity::ActiveModel {
    quote_customer_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        quote_id: Set(quote_id),
        customer_id: Set(customer.id),
        company_name: Set(customer.company_name.clone()),
        contact_name: Set(customer.contact_name.clone()),
        email: Set(customer.email.clone()),
        phone: Set(customer.phone.clone()),
        address: Set(customer.address.clone()),
        vat_number: Set(customer.vat_number.clone()),
        created_at: Set(now),
    }
}

pub fn quote_product(
    quote_id: Uuid,
    product: &product_entity::Model,
    quantity: i32,
    unit_price: Decimal,
    now: DateTime<Utc>,
) -> quote_product_entity::ActiveModel {
    quote_product_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        quote_id: Set(quote_id),
        product_id: Set(product.id),
        product_code: Set(product.product_code.clone()),
        name: Set(product.name.clone()),
        description: Set(product.description.clone()),
        technical_specs: Set(product.technical_specs.clone()),
        commercial_terms: Set(product.commercial_terms.clone()),
        payment_terms: Set(product.payment_terms.clone()),
        min_delivery_day: Set(product.min_delivery_day),
        max_delivery_day: Set(product.max_delivery_day),
        availability_yrs: Set(product.availability_yrs),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        total_line_price: Set(line_total(quantity, unit_price)),
        created_at: Set(now),
    }
}

pub fn po_customer_from_quote_customer(
    purchase_order_id: Uuid,
    source: &quote_customer_entity::Model,
    now: DateTime<Utc>,
) -> po_customer_entity::ActiveModel {
    po_customer_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        customer_id: Set(source.customer_id),
        company_name: Set(source.company_name.clone()),
        contact_name: Set(source.contact_name.clone()),
        email: Set(source.email.clone()),
        phone: Set(source.phone.clone()),
        address: Set(source.address.clone()),
        vat_number: Set(source.vat_number.clone()),
        created_at: Set(now),
    }
}

pub fn po_customer_from_customer(
    purchase_order_id: Uuid,
    customer: &customer_entity::Model,
    now: DateTime<Utc>,
) -> po_customer_entity::ActiveModel {
    po_customer_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        customer_id: Set(customer.id),
        company_name: Set(customer.company_name.clone()),
        contact_name: Set(customer.contact_name.clone()),
        email: Set(customer.email.clone()),
        phone: Set(customer.phone.clone()),
        address: Set(customer.address.clone()),
        vat_number: Set(customer.vat_number.clone()),
        created_at: Set(now),
    }
}

/// PO line copied from the quote line, keeping the quoted terms.
pub fn po_product_from_quote_product(
    purchase_order_id: Uuid,
    source: &quote_product_entity::Model,
    now: DateTime<Utc>,
) -> po_product_entity::ActiveModel {
    po_product_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        quote_product_id: Set(Some(source.id)),
        product_id: Set(source.product_id),
        product_code: Set(source.product_code.clone()),
        name: Set(source.name.clone()),
        description: Set(source.description.clone()),
        technical_specs: Set(source.technical_specs.clone()),
        commercial_terms: Set(source.commercial_terms.clone()),
        payment_terms: Set(source.payment_terms.clone()),
        min_delivery_day: Set(source.min_delivery_day),
        max_delivery_day: Set(source.max_delivery_day),
        availability_yrs: Set(source.availability_yrs),
        quantity: Set(source.quantity),
        unit_price: Set(source.unit_price),
        total_line_price: Set(line_total(source.quantity, source.unit_price)),
        created_at: Set(now),
    }
}

pub fn po_product_from_product(
    purchase_order_id: Uuid,
    product: &product_entity::Model,
    quantity: i32,
    unit_price: Decimal,
    now: DateTime<Utc>,
) -> po_product_entity::ActiveModel {
    po_product_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        purchase_order_id: Set(purchase_order_id),
        quote_product_id: Set(None),
        product_id: Set(product.id),
        product_code: Set(product.product_code.clone()),
        name: Set(product.name.clone()),
        description: Set(product.description.clone()),
        technical_specs: Set(product.technical_specs.clone()),
        commercial_terms: Set(product.commercial_terms.clone()),
        payment_terms: Set(product.payment_terms.clone()),
        min_delivery_day: Set(product.min_delivery_day),
        max_delivery_day: Set(product.max_delivery_day),
        availability_yrs: Set(product.availability_yrs),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        total_line_price: Set(line_total(quantity, unit_price)),
        created_at: Set(now),
    }
}

/// Shipment details captured for one ARO line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DnpLineOverride {
    pub aro_product_id: Uuid,
    #[validate(range(min = 0, max = 1000000))]
    pub quantity_shipped: Option<i32>,
    pub serial_numbers: Option<String>,
    #[validate(length(max = 255))]
    pub tracking_code: Option<String>,
}

/// Delivery note lines: one per ARO line whose quote line is also on the PO
/// and that still has received units left to ship. `already_shipped` holds,
/// per ARO line, what the ARO's other live notes ship. Shipped quantity
/// defaults to everything still remaining.
pub fn dnp_products(
    delivery_note_id: Uuid,
    aro_lines: &[aro_product_entity::Model],
    po_lines: &[po_product_entity::Model],
    already_shipped: &HashMap<Uuid, i32>,
    overrides: &[DnpLineOverride],
    now: DateTime<Utc>,
) -> Result<SnapshotOutcome<dnp_product_entity::ActiveModel>, ServiceError> {
    let remaining = |aro_line: &aro_product_entity::Model| {
        let shipped = already_shipped.get(&aro_line.id).copied().unwrap_or(0);
        aro_line.quantity_received.saturating_sub(shipped).max(0)
    };

    let mut by_aro_line: HashMap<Uuid, &DnpLineOverride> = HashMap::new();
    for line in overrides {
        let Some(aro_line) = aro_lines.iter().find(|a| a.id == line.aro_product_id) else {
            return Err(ServiceError::ReferentialIntegrity(format!(
                "ARO line {} does not belong to this ARO",
                line.aro_product_id
            )));
        };
        if let Some(shipped) = line.quantity_shipped {
            let left = remaining(aro_line);
            if shipped > left {
                return Err(ServiceError::QuantityExceeded(format!(
                    "ARO line {} ships {} but only {} of {} received remain",
                    aro_line.id, shipped, left, aro_line.quantity_received
                )));
            }
        }
        by_aro_line.insert(line.aro_product_id, line);
    }

    let po_by_quote_line: HashMap<Uuid, &po_product_entity::Model> = po_lines
        .iter()
        .filter_map(|p| p.quote_product_id.map(|qp| (qp, p)))
        .collect();

    Ok(collect_snapshots(
        aro_lines,
        |aro_line| aro_line.id,
        |aro_line| {
            let po_line = po_by_quote_line
                .get(&aro_line.quote_product_id)
                .copied()
                .ok_or_else(|| {
                    format!(
                        "no purchase order line for quote line {}",
                        aro_line.quote_product_id
                    )
                })?;
            match remaining(aro_line) {
                0 => Err(format!("ARO line {} has nothing left to ship", aro_line.id)),
                left => Ok((po_line, left)),
            }
        },
        |aro_line, (po_line, left)| {
            let details = by_aro_line.get(&aro_line.id);
            let quantity = details.and_then(|d| d.quantity_shipped).unwrap_or(left);
            dnp_product_entity::ActiveModel {
                id: Set(Uuid::new_v4()),
                delivery_note_id: Set(delivery_note_id),
                aro_product_id: Set(aro_line.id),
                po_product_id: Set(po_line.id),
                quote_product_id: Set(aro_line.quote_product_id),
                product_id: Set(po_line.product_id),
                product_code: Set(po_line.product_code.clone()),
                name: Set(po_line.name.clone()),
                description: Set(po_line.description.clone()),
                quantity_shipped: Set(quantity),
                unit_price: Set(po_line.unit_price),
                total_line_price: Set(line_total(quantity, po_line.unit_price)),
                serial_numbers: Set(details.and_then(|d| d.serial_numbers.clone())),
                tracking_code: Set(details.and_then(|d| d.tracking_code.clone())),
                created_at: Set(now),
            }
        },
    ))
}

struct InvoiceLineSource<'a> {
    quote_product_id: Option<Uuid>,
    dnp_product_id: Option<Uuid>,
    product_code: &'a str,
    name: &'a str,
    description: Option<&'a String>,
    quantity: i32,
    unit_price: Decimal,
}

fn invoice_line(
    invoice_id: Uuid,
    source: InvoiceLineSource<'_>,
    vat_rate: Decimal,
    now: DateTime<Utc>,
) -> invoice_line_entity::ActiveModel {
    let vat = line_vat(source.quantity, source.unit_price, vat_rate);
    invoice_line_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        invoice_id: Set(invoice_id),
        quote_product_id: Set(source.quote_product_id),
        dnp_product_id: Set(source.dnp_product_id),
        product_code: Set(source.product_code.to_string()),
        name: Set(source.name.to_string()),
        description: Set(source.description.cloned()),
        quantity_invoiced: Set(source.quantity),
        unit_price: Set(source.unit_price),
        total_ht: Set(vat.total_ht),
        vat_amount: Set(vat.vat_amount),
        reduction: Set(Decimal::ZERO),
        line_total: Set(vat.line_total),
        created_at: Set(now),
    }
}

/// Invoice lines at the quoted quantities.
pub fn invoice_lines_from_quote(
    invoice_id: Uuid,
    quote_lines: &[quote_product_entity::Model],
    vat_rate: Decimal,
    now: DateTime<Utc>,
) -> SnapshotOutcome<invoice_line_entity::ActiveModel> {
    collect_snapshots(
        quote_lines,
        |line| line.id,
        |_| Ok(()),
        |line, ()| {
            invoice_line(
                invoice_id,
                InvoiceLineSource {
                    quote_product_id: Some(line.id),
                    dnp_product_id: None,
                    product_code: &line.product_code,
                    name: &line.name,
                    description: line.description.as_ref(),
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                },
                vat_rate,
                now,
            )
        },
    )
}

/// Invoice lines at the shipped quantities. Lines that shipped nothing are
/// left off the invoice.
pub fn invoice_lines_from_delivery_note(
    invoice_id: Uuid,
    shipped_lines: &[dnp_product_entity::Model],
    vat_rate: Decimal,
    now: DateTime<Utc>,
) -> SnapshotOutcome<invoice_line_entity::ActiveModel> {
    collect_snapshots(
        shipped_lines,
        |line| line.id,
        |line| {
            if line.quantity_shipped > 0 {
                Ok(())
            } else {
                Err(format!("{} was not shipped on this note", line.product_code))
            }
        },
        |line, ()| {
            invoice_line(
                invoice_id,
                InvoiceLineSource {
                    quote_product_id: Some(line.quote_product_id),
                    dnp_product_id: Some(line.id),
                    product_code: &line.product_code,
                    name: &line.name,
                    description: line.description.as_ref(),
                    quantity: line.quantity_shipped,
                    unit_price: line.unit_price,
                },
                vat_rate,
                now,
            )
        },
    )
}

/// Returns the quote's customer snapshot, taking it from the live customer
/// record when the quote never got one.
pub async fn ensure_quote_customer<C: ConnectionTrait>(
    conn: &C,
    quote: &quote_entity::Model,
) -> Result<(quote_customer_entity::Model, Option<SnapshotWarning>), ServiceError> {
    let existing = quote_customer_entity::Entity::find()
        .filter(quote_customer_entity::Column::QuoteId.eq(quote.id))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?;
    if let Some(snapshot) = existing {
        return Ok((snapshot, None));
    }

    let customer = customer_entity::Entity::find_by_id(quote.customer_id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::ReferentialIntegrity(format!(
                "customer {} of quote {} no longer exists",
                quote.customer_id, quote.quote_number
            ))
        })?;

    warn!(quote_id = %quote.id, "Quote had no customer snapshot, taking one now");
    let snapshot = quote_customer(quote.id, &customer, Utc::now())
        .insert(conn)
        .await
        .map_err(ServiceError::db_error)?;

    Ok((
        snapshot,
        Some(SnapshotWarning {
            source_id: customer.id,
            message: format!(
                "quote {} had no customer snapshot; taken from current customer data",
                quote.quote_number
            ),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn aro_line(quote_product_id: Uuid, received: i32) -> aro_product_entity::Model {
        aro_product_entity::Model {
            id: Uuid::new_v4(),
            aro_id: Uuid::new_v4(),
            quote_product_id,
            quantity_received: received,
            remarks: None,
            created_at: Utc::now(),
        }
    }

    fn po_line(quote_product_id: Uuid, price: Decimal) -> po_product_entity::Model {
        po_product_entity::Model {
            id: Uuid::new_v4(),
            purchase_order_id: Uuid::new_v4(),
            quote_product_id: Some(quote_product_id),
            product_id: Uuid::new_v4(),
            product_code: "SNX-A".into(),
            name: "Analyser".into(),
            description: None,
            technical_specs: None,
            commercial_terms: None,
            payment_terms: None,
            min_delivery_day: None,
            max_delivery_day: None,
            availability_yrs: None,
            quantity: 3,
            unit_price: price,
            total_line_price: price * Decimal::from(3),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn unmatched_aro_lines_become_warnings() {
        let matched = Uuid::new_v4();
        let orphan = Uuid::new_v4();
        let aro = vec![aro_line(matched, 3), aro_line(orphan, 1)];
        let po = vec![po_line(matched, dec!(100))];

        let outcome =
            dnp_products(Uuid::new_v4(), &aro, &po, &HashMap::new(), &[], Utc::now()).unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].source_id, aro[1].id);
        let line = &outcome.records[0];
        assert_eq!(line.quantity_shipped, Set(3));
        assert_eq!(line.total_line_price, Set(dec!(300.00)));
    }

    #[test]
    fn shipping_more_than_received_is_rejected() {
        let qp = Uuid::new_v4();
        let aro = vec![aro_line(qp, 2)];
        let po = vec![po_line(qp, dec!(10))];
        let overrides = vec![DnpLineOverride {
            aro_product_id: aro[0].id,
            quantity_shipped: Some(3),
            serial_numbers: None,
            tracking_code: None,
        }];
        assert_matches!(
            dnp_products(Uuid::new_v4(), &aro, &po, &HashMap::new(), &overrides, Utc::now()),
            Err(ServiceError::QuantityExceeded(_))
        );
    }

    #[test]
    fn earlier_shipments_reduce_what_is_left() {
        let partly = Uuid::new_v4();
        let exhausted = Uuid::new_v4();
        let aro = vec![aro_line(partly, 3), aro_line(exhausted, 2)];
        let po = vec![po_line(partly, dec!(10)), po_line(exhausted, dec!(10))];
        let shipped = HashMap::from([(aro[0].id, 1), (aro[1].id, 2)]);

        let outcome =
            dnp_products(Uuid::new_v4(), &aro, &po, &shipped, &[], Utc::now()).unwrap();
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].quantity_shipped, Set(2));
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].source_id, aro[1].id);

        let overrides = vec![DnpLineOverride {
            aro_product_id: aro[0].id,
            quantity_shipped: Some(3),
            serial_numbers: None,
            tracking_code: None,
        }];
        assert_matches!(
            dnp_products(Uuid::new_v4(), &aro, &po, &shipped, &overrides, Utc::now()),
            Err(ServiceError::QuantityExceeded(_))
        );
    }

    #[test]
    fn override_for_foreign_line_is_rejected() {
        let qp = Uuid::new_v4();
        let aro = vec![aro_line(qp, 2)];
        let overrides = vec![DnpLineOverride {
            aro_product_id: Uuid::new_v4(),
            quantity_shipped: None,
            serial_numbers: Some("SN-1".into()),
            tracking_code: None,
        }];
        assert_matches!(
            dnp_products(Uuid::new_v4(), &aro, &[], &HashMap::new(), &overrides, Utc::now()),
            Err(ServiceError::ReferentialIntegrity(_))
        );
    }

    #[test]
    fn zero_shipped_lines_are_left_off_invoices() {
        let shipped = dnp_product_entity::Model {
            id: Uuid::new_v4(),
            delivery_note_id: Uuid::new_v4(),
            aro_product_id: Uuid::new_v4(),
            po_product_id: Uuid::new_v4(),
            quote_product_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_code: "SNX-B".into(),
            name: "Sensor".into(),
            description: None,
            quantity_shipped: 0,
            unit_price: dec!(50),
            total_line_price: dec!(0),
            serial_numbers: None,
            tracking_code: None,
            created_at: Utc::now(),
        };
        let outcome =
            invoice_lines_from_delivery_note(Uuid::new_v4(), &[shipped], dec!(0.2), Utc::now());
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
