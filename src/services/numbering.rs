//! Year-scoped document numbering.
//!
//! Every document kind owns one counter row per year in `document_sequences`.
//! Allocation increments that row inside the caller's transaction, so the
//! row lock taken by the `UPDATE` serialises concurrent creators. A missing row
//! is seeded from the greatest number already stored, which keeps numbering
//! continuous for data written before the counter existed.

use crate::{
    db::is_unique_violation,
    errors::ServiceError,
    metrics,
    models::{
        aro_entity, delivery_note_entity,
        document_sequence_entity::{self, DocumentKind},
        invoice_entity, purchase_order_entity, quote_entity,
    },
};
use chrono::{Datelike, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::future::Future;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// Largest sequence that fits the five-digit suffix.
pub const MAX_SEQUENCE: i32 = 99_999;

const SEQUENCE_WIDTH: usize = 5;

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Everything in a document number that precedes the sequence digits.
pub fn number_stem(prefix: &str, kind: DocumentKind, year: i32) -> String {
    match kind {
        DocumentKind::Quote => format!("{}QT{}", prefix, year),
        DocumentKind::PurchaseOrder => format!("{}-PO-{}-", prefix, year),
        DocumentKind::Aro => format!("{}-ARO-{}-", prefix, year),
        DocumentKind::DeliveryNote => format!("{}-DN-{}-", prefix, year),
        DocumentKind::Invoice => format!("{}-INV-{}-", prefix, year),
    }
}

pub fn format_number(
    prefix: &str,
    kind: DocumentKind,
    year: i32,
    sequence: i32,
) -> Result<String, ServiceError> {
    if !(1..=MAX_SEQUENCE).contains(&sequence) {
        return Err(ServiceError::DataIntegrity(format!(
            "{} sequence {} for {} does not fit {} digits",
            kind, sequence, year, SEQUENCE_WIDTH
        )));
    }
    Ok(format!(
        "{}{:0width$}",
        number_stem(prefix, kind, year),
        sequence,
        width = SEQUENCE_WIDTH
    ))
}

/// Reads the sequence back out of a stored number. Anything that does not
/// match the kind's format exactly is corrupt data.
pub fn parse_sequence(
    prefix: &str,
    kind: DocumentKind,
    year: i32,
    number: &str,
) -> Result<i32, ServiceError> {
    let corrupt = || {
        ServiceError::DataIntegrity(format!(
            "stored {} number '{}' does not match the expected format",
            kind, number
        ))
    };

    let digits = number
        .strip_prefix(&number_stem(prefix, kind, year))
        .ok_or_else(corrupt)?;
    if digits.len() != SEQUENCE_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(corrupt());
    }
    digits.parse::<i32>().map_err(|_| corrupt())
}

/// Maps a failed document insert. A duplicate number means another writer won
/// the race, which the caller retries.
pub fn map_insert_error(kind: DocumentKind, err: DbErr) -> ServiceError {
    if is_unique_violation(&err) {
        warn!(%kind, error = %err, "Document number already taken");
        ServiceError::NumberGenerationConflict(format!("{} number already in use", kind))
    } else {
        error!(%kind, error = %err, "Failed to insert document");
        ServiceError::db_error(err)
    }
}

macro_rules! greatest_number {
    ($conn:expr, $entity:ident, $column:ident, $stem:expr) => {
        $entity::Entity::find()
            .select_only()
            .column($entity::Column::$column)
            .filter($entity::Column::$column.starts_with($stem))
            .order_by_desc($entity::Column::$column)
            .into_tuple::<String>()
            .one($conn)
            .await
    };
}

async fn greatest_existing_number<C: ConnectionTrait>(
    conn: &C,
    kind: DocumentKind,
    stem: &str,
) -> Result<Option<String>, DbErr> {
    match kind {
        DocumentKind::Quote => greatest_number!(conn, quote_entity, QuoteNumber, stem),
        DocumentKind::PurchaseOrder => {
            greatest_number!(conn, purchase_order_entity, PoNumber, stem)
        }
        DocumentKind::Aro => greatest_number!(conn, aro_entity, AroNumber, stem),
        DocumentKind::DeliveryNote => {
            greatest_number!(conn, delivery_note_entity, DnpNumber, stem)
        }
        DocumentKind::Invoice => greatest_number!(conn, invoice_entity, InvoiceNumber, stem),
    }
}

/// Highest sequence already used by stored documents, 0 when there are none.
async fn seed_from_existing<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    kind: DocumentKind,
    year: i32,
) -> Result<i32, ServiceError> {
    let stem = number_stem(prefix, kind, year);
    let greatest = greatest_existing_number(conn, kind, &stem)
        .await
        .map_err(ServiceError::db_error)?;
    match greatest {
        Some(number) => parse_sequence(prefix, kind, year, &number),
        None => Ok(0),
    }
}

async fn find_counter<C: ConnectionTrait>(
    conn: &C,
    kind: DocumentKind,
    year: i32,
) -> Result<Option<document_sequence_entity::Model>, ServiceError> {
    document_sequence_entity::Entity::find()
        .filter(document_sequence_entity::Column::Kind.eq(kind))
        .filter(document_sequence_entity::Column::Year.eq(year))
        .one(conn)
        .await
        .map_err(ServiceError::db_error)
}

/// Allocates the next number for `kind` in `year`. Must run inside the
/// transaction that inserts the document, so a rollback returns the number.
#[instrument(skip(conn))]
pub async fn next_number<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    kind: DocumentKind,
    year: i32,
) -> Result<String, ServiceError> {
    let now = Utc::now();
    let updated = document_sequence_entity::Entity::update_many()
        .col_expr(
            document_sequence_entity::Column::LastValue,
            Expr::col(document_sequence_entity::Column::LastValue).add(1),
        )
        .col_expr(document_sequence_entity::Column::UpdatedAt, Expr::value(now))
        .filter(document_sequence_entity::Column::Kind.eq(kind))
        .filter(document_sequence_entity::Column::Year.eq(year))
        .exec(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let sequence = if updated.rows_affected == 0 {
        let seed = seed_from_existing(conn, prefix, kind, year).await?;
        let next = seed + 1;
        debug!(%kind, year, seed, "Seeding document counter");
        document_sequence_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            kind: Set(kind),
            year: Set(year),
            last_value: Set(next),
            updated_at: Set(now),
        }
        .insert(conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ServiceError::NumberGenerationConflict(format!(
                    "{} counter for {} created concurrently",
                    kind, year
                ))
            } else {
                ServiceError::db_error(e)
            }
        })?;
        next
    } else {
        find_counter(conn, kind, year)
            .await?
            .map(|row| row.last_value)
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "{} counter for {} vanished after increment",
                    kind, year
                ))
            })?
    };

    format_number(prefix, kind, year, sequence)
}

/// Number the next creation would receive. Nothing is reserved.
pub async fn peek_next_number<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
    kind: DocumentKind,
    year: i32,
) -> Result<String, ServiceError> {
    let last = match find_counter(conn, kind, year).await? {
        Some(row) => row.last_value,
        None => seed_from_existing(conn, prefix, kind, year).await?,
    };
    format_number(prefix, kind, year, last + 1)
}

/// Runs `attempt` until it stops failing with a number conflict. Each call
/// must open and commit its own transaction.
pub async fn with_number_retry<T, F, Fut>(
    kind: DocumentKind,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, ServiceError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let max_attempts = max_attempts.max(1);
    let mut current = 1;
    loop {
        match attempt(current).await {
            Err(ServiceError::NumberGenerationConflict(detail)) => {
                metrics::record_number_retry(kind);
                if current >= max_attempts {
                    error!(%kind, attempts = current, %detail, "Giving up on number allocation");
                    return Err(ServiceError::ServerError(format!(
                        "could not allocate a {} number after {} attempts",
                        kind, current
                    )));
                }
                warn!(%kind, attempt = current, %detail, "Number conflict, retrying");
                current += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::cell::Cell;
    use test_case::test_case;

    #[test_case(DocumentKind::Quote, "SNXQT202400007")]
    #[test_case(DocumentKind::PurchaseOrder, "SNX-PO-2024-00007")]
    #[test_case(DocumentKind::Aro, "SNX-ARO-2024-00007")]
    #[test_case(DocumentKind::DeliveryNote, "SNX-DN-2024-00007")]
    #[test_case(DocumentKind::Invoice, "SNX-INV-2024-00007")]
    fn formats_each_kind(kind: DocumentKind, expected: &str) {
        assert_eq!(format_number("SNX", kind, 2024, 7).unwrap(), expected);
        assert_eq!(parse_sequence("SNX", kind, 2024, expected).unwrap(), 7);
    }

    #[test_case("SNX-PO-2024-0007" ; "too short")]
    #[test_case("SNX-PO-2024-00A07" ; "non digit")]
    #[test_case("SNX-PO-2023-00007" ; "other year")]
    #[test_case("SNX-PO-2024-000070" ; "too long")]
    fn rejects_corrupt_numbers(number: &str) {
        assert_matches!(
            parse_sequence("SNX", DocumentKind::PurchaseOrder, 2024, number),
            Err(ServiceError::DataIntegrity(_))
        );
    }

    #[test]
    fn sequence_overflow_is_a_data_integrity_error() {
        assert!(format_number("SNX", DocumentKind::Invoice, 2024, MAX_SEQUENCE).is_ok());
        assert_matches!(
            format_number("SNX", DocumentKind::Invoice, 2024, MAX_SEQUENCE + 1),
            Err(ServiceError::DataIntegrity(_))
        );
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        assert_eq!(
            format_number("ACME", DocumentKind::Quote, 2025, 1).unwrap(),
            "ACMEQT202500001"
        );
    }

    #[tokio::test]
    async fn retries_conflicts_then_succeeds() {
        let calls = Cell::new(0);
        let result = with_number_retry(DocumentKind::Aro, 3, |attempt| {
            calls.set(calls.get() + 1);
            async move {
                if attempt < 3 {
                    Err(ServiceError::NumberGenerationConflict("taken".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_surface_as_server_error() {
        let result: Result<(), _> = with_number_retry(DocumentKind::Quote, 2, |_| async {
            Err(ServiceError::NumberGenerationConflict("taken".into()))
        })
        .await;
        assert_matches!(result, Err(ServiceError::ServerError(_)));
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = with_number_retry(DocumentKind::Quote, 5, |_| {
            calls.set(calls.get() + 1);
            async { Err(ServiceError::StateConflict("paid".into())) }
        })
        .await;
        assert_matches!(result, Err(ServiceError::StateConflict(_)));
        assert_eq!(calls.get(), 1);
    }
}
