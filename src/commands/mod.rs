use crate::{
    db::DbPool,
    errors::ServiceError,
    events::{Event, EventSender},
    metrics,
    models::DocumentKind,
    services::{calculator::MAX_MONEY, snapshot::SnapshotWarning},
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;
use validator::ValidationError;

pub mod aros;
pub mod delivery_notes;
pub mod invoices;
pub mod purchase_orders;
pub mod quotes;

/// Command trait for implementing the Command Pattern
///
/// A command validates its input, runs its writes in one transaction, and
/// publishes domain events once that transaction has committed.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

/// Result of a delete command
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResult {
    pub id: Uuid,
    pub deleted: bool,
}

pub(crate) async fn begin(db: &DbPool) -> Result<DatabaseTransaction, ServiceError> {
    db.begin().await.map_err(|e| {
        error!(error = %e, "Failed to start transaction");
        ServiceError::db_error(e)
    })
}

pub(crate) async fn commit(txn: DatabaseTransaction) -> Result<(), ServiceError> {
    txn.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit transaction");
        ServiceError::db_error(e)
    })
}

/// Commits on success and rolls back on error, returning the work's outcome.
pub(crate) async fn finish<T>(
    txn: DatabaseTransaction,
    outcome: Result<T, ServiceError>,
) -> Result<T, ServiceError> {
    match outcome {
        Ok(value) => {
            commit(txn).await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(e) = txn.rollback().await {
                error!(error = %e, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Counts a failed command against its document kind and passes the error on.
pub(crate) fn track_failure(kind: DocumentKind, err: ServiceError) -> ServiceError {
    metrics::record_command_failure(kind, err.kind());
    err
}

pub(crate) fn snapshot_gap_events(
    kind: DocumentKind,
    document_id: Uuid,
    warnings: &[SnapshotWarning],
) -> Vec<Event> {
    metrics::record_snapshot_gaps(kind, warnings.len());
    warnings
        .iter()
        .map(|w| Event::SnapshotGapDetected {
            kind,
            document_id,
            source_id: w.source_id,
            reason: w.message.clone(),
        })
        .collect()
}

/// Money input: not negative, at most two decimals, and small enough for a
/// `decimal(15, 2)` column.
pub(crate) fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("more_than_two_decimals"));
    }
    if *value > MAX_MONEY {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

pub(crate) fn validate_rate(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() || *value > Decimal::ONE {
        return Err(ValidationError::new("rate_out_of_range"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use test_case::test_case;

    #[test_case(dec!(0) ; "zero")]
    #[test_case(dec!(19.99) ; "cents")]
    #[test_case(dec!(12.500) ; "trailing zero")]
    #[test_case(dec!(9999999999999.99) ; "column maximum")]
    fn money_inputs_that_fit_storage(value: Decimal) {
        assert!(validate_money(&value).is_ok());
    }

    #[test_case(dec!(-0.01) ; "negative")]
    #[test_case(dec!(0.335) ; "three decimals")]
    #[test_case(dec!(10000000000000) ; "too large")]
    fn money_inputs_that_do_not(value: Decimal) {
        assert!(validate_money(&value).is_err());
    }
}
