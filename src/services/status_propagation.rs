//! Recomputes a parent document's delivery status from its children.
//!
//! Commands call the recompute functions once, inside the transaction of the
//! child mutation. The rule counts line presence rather than quantities: a line
//! with any receipt (or any shipment) counts as covered. Propagation only ever
//! moves a status forward; cancelled parents are left alone.

use crate::{
    db::supports_row_locks,
    errors::ServiceError,
    events::Event,
    models::{
        aro_entity::{self, AroStatus},
        aro_product_entity,
        delivery_note_entity::{self, DeliveryNoteStatus},
        dnp_product_entity, po_product_entity,
        purchase_order_entity::{self, PurchaseOrderStatus},
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set,
};
use std::collections::HashSet;
use std::fmt::Display;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Untouched,
    Partial,
    Complete,
}

/// `covered` of `total` lines have been received or shipped.
pub fn assess_progress(total: usize, covered: usize) -> Progress {
    if total == 0 || covered == 0 {
        Progress::Untouched
    } else if covered >= total {
        Progress::Complete
    } else {
        Progress::Partial
    }
}

/// Statuses that follow the Pending, Partially Delivered, Delivered ladder
pub trait DeliveryLadder: Copy + PartialEq + Display {
    /// Position on the ladder; `None` for statuses propagation must not touch.
    fn rank(self) -> Option<u8>;
    fn partial() -> Self;
    fn complete() -> Self;
}

impl DeliveryLadder for PurchaseOrderStatus {
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending | Self::Approved => Some(0),
            Self::PartiallyDelivered => Some(1),
            Self::Delivered => Some(2),
            Self::Cancelled => None,
        }
    }

    fn partial() -> Self {
        Self::PartiallyDelivered
    }

    fn complete() -> Self {
        Self::Delivered
    }
}

impl DeliveryLadder for AroStatus {
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::PartiallyDelivered => Some(1),
            Self::Delivered => Some(2),
            Self::Cancelled => None,
        }
    }

    fn partial() -> Self {
        Self::PartiallyDelivered
    }

    fn complete() -> Self {
        Self::Delivered
    }
}

/// Status the parent should move to, or `None` to leave it as is.
pub fn next_status<S: DeliveryLadder>(current: S, progress: Progress) -> Option<S> {
    let rank = current.rank()?;
    match progress {
        Progress::Complete if rank < 2 => Some(S::complete()),
        Progress::Partial if rank < 1 => Some(S::partial()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange<S> {
    pub id: Uuid,
    pub from: S,
    pub to: S,
}

impl StatusChange<PurchaseOrderStatus> {
    pub fn into_event(self) -> Event {
        Event::PurchaseOrderStatusChanged {
            purchase_order_id: self.id,
            old_status: self.from.to_string(),
            new_status: self.to.to_string(),
        }
    }
}

impl StatusChange<AroStatus> {
    pub fn into_event(self) -> Event {
        Event::AroStatusChanged {
            aro_id: self.id,
            old_status: self.from.to_string(),
            new_status: self.to.to_string(),
        }
    }
}

/// PO lines covered by at least one non-cancelled ARO line with a receipt.
#[instrument(skip(conn))]
pub async fn recompute_purchase_order_status<C: ConnectionTrait>(
    conn: &C,
    purchase_order_id: Uuid,
) -> Result<Option<StatusChange<PurchaseOrderStatus>>, ServiceError> {
    let mut query = purchase_order_entity::Entity::find_by_id(purchase_order_id);
    if supports_row_locks(conn) {
        query = query.lock_exclusive();
    }
    let purchase_order = query
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("purchase order {} not found", purchase_order_id))
        })?;

    let po_lines = po_product_entity::Entity::find()
        .filter(po_product_entity::Column::PurchaseOrderId.eq(purchase_order_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let ordered: HashSet<Uuid> = po_lines.iter().filter_map(|l| l.quote_product_id).collect();

    let aro_ids: Vec<Uuid> = aro_entity::Entity::find()
        .filter(aro_entity::Column::PurchaseOrderId.eq(purchase_order_id))
        .filter(aro_entity::Column::Status.ne(AroStatus::Cancelled))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|aro| aro.id)
        .collect();

    let received: HashSet<Uuid> = if aro_ids.is_empty() {
        HashSet::new()
    } else {
        aro_product_entity::Entity::find()
            .filter(aro_product_entity::Column::AroId.is_in(aro_ids))
            .filter(aro_product_entity::Column::QuantityReceived.gt(0))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|line| line.quote_product_id)
            .filter(|id| ordered.contains(id))
            .collect()
    };

    let progress = assess_progress(po_lines.len(), received.len());
    debug!(
        total = po_lines.len(),
        covered = received.len(),
        ?progress,
        "Purchase order receipt progress"
    );

    let Some(target) = next_status(purchase_order.status, progress) else {
        return Ok(None);
    };

    let from = purchase_order.status;
    let mut active: purchase_order_entity::ActiveModel = purchase_order.into();
    active.status = Set(target);
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)?;

    info!(%purchase_order_id, %from, to = %target, "Purchase order status propagated");
    Ok(Some(StatusChange {
        id: purchase_order_id,
        from,
        to: target,
    }))
}

/// ARO lines with a receipt that appear, shipped, on a Delivered note.
#[instrument(skip(conn))]
pub async fn recompute_aro_status<C: ConnectionTrait>(
    conn: &C,
    aro_id: Uuid,
) -> Result<Option<StatusChange<AroStatus>>, ServiceError> {
    let mut query = aro_entity::Entity::find_by_id(aro_id);
    if supports_row_locks(conn) {
        query = query.lock_exclusive();
    }
    let aro = query
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("ARO {} not found", aro_id)))?;

    let receivable: HashSet<Uuid> = aro_product_entity::Entity::find()
        .filter(aro_product_entity::Column::AroId.eq(aro_id))
        .filter(aro_product_entity::Column::QuantityReceived.gt(0))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|line| line.id)
        .collect();

    let delivered_notes: Vec<Uuid> = delivery_note_entity::Entity::find()
        .filter(delivery_note_entity::Column::AroId.eq(aro_id))
        .filter(delivery_note_entity::Column::Status.eq(DeliveryNoteStatus::Delivered))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|note| note.id)
        .collect();

    let shipped: HashSet<Uuid> = if delivered_notes.is_empty() {
        HashSet::new()
    } else {
        dnp_product_entity::Entity::find()
            .filter(dnp_product_entity::Column::DeliveryNoteId.is_in(delivered_notes))
            .filter(dnp_product_entity::Column::QuantityShipped.gt(0))
            .all(conn)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|line| line.aro_product_id)
            .filter(|id| receivable.contains(id))
            .collect()
    };

    let progress = assess_progress(receivable.len(), shipped.len());
    let Some(target) = next_status(aro.status, progress) else {
        return Ok(None);
    };

    let from = aro.status;
    let mut active: aro_entity::ActiveModel = aro.into();
    active.status = Set(target);
    active.updated_at = Set(Utc::now());
    active.update(conn).await.map_err(ServiceError::db_error)?;

    info!(%aro_id, %from, to = %target, "ARO status propagated");
    Ok(Some(StatusChange {
        id: aro_id,
        from,
        to: target,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(2, 0, Progress::Untouched)]
    #[test_case(2, 1, Progress::Partial)]
    #[test_case(2, 2, Progress::Complete)]
    #[test_case(0, 0, Progress::Untouched ; "no lines never completes")]
    fn progress_from_counts(total: usize, covered: usize, expected: Progress) {
        assert_eq!(assess_progress(total, covered), expected);
    }

    #[test]
    fn propagation_never_regresses() {
        use PurchaseOrderStatus::*;
        assert_eq!(next_status(Delivered, Progress::Partial), None);
        assert_eq!(next_status(Delivered, Progress::Untouched), None);
        assert_eq!(next_status(PartiallyDelivered, Progress::Untouched), None);
        assert_eq!(next_status(PartiallyDelivered, Progress::Complete), Some(Delivered));
        assert_eq!(next_status(Approved, Progress::Partial), Some(PartiallyDelivered));
        assert_eq!(next_status(Pending, Progress::Complete), Some(Delivered));
    }

    #[test]
    fn cancelled_parents_are_left_alone() {
        assert_eq!(
            next_status(PurchaseOrderStatus::Cancelled, Progress::Complete),
            None
        );
        assert_eq!(next_status(AroStatus::Cancelled, Progress::Complete), None);
    }
}
