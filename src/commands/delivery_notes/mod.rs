pub mod create_delivery_note_command;
pub mod delete_delivery_note_command;
pub mod update_delivery_note_command;

pub use create_delivery_note_command::CreateDeliveryNoteCommand;
pub use delete_delivery_note_command::DeleteDeliveryNoteCommand;
pub use update_delivery_note_command::UpdateDeliveryNoteCommand;

use crate::{
    db::supports_row_locks,
    errors::ServiceError,
    models::{
        aro_entity::{self, AroStatus},
        aro_product_entity,
        delivery_note_entity::{self, DeliveryNoteStatus},
        dnp_product_entity, po_product_entity,
    },
    services::snapshot::{self, DnpLineOverride, SnapshotWarning},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateDeliveryNoteRequest {
    pub aro_id: Uuid,
    pub date_delivery: Option<NaiveDate>,
    pub planned_delivery_date: NaiveDate,
    pub actual_delivery_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 1000))]
    pub delivery_address: String,
    #[validate(length(max = 20))]
    pub incoterms: Option<String>,
    #[validate(length(max = 1000))]
    pub packaging_details: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    /// Per ARO line shipment details; lines not listed ship what was received
    #[serde(default)]
    #[validate]
    pub lines: Vec<DnpLineOverride>,
}

/// Edit of one existing delivery note line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct DnpLineUpdate {
    pub id: Uuid,
    #[validate(range(min = 0, max = 1000000))]
    pub quantity_shipped: Option<i32>,
    pub serial_numbers: Option<String>,
    #[validate(length(max = 255))]
    pub tracking_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateDeliveryNoteRequest {
    /// Moving the note to another ARO rebuilds its lines
    pub aro_id: Option<Uuid>,
    pub status: Option<DeliveryNoteStatus>,
    pub date_delivery: Option<NaiveDate>,
    pub planned_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 1000))]
    pub delivery_address: Option<String>,
    #[validate(length(max = 20))]
    pub incoterms: Option<String>,
    #[validate(length(max = 1000))]
    pub packaging_details: Option<String>,
    #[validate(length(max = 1000))]
    pub remarks: Option<String>,
    #[serde(default)]
    #[validate]
    pub lines: Vec<DnpLineUpdate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryNoteView {
    pub delivery_note: delivery_note_entity::Model,
    pub lines: Vec<dnp_product_entity::Model>,
    /// Status of the ARO after this change
    pub aro_status: AroStatus,
    pub warnings: Vec<SnapshotWarning>,
}

/// Loads and, where supported, locks the ARO a note ships from, so notes
/// drawing on the same receipts are bounded one at a time.
pub(crate) async fn lock_aro<C: ConnectionTrait>(
    conn: &C,
    aro_id: Uuid,
) -> Result<Option<aro_entity::Model>, ServiceError> {
    let mut query = aro_entity::Entity::find_by_id(aro_id);
    if supports_row_locks(conn) {
        query = query.lock_exclusive();
    }
    query.one(conn).await.map_err(ServiceError::db_error)
}

/// Loads the ARO a note ships from. A cancelled ARO ships nothing.
pub(crate) async fn load_shippable_aro<C: ConnectionTrait>(
    conn: &C,
    aro_id: Uuid,
) -> Result<aro_entity::Model, ServiceError> {
    let aro = lock_aro(conn, aro_id)
        .await?
        .ok_or_else(|| ServiceError::ReferentialIntegrity(format!("ARO {} does not exist", aro_id)))?;
    if aro.status == AroStatus::Cancelled {
        return Err(ServiceError::StateConflict(format!(
            "ARO {} is cancelled",
            aro.aro_number
        )));
    }
    Ok(aro)
}

/// Quantity per ARO line shipped by the ARO's notes other than `exclude`.
/// Cancelled and returned notes release what they shipped.
pub(crate) async fn shipped_on_other_notes<C: ConnectionTrait>(
    conn: &C,
    aro_id: Uuid,
    exclude: Uuid,
) -> Result<HashMap<Uuid, i32>, ServiceError> {
    let notes: Vec<Uuid> = delivery_note_entity::Entity::find()
        .filter(delivery_note_entity::Column::AroId.eq(aro_id))
        .filter(delivery_note_entity::Column::Id.ne(exclude))
        .filter(delivery_note_entity::Column::Status.ne(DeliveryNoteStatus::Cancelled))
        .filter(delivery_note_entity::Column::Status.ne(DeliveryNoteStatus::Returned))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?
        .into_iter()
        .map(|note| note.id)
        .collect();

    let mut shipped: HashMap<Uuid, i32> = HashMap::new();
    if notes.is_empty() {
        return Ok(shipped);
    }
    let lines = dnp_product_entity::Entity::find()
        .filter(dnp_product_entity::Column::DeliveryNoteId.is_in(notes))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    for line in lines {
        let total = shipped.entry(line.aro_product_id).or_default();
        *total = total.saturating_add(line.quantity_shipped);
    }
    Ok(shipped)
}

/// Snapshots the ARO's lines onto the note and stores them. Each line ships
/// at most what the ARO received minus what its other notes already ship.
pub(crate) async fn write_dnp_lines<C: ConnectionTrait>(
    conn: &C,
    delivery_note_id: Uuid,
    aro: &aro_entity::Model,
    overrides: &[DnpLineOverride],
    now: DateTime<Utc>,
) -> Result<(Vec<dnp_product_entity::Model>, Vec<SnapshotWarning>), ServiceError> {
    let aro_lines = aro_product_entity::Entity::find()
        .filter(aro_product_entity::Column::AroId.eq(aro.id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let po_lines = po_product_entity::Entity::find()
        .filter(po_product_entity::Column::PurchaseOrderId.eq(aro.purchase_order_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)?;

    let already_shipped = shipped_on_other_notes(conn, aro.id, delivery_note_id).await?;

    let outcome = snapshot::dnp_products(
        delivery_note_id,
        &aro_lines,
        &po_lines,
        &already_shipped,
        overrides,
        now,
    )?;
    if outcome.records.is_empty() {
        return Err(ServiceError::StateConflict(format!(
            "ARO {} has nothing left to ship",
            aro.aro_number
        )));
    }
    let mut saved = Vec::with_capacity(outcome.records.len());
    for record in outcome.records {
        saved.push(record.insert(conn).await.map_err(ServiceError::db_error)?);
    }
    Ok((saved, outcome.warnings))
}

pub(crate) async fn load_dnp_lines<C: ConnectionTrait>(
    conn: &C,
    delivery_note_id: Uuid,
) -> Result<Vec<dnp_product_entity::Model>, ServiceError> {
    dnp_product_entity::Entity::find()
        .filter(dnp_product_entity::Column::DeliveryNoteId.eq(delivery_note_id))
        .all(conn)
        .await
        .map_err(ServiceError::db_error)
}

pub(crate) fn is_deletable(status: DeliveryNoteStatus) -> bool {
    status != DeliveryNoteStatus::Delivered
}
