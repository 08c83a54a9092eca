use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Shipped line, built from an ARO line and the PO line sharing its quote line.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "dnp_products")]
#[schema(as = DnpProduct)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub delivery_note_id: Uuid,
    pub aro_product_id: Uuid,
    pub po_product_id: Uuid,
    pub quote_product_id: Uuid,
    pub product_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity_shipped: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_line_price: Decimal,
    pub serial_numbers: Option<String>,
    pub tracking_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery_note_entity::Entity",
        from = "Column::DeliveryNoteId",
        to = "super::delivery_note_entity::Column::Id"
    )]
    DeliveryNote,
}

impl Related<super::delivery_note_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryNote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
