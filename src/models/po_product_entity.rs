use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// PO line. Copied from the quote line when the PO derives from a quote,
/// otherwise from the product catalogue.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "po_products")]
#[schema(as = PoProduct)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub purchase_order_id: Uuid,
    pub quote_product_id: Option<Uuid>,
    pub product_id: Uuid,
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub technical_specs: Option<String>,
    pub commercial_terms: Option<String>,
    pub payment_terms: Option<String>,
    pub min_delivery_day: Option<i32>,
    pub max_delivery_day: Option<i32>,
    pub availability_yrs: Option<i32>,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_line_price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order_entity::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order_entity::Column::Id"
    )]
    PurchaseOrder,
}

impl Related<super::purchase_order_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
