use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "invoice_lines")]
#[schema(as = InvoiceLine)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub quote_product_id: Option<Uuid>,
    pub dnp_product_id: Option<Uuid>,
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub quantity_invoiced: i32,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub total_ht: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub vat_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub reduction: Decimal,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::invoice_entity::Entity",
        from = "Column::InvoiceId",
        to = "super::invoice_entity::Column::Id"
    )]
    Invoice,
}

impl Related<super::invoice_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
