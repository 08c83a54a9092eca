use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Product terms frozen at quote time, plus the quoted quantity and price.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "quote_products")]
#[schema(as = QuoteProduct)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub quote_id: Uuid,
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
        belongs_to = "super::quote_entity::Entity",
        from = "Column::QuoteId",
        to = "super::quote_entity::Column::Id"
    )]
    Quote,
}

impl Related<super::quote_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
