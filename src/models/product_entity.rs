use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum ProductStatus {
    #[sea_orm(string_value = "Active")]
    Active,
    #[sea_orm(string_value = "EOL")]
    #[serde(rename = "EOL")]
    #[strum(serialize = "EOL")]
    Eol,
    #[sea_orm(string_value = "Archived")]
    Archived,
}

/// Catalogue entry. Documents never read it after their snapshot is taken.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub product_code: String,
    pub name: String,
    pub description: Option<String>,
    pub technical_specs: Option<String>,
    pub commercial_terms: Option<String>,
    pub payment_terms: Option<String>,
    pub min_delivery_day: Option<i32>,
    pub max_delivery_day: Option<i32>,
    pub availability_yrs: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((15, 2)))")]
    pub unit_price: Decimal,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_quotable(&self) -> bool {
        self.status == ProductStatus::Active
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
