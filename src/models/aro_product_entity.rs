use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "aro_products")]
#[schema(as = AroProduct)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub aro_id: Uuid,
    pub quote_product_id: Uuid,
    pub quantity_received: i32,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::aro_entity::Entity",
        from = "Column::AroId",
        to = "super::aro_entity::Column::Id"
    )]
    Aro,
}

impl Related<super::aro_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aro.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
