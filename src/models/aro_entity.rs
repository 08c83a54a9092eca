use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum AroStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Partially Delivered")]
    #[serde(rename = "Partially Delivered")]
    #[strum(serialize = "Partially Delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl AroStatus {
    pub fn is_user_settable(self) -> bool {
        matches!(self, Self::Pending | Self::Cancelled)
    }
}

/// Acknowledgment of receipt recorded against a purchase order.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "aros")]
#[schema(as = Aro)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub aro_number: String,
    pub purchase_order_id: Uuid,
    pub date_aro: NaiveDate,
    pub status: AroStatus,
    pub created_by: Option<Uuid>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order_entity::Entity",
        from = "Column::PurchaseOrderId",
        to = "super::purchase_order_entity::Column::Id"
    )]
    PurchaseOrder,
    #[sea_orm(has_many = "super::aro_product_entity::Entity")]
    AroProducts,
}

impl Related<super::purchase_order_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrder.def()
    }
}

impl Related<super::aro_product_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AroProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
