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
pub enum DeliveryNoteStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Partially Delivered")]
    #[serde(rename = "Partially Delivered")]
    #[strum(serialize = "Partially Delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Returned")]
    Returned,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl DeliveryNoteStatus {
    /// Cancelled and returned notes never change status again and no
    /// longer consume the ARO's received quantities.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "delivery_notes")]
#[schema(as = DeliveryNote)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub dnp_number: String,
    pub purchase_order_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub aro_id: Uuid,
    pub status: DeliveryNoteStatus,
    pub date_delivery: NaiveDate,
    pub planned_delivery_date: NaiveDate,
    pub actual_delivery_date: Option<NaiveDate>,
    pub delivery_address: String,
    pub incoterms: Option<String>,
    pub packaging_details: Option<String>,
    pub remarks: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::aro_entity::Entity",
        from = "Column::AroId",
        to = "super::aro_entity::Column::Id"
    )]
    Aro,
    #[sea_orm(has_many = "super::dnp_product_entity::Entity")]
    DnpProducts,
}

impl Related<super::aro_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Aro.def()
    }
}

impl Related<super::dnp_product_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DnpProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
