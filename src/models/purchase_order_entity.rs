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
pub enum PurchaseOrderStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Approved")]
    Approved,
    #[sea_orm(string_value = "Partially Delivered")]
    #[serde(rename = "Partially Delivered")]
    #[strum(serialize = "Partially Delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "Delivered")]
    Delivered,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Statuses a user may set directly; the delivery statuses are derived.
    pub fn is_user_settable(self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Cancelled)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "purchase_orders")]
#[schema(as = PurchaseOrder)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub po_number: String,
    pub customer_id: Uuid,
    pub quote_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub status: PurchaseOrderStatus,
    pub planned_delivery_date: Option<NaiveDate>,
    pub actual_delivery_date: Option<NaiveDate>,
    pub remarks: Option<String>,
    pub pdf_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Canonical name under which the signed PO scan is stored.
    pub fn attachment_file_name(&self) -> String {
        format!("{}.pdf", self.po_number)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::quote_entity::Entity",
        from = "Column::QuoteId",
        to = "super::quote_entity::Column::Id"
    )]
    Quote,
    #[sea_orm(has_many = "super::po_product_entity::Entity")]
    PoProducts,
}

impl Related<super::quote_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Quote.def()
    }
}

impl Related<super::po_product_entity::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PoProducts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
