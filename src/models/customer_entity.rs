use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Payment and delivery track record of a customer
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum PerformanceFlag {
    #[sea_orm(string_value = "Always on time")]
    #[serde(rename = "Always on time")]
    #[strum(serialize = "Always on time")]
    AlwaysOnTime,
    #[sea_orm(string_value = "Small delays")]
    #[serde(rename = "Small delays")]
    #[strum(serialize = "Small delays")]
    SmallDelays,
    #[sea_orm(string_value = "Frequent big delays")]
    #[serde(rename = "Frequent big delays")]
    #[strum(serialize = "Frequent big delays")]
    FrequentBigDelays,
    #[sea_orm(string_value = "No payment")]
    #[serde(rename = "No payment")]
    #[strum(serialize = "No payment")]
    NoPayment,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "customers")]
#[schema(as = Customer)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub vat_number: Option<String>,
    pub performance_flag: Option<PerformanceFlag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
