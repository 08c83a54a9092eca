//! Customers and products. The document chain only reads them; the write
//! operations here exist so the chain has something to quote.

use crate::{
    commands::validate_money,
    db::DbPool,
    errors::ServiceError,
    models::{
        customer_entity::{self, PerformanceFlag},
        product_entity::{self, ProductStatus},
    },
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub async fn get_customer<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<customer_entity::Model, ServiceError> {
    customer_entity::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::ReferentialIntegrity(format!("customer {} does not exist", id)))
}

pub async fn get_product<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<product_entity::Model, ServiceError> {
    product_entity::Entity::find_by_id(id)
        .one(conn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::ReferentialIntegrity(format!("product {} does not exist", id)))
}

/// Loads a product that may go on a new quote.
pub async fn get_quotable_product<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<product_entity::Model, ServiceError> {
    let product = get_product(conn, id).await?;
    if !product.is_quotable() {
        return Err(ServiceError::StateConflict(format!(
            "product {} is {} and cannot be quoted",
            product.product_code, product.status
        )));
    }
    Ok(product)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[validate(length(max = 255))]
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[validate(length(max = 50))]
    pub vat_number: Option<String>,
    pub performance_flag: Option<PerformanceFlag>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 64))]
    pub product_code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub technical_specs: Option<String>,
    pub commercial_terms: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(range(min = 0))]
    pub min_delivery_day: Option<i32>,
    #[validate(range(min = 0))]
    pub max_delivery_day: Option<i32>,
    #[validate(range(min = 0))]
    pub availability_yrs: Option<i32>,
    #[validate(custom = "validate_money")]
    pub unit_price: Decimal,
    pub status: Option<ProductStatus>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub technical_specs: Option<String>,
    pub commercial_terms: Option<String>,
    pub payment_terms: Option<String>,
    #[validate(custom = "validate_money")]
    pub unit_price: Option<Decimal>,
    pub status: Option<ProductStatus>,
}

#[derive(Clone)]
pub struct MasterDataService {
    db_pool: Arc<DbPool>,
}

impl MasterDataService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(company = %request.company_name))]
    pub async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<customer_entity::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let customer = customer_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            company_name: Set(request.company_name),
            contact_name: Set(request.contact_name),
            email: Set(request.email),
            phone: Set(request.phone),
            address: Set(request.address),
            vat_number: Set(request.vat_number),
            performance_flag: Set(request.performance_flag),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create customer");
            ServiceError::db_error(e)
        })?;

        info!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    #[instrument(skip(self, request), fields(product_code = %request.product_code))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<product_entity::Model, ServiceError> {
        request.validate()?;
        let now = Utc::now();
        let product = product_entity::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_code: Set(request.product_code),
            name: Set(request.name),
            description: Set(request.description),
            technical_specs: Set(request.technical_specs),
            commercial_terms: Set(request.commercial_terms),
            payment_terms: Set(request.payment_terms),
            min_delivery_day: Set(request.min_delivery_day),
            max_delivery_day: Set(request.max_delivery_day),
            availability_yrs: Set(request.availability_yrs),
            unit_price: Set(request.unit_price),
            status: Set(request.status.unwrap_or(ProductStatus::Active)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(|e| {
            if crate::db::is_unique_violation(&e) {
                ServiceError::ValidationError("product_code is already in use".to_string())
            } else {
                error!(error = %e, "Failed to create product");
                ServiceError::db_error(e)
            }
        })?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// Changes the master record only. Existing document snapshots keep the
    /// values they were taken with.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<product_entity::Model, ServiceError> {
        request.validate()?;
        let db = self.db_pool.as_ref();
        let product = product_entity::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", id)))?;

        let mut active: product_entity::ActiveModel = product.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(specs) = request.technical_specs {
            active.technical_specs = Set(Some(specs));
        }
        if let Some(terms) = request.commercial_terms {
            active.commercial_terms = Set(Some(terms));
        }
        if let Some(terms) = request.payment_terms {
            active.payment_terms = Set(Some(terms));
        }
        if let Some(price) = request.unit_price {
            active.unit_price = Set(price);
        }
        if let Some(status) = request.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        active.update(db).await.map_err(ServiceError::db_error)
    }

    pub async fn get_customer(&self, id: Uuid) -> Result<customer_entity::Model, ServiceError> {
        get_customer(self.db_pool.as_ref(), id).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<product_entity::Model, ServiceError> {
        get_product(self.db_pool.as_ref(), id).await
    }
}
