use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::QueryBuilder;

use slideboard_core::catalog::PriceCatalog;
use slideboard_core::domain::product::{Product, ProductCategory, ProductId};
use slideboard_core::domain::quote::TenantId;
use slideboard_core::errors::ApplicationError;
use slideboard_core::money::to_wire;

use super::{column, decimal_column, parse_enum, timestamp, ProductRepository, RepositoryError};
use crate::DbPool;

/// Product table access; also serves as the price catalog for refreshes.
pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_product(row: &SqliteRow) -> Result<Product, RepositoryError> {
    let category: String = column(row, "category")?;
    Ok(Product {
        id: ProductId(column(row, "id")?),
        tenant_id: TenantId(column(row, "tenant_id")?),
        name: column(row, "name")?,
        category: parse_enum::<ProductCategory>("category", &category)?,
        unit: column(row, "unit")?,
        unit_price: decimal_column(row, "unit_price")?,
        active: column(row, "active")?,
    })
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &ProductId,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, tenant_id, name, category, unit, unit_price, active
             FROM product WHERE tenant_id = ? AND id = ?",
        )
        .bind(&tenant_id.0)
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_product).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        let now = timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO product (id, tenant_id, name, category, unit, unit_price, active,
                                  created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 name = excluded.name,
                 category = excluded.category,
                 unit = excluded.unit,
                 unit_price = excluded.unit_price,
                 active = excluded.active,
                 updated_at = excluded.updated_at
             WHERE product.tenant_id = excluded.tenant_id",
        )
        .bind(&product.id.0)
        .bind(&product.tenant_id.0)
        .bind(&product.name)
        .bind(product.category.as_str())
        .bind(&product.unit)
        .bind(to_wire(product.unit_price))
        .bind(product.active)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

impl SqlProductRepository {
    async fn active_prices(
        &self,
        tenant_id: &TenantId,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Decimal>, RepositoryError> {
        if product_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut query_builder = QueryBuilder::<sqlx::Sqlite>::new(
            "SELECT id, unit_price FROM product WHERE active = 1 AND tenant_id = ",
        );
        query_builder.push_bind(&tenant_id.0);
        query_builder.push(" AND id IN (");
        let mut separated = query_builder.separated(", ");
        for product_id in product_ids {
            separated.push_bind(&product_id.0);
        }
        query_builder.push(")");

        let rows = query_builder.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<(ProductId, Decimal), RepositoryError> {
                Ok((ProductId(column(row, "id")?), decimal_column(row, "unit_price")?))
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PriceCatalog for SqlProductRepository {
    async fn current_prices(
        &self,
        tenant_id: &TenantId,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Decimal>, ApplicationError> {
        Ok(self.active_prices(tenant_id, product_ids).await?)
    }
}
