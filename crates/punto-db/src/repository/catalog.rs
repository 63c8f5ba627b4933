//! # Catalog Repository
//!
//! Database operations for products and their sellable variants.
//!
//! ## Variant Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Variant Identity                                   │
//! │                                                                         │
//! │  A sellable unit is (product_id, size, color).                         │
//! │                                                                         │
//! │  "Remera básica"  ──┬── (M, Negro)    stock 4   $1500                  │
//! │                     ├── (M, Blanco)   stock 2   $1500                  │
//! │                     └── (L, Negro)    stock 0   $1500                  │
//! │                                                                         │
//! │  "Cinturón"       ──── (NULL, NULL)   stock 9   $800                   │
//! │                                                                         │
//! │  Products without size/color variations get a single row with          │
//! │  NULL size and NULL color. Lookups compare with IS (not =) so          │
//! │  NULL identities match.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use punto_core::types::{Variant, VariantStock};
use punto_core::Money;

// =============================================================================
// Row Types
// =============================================================================

/// A catalog product row.
#[derive(Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductRow {
    /// Creates a product row with a generated ID.
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        ProductRow {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A sellable variant row.
///
/// Stock and price live here, one row per (product, size, color).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VariantRow {
    pub id: String,
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VariantRow {
    /// Creates a variant row with a generated ID.
    ///
    /// Pass `None` for products sold without size/color variations.
    pub fn new(product_id: &str, variant: Option<&Variant>, price: Money, stock: i64) -> Self {
        let now = Utc::now();
        VariantRow {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            size: variant.map(|v| v.size.clone()),
            color: variant.map(|v| v.color.clone()),
            price,
            stock,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Projection used by [`CatalogRepository::find_variant`].
#[derive(Debug, sqlx::FromRow)]
struct StockRow {
    stock: i64,
    price: Money,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a product.
    pub async fn insert_product(&self, product: &ProductRow) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a sellable variant.
    ///
    /// ## Errors
    /// * `UniqueViolation` - a variant with the same (product, size,
    ///   color) identity already exists
    /// * `ForeignKeyViolation` - the product does not exist
    pub async fn insert_variant(&self, variant: &VariantRow) -> DbResult<()> {
        debug!(
            id = %variant.id,
            product_id = %variant.product_id,
            "Inserting variant"
        );

        sqlx::query(
            r#"
            INSERT INTO variants (
                id, product_id, size, color, price, stock,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&variant.id)
        .bind(&variant.product_id)
        .bind(&variant.size)
        .bind(&variant.color)
        .bind(variant.price)
        .bind(variant.stock)
        .bind(variant.created_at)
        .bind(variant.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks up live stock and list price for one variant identity.
    ///
    /// Returns `Ok(None)` when no such variant exists. Callers treat
    /// that as zero units available, not as an error.
    pub async fn find_variant(
        &self,
        product_id: &str,
        variant: Option<&Variant>,
    ) -> DbResult<Option<VariantStock>> {
        let row = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT stock, price
            FROM variants
            WHERE product_id = ?1 AND size IS ?2 AND color IS ?3
            "#,
        )
        .bind(product_id)
        .bind(variant.map(|v| v.size.as_str()))
        .bind(variant.map(|v| v.color.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| VariantStock {
            stock: r.stock,
            price: r.price,
        }))
    }

    /// Lists all variants of one product, stable order.
    pub async fn list_variants(&self, product_id: &str) -> DbResult<Vec<VariantRow>> {
        let rows = sqlx::query_as::<_, VariantRow>(
            r#"
            SELECT id, product_id, size, color, price, stock,
                   created_at, updated_at
            FROM variants
            WHERE product_id = ?1
            ORDER BY size, color
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sets the absolute stock count for one variant identity.
    ///
    /// ## When To Call
    /// Receiving merchandise or correcting a count. Sales never call
    /// this; they go through the ledger's guarded decrement.
    pub async fn set_stock(
        &self,
        product_id: &str,
        variant: Option<&Variant>,
        stock: i64,
    ) -> DbResult<()> {
        debug!(product_id = %product_id, stock, "Setting stock");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE variants
            SET stock = ?4, updated_at = ?5
            WHERE product_id = ?1 AND size IS ?2 AND color IS ?3
            "#,
        )
        .bind(product_id)
        .bind(variant.map(|v| v.size.as_str()))
        .bind(variant.map(|v| v.color.as_str()))
        .bind(stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Variant", product_id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics and seed checks).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
