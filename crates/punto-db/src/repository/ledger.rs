//! # Ledger Repository
//!
//! Database operations for committed sales.
//!
//! ## Commit Atomicity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       commit_sale()                                     │
//! │                                                                         │
//! │  BEGIN TRANSACTION                                                     │
//! │       │                                                                 │
//! │       ├── INSERT sale header      (frozen totals)                      │
//! │       ├── INSERT sale_items       (one per line, receipt order)        │
//! │       └── UPDATE variants stock   (guarded, one per delta)             │
//! │             │                                                           │
//! │             ├── guard holds   → next delta                             │
//! │             └── guard refuses → drop transaction (implicit ROLLBACK)   │
//! │                                  return InsufficientStock              │
//! │       │                                                                 │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Either the sale, its items, and every stock movement all land,        │
//! │  or none do. There is no state where the sale exists but stock         │
//! │  was not moved.                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use punto_core::types::{PaymentMethod, Percent, SaleItem, SaleRecord, StockDelta, Variant};
use punto_core::Money;

// =============================================================================
// Row Types
// =============================================================================

/// Database projection of a sale header.
#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: String,
    sale_number: String,
    sold_at: DateTime<Utc>,
    payment_method: PaymentMethod,
    card_name: Option<String>,
    installments: i64,
    commission_bps: i64,
    net_amount: Money,
    discount_bps: i64,
    customer_name: Option<String>,
    customer_dni: Option<String>,
    subtotal: Money,
    discount_value: Money,
    balance: Money,
    total: Money,
    cash_received: Money,
    change: Money,
}

impl SaleRow {
    fn into_record(self, items: Vec<SaleItem>) -> SaleRecord {
        SaleRecord {
            id: self.id,
            sale_number: self.sale_number,
            sold_at: self.sold_at,
            payment_method: self.payment_method,
            card_name: self.card_name,
            installments: self.installments as u32,
            commission: Percent::from_bps(self.commission_bps as u32),
            net_amount: self.net_amount,
            discount: Percent::from_bps(self.discount_bps as u32),
            customer_name: self.customer_name,
            customer_dni: self.customer_dni,
            subtotal: self.subtotal,
            discount_value: self.discount_value,
            balance: self.balance,
            total: self.total,
            cash_received: self.cash_received,
            change: self.change,
            items,
        }
    }
}

/// Database projection of a sale line.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    product_id: Option<String>,
    name_snapshot: String,
    size: Option<String>,
    color: Option<String>,
    unit_price: Money,
    quantity: i64,
    is_return: bool,
    is_quick: bool,
    is_offer: bool,
}

impl ItemRow {
    fn into_item(self) -> SaleItem {
        let variant = match (self.size, self.color) {
            (Some(size), Some(color)) => Some(Variant { size, color }),
            _ => None,
        };
        SaleItem {
            product_id: self.product_id,
            name_snapshot: self.name_snapshot,
            variant,
            unit_price: self.unit_price,
            quantity: self.quantity,
            is_return: self.is_return,
            is_quick: self.is_quick,
            is_offer: self.is_offer,
        }
    }
}

const SALE_COLUMNS: &str = "id, sale_number, sold_at, payment_method, card_name, \
     installments, commission_bps, net_amount, discount_bps, \
     customer_name, customer_dni, subtotal, discount_value, \
     balance, total, cash_received, change";

// =============================================================================
// Repository
// =============================================================================

/// Repository for the committed-sale ledger.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    /// Creates a new LedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerRepository { pool }
    }

    /// Commits a sale and its stock deltas as one atomic unit.
    ///
    /// ## What This Does
    /// 1. Inserts the sale header with all totals frozen
    /// 2. Inserts one `sale_items` row per line, preserving order
    /// 3. Applies each stock delta through a guarded UPDATE
    ///
    /// Any failure before COMMIT drops the transaction, rolling back
    /// every row written so far.
    ///
    /// ## Errors
    /// * `InsufficientStock` - a delta would drive stock below zero
    ///   (or the variant no longer exists)
    /// * `UniqueViolation` - the sale number is already taken
    pub async fn commit_sale(&self, record: &SaleRecord, deltas: &[StockDelta]) -> DbResult<()> {
        debug!(
            sale_number = %record.sale_number,
            items = record.items.len(),
            deltas = deltas.len(),
            "Committing sale"
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Sale header
        sqlx::query(
            r#"
            INSERT INTO sales (
                id, sale_number, sold_at, payment_method, card_name,
                installments, commission_bps, net_amount, discount_bps,
                customer_name, customer_dni, subtotal, discount_value,
                balance, total, cash_received, change, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&record.id)
        .bind(&record.sale_number)
        .bind(record.sold_at)
        .bind(record.payment_method)
        .bind(&record.card_name)
        .bind(record.installments as i64)
        .bind(record.commission.bps() as i64)
        .bind(record.net_amount)
        .bind(record.discount.bps() as i64)
        .bind(&record.customer_name)
        .bind(&record.customer_dni)
        .bind(record.subtotal)
        .bind(record.discount_value)
        .bind(record.balance)
        .bind(record.total)
        .bind(record.cash_received)
        .bind(record.change)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        // Frozen line projections, in receipt order
        for (position, item) in record.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, name_snapshot, size, color,
                    unit_price, quantity, is_return, is_quick, is_offer,
                    position, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    ?7, ?8, ?9, ?10, ?11,
                    ?12, ?13
                )
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(&record.id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.variant.as_ref().map(|v| v.size.as_str()))
            .bind(item.variant.as_ref().map(|v| v.color.as_str()))
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.is_return)
            .bind(item.is_quick)
            .bind(item.is_offer)
            .bind(position as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        // Guarded stock movements. rows_affected = 0 means the guard
        // refused (or the variant vanished since verification).
        for delta in deltas {
            let size = delta.variant.as_ref().map(|v| v.size.as_str());
            let color = delta.variant.as_ref().map(|v| v.color.as_str());

            let result = sqlx::query(
                r#"
                UPDATE variants
                SET stock = stock + ?4, updated_at = ?5
                WHERE product_id = ?1 AND size IS ?2 AND color IS ?3
                  AND stock + ?4 >= 0
                "#,
            )
            .bind(&delta.product_id)
            .bind(size)
            .bind(color)
            .bind(delta.delta)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                let available: i64 = sqlx::query_scalar(
                    r#"
                    SELECT stock FROM variants
                    WHERE product_id = ?1 AND size IS ?2 AND color IS ?3
                    "#,
                )
                .bind(&delta.product_id)
                .bind(size)
                .bind(color)
                .fetch_optional(&mut *tx)
                .await?
                .unwrap_or(0);

                warn!(
                    product_id = %delta.product_id,
                    available,
                    requested = -delta.delta,
                    "Stock guard refused sale commit"
                );

                // Dropping tx here rolls back the header and items.
                return Err(DbError::InsufficientStock {
                    product_id: delta.product_id.clone(),
                    variant: variant_label(delta.variant.as_ref()),
                    available,
                    requested: -delta.delta,
                });
            }
        }

        tx.commit().await?;

        debug!(sale_number = %record.sale_number, "Sale committed");
        Ok(())
    }

    /// Gets a committed sale by its human-facing number.
    pub async fn get_by_number(&self, sale_number: &str) -> DbResult<Option<SaleRecord>> {
        let query = format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE sale_number = ?1"
        );

        let row = sqlx::query_as::<_, SaleRow>(&query)
            .bind(sale_number)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let items = self.load_items(&row.id).await?;
                Ok(Some(row.into_record(items)))
            }
            None => Ok(None),
        }
    }

    /// Returns the highest sale number recorded under a day prefix
    /// (`YYYYMMDD`), if any.
    ///
    /// Lexicographic order is numeric order for the zero-padded
    /// `-NNN` suffix. Timestamp-suffixed fallback numbers sort
    /// irregularly; the caller already treats anything unparseable as
    /// a reason to fall back again.
    pub async fn last_sale_number(&self, day_prefix: &str) -> DbResult<Option<String>> {
        let pattern = format!("{day_prefix}-%");

        let number = sqlx::query_scalar::<_, String>(
            r#"
            SELECT sale_number
            FROM sales
            WHERE sale_number LIKE ?1
            ORDER BY sale_number DESC
            LIMIT 1
            "#,
        )
        .bind(&pattern)
        .fetch_optional(&self.pool)
        .await?;

        Ok(number)
    }

    /// All sales recorded for one calendar day, oldest first.
    ///
    /// Backdated sales carry a start-of-day `sold_at`, so they land on
    /// the day the operator chose, not the day the row was written.
    pub async fn sales_for_day(&self, day: NaiveDate) -> DbResult<Vec<SaleRecord>> {
        let start = day.and_time(NaiveTime::MIN).and_utc();
        let end = start + Duration::days(1);

        let query = format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE sold_at >= ?1 AND sold_at < ?2 \
             ORDER BY sold_at, sale_number"
        );

        let rows = sqlx::query_as::<_, SaleRow>(&query)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let items = self.load_items(&row.id).await?;
            records.push(row.into_record(items));
        }

        Ok(records)
    }

    /// Loads the frozen lines of one sale, in receipt order.
    async fn load_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT product_id, name_snapshot, size, color, unit_price,
                   quantity, is_return, is_quick, is_offer
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY position
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemRow::into_item).collect())
    }
}

/// Display form of a variant identity for error messages.
fn variant_label(variant: Option<&Variant>) -> String {
    match variant {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::catalog::{ProductRow, VariantRow};
    use chrono::TimeZone;

    async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_variant(
        db: &Database,
        product_id: &str,
        variant: Option<&Variant>,
        price: i64,
        stock: i64,
    ) {
        let mut product = ProductRow::new("Remera básica");
        product.id = product_id.to_string();
        // Repeated seeding of the same product is fine; only the
        // variant row must be new.
        let _ = db.catalog().insert_product(&product).await;
        db.catalog()
            .insert_variant(&VariantRow::new(
                product_id,
                variant,
                Money::from_pesos(price),
                stock,
            ))
            .await
            .unwrap();
    }

    fn sold_at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn sample_record(sale_number: &str, at: DateTime<Utc>) -> SaleRecord {
        SaleRecord {
            id: Uuid::new_v4().to_string(),
            sale_number: sale_number.to_string(),
            sold_at: at,
            payment_method: PaymentMethod::Cash,
            card_name: None,
            installments: 1,
            commission: Percent::zero(),
            net_amount: Money::from_pesos(3000),
            discount: Percent::zero(),
            customer_name: Some("Ana García".to_string()),
            customer_dni: Some("28456789".to_string()),
            subtotal: Money::from_pesos(3000),
            discount_value: Money::zero(),
            balance: Money::from_pesos(3000),
            total: Money::from_pesos(3000),
            cash_received: Money::from_pesos(3000),
            change: Money::zero(),
            items: vec![
                SaleItem {
                    product_id: Some("p1".to_string()),
                    name_snapshot: "Remera básica".to_string(),
                    variant: Some(Variant::new("M", "Negro")),
                    unit_price: Money::from_pesos(1500),
                    quantity: 2,
                    is_return: false,
                    is_quick: false,
                    is_offer: false,
                },
                SaleItem {
                    product_id: None,
                    name_snapshot: "Ajuste".to_string(),
                    variant: None,
                    unit_price: Money::from_pesos(0),
                    quantity: 1,
                    is_return: false,
                    is_quick: true,
                    is_offer: true,
                },
            ],
        }
    }

    fn delta(product_id: &str, variant: Option<Variant>, amount: i64) -> StockDelta {
        StockDelta {
            product_id: product_id.to_string(),
            variant,
            delta: amount,
        }
    }

    #[tokio::test]
    async fn test_commit_and_read_back() {
        let db = db().await;
        let variant = Variant::new("M", "Negro");
        seed_variant(&db, "p1", Some(&variant), 1500, 5).await;

        let record = sample_record("20260314-001", sold_at(2026, 3, 14, 15));
        db.ledger()
            .commit_sale(&record, &[delta("p1", Some(variant.clone()), -2)])
            .await
            .unwrap();

        let loaded = db
            .ledger()
            .get_by_number("20260314-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, record);

        // Stock moved in the same transaction
        let stock = db
            .catalog()
            .find_variant("p1", Some(&variant))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.stock, 3);
    }

    #[tokio::test]
    async fn test_unknown_number_returns_none() {
        let db = db().await;

        let loaded = db.ledger().get_by_number("20260314-001").await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_shortfall_rolls_back_everything() {
        let db = db().await;
        let negro = Variant::new("M", "Negro");
        let rojo = Variant::new("M", "Rojo");
        seed_variant(&db, "p1", Some(&negro), 1500, 5).await;
        seed_variant(&db, "p2", Some(&rojo), 2000, 3).await;

        let record = sample_record("20260314-001", sold_at(2026, 3, 14, 15));
        let err = db
            .ledger()
            .commit_sale(
                &record,
                &[
                    delta("p1", Some(negro.clone()), -1),
                    delta("p2", Some(rojo.clone()), -4),
                ],
            )
            .await
            .unwrap_err();

        match err {
            DbError::InsufficientStock {
                product_id,
                variant,
                available,
                requested,
            } => {
                assert_eq!(product_id, "p2");
                assert_eq!(variant, "M/Rojo");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Nothing landed: no sale row, and the first delta was undone
        assert!(db
            .ledger()
            .get_by_number("20260314-001")
            .await
            .unwrap()
            .is_none());
        let stock = db
            .catalog()
            .find_variant("p1", Some(&negro))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.stock, 5);
    }

    #[tokio::test]
    async fn test_sequential_sales_race_for_last_unit() {
        let db = db().await;
        let variant = Variant::new("U", "Azul");
        seed_variant(&db, "p1", Some(&variant), 1500, 1).await;

        let first = sample_record("20260314-001", sold_at(2026, 3, 14, 10));
        db.ledger()
            .commit_sale(&first, &[delta("p1", Some(variant.clone()), -1)])
            .await
            .unwrap();

        let second = sample_record("20260314-002", sold_at(2026, 3, 14, 11));
        let err = db
            .ledger()
            .commit_sale(&second, &[delta("p1", Some(variant.clone()), -1)])
            .await
            .unwrap_err();

        match err {
            DbError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 0);
                assert_eq!(requested, 1);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_variant_reports_zero_available() {
        let db = db().await;

        let record = sample_record("20260314-001", sold_at(2026, 3, 14, 15));
        let err = db
            .ledger()
            .commit_sale(&record, &[delta("ghost", None, -1)])
            .await
            .unwrap_err();

        match err {
            DbError::InsufficientStock {
                product_id,
                variant,
                available,
                ..
            } => {
                assert_eq!(product_id, "ghost");
                assert_eq!(variant, "-");
                assert_eq!(available, 0);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_sale_number_rejected() {
        let db = db().await;
        let variant = Variant::new("M", "Negro");
        seed_variant(&db, "p1", Some(&variant), 1500, 10).await;

        let first = sample_record("20260314-001", sold_at(2026, 3, 14, 10));
        db.ledger()
            .commit_sale(&first, &[delta("p1", Some(variant.clone()), -2)])
            .await
            .unwrap();

        let imposter = sample_record("20260314-001", sold_at(2026, 3, 14, 11));
        let err = db
            .ledger()
            .commit_sale(&imposter, &[delta("p1", Some(variant.clone()), -2)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        // The rejected commit moved no stock
        let stock = db
            .catalog()
            .find_variant("p1", Some(&variant))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.stock, 8);
    }

    #[tokio::test]
    async fn test_positive_delta_restores_stock() {
        let db = db().await;
        let variant = Variant::new("M", "Negro");
        seed_variant(&db, "p1", Some(&variant), 1500, 5).await;

        // An exchange where returns dominate moves stock up, not down.
        let record = sample_record("20260314-001", sold_at(2026, 3, 14, 15));
        db.ledger()
            .commit_sale(&record, &[delta("p1", Some(variant.clone()), 3)])
            .await
            .unwrap();

        let stock = db
            .catalog()
            .find_variant("p1", Some(&variant))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stock.stock, 8);
    }

    #[tokio::test]
    async fn test_commit_without_deltas() {
        let db = db().await;

        // A quick-item-only sale touches no stock at all
        let mut record = sample_record("20260314-001", sold_at(2026, 3, 14, 15));
        record.items = vec![SaleItem {
            product_id: None,
            name_snapshot: "Dobladillo".to_string(),
            variant: None,
            unit_price: Money::from_pesos(500),
            quantity: 1,
            is_return: false,
            is_quick: true,
            is_offer: false,
        }];

        db.ledger().commit_sale(&record, &[]).await.unwrap();

        let loaded = db
            .ledger()
            .get_by_number("20260314-001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.items.len(), 1);
        assert!(loaded.items[0].is_quick);
        assert!(loaded.items[0].variant.is_none());
    }

    #[tokio::test]
    async fn test_last_sale_number() {
        let db = db().await;

        assert!(db
            .ledger()
            .last_sale_number("20260314")
            .await
            .unwrap()
            .is_none());

        for (number, day, hour) in [
            ("20260314-001", 14, 9),
            ("20260314-002", 14, 11),
            ("20260315-001", 15, 10),
        ] {
            let record = sample_record(number, sold_at(2026, 3, day, hour));
            db.ledger().commit_sale(&record, &[]).await.unwrap();
        }

        assert_eq!(
            db.ledger().last_sale_number("20260314").await.unwrap(),
            Some("20260314-002".to_string())
        );
        assert_eq!(
            db.ledger().last_sale_number("20260315").await.unwrap(),
            Some("20260315-001".to_string())
        );
        assert!(db
            .ledger()
            .last_sale_number("20260316")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_sales_for_day() {
        let db = db().await;

        let morning = sample_record("20260314-001", sold_at(2026, 3, 14, 9));
        let evening = sample_record("20260314-002", sold_at(2026, 3, 14, 19));
        let next_day = sample_record("20260315-001", sold_at(2026, 3, 15, 0));
        db.ledger().commit_sale(&evening, &[]).await.unwrap();
        db.ledger().commit_sale(&morning, &[]).await.unwrap();
        db.ledger().commit_sale(&next_day, &[]).await.unwrap();

        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let listed = db.ledger().sales_for_day(day).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].sale_number, "20260314-001");
        assert_eq!(listed[1].sale_number, "20260314-002");
        assert_eq!(listed[0].items.len(), 2);

        // Midnight belongs to the next day, not this one
        let next = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let listed = db.ledger().sales_for_day(next).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].sale_number, "20260315-001");

        let empty = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        assert!(db.ledger().sales_for_day(empty).await.unwrap().is_empty());
    }
}
