//! # Gateway Implementations
//!
//! Wires the engine's storage traits onto the SQLite repositories.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CheckoutProcessor (punto-engine)                                      │
//! │       │                                                                 │
//! │       │  dyn ProductCatalog        dyn SaleLedger                      │
//! │       ▼                            ▼                                    │
//! │  Database (this crate) ───► CatalogRepository / LedgerRepository       │
//! │       │                                                                 │
//! │       │  DbError → CatalogError / LedgerError                          │
//! │       ▼                                                                 │
//! │  SQLite                                                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never sees a `DbError`. Storage failures are translated
//! here into the domain errors it understands, and the stock shortfall
//! keeps its structured fields all the way up.

use async_trait::async_trait;
use chrono::NaiveDate;

use punto_core::types::{SaleRecord, StockDelta, Variant, VariantStock};
use punto_engine::{CatalogError, LedgerError, ProductCatalog, SaleLedger};

use crate::error::DbError;
use crate::pool::Database;

#[async_trait]
impl ProductCatalog for Database {
    async fn find_variant(
        &self,
        product_id: &str,
        variant: Option<&Variant>,
    ) -> Result<Option<VariantStock>, CatalogError> {
        self.catalog()
            .find_variant(product_id, variant)
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl SaleLedger for Database {
    async fn commit_sale(
        &self,
        record: &SaleRecord,
        deltas: &[StockDelta],
    ) -> Result<(), LedgerError> {
        self.ledger()
            .commit_sale(record, deltas)
            .await
            .map_err(commit_error)
    }

    async fn last_sale_number(&self, day_prefix: &str) -> Result<Option<String>, LedgerError> {
        self.ledger()
            .last_sale_number(day_prefix)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }

    async fn sales_for_day(&self, day: NaiveDate) -> Result<Vec<SaleRecord>, LedgerError> {
        self.ledger()
            .sales_for_day(day)
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))
    }
}

/// Translates a commit failure into the ledger error the engine
/// understands. The stock shortfall keeps its fields; everything else
/// degrades to a commit failure message.
fn commit_error(err: DbError) -> LedgerError {
    match err {
        DbError::InsufficientStock {
            product_id,
            variant,
            available,
            requested,
        } => LedgerError::InsufficientStock {
            product_id,
            variant,
            available,
            requested,
        },
        other => LedgerError::Commit(other.to_string()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
