//! # Storage Gateways
//!
//! The async traits the engine needs from persistent storage. The
//! `punto-db` crate implements them over SQLite; tests substitute
//! in-memory fakes.
//!
//! ## Who Calls What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Finalize Data Flow                               │
//! │                                                                         │
//! │  CheckoutProcessor::finalize()                                          │
//! │        │                                                                │
//! │        ├── ProductCatalog::find_variant()   per variant in the cart     │
//! │        │         (live stock re-check before committing)                │
//! │        │                                                                │
//! │        ├── SaleLedger::last_sale_number()   for YYYYMMDD-NNN numbering  │
//! │        │                                                                │
//! │        └── SaleLedger::commit_sale()        sale + items + stock deltas │
//! │                  (one atomic transaction, all-or-nothing)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use punto_core::types::{SaleRecord, StockDelta, Variant, VariantStock};

use crate::error::{CatalogError, LedgerError};

/// Read access to the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Looks up live stock and list price for one product variant.
    ///
    /// `Ok(None)` means the variant does not exist; callers treat that
    /// as zero units available.
    async fn find_variant(
        &self,
        product_id: &str,
        variant: Option<&Variant>,
    ) -> Result<Option<VariantStock>, CatalogError>;
}

/// Append access to the sale ledger.
#[async_trait]
pub trait SaleLedger: Send + Sync {
    /// Commits a sale and its stock deltas as one atomic unit.
    ///
    /// Either the sale record, its items, and every stock movement all
    /// land, or none do. A stock guard that finds fewer units than a
    /// delta needs must abort the whole commit with
    /// [`LedgerError::InsufficientStock`].
    async fn commit_sale(
        &self,
        record: &SaleRecord,
        deltas: &[StockDelta],
    ) -> Result<(), LedgerError>;

    /// Returns the highest sale number recorded under a day prefix
    /// (`YYYYMMDD`), if any.
    async fn last_sale_number(&self, day_prefix: &str) -> Result<Option<String>, LedgerError>;

    /// All sales recorded for one calendar day, oldest first.
    async fn sales_for_day(&self, day: NaiveDate) -> Result<Vec<SaleRecord>, LedgerError>;
}
