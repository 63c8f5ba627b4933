//! # punto-db: Database Layer for Punto POS
//!
//! This crate provides database access for the Punto POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Punto POS Data Flow                              │
//! │                                                                         │
//! │  CheckoutProcessor (punto-engine)                                      │
//! │       │                                                                 │
//! │       │  via ProductCatalog / SaleLedger traits                        │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     punto-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (catalog.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │ (ledger.rs)   │    │              │  │   │
//! │  │   │ SqlitePool    │    │               │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │◄───│ CatalogRepo   │    │ 002_idx.sql  │  │   │
//! │  │   │ Management    │    │ LedgerRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   ~/.local/share/punto/pos/punto.db                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (catalog, ledger)
//! - [`gateway`] - Engine trait implementations over the repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use punto_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/punto.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories directly
//! let stock = db.catalog().find_variant("prod-1", None).await?;
//!
//! // Or hand the handle to the engine as its storage gateways
//! let db = std::sync::Arc::new(db);
//! let checkout = CheckoutProcessor::new(db.clone(), db.clone());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod gateway;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::catalog::{CatalogRepository, ProductRow, VariantRow};
pub use repository::ledger::LedgerRepository;
