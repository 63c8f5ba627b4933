//! # Repository Module
//!
//! Database repository implementations for Punto POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  CheckoutProcessor (via gateway traits)                                │
//! │       │                                                                 │
//! │       │  db.ledger().commit_sale(&record, &deltas)                     │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  LedgerRepository                                                      │
//! │  ├── commit_sale(&self, record, deltas)                                │
//! │  ├── last_sale_number(&self, day_prefix)                               │
//! │  └── sales_for_day(&self, day)                                         │
//! │       │                                                                 │
//! │       │  SQL (one transaction for the commit)                          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`catalog::CatalogRepository`] - Product and variant storage, stock reads
//! - [`ledger::LedgerRepository`] - Committed sales, atomic stock movements

pub mod catalog;
pub mod ledger;
