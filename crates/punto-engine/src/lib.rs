//! # Punto Engine
//!
//! Session lifecycle and checkout orchestration for Punto POS.
//!
//! `punto-core` defines what a session *is* and what a sale *costs*;
//! this crate decides when sessions open, close, persist, and become
//! committed sales. Storage stays behind two async traits so the engine
//! never links against a database.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         punto-engine                                    │
//! │                                                                         │
//! │   ┌───────────────────┐          ┌─────────────────────┐                │
//! │   │  SessionManager   │          │  CheckoutProcessor  │                │
//! │   │                   │          │                     │                │
//! │   │  open set         │◄────────►│  validate           │                │
//! │   │  active pointer   │  retire  │  verify stock       │                │
//! │   │  label counter    │          │  number the sale    │                │
//! │   │  line ops         │          │  commit atomically  │                │
//! │   └─────────┬─────────┘          └──────────┬──────────┘                │
//! │             │                               │                           │
//! │             ▼                               ▼                           │
//! │   ┌───────────────────┐          ┌─────────────────────┐                │
//! │   │   SnapshotStore   │          │   ProductCatalog    │                │
//! │   │   (sessions.json) │          │   SaleLedger        │                │
//! │   └───────────────────┘          │   (punto-db)        │                │
//! │                                  └─────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use punto_core::{LineDraft, Money};
//! use punto_engine::{EngineConfig, SessionManager};
//!
//! let mut manager = SessionManager::in_memory(EngineConfig::default());
//! let id = manager.active_id().to_string();
//! manager
//!     .add_line(&id, LineDraft::quick("Gorra", Money::from_pesos(1000), 2))
//!     .unwrap();
//! assert_eq!(manager.active_totals().total, Money::from_pesos(2000));
//! ```

pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod manager;
pub mod snapshot;

// Re-export the main API surface
pub use checkout::CheckoutProcessor;
pub use config::EngineConfig;
pub use error::{
    CatalogError, CheckoutError, CheckoutResult, ConfigError, ConfigResult, LedgerError,
    SessionError, SessionResult, SnapshotError, SnapshotResult,
};
pub use gateway::{ProductCatalog, SaleLedger};
pub use manager::SessionManager;
pub use snapshot::{
    default_snapshot_path, FileSnapshotStore, MemorySnapshotStore, SessionSnapshot, SnapshotStore,
    SNAPSHOT_SCHEMA_VERSION,
};
