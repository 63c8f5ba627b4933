//! # Engine Error Types
//!
//! Error types for session management, snapshots, configuration, and
//! the checkout pipeline.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Engine Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Sessions     │  │   Snapshots     │  │     Checkout            │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  NotFound       │  │  Io             │  │  Invalid (core rules)   │ │
//! │  │  Capacity       │  │  Serialize      │  │  InsufficientStock      │ │
//! │  │  Core(..)       │  │  NoDirectory    │  │  Catalog / Ledger       │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌──────────────────────────────────────────────┐ │
//! │  │  Configuration  │  │  Gateways (implemented by punto-db)          │ │
//! │  │                 │  │                                              │ │
//! │  │  Invalid        │  │  CatalogError::Unavailable                   │ │
//! │  │  LoadFailed     │  │  LedgerError::{InsufficientStock, Commit,    │ │
//! │  │  SaveFailed     │  │               Unavailable}                   │ │
//! │  └─────────────────┘  └──────────────────────────────────────────────┘ │
//! │                                                                         │
//! │  Snapshot failures are logged and swallowed by the manager: losing a    │
//! │  snapshot must never break the sale in progress.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use punto_core::CoreError;

// =============================================================================
// Session Error
// =============================================================================

/// Session manager failures.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No open session with this ID.
    #[error("Session not found: {0}")]
    NotFound(String),

    /// The open-session set is full.
    ///
    /// ## When This Occurs
    /// The operator tries to open another tab while `max_sessions`
    /// sales are already in progress. Old tabs must be finalized or
    /// cancelled first.
    #[error("Cannot open more than {max} concurrent sales")]
    CapacityExceeded { max: usize },

    /// A domain rule rejected the operation (wraps CoreError).
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for session manager operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Snapshot Error
// =============================================================================

/// Snapshot store failures.
///
/// The manager logs these at `warn` and keeps going; the snapshot is a
/// recovery aid, not a source of truth.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Filesystem access failed.
    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failed.
    #[error("Snapshot serialization failed: {0}")]
    Serde(#[from] serde_json::Error),

    /// No usable snapshot location on this platform.
    #[error("No snapshot directory available")]
    NoDirectory,
}

/// Result type alias for snapshot operations.
pub type SnapshotResult<T> = Result<T, SnapshotError>;

// =============================================================================
// Config Error
// =============================================================================

/// Terminal configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration value out of bounds.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Gateway Errors
// =============================================================================

/// Product catalog lookup failures.
///
/// "Variant not found" is not an error: `find_variant` returns
/// `Ok(None)` for that and the caller treats it as zero stock.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog backend could not be reached or failed mid-query.
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Sale ledger failures.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A stock guard inside the commit transaction found fewer units
    /// than the sale needs. Nothing was written.
    #[error("Insufficient stock for {product_id} ({variant}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        /// Display label ("M/Negro", or "-" for variant-less products).
        variant: String,
        available: i64,
        requested: i64,
    },

    /// The all-or-nothing commit failed and was rolled back.
    #[error("Sale commit failed: {0}")]
    Commit(String),

    /// The ledger backend could not be reached.
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// Checkout Error
// =============================================================================

/// Everything `CheckoutProcessor::finalize` can fail with.
///
/// Whatever the variant, a failed finalize leaves the session exactly
/// as it was: still open, still editable.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The checkout gate rejected the session (empty cart,
    /// non-positive total, missing card name).
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// Session lookup or retirement failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Live stock is short of what the session needs.
    #[error("Insufficient stock for {product_id} ({variant}): available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        variant: String,
        available: i64,
        requested: i64,
    },

    /// The stock re-check could not read the catalog.
    #[error("Catalog lookup failed: {0}")]
    Catalog(#[from] CatalogError),

    /// The atomic commit failed.
    #[error("Sale commit failed: {0}")]
    Ledger(LedgerError),
}

/// A shortfall detected inside the commit transaction surfaces the
/// same way as one caught by the pre-check.
impl From<LedgerError> for CheckoutError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientStock {
                product_id,
                variant,
                available,
                requested,
            } => CheckoutError::InsufficientStock {
                product_id,
                variant,
                available,
                requested,
            },
            other => CheckoutError::Ledger(other),
        }
    }
}

/// Result type alias for checkout operations.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================
