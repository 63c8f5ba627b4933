//! # punto-core: Pure Business Logic for Punto POS
//!
//! This crate is the **heart** of Punto POS. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Punto POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 punto-engine (Orchestration)                    │   │
//! │  │   SessionManager ──► CheckoutProcessor ──► gateway traits       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ punto-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  session  │  │  pricing  │  │   │
//! │  │   │ LineKind  │  │   Money   │  │  Session  │  │  Totals   │  │   │
//! │  │   │SaleRecord │  │  Percent  │  │ LineItem  │  │ pipeline  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    punto-db (Database Layer)                    │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (LineKind, SaleRecord, Percent, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`session`] - Sales sessions and their cart line operations
//! - [`pricing`] - The totals pipeline (subtotal → discount → total)
//! - [`error`] - Domain error types
//! - [`validation`] - Field validation and the checkout gate
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are whole pesos (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use punto_core::money::Money;
//! use punto_core::pricing::compute_totals;
//! use punto_core::session::{LineDraft, Session};
//! use punto_core::types::Percent;
//!
//! let mut session = Session::new("Venta 1");
//! session
//!     .add_line(LineDraft::regular("p1", "Remera lisa", Money::from_pesos(1000), 3))
//!     .unwrap();
//! session.discount = Percent::from_percentage(10.0);
//!
//! let totals = compute_totals(&session);
//! // 3000 − 10% = 2700, charged in 500-peso steps: 2500
//! assert_eq!(totals.total.pesos(), 2500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod pricing;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use punto_core::Money` instead of
// `use punto_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use pricing::{compute_totals, compute_totals_with_bucket, Totals};
pub use session::{LineDraft, LineItem, Session};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum concurrently open sessions.
///
/// ## Why a constant?
/// One operator juggles a handful of customers at most; a runaway tab
/// bar usually means abandoned sessions nobody cleaned up. The engine
/// config can lower this per terminal but never raise it.
pub const MAX_SESSIONS: usize = 10;

/// Maximum lines allowed in a single session.
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
pub const MAX_SESSION_LINES: usize = 200;

/// Maximum quantity of a single line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default cash rounding bucket, in whole pesos.
///
/// Cash sales settle in steps of this amount; card and QR charge the
/// same rounded figure so one sale never has two prices.
pub const CASH_ROUNDING_BUCKET: i64 = 500;
