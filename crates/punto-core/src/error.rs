//! # Error Types
//!
//! Domain-specific error types for punto-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  punto-core errors (this file)                                         │
//! │  ├── CoreError        - Session / cart / checkout rule violations      │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  punto-engine errors (separate crate)                                  │
//! │  ├── SessionError     - Session manager failures                       │
//! │  └── CheckoutError    - Finalize pipeline failures                     │
//! │                                                                         │
//! │  punto-db errors (separate crate)                                      │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → SessionError/CheckoutError        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (line ID, totals, limits)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use thiserror::Error;

use crate::money::Money;
use crate::types::SessionStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or domain logic failures.
/// They should be caught and translated to user-friendly messages.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Checkout attempted on a session with no lines.
    #[error("Cannot finalize an empty sale")]
    EmptyCart,

    /// Checkout attempted with a non-positive total.
    ///
    /// ## When This Occurs
    /// - Every line is a return (the balance is negative)
    /// - A 100% discount wiped the total
    ///
    /// Sessions like these are settled outside the sale flow; they can
    /// never commit as a sale.
    #[error("Sale total must be positive, got {total}")]
    InvalidTotal { total: Money },

    /// Credit payment without a cardholder name.
    #[error("Card payments require the cardholder name")]
    MissingCardName,

    /// Line cannot be found in the session.
    ///
    /// ## When This Occurs
    /// - The line was already removed (double-tap on delete)
    /// - A stale line ID from a previous session
    #[error("Line not found: {line_id}")]
    LineNotFound { line_id: String },

    /// Operation attempted on a session that already left the open state.
    #[error("Session is {status}, only open sessions can be modified")]
    SessionNotOpen { status: SessionStatus },

    /// Session has exceeded the maximum allowed lines.
    #[error("Sale cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., non-numeric DNI).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================
