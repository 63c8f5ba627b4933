//! # Validation Rules
//!
//! Input validation for operator-entered data, plus the checkout
//! gate that decides whether a session may finalize.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Two Validation Layers                               │
//! │                                                                         │
//! │  Field validators (this file)        Checkout gate (this file)         │
//! │  ─────────────────────────────       ────────────────────────          │
//! │  Run when the operator types:        Runs once, at finalize:           │
//! │    label, names, DNI,                  cart not empty                   │
//! │    discount, commission,               total positive                   │
//! │    installments, cash                  card name present (credit)       │
//! │                                                                         │
//! │  Reject early, before the            The last word before anything     │
//! │  session state changes.              touches the ledger.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, ValidationError, ValidationResult};
use crate::money::Money;
use crate::pricing::Totals;
use crate::session::Session;
use crate::types::{PaymentMethod, Percent};

// =============================================================================
// Field Limits
// =============================================================================

/// Maximum length for a session label.
pub const MAX_LABEL_LENGTH: usize = 60;

/// Maximum length for customer and cardholder names.
pub const MAX_NAME_LENGTH: usize = 120;

/// Maximum card installments offered.
pub const MAX_INSTALLMENTS: u32 = 24;

/// DNI digit-count bounds.
pub const MIN_DNI_DIGITS: usize = 6;
pub const MAX_DNI_DIGITS: usize = 11;

// =============================================================================
// Field Validators
// =============================================================================

/// Validates a session label: non-blank, bounded length.
pub fn validate_label(label: &str) -> ValidationResult<()> {
    if label.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "label".to_string(),
        });
    }
    if label.len() > MAX_LABEL_LENGTH {
        return Err(ValidationError::TooLong {
            field: "label".to_string(),
            max: MAX_LABEL_LENGTH,
        });
    }
    Ok(())
}

/// Validates a customer or cardholder name length.
///
/// Blank is allowed here (the customer is optional on most sales);
/// the checkout gate enforces presence where it matters.
pub fn validate_person_name(field: &str, name: &str) -> ValidationResult<()> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Validates a DNI: digits only, plausible length.
pub fn validate_dni(dni: &str) -> ValidationResult<()> {
    if !dni.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "dni".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }
    if dni.len() < MIN_DNI_DIGITS || dni.len() > MAX_DNI_DIGITS {
        return Err(ValidationError::OutOfRange {
            field: "dni".to_string(),
            min: MIN_DNI_DIGITS as i64,
            max: MAX_DNI_DIGITS as i64,
        });
    }
    Ok(())
}

/// Validates a discount or commission rate: at most 100%.
pub fn validate_rate(field: &str, rate: Percent) -> ValidationResult<()> {
    if rate.bps() > 10000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10000,
        });
    }
    Ok(())
}

/// Validates an installment count.
pub fn validate_installments(installments: u32) -> ValidationResult<()> {
    if installments < 1 || installments > MAX_INSTALLMENTS {
        return Err(ValidationError::OutOfRange {
            field: "installments".to_string(),
            min: 1,
            max: MAX_INSTALLMENTS as i64,
        });
    }
    Ok(())
}

/// Validates cash received: never negative.
pub fn validate_cash_received(amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustBePositive {
            field: "cash_received".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Checkout Gate
// =============================================================================

/// Decides whether a session may finalize into a sale.
///
/// Checks run in order; the first violation is returned and the
/// session is left untouched:
/// 1. The cart must have at least one line.
/// 2. The charged total must be positive (an all-returns session
///    settles as a refund elsewhere, never as a sale).
/// 3. Credit payments need the cardholder name.
pub fn validate_for_checkout(session: &Session, totals: &Totals) -> CoreResult<()> {
    if session.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    if !totals.total.is_positive() {
        return Err(CoreError::InvalidTotal {
            total: totals.total,
        });
    }

    if session.payment_method == PaymentMethod::Credit {
        let blank = session
            .card_name
            .as_deref()
            .map_or(true, |name| name.trim().is_empty());
        if blank {
            return Err(CoreError::MissingCardName);
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
