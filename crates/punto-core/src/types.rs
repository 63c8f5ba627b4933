//! # Domain Types
//!
//! Core domain types for Punto POS. These types are shared across all layers:
//! session engine, checkout processor, database, and any future surface.
//!
//! ## Type Relationships
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Domain Type Relationships                         │
//! │                                                                         │
//! │  Session ──(contains)──► LineItem ──(kind)──► LineKind                 │
//! │     │                        │                  ├── Regular {variant}  │
//! │     │                        │                  ├── Quick              │
//! │     │                        │                  └── Return  {variant}  │
//! │     │                        │                                          │
//! │     │                        └──(merges by)──► VariantKey              │
//! │     │                                                                   │
//! │     └──(finalizes into)──► SaleRecord ──(contains)──► SaleItem         │
//! │                                │                                        │
//! │                                └──(moves stock via)──► StockDelta      │
//! │                                                                         │
//! │  VariantStock: the catalog's answer for one (product, size, color)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::money::Money;

// =============================================================================
// Percent (basis points)
// =============================================================================

/// A percentage represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 235 bps = 2.35% (a typical card commission)
///
/// Both the session discount and the card commission use this type, so
/// percentage math is integer math everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percent(u32);

impl Percent {
    /// Creates a percentage from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Percent(bps)
    }

    /// Creates a percentage from a float (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        Percent((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero percent.
    #[inline]
    pub const fn zero() -> Self {
        Percent(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Percent {
    fn default() -> Self {
        Percent::zero()
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percentage())
    }
}

// =============================================================================
// Session Status
// =============================================================================

/// The lifecycle status of a sales session.
///
/// Transitions are one-way out of `Open`:
/// ```text
///            finalize()              cancel()
///   Open ───────────────► Finalized
///   Open ───────────────────────────────────► Cancelled
/// ```
/// A session never re-enters `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Session is in progress (lines being added, payment being set up).
    Open,
    /// Session was committed as a sale.
    Finalized,
    /// Session was abandoned by the operator.
    Cancelled,
}

impl SessionStatus {
    /// Only open sessions accept mutations.
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, SessionStatus::Open)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Open => "open",
            SessionStatus::Finalized => "finalized",
            SessionStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment. The only method that produces change,
    /// and the reason totals are rounded to the cash bucket.
    Cash,
    /// Card payment on an external terminal (credit or debit).
    /// Requires the cardholder name; supports installments.
    Credit,
    /// QR / wallet transfer payment.
    Qr,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Qr => "qr",
        };
        write!(f, "{}", s)
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

// =============================================================================
// Fee Edit Marker
// =============================================================================

/// Which side of the commission/net pair the operator edited last.
///
/// The card fee can be entered either way: as a commission percentage
/// (net amount is derived) or as the exact net amount the processor will
/// deposit (commission is back-computed). The marker makes the derivation
/// direction explicit instead of guessing from which field looks dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeEdit {
    /// Operator entered the commission percentage.
    Commission,
    /// Operator entered the net deposit amount.
    NetAmount,
}

impl Default for FeeEdit {
    fn default() -> Self {
        FeeEdit::Commission
    }
}

// =============================================================================
// Variants
// =============================================================================

/// A size/color combination of a product.
///
/// Both fields are non-empty when the variant exists; products without
/// size/color distinctions carry no variant at all (`Option<Variant>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub size: String,
    pub color: String,
}

impl Variant {
    pub fn new(size: impl Into<String>, color: impl Into<String>) -> Self {
        Variant {
            size: size.into(),
            color: color.into(),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.size, self.color)
    }
}

/// The identity under which cart lines merge: product plus variant.
///
/// Two lines are "the same thing" exactly when their keys are equal.
/// Keeping this as a named type (instead of ad-hoc tuple comparisons)
/// means the merge rule lives in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariantKey {
    pub product_id: String,
    pub size: Option<String>,
    pub color: Option<String>,
}

impl VariantKey {
    pub fn new(product_id: &str, variant: Option<&Variant>) -> Self {
        VariantKey {
            product_id: product_id.to_string(),
            size: variant.map(|v| v.size.clone()),
            color: variant.map(|v| v.color.clone()),
        }
    }
}

/// The catalog's authoritative answer for one (product, variant) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantStock {
    /// Units currently on hand.
    pub stock: i64,
    /// Current list price.
    pub price: Money,
}

// =============================================================================
// Line Kind
// =============================================================================

/// What a cart line actually is.
///
/// ## Why a tagged union?
/// Quick items have no product, returns may or may not reference one,
/// and regular lines always do. Encoding that as three variants makes
/// illegal states (a quick item with a variant, say) unrepresentable.
/// The offer flag stays orthogonal on the line itself: any kind of line
/// can be exempted from the session discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineKind {
    /// A catalog-backed item. Participates in stock checks and merging.
    Regular {
        product_id: String,
        variant: Option<Variant>,
    },
    /// An ad-hoc item typed in by the operator (name + price on the
    /// spot). No product reference, never stock-checked, never merged.
    Quick,
    /// Returned merchandise. Contributes a negative amount; exempt from
    /// stock checks; never merged.
    Return {
        product_id: Option<String>,
        variant: Option<Variant>,
    },
}

impl LineKind {
    #[inline]
    pub const fn is_return(&self) -> bool {
        matches!(self, LineKind::Return { .. })
    }

    #[inline]
    pub const fn is_quick(&self) -> bool {
        matches!(self, LineKind::Quick)
    }

    /// The referenced product, when there is one.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            LineKind::Regular { product_id, .. } => Some(product_id),
            LineKind::Quick => None,
            LineKind::Return { product_id, .. } => product_id.as_deref(),
        }
    }

    /// The referenced variant, when there is one.
    pub fn variant(&self) -> Option<&Variant> {
        match self {
            LineKind::Regular { variant, .. } => variant.as_ref(),
            LineKind::Quick => None,
            LineKind::Return { variant, .. } => variant.as_ref(),
        }
    }

    /// The identity under which this line merges with others.
    ///
    /// Only regular lines merge; quick items and returns always get
    /// their own line.
    pub fn merge_key(&self) -> Option<VariantKey> {
        match self {
            LineKind::Regular {
                product_id,
                variant,
            } => Some(VariantKey::new(product_id, variant.as_ref())),
            _ => None,
        }
    }

    /// Whether finalize moves stock for this line.
    ///
    /// Regular lines consume stock. Returns restore it, but only when
    /// they reference the product they came from; quick items and
    /// unreferenced returns leave stock alone.
    #[inline]
    pub const fn tracks_stock(&self) -> bool {
        match self {
            LineKind::Regular { .. } => true,
            LineKind::Quick => false,
            LineKind::Return { product_id, .. } => product_id.is_some(),
        }
    }
}

// =============================================================================
// Sale Record
// =============================================================================

/// One committed sale. Immutable once written to the ledger.
///
/// All monetary fields are frozen copies of the totals at finalize time;
/// re-computing from the items must reproduce them, but the record never
/// depends on live catalog data again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// UUID v4, primary identity.
    pub id: String,
    /// Human-facing per-day number: `YYYYMMDD-NNN`.
    pub sale_number: String,
    /// Commit timestamp; start of day when the sale was backdated.
    pub sold_at: DateTime<Utc>,
    pub payment_method: PaymentMethod,
    /// Cardholder name (credit only).
    pub card_name: Option<String>,
    /// Number of card installments (1 = single payment).
    pub installments: u32,
    /// Commission applied by the card processor.
    pub commission: Percent,
    /// What the processor actually deposits after its fee.
    pub net_amount: Money,
    /// Session discount at finalize time.
    pub discount: Percent,
    pub customer_name: Option<String>,
    pub customer_dni: Option<String>,
    pub subtotal: Money,
    pub discount_value: Money,
    /// Signed, unrounded sum (negative when returns dominated).
    pub balance: Money,
    /// What the customer was charged (rounded, never negative).
    pub total: Money,
    pub cash_received: Money,
    pub change: Money,
    pub items: Vec<SaleItem>,
}

/// One line of a committed sale.
///
/// A frozen projection of the session line: names and prices are
/// snapshots so later catalog edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    pub product_id: Option<String>,
    /// Display name at sale time.
    pub name_snapshot: String,
    pub variant: Option<Variant>,
    /// Effective unit price actually charged (signed; negative for
    /// returns, custom price already applied).
    pub unit_price: Money,
    pub quantity: i64,
    pub is_return: bool,
    pub is_quick: bool,
    pub is_offer: bool,
}

/// A stock movement produced by a committed sale.
///
/// Negative delta for sold units. Applied by the ledger inside the same
/// transaction that writes the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: String,
    pub variant: Option<Variant>,
    pub delta: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
