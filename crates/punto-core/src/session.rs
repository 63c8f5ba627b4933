//! # Sales Session
//!
//! One open sale: its cart lines, customer data, and payment setup.
//! Several sessions can be open at once (the operator flips between
//! them like browser tabs); the session manager in the engine crate
//! owns that set. This module owns what happens *inside* one session.
//!
//! ## Line Mutation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Line Operations                              │
//! │                                                                         │
//! │  Operator Action           Operation              Session Change        │
//! │  ───────────────           ─────────              ──────────────        │
//! │                                                                         │
//! │  Scan / tap product ─────► add_line() ──────────► merge or push        │
//! │                                                                         │
//! │  Change quantity ────────► set_quantity() ──────► qty = n (0 removes)  │
//! │                                                                         │
//! │  Haggle a price ─────────► set_custom_price() ──► override unit price  │
//! │                                                                         │
//! │  Mark as offer ──────────► set_offer() ─────────► exempt from discount │
//! │                                                                         │
//! │  Remove line ────────────► remove_line() ───────► items.remove(i)      │
//! │                                                                         │
//! │  NOTE: every operation refuses to run once the session left Open.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{FeeEdit, LineKind, PaymentMethod, Percent, SessionStatus};
use crate::{MAX_LINE_QUANTITY, MAX_SESSION_LINES};

// =============================================================================
// Line Item
// =============================================================================

/// One line in a session's cart.
///
/// ## Design Notes
/// - `unit_price`: frozen at add time. Catalog price changes after the
///   line was added never affect an open sale.
/// - `custom_price`: operator override; wins over `unit_price` when set.
/// - `stock_snapshot`: what the catalog reported when the line was added.
///   Display-only; finalize re-checks stock against the live catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line ID (UUID), stable across quantity/price edits.
    pub line_id: String,

    /// What this line is: regular, quick, or return.
    pub kind: LineKind,

    /// Display name at time of adding (frozen)
    pub name: String,

    /// List price at time of adding (frozen)
    pub unit_price: Money,

    /// Operator price override; `None` means the list price applies.
    pub custom_price: Option<Money>,

    /// Units on this line, always >= 1 (the sign lives in the price).
    pub quantity: i64,

    /// Exempt from the session discount.
    pub is_offer: bool,

    /// Stock level seen when the line was added. Informational only.
    pub stock_snapshot: Option<i64>,

    /// When this line was added.
    pub added_at: DateTime<Utc>,
}

impl LineItem {
    fn from_draft(draft: LineDraft) -> Self {
        LineItem {
            line_id: Uuid::new_v4().to_string(),
            kind: draft.kind,
            name: draft.name,
            unit_price: draft.unit_price,
            custom_price: None,
            quantity: draft.quantity,
            is_offer: false,
            stock_snapshot: draft.stock_snapshot,
            added_at: Utc::now(),
        }
    }

    /// The price one unit actually contributes to the sale.
    ///
    /// Custom price wins over the frozen list price; return lines are
    /// sign-normalized to negative regardless of how the price was
    /// entered.
    pub fn effective_unit_price(&self) -> Money {
        let base = self.custom_price.unwrap_or(self.unit_price);
        if self.kind.is_return() {
            base.abs().neg()
        } else {
            base
        }
    }

    /// Line amount: effective unit price × quantity (signed).
    pub fn line_total(&self) -> Money {
        self.effective_unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Line Draft
// =============================================================================

/// Input for `Session::add_line`.
///
/// Constructors cover the three line kinds; optional fields chain on.
///
/// ## Example
/// ```rust
/// use punto_core::money::Money;
/// use punto_core::session::LineDraft;
/// use punto_core::types::Variant;
///
/// let draft = LineDraft::regular("prod-1", "Remera lisa", Money::from_pesos(1000), 3)
///     .with_variant(Variant::new("M", "Negro"))
///     .with_stock_snapshot(12);
/// assert_eq!(draft.quantity, 3);
/// ```
#[derive(Debug, Clone)]
pub struct LineDraft {
    pub kind: LineKind,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub stock_snapshot: Option<i64>,
}

impl LineDraft {
    /// A catalog-backed line.
    pub fn regular(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        quantity: i64,
    ) -> Self {
        LineDraft {
            kind: LineKind::Regular {
                product_id: product_id.into(),
                variant: None,
            },
            name: name.into(),
            unit_price,
            quantity,
            stock_snapshot: None,
        }
    }

    /// An ad-hoc line with an operator-typed name and price.
    pub fn quick(name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        LineDraft {
            kind: LineKind::Quick,
            name: name.into(),
            unit_price,
            quantity,
            stock_snapshot: None,
        }
    }

    /// A return line. The price may be entered positive or negative;
    /// the session normalizes it to a negative contribution.
    pub fn return_of(name: impl Into<String>, unit_price: Money, quantity: i64) -> Self {
        LineDraft {
            kind: LineKind::Return {
                product_id: None,
                variant: None,
            },
            name: name.into(),
            unit_price,
            quantity,
            stock_snapshot: None,
        }
    }

    /// Attaches a size/color variant (regular and return lines).
    pub fn with_variant(mut self, variant: crate::types::Variant) -> Self {
        match &mut self.kind {
            LineKind::Regular { variant: v, .. } => *v = Some(variant),
            LineKind::Return { variant: v, .. } => *v = Some(variant),
            LineKind::Quick => {}
        }
        self
    }

    /// Links a return line back to the product it came from.
    pub fn with_product(mut self, product_id: impl Into<String>) -> Self {
        if let LineKind::Return { product_id: p, .. } = &mut self.kind {
            *p = Some(product_id.into());
        }
        self
    }

    /// Records the stock level the catalog reported at add time.
    pub fn with_stock_snapshot(mut self, stock: i64) -> Self {
        self.stock_snapshot = Some(stock);
        self
    }
}

// =============================================================================
// Session
// =============================================================================

/// One sales session (an open "tab").
///
/// ## Invariants
/// - Lines merge by `VariantKey` (regular lines only, no custom price)
/// - `quantity` >= 1 on every line (setting <= 0 removes the line)
/// - Maximum lines per session: `MAX_SESSION_LINES`
/// - Maximum quantity per line: `MAX_LINE_QUANTITY`
/// - Mutations are rejected once `status` leaves `Open`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (UUID v4).
    pub id: String,

    /// Tab label shown to the operator ("Venta 1", a customer name, ...).
    pub label: String,

    /// Lifecycle status; one-way out of `Open`.
    pub status: SessionStatus,

    /// Cart lines.
    pub items: Vec<LineItem>,

    /// Session-wide discount percentage.
    pub discount: Percent,

    /// How the customer pays. Defaults to cash.
    pub payment_method: PaymentMethod,

    /// Cash handed over by the customer (cash sales).
    pub cash_received: Money,

    /// Cardholder name (credit sales).
    pub card_name: Option<String>,

    /// Card installments, >= 1.
    pub installments: u32,

    /// Card processor commission.
    pub commission: Percent,

    /// Operator-typed net deposit amount; `None` until edited.
    pub net_amount_override: Option<Money>,

    /// Which of commission / net amount was edited last.
    pub fee_edit: FeeEdit,

    /// Optional customer name for the record.
    pub customer_name: Option<String>,

    /// Optional customer tax ID.
    pub customer_dni: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new open session with the given tab label.
    pub fn new(label: impl Into<String>) -> Self {
        let now = Utc::now();
        Session {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            status: SessionStatus::Open,
            items: Vec::new(),
            discount: Percent::zero(),
            payment_method: PaymentMethod::Cash,
            cash_received: Money::zero(),
            card_name: None,
            installments: 1,
            commission: Percent::zero(),
            net_amount_override: None,
            fee_edit: FeeEdit::Commission,
            customer_name: None,
            customer_dni: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.status.is_open() {
            Ok(())
        } else {
            Err(CoreError::SessionNotOpen {
                status: self.status,
            })
        }
    }

    /// Adds a line, merging into an existing regular line when possible.
    ///
    /// ## Merge Rule
    /// A draft merges into an existing line when both are regular lines
    /// with equal `VariantKey` and the existing line has no custom
    /// price. Quick items and returns always get their own line.
    ///
    /// ## Returns
    /// The ID of the affected line (merged-into or freshly added).
    pub fn add_line(&mut self, draft: LineDraft) -> CoreResult<String> {
        self.ensure_open()?;

        if draft.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "name".to_string(),
            }
            .into());
        }
        if draft.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if draft.quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: draft.quantity,
                max: MAX_LINE_QUANTITY,
            });
        }
        // Return lines are sign-normalized later; everything else must
        // be priced at zero or above.
        if !draft.kind.is_return() && draft.unit_price.is_negative() {
            return Err(ValidationError::MustBePositive {
                field: "unit_price".to_string(),
            }
            .into());
        }

        // Merge into an existing regular line with the same identity
        if let Some(key) = draft.kind.merge_key() {
            if let Some(line) = self
                .items
                .iter_mut()
                .find(|i| i.custom_price.is_none() && i.kind.merge_key().as_ref() == Some(&key))
            {
                let new_qty = line.quantity + draft.quantity;
                if new_qty > MAX_LINE_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: new_qty,
                        max: MAX_LINE_QUANTITY,
                    });
                }
                line.quantity = new_qty;
                if draft.stock_snapshot.is_some() {
                    line.stock_snapshot = draft.stock_snapshot;
                }
                return Ok(line.line_id.clone());
            }
        }

        // Check max lines
        if self.items.len() >= MAX_SESSION_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_SESSION_LINES,
            });
        }

        let line = LineItem::from_draft(draft);
        let line_id = line.line_id.clone();
        self.items.push(line);
        Ok(line_id)
    }

    /// Removes a line by ID.
    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<()> {
        self.ensure_open()?;

        let initial_len = self.items.len();
        self.items.retain(|i| i.line_id != line_id);

        if self.items.len() == initial_len {
            Err(CoreError::LineNotFound {
                line_id: line_id.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Updates the quantity of a line.
    ///
    /// ## Behavior
    /// - quantity <= 0 removes the line
    /// - quantity above the per-line maximum is rejected
    pub fn set_quantity(&mut self, line_id: &str, quantity: i64) -> CoreResult<()> {
        self.ensure_open()?;

        if quantity <= 0 {
            return self.remove_line(line_id);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        let line = self.line_mut(line_id)?;
        line.quantity = quantity;
        Ok(())
    }

    /// Sets or clears (`None`) the operator price override on a line.
    ///
    /// The override is entered as a magnitude; return lines keep taking
    /// their sign from the line kind.
    pub fn set_custom_price(&mut self, line_id: &str, price: Option<Money>) -> CoreResult<()> {
        self.ensure_open()?;

        if let Some(p) = price {
            if p.is_negative() {
                return Err(ValidationError::MustBePositive {
                    field: "custom_price".to_string(),
                }
                .into());
            }
        }

        let line = self.line_mut(line_id)?;
        line.custom_price = price;
        Ok(())
    }

    /// Flags or unflags a line as an offer (exempt from the discount).
    pub fn set_offer(&mut self, line_id: &str, is_offer: bool) -> CoreResult<()> {
        self.ensure_open()?;
        let line = self.line_mut(line_id)?;
        line.is_offer = is_offer;
        Ok(())
    }

    /// One-way transition `Open → Finalized`.
    pub fn mark_finalized(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.status = SessionStatus::Finalized;
        Ok(())
    }

    /// One-way transition `Open → Cancelled`.
    pub fn mark_cancelled(&mut self) -> CoreResult<()> {
        self.ensure_open()?;
        self.status = SessionStatus::Cancelled;
        Ok(())
    }

    /// Bumps `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Looks up a line by ID.
    pub fn line(&self, line_id: &str) -> Option<&LineItem> {
        self.items.iter().find(|i| i.line_id == line_id)
    }

    fn line_mut(&mut self, line_id: &str) -> CoreResult<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|i| i.line_id == line_id)
            .ok_or_else(|| CoreError::LineNotFound {
                line_id: line_id.to_string(),
            })
    }

    /// All lines, in add order.
    pub fn lines(&self) -> &[LineItem] {
        &self.items
    }

    /// Checks if the session has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
