//! # Pricing Calculator
//!
//! Derives every money figure of a session from its current state.
//! Pure: no clock, no I/O, no mutation. Call it as often as the UI
//! repaints.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Totals Pipeline                                    │
//! │                                                                         │
//! │  lines ──► effective price × qty ──► subtotal (signed)                 │
//! │                │                                                        │
//! │                └─ non-offer lines ──► discount base ──► discount value │
//! │                                                                         │
//! │  balance = subtotal − discount value          (signed, unrounded)      │
//! │                                                                         │
//! │  total = round_to_bucket(max(0, balance))     (what gets charged)      │
//! │                                                                         │
//! │  change = max(0, cash received − total)       (cash only)              │
//! │                                                                         │
//! │  net amount ◄── commission% of total   OR   operator-typed net         │
//! │                 (direction picked by the fee-edit marker)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `balance` and `total` answer different questions and are always
//! reported side by side: `balance` is "where does this sale stand"
//! (negative when returns dominate), `total` is "what does the customer
//! hand over" (never negative, always a cash-bucket multiple).

use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::session::Session;
use crate::types::{FeeEdit, PaymentMethod, Percent};
use crate::CASH_ROUNDING_BUCKET;

// =============================================================================
// Totals
// =============================================================================

/// Everything the pricing pipeline derives from one session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// Σ effective price × quantity over all lines (signed).
    pub subtotal: Money,

    /// Discount applied to non-offer lines.
    pub discount_value: Money,

    /// subtotal − discount, untouched. Negative when returns dominate.
    pub balance: Money,

    /// The charged amount: balance clamped to zero and rounded to the
    /// cash bucket. Never negative.
    pub total: Money,

    /// Cash handed back to the customer. Zero for non-cash methods.
    pub change: Money,

    /// What the card processor deposits after its fee. Equals `total`
    /// for cash sales.
    pub net_amount: Money,

    /// Effective commission: as entered, or back-computed from the
    /// operator-typed net amount.
    pub commission: Percent,

    /// Total units across all lines (Σ quantity).
    pub item_count: i64,

    /// Number of lines.
    pub line_count: usize,
}

// =============================================================================
// Computation
// =============================================================================

/// Computes totals with the default cash rounding bucket.
pub fn compute_totals(session: &Session) -> Totals {
    compute_totals_with_bucket(session, Money::from_pesos(CASH_ROUNDING_BUCKET))
}

/// Computes totals with an explicit cash rounding bucket.
///
/// ## Example
/// ```rust
/// use punto_core::money::Money;
/// use punto_core::pricing::compute_totals;
/// use punto_core::session::{LineDraft, Session};
/// use punto_core::types::Percent;
///
/// let mut session = Session::new("Venta 1");
/// session
///     .add_line(LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 3))
///     .unwrap();
/// session.discount = Percent::from_percentage(10.0);
///
/// let totals = compute_totals(&session);
/// assert_eq!(totals.subtotal.pesos(), 3000);
/// assert_eq!(totals.discount_value.pesos(), 300);
/// assert_eq!(totals.balance.pesos(), 2700);
/// assert_eq!(totals.total.pesos(), 2500); // rounded to the 500 bucket
/// ```
pub fn compute_totals_with_bucket(session: &Session, bucket: Money) -> Totals {
    let mut subtotal = Money::zero();
    let mut discount_base = Money::zero();
    let mut item_count: i64 = 0;

    for line in session.lines() {
        let amount = line.line_total();
        subtotal += amount;
        if !line.is_offer {
            discount_base += amount;
        }
        item_count += line.quantity;
    }

    let discount_value = discount_base.percent_of(session.discount);
    let balance = subtotal - discount_value;
    let total = balance.clamp_non_negative().round_to_bucket(bucket);

    let change = match session.payment_method {
        PaymentMethod::Cash if session.cash_received > total => session.cash_received - total,
        _ => Money::zero(),
    };

    let (net_amount, commission) = settlement(session, total);

    Totals {
        subtotal,
        discount_value,
        balance,
        total,
        change,
        net_amount,
        commission,
        item_count,
        line_count: session.lines().len(),
    }
}

/// Resolves the commission/net pair for the chosen payment method.
///
/// Card and QR methods derive one side from the other according to the
/// fee-edit marker. Cash has no processor in the middle: the deposit is
/// the total and the stored commission is inert.
fn settlement(session: &Session, total: Money) -> (Money, Percent) {
    match session.payment_method {
        PaymentMethod::Cash => (total, session.commission),
        PaymentMethod::Credit | PaymentMethod::Qr => match session.fee_edit {
            FeeEdit::Commission => (total.less_percent(session.commission), session.commission),
            FeeEdit::NetAmount => {
                let net = session
                    .net_amount_override
                    .unwrap_or(total)
                    .clamp(Money::zero(), total);
                (net, back_computed_commission(total, net))
            }
        },
    }
}

/// Commission implied by a typed-in net amount, to the nearest bps.
fn back_computed_commission(total: Money, net: Money) -> Percent {
    if total.is_zero() {
        return Percent::zero();
    }
    let fee = (total - net).pesos() as i128;
    let total = total.pesos() as i128;
    let bps = (fee * 10000 + total / 2) / total;
    Percent::from_bps(bps as u32)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LineDraft;

    fn session_with(lines: Vec<LineDraft>) -> Session {
        let mut session = Session::new("Venta 1");
        for draft in lines {
            session.add_line(draft).unwrap();
        }
        session
    }

    fn regular(price: i64, qty: i64) -> LineDraft {
        LineDraft::regular("p1", "Remera", Money::from_pesos(price), qty)
    }

    #[test]
    fn test_discount_then_bucket_rounding() {
        // 1000 × 3 with 10% off: 3000 − 300 = 2700 → charged 2500
        let mut session = session_with(vec![regular(1000, 3)]);
        session.discount = Percent::from_percentage(10.0);

        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), 3000);
        assert_eq!(totals.discount_value.pesos(), 300);
        assert_eq!(totals.balance.pesos(), 2700);
        assert_eq!(totals.total.pesos(), 2500);
        assert_eq!(totals.item_count, 3);
        assert_eq!(totals.line_count, 1);
    }

    #[test]
    fn test_offer_lines_are_exempt_from_discount() {
        let mut session = session_with(vec![regular(1000, 3)]);
        let line_id = session.lines()[0].line_id.clone();
        session.set_offer(&line_id, true).unwrap();
        session.discount = Percent::from_percentage(10.0);

        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), 3000);
        assert_eq!(totals.discount_value.pesos(), 0);
        assert_eq!(totals.total.pesos(), 3000);
    }

    #[test]
    fn test_discount_applies_only_to_non_offer_lines() {
        // Offer line (2000) + plain line (1000), 10% off the plain one
        let mut session = session_with(vec![
            regular(2000, 1),
            LineDraft::regular("p2", "Pantalón", Money::from_pesos(1000), 1),
        ]);
        let offer_id = session.lines()[0].line_id.clone();
        session.set_offer(&offer_id, true).unwrap();
        session.discount = Percent::from_percentage(10.0);

        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), 3000);
        assert_eq!(totals.discount_value.pesos(), 100);
        assert_eq!(totals.balance.pesos(), 2900);
        assert_eq!(totals.total.pesos(), 3000); // 2900 rounds up
    }

    #[test]
    fn test_change_for_cash_payment() {
        let mut session = session_with(vec![regular(1000, 3)]);
        session.discount = Percent::from_percentage(10.0);
        session.cash_received = Money::from_pesos(3000);

        let totals = compute_totals(&session);
        assert_eq!(totals.total.pesos(), 2500);
        assert_eq!(totals.change.pesos(), 500);
    }

    #[test]
    fn test_no_change_when_cash_is_short_or_method_is_card() {
        let mut session = session_with(vec![regular(1000, 3)]);
        session.cash_received = Money::from_pesos(2000);
        assert_eq!(compute_totals(&session).change.pesos(), 0);

        session.payment_method = PaymentMethod::Credit;
        session.cash_received = Money::from_pesos(10000);
        assert_eq!(compute_totals(&session).change.pesos(), 0);
    }

    #[test]
    fn test_returns_drive_balance_negative_but_not_total() {
        let session = session_with(vec![
            LineDraft::return_of("Remera", Money::from_pesos(2000), 1),
            LineDraft::regular("p2", "Medias", Money::from_pesos(500), 1),
        ]);

        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), -1500);
        assert_eq!(totals.balance.pesos(), -1500);
        assert_eq!(totals.total.pesos(), 0);
        assert_eq!(totals.change.pesos(), 0);
    }

    #[test]
    fn test_empty_session_totals_are_zero() {
        let session = Session::new("Venta 1");
        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), 0);
        assert_eq!(totals.total.pesos(), 0);
        assert_eq!(totals.item_count, 0);
        assert_eq!(totals.line_count, 0);
    }

    #[test]
    fn test_custom_price_feeds_the_subtotal() {
        let mut session = session_with(vec![regular(1000, 2)]);
        let line_id = session.lines()[0].line_id.clone();
        session
            .set_custom_price(&line_id, Some(Money::from_pesos(800)))
            .unwrap();

        let totals = compute_totals(&session);
        assert_eq!(totals.subtotal.pesos(), 1600);
        assert_eq!(totals.total.pesos(), 1500);
    }

    #[test]
    fn test_commission_derives_net_amount() {
        let mut session = session_with(vec![regular(2500, 1)]);
        session.payment_method = PaymentMethod::Credit;
        session.card_name = Some("Ana Pérez".to_string());
        session.commission = Percent::from_percentage(2.35);
        session.fee_edit = FeeEdit::Commission;

        let totals = compute_totals(&session);
        assert_eq!(totals.total.pesos(), 2500);
        // 2.35% of 2500 = 58.75 → 59 (half-up); net = 2441
        assert_eq!(totals.net_amount.pesos(), 2441);
        assert_eq!(totals.commission.bps(), 235);
    }

    #[test]
    fn test_net_amount_back_computes_commission() {
        let mut session = session_with(vec![regular(2500, 1)]);
        session.payment_method = PaymentMethod::Credit;
        session.net_amount_override = Some(Money::from_pesos(2441));
        session.fee_edit = FeeEdit::NetAmount;

        let totals = compute_totals(&session);
        assert_eq!(totals.net_amount.pesos(), 2441);
        // fee 59 of 2500 = 2.36%
        assert_eq!(totals.commission.bps(), 236);
    }

    #[test]
    fn test_net_override_is_clamped_to_total() {
        let mut session = session_with(vec![regular(2500, 1)]);
        session.payment_method = PaymentMethod::Qr;
        session.fee_edit = FeeEdit::NetAmount;

        session.net_amount_override = Some(Money::from_pesos(99999));
        let totals = compute_totals(&session);
        assert_eq!(totals.net_amount.pesos(), 2500);
        assert_eq!(totals.commission.bps(), 0);

        session.net_amount_override = Some(Money::from_pesos(-50));
        let totals = compute_totals(&session);
        assert_eq!(totals.net_amount.pesos(), 0);
        assert_eq!(totals.commission.bps(), 10000);
    }

    #[test]
    fn test_cash_sales_ignore_commission() {
        let mut session = session_with(vec![regular(2500, 1)]);
        session.commission = Percent::from_percentage(2.35);

        let totals = compute_totals(&session);
        assert_eq!(totals.net_amount.pesos(), 2500);
    }

    #[test]
    fn test_custom_bucket() {
        let session = session_with(vec![regular(1049, 1)]);
        let totals = compute_totals_with_bucket(&session, Money::from_pesos(100));
        assert_eq!(totals.total.pesos(), 1000);

        let totals = compute_totals_with_bucket(&session, Money::from_pesos(1));
        assert_eq!(totals.total.pesos(), 1049);
    }
}
