//! # Checkout Processor
//!
//! Turns an open session into a committed sale: validate, re-check
//! stock, number the sale, commit atomically, retire the session.
//!
//! ## Finalize Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Finalize Pipeline                                │
//! │                                                                         │
//! │  1. Look up the session            (still open? still there?)           │
//! │  2. Compute totals                 (configured cash bucket)             │
//! │  3. Checkout gate                  (non-empty, total > 0, card name)    │
//! │  4. Verify stock                   (live catalog, per variant,          │
//! │                                     same-variant lines summed)          │
//! │  5. Resolve timestamp + number     (YYYYMMDD-NNN, backdate = day start) │
//! │  6. Commit sale + stock deltas     (ONE transaction, all-or-nothing)    │
//! │  7. Retire the session             (open set gets a replacement tab)    │
//! │                                                                         │
//! │  A failure at ANY step leaves the session exactly as it was:            │
//! │  still open, still editable. Step 6 is the only one that writes.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use punto_core::types::{SaleItem, SaleRecord, StockDelta, Variant, VariantKey};
use punto_core::validation::validate_for_checkout;
use punto_core::{Money, PaymentMethod, Session, Totals};

use crate::error::{CheckoutError, CheckoutResult, SessionError};
use crate::gateway::{ProductCatalog, SaleLedger};
use crate::manager::SessionManager;

// =============================================================================
// Checkout Processor
// =============================================================================

/// Finalizes sessions into committed sales.
pub struct CheckoutProcessor {
    catalog: Arc<dyn ProductCatalog>,
    ledger: Arc<dyn SaleLedger>,
}

impl CheckoutProcessor {
    pub fn new(catalog: Arc<dyn ProductCatalog>, ledger: Arc<dyn SaleLedger>) -> Self {
        CheckoutProcessor { catalog, ledger }
    }

    /// Finalizes one session into a committed sale.
    ///
    /// `sale_date` backdates the sale: anything other than today lands
    /// at the start of that day and is numbered under that day's
    /// prefix. `None` means "now".
    ///
    /// On success the session leaves the open set and the record is
    /// returned. On any error the session is untouched.
    pub async fn finalize(
        &self,
        manager: &mut SessionManager,
        session_id: &str,
        sale_date: Option<NaiveDate>,
    ) -> CheckoutResult<SaleRecord> {
        let session = manager
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?
            .clone();

        let totals = manager.compute_totals(session_id)?;
        validate_for_checkout(&session, &totals)?;

        let deltas = self.verify_stock(&session).await?;

        let sold_at = resolve_sold_at(sale_date);
        let sale_number = self.next_sale_number(sold_at).await;
        let record = build_record(&session, &totals, sale_number, sold_at);

        self.ledger.commit_sale(&record, &deltas).await?;

        // The sale is durable from here on. Retiring the session only
        // mutates in-memory state and the snapshot.
        manager.retire_finalized(session_id)?;

        info!(
            sale_number = %record.sale_number,
            total = %record.total,
            payment = %record.payment_method,
            items = record.items.len(),
            "Sale finalized"
        );
        Ok(record)
    }

    /// Re-checks live stock for the session's sale lines and returns
    /// the per-variant stock deltas the commit must apply.
    ///
    /// Sale quantities are summed per variant first: two lines of the
    /// same variant (split by a custom price) must pass the check
    /// together. Referenced returns restock into the same delta, but
    /// they never relax the check: what is being sold must be on hand
    /// even when the customer hands units of it back.
    async fn verify_stock(&self, session: &Session) -> CheckoutResult<Vec<StockDelta>> {
        let mut sold: Vec<(VariantKey, i64)> = Vec::new();
        let mut returned: Vec<(VariantKey, i64)> = Vec::new();
        for line in session.lines() {
            if !line.kind.tracks_stock() {
                continue;
            }
            let bucket = if line.kind.is_return() {
                &mut returned
            } else {
                &mut sold
            };
            if let Some(product_id) = line.kind.product_id() {
                let key = VariantKey::new(product_id, line.kind.variant());
                match bucket.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, qty)) => *qty += line.quantity,
                    None => bucket.push((key, line.quantity)),
                }
            }
        }

        let mut deltas = Vec::with_capacity(sold.len() + returned.len());
        for (key, qty) in sold {
            let variant = variant_of(&key);
            let found = self
                .catalog
                .find_variant(&key.product_id, variant.as_ref())
                .await?;

            // An unknown variant sells zero units, it does not panic the
            // terminal.
            let available = found.map(|v| v.stock).unwrap_or(0);
            if available < qty {
                return Err(CheckoutError::InsufficientStock {
                    product_id: key.product_id,
                    variant: variant_label(variant.as_ref()),
                    available,
                    requested: qty,
                });
            }

            let restocked = match returned.iter().position(|(k, _)| *k == key) {
                Some(idx) => returned.remove(idx).1,
                None => 0,
            };
            let delta = restocked - qty;
            if delta != 0 {
                deltas.push(StockDelta {
                    product_id: key.product_id,
                    variant,
                    delta,
                });
            }
        }

        // Variants only seen in returns restock whatever the catalog
        // still knows about. An identity the catalog no longer carries
        // has no stock row to restore.
        for (key, qty) in returned {
            let variant = variant_of(&key);
            let found = self
                .catalog
                .find_variant(&key.product_id, variant.as_ref())
                .await?;
            if found.is_some() {
                deltas.push(StockDelta {
                    product_id: key.product_id,
                    variant,
                    delta: qty,
                });
            } else {
                warn!(
                    product_id = %key.product_id,
                    variant = %variant_label(variant.as_ref()),
                    "Returned variant not in catalog, stock not restored"
                );
            }
        }

        Ok(deltas)
    }

    /// Next sale number under the day's prefix: `YYYYMMDD-NNN`.
    ///
    /// When the last number cannot be read or parsed, falls back to a
    /// millisecond timestamp suffix; numbering must never block a sale.
    async fn next_sale_number(&self, sold_at: DateTime<Utc>) -> String {
        let prefix = sold_at.format("%Y%m%d").to_string();

        let last = match self.ledger.last_sale_number(&prefix).await {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "Sale number lookup failed, using timestamp fallback");
                return format!("{}-{}", prefix, Utc::now().timestamp_millis());
            }
        };

        let next = match last {
            None => 1,
            Some(ref number) => match parse_sequence(number) {
                Some(seq) => seq + 1,
                None => {
                    warn!(last = %number, "Unparseable sale number, using timestamp fallback");
                    return format!("{}-{}", prefix, Utc::now().timestamp_millis());
                }
            },
        };

        format!("{}-{:03}", prefix, next)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Commit timestamp for the sale. Backdated sales land at the start of
/// the chosen day; "today" keeps the real clock time.
fn resolve_sold_at(sale_date: Option<NaiveDate>) -> DateTime<Utc> {
    match sale_date {
        Some(date) if date != Utc::now().date_naive() => date.and_time(NaiveTime::MIN).and_utc(),
        _ => Utc::now(),
    }
}

fn parse_sequence(sale_number: &str) -> Option<u32> {
    sale_number
        .rsplit_once('-')
        .and_then(|(_, seq)| seq.parse().ok())
}

fn variant_of(key: &VariantKey) -> Option<Variant> {
    match (&key.size, &key.color) {
        (Some(size), Some(color)) => Some(Variant::new(size.clone(), color.clone())),
        _ => None,
    }
}

fn variant_label(variant: Option<&Variant>) -> String {
    variant.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Freezes the session and its totals into an immutable sale record.
fn build_record(
    session: &Session,
    totals: &Totals,
    sale_number: String,
    sold_at: DateTime<Utc>,
) -> SaleRecord {
    let items = session
        .lines()
        .iter()
        .map(|line| SaleItem {
            product_id: line.kind.product_id().map(str::to_string),
            name_snapshot: line.name.clone(),
            variant: line.kind.variant().cloned(),
            unit_price: line.effective_unit_price(),
            quantity: line.quantity,
            is_return: line.kind.is_return(),
            is_quick: line.kind.is_quick(),
            is_offer: line.is_offer,
        })
        .collect();

    let is_cash = session.payment_method == PaymentMethod::Cash;
    let is_credit = session.payment_method == PaymentMethod::Credit;

    SaleRecord {
        id: Uuid::new_v4().to_string(),
        sale_number,
        sold_at,
        payment_method: session.payment_method,
        card_name: if is_credit { session.card_name.clone() } else { None },
        installments: session.installments,
        commission: totals.commission,
        net_amount: totals.net_amount,
        discount: session.discount,
        customer_name: session.customer_name.clone(),
        customer_dni: session.customer_dni.clone(),
        subtotal: totals.subtotal,
        discount_value: totals.discount_value,
        balance: totals.balance,
        total: totals.total,
        cash_received: if is_cash { session.cash_received } else { Money::zero() },
        change: totals.change,
        items,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::{CatalogError, LedgerError};
    use async_trait::async_trait;
    use punto_core::types::VariantStock;
    use punto_core::{LineDraft, Percent};
    use std::collections::HashMap;
    use std::sync::Mutex;

    // A catalog + ledger fake with the same atomicity rules as the real
    // database: commit validates every delta before applying any.
    #[derive(Default)]
    struct MemoryBackend {
        stock: Mutex<HashMap<VariantKey, i64>>,
        sales: Mutex<Vec<SaleRecord>>,
        fail_lookup: bool,
        fail_commit: bool,
        fail_last_number: bool,
        commit_shortfall: bool,
    }

    impl MemoryBackend {
        fn with_stock(entries: &[(&str, Option<Variant>, i64)]) -> Arc<Self> {
            let backend = MemoryBackend::default();
            {
                let mut stock = backend.stock.lock().unwrap();
                for (product_id, variant, qty) in entries {
                    stock.insert(VariantKey::new(product_id, variant.as_ref()), *qty);
                }
            }
            Arc::new(backend)
        }

        fn stock_of(&self, product_id: &str, variant: Option<&Variant>) -> i64 {
            self.stock
                .lock()
                .unwrap()
                .get(&VariantKey::new(product_id, variant))
                .copied()
                .unwrap_or(0)
        }

        fn sales(&self) -> Vec<SaleRecord> {
            self.sales.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProductCatalog for MemoryBackend {
        async fn find_variant(
            &self,
            product_id: &str,
            variant: Option<&Variant>,
        ) -> Result<Option<VariantStock>, CatalogError> {
            if self.fail_lookup {
                return Err(CatalogError::Unavailable("offline".into()));
            }
            let key = VariantKey::new(product_id, variant);
            Ok(self.stock.lock().unwrap().get(&key).map(|&stock| VariantStock {
                stock,
                price: Money::from_pesos(1000),
            }))
        }
    }

    #[async_trait]
    impl SaleLedger for MemoryBackend {
        async fn commit_sale(
            &self,
            record: &SaleRecord,
            deltas: &[StockDelta],
        ) -> Result<(), LedgerError> {
            if self.fail_commit {
                return Err(LedgerError::Commit("disk full".into()));
            }
            if self.commit_shortfall {
                return Err(LedgerError::InsufficientStock {
                    product_id: "p1".into(),
                    variant: "-".into(),
                    available: 0,
                    requested: 1,
                });
            }

            let mut stock = self.stock.lock().unwrap();
            for delta in deltas {
                let key = VariantKey::new(&delta.product_id, delta.variant.as_ref());
                let available = stock.get(&key).copied().unwrap_or(0);
                if available + delta.delta < 0 {
                    return Err(LedgerError::InsufficientStock {
                        product_id: delta.product_id.clone(),
                        variant: variant_label(delta.variant.as_ref()),
                        available,
                        requested: -delta.delta,
                    });
                }
            }
            for delta in deltas {
                let key = VariantKey::new(&delta.product_id, delta.variant.as_ref());
                *stock.entry(key).or_insert(0) += delta.delta;
            }

            self.sales.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn last_sale_number(&self, day_prefix: &str) -> Result<Option<String>, LedgerError> {
            if self.fail_last_number {
                return Err(LedgerError::Unavailable("offline".into()));
            }
            Ok(self
                .sales
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.sale_number.starts_with(day_prefix))
                .map(|s| s.sale_number.clone())
                .max())
        }

        async fn sales_for_day(&self, day: NaiveDate) -> Result<Vec<SaleRecord>, LedgerError> {
            Ok(self
                .sales
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.sold_at.date_naive() == day)
                .cloned()
                .collect())
        }
    }

    fn processor(backend: &Arc<MemoryBackend>) -> CheckoutProcessor {
        CheckoutProcessor::new(backend.clone(), backend.clone())
    }

    fn manager() -> SessionManager {
        SessionManager::in_memory(EngineConfig::default())
    }

    fn today_prefix() -> String {
        Utc::now().format("%Y%m%d").to_string()
    }

    #[tokio::test]
    async fn test_cash_sale_finalizes_end_to_end() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 5)]);
        let checkout = processor(&backend);
        let mut manager = manager();

        let id = manager.active_id().to_string();
        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2))
            .unwrap();
        manager
            .set_cash_received(&id, Money::from_pesos(3000))
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();

        assert_eq!(record.sale_number, format!("{}-001", today_prefix()));
        assert_eq!(record.total, Money::from_pesos(2000));
        assert_eq!(record.change, Money::from_pesos(1000));
        assert_eq!(record.items.len(), 1);
        assert_eq!(backend.stock_of("p1", None), 3);
        assert_eq!(backend.sales().len(), 1);

        // The session is gone and a replacement tab is open.
        assert!(manager.get(&id).is_none());
        assert_eq!(manager.open_count(), 1);
        assert!(manager.active().is_empty());
    }

    #[tokio::test]
    async fn test_sale_numbers_increment_within_a_day() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 10)]);
        let checkout = processor(&backend);
        let mut manager = manager();

        for expected in ["-001", "-002", "-003"] {
            let id = manager.active_id().to_string();
            manager
                .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
                .unwrap();
            let record = checkout.finalize(&mut manager, &id, None).await.unwrap();
            assert!(record.sale_number.ends_with(expected), "{}", record.sale_number);
        }
    }

    #[tokio::test]
    async fn test_empty_session_is_rejected() {
        let backend = MemoryBackend::with_stock(&[]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(_)));

        assert!(manager.get(&id).is_some());
        assert!(backend.sales().is_empty());
    }

    #[tokio::test]
    async fn test_credit_sale_requires_card_name() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 5)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2))
            .unwrap();
        manager
            .set_payment_method(&id, PaymentMethod::Credit)
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Invalid(_)));

        manager
            .set_card_details(&id, Some("Ana Pérez".to_string()), 3)
            .unwrap();
        manager
            .set_commission(&id, Percent::from_percentage(2.35))
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();
        assert_eq!(record.card_name.as_deref(), Some("Ana Pérez"));
        assert_eq!(record.installments, 3);
        assert_eq!(record.net_amount, Money::from_pesos(1953));
        // Cash fields stay out of card sales.
        assert_eq!(record.cash_received, Money::zero());
        assert_eq!(record.change, Money::zero());
    }

    #[tokio::test]
    async fn test_insufficient_stock_blocks_the_sale() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 1)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2))
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Nothing moved: session still open, stock intact, no sale.
        assert_eq!(manager.get(&id).unwrap().lines().len(), 1);
        assert_eq!(backend.stock_of("p1", None), 1);
        assert!(backend.sales().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_counts_as_zero_stock() {
        let backend = MemoryBackend::with_stock(&[]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("ghost", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock { available: 0, .. }
        ));
    }

    #[tokio::test]
    async fn test_quick_and_unreferenced_return_lines_skip_stock() {
        let backend = MemoryBackend::with_stock(&[]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::quick("Ajuste", Money::from_pesos(3000), 1))
            .unwrap();
        manager
            .add_line(
                &id,
                LineDraft::return_of("Remera", Money::from_pesos(500), 1),
            )
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();
        assert_eq!(record.total, Money::from_pesos(2500));
        assert!(record.items.iter().any(|i| i.is_return));
        // No catalog-backed lines, no stock movement.
        assert!(backend.stock.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_referenced_return_restores_stock() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 5)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::quick("Campera", Money::from_pesos(8000), 1))
            .unwrap();
        manager
            .add_line(
                &id,
                LineDraft::return_of("Remera", Money::from_pesos(1000), 2).with_product("p1"),
            )
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();
        // 8000 less the 2000 handed back.
        assert_eq!(record.total, Money::from_pesos(6000));
        assert_eq!(backend.stock_of("p1", None), 7);
    }

    #[tokio::test]
    async fn test_exchange_nets_one_delta_per_variant() {
        let variant = Variant::new("M", "Negro");
        let backend = MemoryBackend::with_stock(&[("p1", Some(variant.clone()), 3)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(
                &id,
                LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2)
                    .with_variant(variant.clone()),
            )
            .unwrap();
        manager
            .add_line(
                &id,
                LineDraft::return_of("Remera", Money::from_pesos(1000), 1)
                    .with_product("p1")
                    .with_variant(variant.clone()),
            )
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();
        assert_eq!(record.total, Money::from_pesos(1000));
        // Sold 2, got 1 back: net one unit left the shelf.
        assert_eq!(backend.stock_of("p1", Some(&variant)), 2);
    }

    #[tokio::test]
    async fn test_returns_never_relax_the_stock_check() {
        let variant = Variant::new("M", "Negro");
        let backend = MemoryBackend::with_stock(&[("p1", Some(variant.clone()), 1)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(
                &id,
                LineDraft::regular("p1", "Remera", Money::from_pesos(2000), 2)
                    .with_variant(variant.clone()),
            )
            .unwrap();
        // Handing units back does not put them on the shelf for this
        // same sale; the two on offer must already be there.
        manager
            .add_line(
                &id,
                LineDraft::return_of("Remera", Money::from_pesos(1000), 2)
                    .with_product("p1")
                    .with_variant(variant.clone()),
            )
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, 1);
                assert_eq!(requested, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.stock_of("p1", Some(&variant)), 1);
    }

    #[tokio::test]
    async fn test_return_of_unknown_variant_is_not_restored() {
        let backend = MemoryBackend::with_stock(&[]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::quick("Ajuste", Money::from_pesos(3000), 1))
            .unwrap();
        manager
            .add_line(
                &id,
                LineDraft::return_of("Remera vieja", Money::from_pesos(500), 1)
                    .with_product("discontinued"),
            )
            .unwrap();

        // The sale still goes through; there is just no stock row to
        // put the unit back on.
        checkout.finalize(&mut manager, &id, None).await.unwrap();
        assert!(backend.stock.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_variant_lines_are_checked_together() {
        let variant = Variant::new("M", "Negro");
        let backend = MemoryBackend::with_stock(&[("p1", Some(variant.clone()), 3)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        let first = manager
            .add_line(
                &id,
                LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2)
                    .with_variant(variant.clone()),
            )
            .unwrap();
        // A custom price keeps the second add on its own line.
        manager
            .set_custom_price(&id, &first, Some(Money::from_pesos(800)))
            .unwrap();
        manager
            .add_line(
                &id,
                LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2)
                    .with_variant(variant.clone()),
            )
            .unwrap();
        assert_eq!(manager.get(&id).unwrap().lines().len(), 2);

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        match err {
            CheckoutError::InsufficientStock {
                available,
                requested,
                variant,
                ..
            } => {
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
                assert_eq!(variant, "M/Negro");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_backdated_sale_lands_at_day_start() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 5)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        let record = checkout
            .finalize(&mut manager, &id, Some(yesterday))
            .await
            .unwrap();

        assert_eq!(record.sold_at.date_naive(), yesterday);
        assert_eq!(record.sold_at.time(), NaiveTime::MIN);
        let expected_prefix = yesterday.format("%Y%m%d").to_string();
        assert!(record.sale_number.starts_with(&expected_prefix));

        // Backdated sales show up under their own day.
        let listed = backend.sales_for_day(yesterday).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(backend.sales_for_day(Utc::now().date_naive()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_todays_date_keeps_clock_time() {
        let backend = MemoryBackend::with_stock(&[("p1", None, 5)]);
        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let today = Utc::now().date_naive();
        let record = checkout
            .finalize(&mut manager, &id, Some(today))
            .await
            .unwrap();

        // Passing today's date is not backdating.
        assert!(record.sold_at.time() > NaiveTime::MIN);
    }

    #[tokio::test]
    async fn test_commit_failure_leaves_session_open() {
        let mut backend = MemoryBackend::default();
        backend.fail_commit = true;
        backend
            .stock
            .lock()
            .unwrap()
            .insert(VariantKey::new("p1", None), 5);
        let backend = Arc::new(backend);

        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 2))
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Ledger(_)));

        assert_eq!(manager.get(&id).unwrap().lines().len(), 1);
        assert_eq!(manager.active_id(), id);
        assert_eq!(backend.stock_of("p1", None), 5);
    }

    #[tokio::test]
    async fn test_shortfall_inside_commit_surfaces_as_stock_error() {
        let mut backend = MemoryBackend::default();
        backend.commit_shortfall = true;
        backend
            .stock
            .lock()
            .unwrap()
            .insert(VariantKey::new("p1", None), 5);
        let backend = Arc::new(backend);

        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));
        assert!(manager.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_catalog_outage_blocks_the_sale() {
        let mut backend = MemoryBackend::default();
        backend.fail_lookup = true;
        let backend = Arc::new(backend);

        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let err = checkout.finalize(&mut manager, &id, None).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Catalog(_)));
        assert!(manager.get(&id).is_some());
    }

    #[tokio::test]
    async fn test_number_lookup_failure_uses_timestamp_fallback() {
        let mut backend = MemoryBackend::default();
        backend.fail_last_number = true;
        backend
            .stock
            .lock()
            .unwrap()
            .insert(VariantKey::new("p1", None), 5);
        let backend = Arc::new(backend);

        let checkout = processor(&backend);
        let mut manager = manager();
        let id = manager.active_id().to_string();

        manager
            .add_line(&id, LineDraft::regular("p1", "Remera", Money::from_pesos(1000), 1))
            .unwrap();

        let record = checkout.finalize(&mut manager, &id, None).await.unwrap();

        let prefix = today_prefix();
        let suffix = record
            .sale_number
            .strip_prefix(&format!("{}-", prefix))
            .unwrap();
        // Millisecond timestamps are far longer than the NNN series.
        assert!(suffix.len() > 3);
        assert!(suffix.parse::<i64>().is_ok());
        assert_eq!(backend.sales().len(), 1);
    }

    #[tokio::test]
    async fn test_finalize_unknown_session() {
        let backend = MemoryBackend::with_stock(&[]);
        let checkout = processor(&backend);
        let mut manager = manager();

        let err = checkout
            .finalize(&mut manager, "ghost", None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Session(SessionError::NotFound(_))));
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("20260822-001"), Some(1));
        assert_eq!(parse_sequence("20260822-042"), Some(42));
        assert_eq!(parse_sequence("20260822-abc"), None);
        assert_eq!(parse_sequence("20260822-1724312345678"), None);
        assert_eq!(parse_sequence("garbage"), None);
    }
}
