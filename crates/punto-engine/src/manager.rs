//! # Session Manager
//!
//! Owns the set of open sales sessions: which ones exist, which one the
//! operator is looking at, and when they get snapshotted to disk.
//!
//! ## Open Set Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Manager Rules                             │
//! │                                                                         │
//! │  ┌────────┐ ┌────────┐ ┌────────┐          at most max_sessions tabs    │
//! │  │Venta 1 │ │Venta 2*│ │Mariana │          (* = active)                 │
//! │  └────────┘ └────────┘ └────────┘                                       │
//! │                                                                         │
//! │  • The open set is never empty: removing the last session               │
//! │    immediately opens a fresh replacement tab.                           │
//! │  • Removing the active session promotes another one.                    │
//! │  • Auto labels come from a counter ("Venta 1", "Venta 2", ...) that     │
//! │    only resets on reset_all(); custom labels don't consume it.          │
//! │  • Every mutation is followed by a snapshot write, so a crash           │
//! │    costs at most the last keystroke.                                    │
//! │  • Sessions leave the set only by finalize (checkout) or cancel.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

use punto_core::validation::{
    validate_cash_received, validate_dni, validate_installments, validate_label,
    validate_person_name, validate_rate,
};
use punto_core::{
    compute_totals_with_bucket, CoreError, CoreResult, FeeEdit, LineDraft, Money, PaymentMethod,
    Percent, Session, Totals,
};

use crate::config::EngineConfig;
use crate::error::{SessionError, SessionResult};
use crate::snapshot::{
    MemorySnapshotStore, SessionSnapshot, SnapshotStore, SNAPSHOT_SCHEMA_VERSION,
};

// =============================================================================
// Session Manager
// =============================================================================

/// The set of open sales sessions on this terminal.
pub struct SessionManager {
    config: EngineConfig,
    store: Arc<dyn SnapshotStore>,
    sessions: Vec<Session>,
    active_id: String,
    label_seq: u64,
}

impl SessionManager {
    /// Creates a manager, restoring open sessions from the snapshot
    /// store when one is readable.
    ///
    /// A missing, corrupt, or outdated snapshot starts the terminal
    /// fresh with one empty session.
    pub fn new(config: EngineConfig, store: Arc<dyn SnapshotStore>) -> Self {
        let restored = match store.load() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to load session snapshot, starting fresh");
                None
            }
        };

        let mut manager = match restored {
            Some(snapshot) => {
                let mut sessions = snapshot.sessions;
                // Only open sessions come back; anything else slipped in
                // from an interrupted shutdown and is already settled.
                sessions.retain(|s| s.status.is_open());
                info!(sessions = sessions.len(), "Restored open sessions from snapshot");
                SessionManager {
                    config,
                    store,
                    sessions,
                    active_id: snapshot.active_id,
                    label_seq: snapshot.label_seq.max(1),
                }
            }
            None => SessionManager {
                config,
                store,
                sessions: Vec::new(),
                active_id: String::new(),
                label_seq: 1,
            },
        };

        manager.ensure_active_exists();
        manager.persist();
        manager
    }

    /// Creates a manager with no durable snapshots (tests, ephemeral
    /// terminals).
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(MemorySnapshotStore::new()))
    }

    // =========================================================================
    // Open Set Operations
    // =========================================================================

    /// Opens a new session and makes it active.
    ///
    /// `label: None` draws the next auto label ("Venta N"); a custom
    /// label is validated and leaves the counter alone.
    pub fn create(&mut self, label: Option<String>) -> SessionResult<String> {
        if self.sessions.len() >= self.config.max_sessions {
            return Err(SessionError::CapacityExceeded {
                max: self.config.max_sessions,
            });
        }

        let label = match label {
            Some(label) => {
                let label = label.trim().to_string();
                validate_label(&label).map_err(CoreError::from)?;
                label
            }
            None => {
                let label = format!("Venta {}", self.label_seq);
                self.label_seq += 1;
                label
            }
        };

        let session = Session::new(label);
        let id = session.id.clone();
        debug!(session_id = %id, label = %session.label, "Session opened");

        self.sessions.push(session);
        self.active_id = id.clone();
        self.persist();
        Ok(id)
    }

    /// Makes another open session the active one.
    pub fn switch_active(&mut self, session_id: &str) -> SessionResult<()> {
        if !self.sessions.iter().any(|s| s.id == session_id) {
            return Err(SessionError::NotFound(session_id.to_string()));
        }
        self.active_id = session_id.to_string();
        self.persist();
        Ok(())
    }

    /// Renames a session's tab label.
    pub fn rename(&mut self, session_id: &str, label: &str) -> SessionResult<()> {
        let label = label.trim().to_string();
        self.with_open_mut(session_id, |session| {
            validate_label(&label)?;
            session.label = label;
            Ok(())
        })
    }

    /// Cancels a session and drops it from the open set.
    ///
    /// Cancelling the active session promotes another one; cancelling
    /// the last session opens a fresh replacement.
    pub fn cancel(&mut self, session_id: &str) -> SessionResult<()> {
        let idx = self.index_of(session_id)?;
        self.sessions[idx].mark_cancelled()?;

        let removed = self.sessions.remove(idx);
        debug!(session_id = %removed.id, label = %removed.label, "Session cancelled");

        self.ensure_active_exists();
        self.persist();
        Ok(())
    }

    /// Cancels everything and starts over with one fresh session.
    ///
    /// The auto-label counter resets; this is the only operation that
    /// rewinds it.
    pub fn reset_all(&mut self) {
        info!(discarded = self.sessions.len(), "Resetting all sessions");

        self.sessions.clear();
        self.active_id.clear();
        self.label_seq = 1;
        self.ensure_active_exists();

        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear session snapshot");
        }
        self.persist();
    }

    /// Guarantees the open set is non-empty and `active_id` points into
    /// it. Called after every removal.
    fn ensure_active_exists(&mut self) {
        if self.sessions.is_empty() {
            let label = format!("Venta {}", self.label_seq);
            self.label_seq += 1;
            let session = Session::new(label);
            self.active_id = session.id.clone();
            self.sessions.push(session);
        } else if !self.sessions.iter().any(|s| s.id == self.active_id) {
            self.active_id = self.sessions[0].id.clone();
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The currently active session.
    pub fn active(&self) -> &Session {
        self.sessions
            .iter()
            .find(|s| s.id == self.active_id)
            .expect("an open session always exists")
    }

    /// ID of the currently active session.
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Looks up an open session by ID.
    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    /// All open sessions, in tab order.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Number of open sessions.
    pub fn open_count(&self) -> usize {
        self.sessions.len()
    }

    /// The terminal configuration this manager runs under.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Totals
    // =========================================================================

    /// Computes display totals for one session using the configured
    /// cash rounding bucket.
    pub fn compute_totals(&self, session_id: &str) -> SessionResult<Totals> {
        let session = self
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        Ok(compute_totals_with_bucket(session, self.config.bucket()))
    }

    /// Totals for the active session.
    pub fn active_totals(&self) -> Totals {
        compute_totals_with_bucket(self.active(), self.config.bucket())
    }

    // =========================================================================
    // Line Operations
    // =========================================================================

    /// Adds a line to a session (merging when the cart rules allow it).
    pub fn add_line(&mut self, session_id: &str, draft: LineDraft) -> SessionResult<String> {
        self.with_open_mut(session_id, |session| session.add_line(draft))
    }

    /// Removes a line from a session.
    pub fn remove_line(&mut self, session_id: &str, line_id: &str) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| session.remove_line(line_id))
    }

    /// Updates a line's quantity (0 removes the line).
    pub fn set_quantity(&mut self, session_id: &str, line_id: &str, qty: i64) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| session.set_quantity(line_id, qty))
    }

    /// Sets or clears a line's operator price override.
    pub fn set_custom_price(
        &mut self,
        session_id: &str,
        line_id: &str,
        price: Option<Money>,
    ) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| session.set_custom_price(line_id, price))
    }

    /// Flags or unflags a line as an offer.
    pub fn set_offer(
        &mut self,
        session_id: &str,
        line_id: &str,
        is_offer: bool,
    ) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| session.set_offer(line_id, is_offer))
    }

    // =========================================================================
    // Payment and Customer Fields
    // =========================================================================

    /// Sets the session-wide discount percentage.
    pub fn set_discount(&mut self, session_id: &str, discount: Percent) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            validate_rate("discount", discount)?;
            session.discount = discount;
            Ok(())
        })
    }

    /// Sets the payment method.
    pub fn set_payment_method(
        &mut self,
        session_id: &str,
        method: PaymentMethod,
    ) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            session.payment_method = method;
            Ok(())
        })
    }

    /// Records the cash the customer handed over.
    pub fn set_cash_received(&mut self, session_id: &str, amount: Money) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            validate_cash_received(amount)?;
            session.cash_received = amount;
            Ok(())
        })
    }

    /// Sets the cardholder name and installment count for card sales.
    pub fn set_card_details(
        &mut self,
        session_id: &str,
        card_name: Option<String>,
        installments: u32,
    ) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            let card_name = normalize(card_name);
            if let Some(ref name) = card_name {
                validate_person_name("card_name", name)?;
            }
            validate_installments(installments)?;
            session.card_name = card_name;
            session.installments = installments;
            Ok(())
        })
    }

    /// Sets the card commission percentage. The net amount becomes
    /// derived again.
    pub fn set_commission(&mut self, session_id: &str, commission: Percent) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            validate_rate("commission", commission)?;
            session.commission = commission;
            session.fee_edit = FeeEdit::Commission;
            Ok(())
        })
    }

    /// Sets the exact net deposit amount; the commission becomes
    /// back-computed. `None` clears the override.
    pub fn set_net_amount(&mut self, session_id: &str, net: Option<Money>) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            match net {
                Some(amount) => {
                    if amount.is_negative() {
                        return Err(punto_core::ValidationError::MustBePositive {
                            field: "net_amount".to_string(),
                        }
                        .into());
                    }
                    session.net_amount_override = Some(amount);
                    session.fee_edit = FeeEdit::NetAmount;
                }
                None => {
                    session.net_amount_override = None;
                    session.fee_edit = FeeEdit::Commission;
                }
            }
            Ok(())
        })
    }

    /// Sets the customer name on the record (blank clears it).
    pub fn set_customer_name(
        &mut self,
        session_id: &str,
        name: Option<String>,
    ) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            let name = normalize(name);
            if let Some(ref n) = name {
                validate_person_name("customer_name", n)?;
            }
            session.customer_name = name;
            Ok(())
        })
    }

    /// Sets the customer tax ID (blank clears it).
    pub fn set_customer_dni(&mut self, session_id: &str, dni: Option<String>) -> SessionResult<()> {
        self.with_open_mut(session_id, |session| {
            let dni = normalize(dni);
            if let Some(ref d) = dni {
                validate_dni(d)?;
            }
            session.customer_dni = dni;
            Ok(())
        })
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// The snapshot this manager would write right now.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            active_id: self.active_id.clone(),
            label_seq: self.label_seq,
            sessions: self.sessions.clone(),
        }
    }

    /// Writes the current state to the snapshot store. Failures are
    /// logged, never propagated: losing a snapshot must not break the
    /// sale in progress.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.snapshot()) {
            warn!(error = %e, "Failed to write session snapshot");
        }
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Runs a mutation against one open session, then touches and
    /// persists it. All session edits funnel through here.
    fn with_open_mut<R>(
        &mut self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> CoreResult<R>,
    ) -> SessionResult<R> {
        let session = self
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        let result = f(session)?;
        session.touch();
        self.persist();
        Ok(result)
    }

    fn index_of(&self, session_id: &str) -> SessionResult<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Marks a session finalized and drops it from the open set.
    /// Called by the checkout processor after a successful commit.
    pub(crate) fn retire_finalized(&mut self, session_id: &str) -> SessionResult<()> {
        let idx = self.index_of(session_id)?;
        self.sessions[idx].mark_finalized()?;

        let retired = self.sessions.remove(idx);
        debug!(session_id = %retired.id, label = %retired.label, "Session finalized and retired");

        self.ensure_active_exists();
        self.persist();
        Ok(())
    }
}

fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// Unit Tests
// =============================================================================
