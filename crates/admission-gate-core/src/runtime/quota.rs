// admission-gate-core/src/runtime/quota.rs
// ============================================================================
// Module: Quota Ledger
// Description: Shared daily request budget with per-requester usage windows.
// Purpose: Cap total exposure to the downstream completion call.
// Dependencies: crate::core, serde, thiserror, time
// ============================================================================

//! ## Overview
//! The ledger tracks recent request instants per [`RequesterKey`] and enforces
//! one global daily ceiling across all keys. Usage windows are pruned lazily on
//! every operation: instants older than 24 hours are dropped and any window
//! whose last reset day differs from today is cleared. There is no background
//! timer.
//!
//! `admit` only checks capacity; `record` consumes it. Callers must invoke
//! `record` only after the downstream call succeeded, so failed, cancelled, or
//! timed out calls never consume quota.
//!
//! Security posture: the budget is shared, so a single aggressive requester can
//! exhaust it for everyone. An optional per-key ceiling exists but is disabled
//! unless configured.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Date;
use time::Duration;
use time::OffsetDateTime;

use crate::core::identifiers::RequesterKey;
use crate::core::time::Clock;
use crate::core::time::SystemClock;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default global daily request budget.
pub const DEFAULT_DAILY_LIMIT: u32 = 50;

/// Age after which a recorded instant no longer counts.
const WINDOW_SPAN: Duration = Duration::DAY;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Ledger ceilings, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    /// Global ceiling shared by every requester.
    pub daily_limit: u32,
    /// Optional ceiling per requester key, checked after the global one.
    pub per_key_limit: Option<u32>,
}

impl Default for QuotaLimits {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            per_key_limit: None,
        }
    }
}

/// Admission decision.
///
/// # Invariants
/// - `reason` is present exactly when `allowed` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaDecision {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Human-readable denial message, safe to return to clients.
    pub reason: Option<String>,
}

impl QuotaDecision {
    /// Builds an allow decision.
    #[must_use]
    pub const fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Builds a deny decision with a message.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Read-only view of ledger usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaSnapshot {
    /// Instants currently counted across all keys.
    pub used: u64,
    /// Global ceiling.
    pub limit: u32,
    /// `limit - used`, floored at zero.
    pub remaining: u64,
    /// Number of keys that ever recorded usage.
    pub distinct_keys: usize,
}

/// Ledger failures.
#[derive(Debug, Error)]
pub enum QuotaError {
    /// Ledger state cannot be accessed.
    #[error("quota ledger unavailable: {0}")]
    Unavailable(String),
}

/// Quota enforcement interface used by the admission gate.
pub trait QuotaLedger: Send + Sync {
    /// Checks whether one more request fits the budget. Does not consume quota.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] when ledger state is unavailable.
    fn admit(&self, key: &RequesterKey) -> Result<QuotaDecision, QuotaError>;

    /// Records one completed request for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] when ledger state is unavailable.
    fn record(&self, key: &RequesterKey) -> Result<(), QuotaError>;

    /// Returns current usage.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] when ledger state is unavailable.
    fn snapshot(&self) -> Result<QuotaSnapshot, QuotaError>;
}

// ============================================================================
// SECTION: Usage Window
// ============================================================================

/// Recent request instants for one key.
#[derive(Debug, Clone)]
struct UsageWindow {
    /// Recorded instants in insertion order.
    timestamps: Vec<OffsetDateTime>,
    /// Calendar day the window was last reset on.
    last_reset_day: Date,
}

impl UsageWindow {
    /// Creates an empty window stamped with `today`.
    const fn new(today: Date) -> Self {
        Self {
            timestamps: Vec::new(),
            last_reset_day: today,
        }
    }

    /// Clears the window on a new day and drops instants older than the span.
    fn prune(&mut self, now: OffsetDateTime) {
        let today = now.date();
        if self.last_reset_day != today {
            self.timestamps.clear();
            self.last_reset_day = today;
        }
        let cutoff = now - WINDOW_SPAN;
        self.timestamps.retain(|instant| *instant > cutoff);
    }

    /// Returns the number of counted instants.
    fn count(&self) -> u64 {
        u64::try_from(self.timestamps.len()).unwrap_or(u64::MAX)
    }
}

// ============================================================================
// SECTION: In-Memory Ledger
// ============================================================================

/// Process-wide in-memory ledger. State is lost on restart.
pub struct InMemoryQuotaLedger {
    /// Configured ceilings.
    limits: QuotaLimits,
    /// Time source.
    clock: Arc<dyn Clock>,
    /// Usage windows keyed by requester, guarded by a single lock.
    windows: Mutex<BTreeMap<RequesterKey, UsageWindow>>,
}

impl InMemoryQuotaLedger {
    /// Creates a ledger on the system clock.
    #[must_use]
    pub fn new(limits: QuotaLimits) -> Self {
        Self::with_clock(limits, Arc::new(SystemClock))
    }

    /// Creates a ledger on an explicit clock.
    #[must_use]
    pub fn with_clock(limits: QuotaLimits, clock: Arc<dyn Clock>) -> Self {
        Self {
            limits,
            clock,
            windows: Mutex::new(BTreeMap::new()),
        }
    }

    /// Locks the window map.
    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<RequesterKey, UsageWindow>>, QuotaError> {
        self.windows
            .lock()
            .map_err(|_| QuotaError::Unavailable("quota ledger mutex poisoned".to_string()))
    }
}

/// Prunes every window and returns the global count.
fn prune_all(windows: &mut BTreeMap<RequesterKey, UsageWindow>, now: OffsetDateTime) -> u64 {
    windows.values_mut().fold(0u64, |total, window| {
        window.prune(now);
        total.saturating_add(window.count())
    })
}

impl QuotaLedger for InMemoryQuotaLedger {
    fn admit(&self, key: &RequesterKey) -> Result<QuotaDecision, QuotaError> {
        let now = self.clock.now();
        let mut windows = self.lock()?;
        let used = prune_all(&mut windows, now);
        if used >= u64::from(self.limits.daily_limit) {
            return Ok(QuotaDecision::deny(format!(
                "The global daily limit of {} requests has been reached. Please try again \
                 tomorrow.",
                self.limits.daily_limit
            )));
        }
        if let Some(per_key) = self.limits.per_key_limit {
            let key_used = windows.get(key).map_or(0, UsageWindow::count);
            if key_used >= u64::from(per_key) {
                return Ok(QuotaDecision::deny(format!(
                    "The daily limit of {per_key} requests for this client has been reached. \
                     Please try again tomorrow."
                )));
            }
        }
        Ok(QuotaDecision::allow())
    }

    fn record(&self, key: &RequesterKey) -> Result<(), QuotaError> {
        let now = self.clock.now();
        let mut windows = self.lock()?;
        let window = windows.entry(key.clone()).or_insert_with(|| UsageWindow::new(now.date()));
        window.prune(now);
        window.timestamps.push(now);
        Ok(())
    }

    fn snapshot(&self) -> Result<QuotaSnapshot, QuotaError> {
        let now = self.clock.now();
        let mut windows = self.lock()?;
        let used = prune_all(&mut windows, now);
        let limit = self.limits.daily_limit;
        Ok(QuotaSnapshot {
            used,
            limit,
            remaining: u64::from(limit).saturating_sub(used),
            distinct_keys: windows.len(),
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
