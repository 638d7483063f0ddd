// admission-gate-core/src/core/time.rs
// ============================================================================
// Module: Admission Gate Time
// Description: Clock seam for quota windows and calendar-day resets.
// Purpose: Keep time-dependent logic deterministic under test.
// Dependencies: time
// ============================================================================

//! ## Overview
//! The quota ledger never reads the wall clock directly. It asks a [`Clock`]
//! for the current instant, and derives the calendar day from that instant in
//! UTC. [`ManualClock`] lets tests move across midnight without sleeping.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use time::Duration;
use time::OffsetDateTime;

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually advanced clock for tests and replay.
///
/// # Invariants
/// - Time only moves when [`ManualClock::set`] or [`ManualClock::advance`] is called.
#[derive(Debug)]
pub struct ManualClock {
    /// Current instant.
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub const fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: OffsetDateTime) {
        *self.instant() = instant;
    }

    /// Advances the clock by `step`.
    pub fn advance(&self, step: Duration) {
        *self.instant() += step;
    }

    /// Locks the instant; a poisoned lock still holds the last value set.
    fn instant(&self) -> MutexGuard<'_, OffsetDateTime> {
        self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.instant()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
