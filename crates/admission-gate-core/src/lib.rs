// admission-gate-core/src/lib.rs
// ============================================================================
// Module: Admission Gate Core Library
// Description: Public API surface for the Admission Gate core.
// Purpose: Expose sanitization, fingerprinting, policy, and quota primitives.
// Dependencies: crate::{core, runtime}
// ============================================================================

//! ## Overview
//! Admission Gate core decides whether untrusted text may reach an expensive
//! downstream completion call. It provides the input sanitizer, the audit
//! fingerprint, the Content-Security-Policy director, and the shared quota
//! ledger. Everything here is transport-agnostic; the HTTP surface lives in
//! `admission-gate-server`.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod runtime;


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use runtime::InMemoryQuotaLedger;
pub use runtime::QuotaDecision;
pub use runtime::QuotaError;
pub use runtime::QuotaLedger;
pub use runtime::QuotaLimits;
pub use runtime::QuotaSnapshot;
