// admission-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Admission Gate Runtime
// Description: Stateful runtime components shared across requests.
// Purpose: Host the process-wide quota ledger.
// Dependencies: crate::core, time
// ============================================================================

//! ## Overview
//! Runtime modules own the only shared mutable state in the core. Every
//! operation on that state is serialized behind a single lock so cross-key
//! aggregates are never computed against a map mid-mutation.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod quota;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use quota::InMemoryQuotaLedger;
pub use quota::QuotaDecision;
pub use quota::QuotaError;
pub use quota::QuotaLedger;
pub use quota::QuotaLimits;
pub use quota::QuotaSnapshot;
