// admission-gate-core/src/core/mod.rs
// ============================================================================
// Module: Admission Gate Core Types
// Description: Pure request-scoped primitives for the admission gate.
// Purpose: Group sanitization, fingerprinting, policy, and identifier types.
// Dependencies: regex, serde, time
// ============================================================================

//! ## Overview
//! Core types are pure and hold no shared state. They are safe to call from any
//! number of concurrent request handlers without synchronization.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod fingerprint;
pub mod identifiers;
pub mod policy;
pub mod sanitize;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use fingerprint::EMPTY_FINGERPRINT;
pub use fingerprint::FINGERPRINT_PREFIX_UNITS;
pub use fingerprint::Fingerprint;
pub use fingerprint::fingerprint;
pub use identifiers::RequesterKey;
pub use identifiers::UNKNOWN_REQUESTER;
pub use policy::CSP_HEADER;
pub use policy::CSP_REPORT_ONLY_HEADER;
pub use policy::PolicyConfig;
pub use policy::build_policy;
pub use policy::policy_header_name;
pub use policy::policy_header_value;
pub use sanitize::CharacterClass;
pub use sanitize::ContentFamily;
pub use sanitize::InputSanitizer;
pub use sanitize::SanitizeConstraints;
pub use sanitize::SanitizeError;
pub use sanitize::SanitizeErrorKind;
pub use sanitize::SanitizedInput;
pub use sanitize::SanitizerBuildError;
pub use sanitize::ValidationResult;
pub use sanitize::escape_html;
pub use time::Clock;
pub use time::ManualClock;
pub use time::SystemClock;
