// admission-gate-core/src/core/fingerprint.rs
// ============================================================================
// Module: Audit Fingerprint
// Description: Short non-cryptographic fingerprints for log correlation.
// Purpose: Let operators correlate audit lines without storing submitted text.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A fingerprint is a 31-multiplier rolling hash over a bounded prefix of the
//! submitted text, rendered as lowercase hex. It exists only to correlate two
//! audit lines about the same submission. Collision resistance is not a goal
//! and the token must never be used for authentication or deduplication.
//!
//! Security posture: only the first [`FINGERPRINT_PREFIX_UNITS`] UTF-16 code
//! units are consumed, so hashing cost is constant regardless of input size.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of leading UTF-16 code units consumed by the fingerprint.
pub const FINGERPRINT_PREFIX_UNITS: usize = 50;

/// Sentinel token for empty or non-text input. Not valid hex, so it can never
/// equal the fingerprint of real content.
pub const EMPTY_FINGERPRINT: &str = "empty";

/// Maximum rendered token length in hex digits.
const MAX_TOKEN_DIGITS: usize = 8;

// ============================================================================
// SECTION: Fingerprint
// ============================================================================

/// Fingerprint token used in audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprints a text value.
    #[must_use]
    pub fn of(text: &str) -> Self {
        if text.is_empty() {
            return Self::empty();
        }
        let mut hash: i32 = 0;
        for unit in text.encode_utf16().take(FINGERPRINT_PREFIX_UNITS) {
            hash = hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit));
        }
        // |i32::MIN| is 0x80000000, so the rendering never exceeds 8 digits.
        let mut token = format!("{:x}", i64::from(hash).unsigned_abs());
        token.truncate(MAX_TOKEN_DIGITS);
        Self(token)
    }

    /// Fingerprints an optional value; absent input maps to the sentinel.
    #[must_use]
    pub fn of_optional(text: Option<&str>) -> Self {
        text.map_or_else(Self::empty, Self::of)
    }

    /// Returns the sentinel fingerprint.
    #[must_use]
    pub fn empty() -> Self {
        Self(EMPTY_FINGERPRINT.to_string())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this is the empty sentinel.
    #[must_use]
    pub fn is_empty_sentinel(&self) -> bool {
        self.0 == EMPTY_FINGERPRINT
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fingerprints a text value.
#[must_use]
pub fn fingerprint(text: &str) -> Fingerprint {
    Fingerprint::of(text)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::EMPTY_FINGERPRINT;
    use super::Fingerprint;
    use super::fingerprint;

    #[test]
    fn known_tokens() {
        assert_eq!(fingerprint("a").as_str(), "61");
        assert_eq!(fingerprint("x").as_str(), "78");
        assert_eq!(fingerprint("hello").as_str(), "5e918d2");
    }

    #[test]
    fn order_sensitive() {
        assert_eq!(fingerprint("ab").as_str(), "c21");
        assert_eq!(fingerprint("ba").as_str(), "c3f");
    }

    #[test]
    fn only_prefix_is_consumed() {
        let short = "a".repeat(50);
        let long = format!("{short}{}", "b".repeat(10_000));
        assert_eq!(fingerprint(&short), fingerprint(&long));
    }

    #[test]
    fn empty_and_absent_map_to_sentinel() {
        assert_eq!(fingerprint("").as_str(), EMPTY_FINGERPRINT);
        assert!(Fingerprint::of_optional(None).is_empty_sentinel());
        assert_ne!(fingerprint(""), fingerprint("a"));
    }

    #[test]
    fn tokens_are_bounded_hex() {
        for sample in ["\u{ffff}\u{ffff}\u{ffff}\u{ffff}\u{ffff}\u{ffff}", "zzzzzzzzzzzzzzzz", "é"] {
            let token = fingerprint(sample);
            assert!(token.as_str().len() <= 8);
            assert!(token.as_str().chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }
}
