// admission-gate-core/src/core/identifiers.rs
// ============================================================================
// Module: Admission Gate Identifiers
// Description: Opaque requester identifiers used to bucket quota usage.
// Purpose: Provide a strongly typed key with a stable string form.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RequesterKey`] names the apparent origin of a request. It is derived
//! from proxy headers or the socket peer and is never validated as a real
//! network address.
//!
//! Security posture: the first `X-Forwarded-For` entry is trusted as-is. That
//! is only sound behind a reverse proxy which overwrites the header; a client
//! talking to the gate directly can pick its own key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::net::IpAddr;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Requester Key
// ============================================================================

/// Requester identifier shared by every client whose origin cannot be resolved.
pub const UNKNOWN_REQUESTER: &str = "unknown";

/// Opaque identifier used to bucket usage for quota purposes.
///
/// # Invariants
/// - Never empty; unresolved origins collapse to [`UNKNOWN_REQUESTER`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequesterKey(String);

impl RequesterKey {
    /// Creates a new requester key, falling back to the unknown sentinel when
    /// the value is blank.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Self::unknown();
        }
        if trimmed.len() == id.len() {
            return Self(id);
        }
        Self(trimmed.to_string())
    }

    /// Returns the shared sentinel key for unresolvable clients.
    #[must_use]
    pub fn unknown() -> Self {
        Self(UNKNOWN_REQUESTER.to_string())
    }

    /// Derives a key from the forwarded-for chain, the real-ip header, and the
    /// socket peer, in that order of preference.
    #[must_use]
    pub fn from_origin(
        forwarded_for: Option<&str>,
        real_ip: Option<&str>,
        peer: Option<IpAddr>,
    ) -> Self {
        let first_forwarded = forwarded_for
            .and_then(|chain| chain.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty());
        if let Some(value) = first_forwarded {
            return Self::new(value);
        }
        if let Some(value) = real_ip.map(str::trim).filter(|value| !value.is_empty()) {
            return Self::new(value);
        }
        peer.map_or_else(Self::unknown, |ip| Self(ip.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when this is the shared unknown sentinel.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_REQUESTER
    }
}

impl fmt::Display for RequesterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RequesterKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RequesterKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
