// admission-gate-server/src/audit.rs
// ============================================================================
// Module: Gate Audit Logging
// Description: Structured audit events for admission decisions.
// Purpose: Emit redacted JSON-line audit logs without hard dependencies.
// Dependencies: admission-gate-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events carry the requester key, the input fingerprint, and a
//! normalized error kind. Submitted text is never part of an event. Sinks
//! write one JSON object per line so deployments can route events to their
//! preferred logging pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use admission_gate_core::ContentFamily;
use admission_gate_core::Fingerprint;
use admission_gate_core::RequesterKey;
use serde::Serialize;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Admission event classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GateEventKind {
    /// Sanitizer rejected the input.
    ValidationFailed,
    /// Quota ledger denied admission.
    QuotaExhausted,
    /// Request admitted and forwarded downstream.
    Request,
    /// Downstream call succeeded and usage was recorded.
    Success,
    /// Downstream call failed.
    UpstreamError,
    /// Quota ledger state was unavailable.
    LedgerUnavailable,
}

impl GateEventKind {
    /// Returns the stable event label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationFailed => "validation_failed",
            Self::QuotaExhausted => "quota_exhausted",
            Self::Request => "request",
            Self::Success => "success",
            Self::UpstreamError => "upstream_error",
            Self::LedgerUnavailable => "ledger_unavailable",
        }
    }
}

/// Admission audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct GateAuditEvent {
    /// Event identifier.
    pub event: GateEventKind,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Requester key.
    pub requester: RequesterKey,
    /// Fingerprint of the submitted or sanitized text.
    pub fingerprint: Fingerprint,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Denylist family for content rejections.
    pub content_family: Option<ContentFamily>,
    /// Redacted message, never containing submitted text.
    pub message: Option<String>,
    /// Reply size in bytes on success.
    pub response_bytes: Option<usize>,
}

/// Inputs required to construct an admission audit event.
pub struct GateAuditEventParams {
    /// Event identifier.
    pub event: GateEventKind,
    /// Requester key.
    pub requester: RequesterKey,
    /// Fingerprint of the submitted or sanitized text.
    pub fingerprint: Fingerprint,
    /// Normalized error kind label.
    pub error_kind: Option<&'static str>,
    /// Denylist family for content rejections.
    pub content_family: Option<ContentFamily>,
    /// Redacted message.
    pub message: Option<String>,
    /// Reply size in bytes on success.
    pub response_bytes: Option<usize>,
}

impl GateAuditEvent {
    /// Creates a new admission audit event.
    #[must_use]
    pub fn new(params: GateAuditEventParams) -> Self {
        Self {
            event: params.event,
            timestamp_ms: now_ms(),
            requester: params.requester,
            fingerprint: params.fingerprint,
            error_kind: params.error_kind,
            content_family: params.content_family,
            message: params.message,
            response_bytes: params.response_bytes,
        }
    }
}

/// Security posture audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityAuditEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
    /// Production switch at the time of the event.
    pub production: bool,
    /// Active global daily limit.
    pub daily_limit: u32,
}

/// Inputs required to construct a security audit event.
pub struct SecurityAuditEventParams {
    /// Security event kind.
    pub kind: String,
    /// Optional message.
    pub message: Option<String>,
    /// Production switch at the time of the event.
    pub production: bool,
    /// Active global daily limit.
    pub daily_limit: u32,
}

impl SecurityAuditEvent {
    /// Creates a new security audit event.
    #[must_use]
    pub fn new(params: SecurityAuditEventParams) -> Self {
        Self {
            event: "security_audit",
            timestamp_ms: now_ms(),
            kind: params.kind,
            message: params.message,
            production: params.production,
            daily_limit: params.daily_limit,
        }
    }
}

/// Returns milliseconds since the Unix epoch.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for admission events.
pub trait GateAuditSink: Send + Sync {
    /// Records an admission event.
    fn record(&self, event: &GateAuditEvent);

    /// Records a security posture event.
    fn record_security(&self, _event: &SecurityAuditEvent) {}
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Serializes and writes one line to stderr.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(io::stderr(), "{payload}");
        }
    }
}

impl GateAuditSink for StderrAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        Self::emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// Append-mode log file.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens `path` for appending, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns [`io::Error`] when the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Serializes and appends one line.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl GateAuditSink for FileAuditSink {
    fn record(&self, event: &GateAuditEvent) {
        self.emit(event);
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl GateAuditSink for NoopAuditSink {
    fn record(&self, _event: &GateAuditEvent) {}
}

// ============================================================================
// SECTION: Tests
// ============================================================================
