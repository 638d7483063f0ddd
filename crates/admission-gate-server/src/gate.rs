// admission-gate-server/src/gate.rs
// ============================================================================
// Module: Admission Gate
// Description: Orchestrates sanitize, admit, complete, and record.
// Purpose: Decide whether submitted text may reach the completion call.
// Dependencies: admission-gate-core, crate::{audit, completion}
// ============================================================================

//! ## Overview
//! [`AdmissionGate::submit`] runs one request through the fixed sequence:
//!
//! 1. sanitize the submitted text; rejections never touch the ledger,
//! 2. ask the ledger whether the shared budget has room,
//! 3. forward the cleaned text to the completion collaborator,
//! 4. record usage only after the collaborator succeeded.
//!
//! Each step writes one audit event. Events carry the requester key and a
//! fingerprint, never the text itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use admission_gate_core::ContentFamily;
use admission_gate_core::Fingerprint;
use admission_gate_core::InputSanitizer;
use admission_gate_core::QuotaError;
use admission_gate_core::QuotaLedger;
use admission_gate_core::QuotaSnapshot;
use admission_gate_core::RequesterKey;
use admission_gate_core::SanitizeConstraints;
use admission_gate_core::SanitizeError;
use serde::Serialize;
use thiserror::Error;

use crate::audit::GateAuditEvent;
use crate::audit::GateAuditEventParams;
use crate::audit::GateAuditSink;
use crate::audit::GateEventKind;
use crate::audit::SecurityAuditEvent;
use crate::audit::SecurityAuditEventParams;
use crate::completion::CompletionClient;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Successful gate outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateReply {
    /// Completion text returned to the caller.
    pub reply: String,
}

/// Gate rejection or failure.
#[derive(Debug, Error)]
pub enum GateError {
    /// The sanitizer rejected the input.
    #[error("{0}")]
    Validation(SanitizeError),
    /// The shared budget is exhausted.
    #[error("{0}")]
    QuotaExhausted(String),
    /// The upstream rejected the service credential.
    #[error("An authentication error occurred.")]
    UpstreamAuthFailure,
    /// The upstream call failed for any other reason.
    #[error("An error occurred. Please try again later.")]
    UpstreamOther,
    /// Ledger state was unavailable.
    #[error("An error occurred. Please try again later.")]
    Ledger(QuotaError),
}

impl GateError {
    /// Returns the normalized kind label used in audit events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(err) => err.kind().as_str(),
            Self::QuotaExhausted(_) => "quota_exhausted",
            Self::UpstreamAuthFailure => "upstream_auth_failure",
            Self::UpstreamOther => "upstream_other",
            Self::Ledger(_) => "ledger_unavailable",
        }
    }
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Admission gate shared by every request handler.
pub struct AdmissionGate {
    /// Compiled sanitizer.
    sanitizer: InputSanitizer,
    /// Sanitizer bounds.
    constraints: SanitizeConstraints,
    /// Shared quota ledger.
    ledger: Arc<dyn QuotaLedger>,
    /// Downstream completion collaborator.
    completion: Arc<dyn CompletionClient>,
    /// Audit sink.
    audit: Arc<dyn GateAuditSink>,
    /// Production switch reported in security events.
    production: bool,
}

impl AdmissionGate {
    /// Creates a gate from its collaborators.
    #[must_use]
    pub fn new(
        sanitizer: InputSanitizer,
        constraints: SanitizeConstraints,
        ledger: Arc<dyn QuotaLedger>,
        completion: Arc<dyn CompletionClient>,
        audit: Arc<dyn GateAuditSink>,
    ) -> Self {
        Self {
            sanitizer,
            constraints,
            ledger,
            completion,
            audit,
            production: false,
        }
    }

    /// Sets the production switch reported in security events.
    #[must_use]
    pub const fn with_production(mut self, production: bool) -> Self {
        self.production = production;
        self
    }

    /// Runs one submission through the gate.
    ///
    /// `input` is `None` when the request carried no text field.
    ///
    /// # Errors
    ///
    /// Returns [`GateError`] for validation, quota, upstream, or ledger
    /// failures.
    pub async fn submit(
        &self,
        requester: &RequesterKey,
        input: Option<&str>,
    ) -> Result<GateReply, GateError> {
        let sanitized = match self.sanitizer.sanitize(input, &self.constraints) {
            Ok(sanitized) => sanitized,
            Err(err) => {
                let family = err.family();
                let err = GateError::Validation(err);
                let fingerprint = Fingerprint::of_optional(input);
                self.emit(requester, GateEventKind::ValidationFailed, fingerprint)
                    .error(err.kind())
                    .content_family(family)
                    .finish();
                return Err(err);
            }
        };
        let fingerprint = Fingerprint::of(sanitized.as_str());

        let decision = match self.ledger.admit(requester) {
            Ok(decision) => decision,
            Err(err) => {
                let err = GateError::Ledger(err);
                self.emit(requester, GateEventKind::LedgerUnavailable, fingerprint)
                    .error(err.kind())
                    .finish();
                return Err(err);
            }
        };
        if !decision.allowed {
            let err = GateError::QuotaExhausted(decision.reason.unwrap_or_default());
            self.emit(requester, GateEventKind::QuotaExhausted, fingerprint)
                .error(err.kind())
                .finish();
            return Err(err);
        }

        self.emit(requester, GateEventKind::Request, fingerprint.clone()).finish();
        let reply = match self.completion.complete(&sanitized).await {
            Ok(reply) => reply,
            Err(upstream) => {
                let err = if upstream.is_auth() {
                    GateError::UpstreamAuthFailure
                } else {
                    GateError::UpstreamOther
                };
                self.emit(requester, GateEventKind::UpstreamError, fingerprint)
                    .error(err.kind())
                    .message(upstream.redacted_message())
                    .finish();
                if upstream.is_auth() {
                    self.record_security("upstream_auth_failure", upstream.redacted_message());
                }
                return Err(err);
            }
        };

        if let Err(err) = self.ledger.record(requester) {
            let err = GateError::Ledger(err);
            self.emit(requester, GateEventKind::LedgerUnavailable, fingerprint)
                .error(err.kind())
                .message("completion succeeded but usage was not recorded".to_string())
                .response_bytes(reply.len())
                .finish();
            return Err(err);
        }
        self.emit(requester, GateEventKind::Success, fingerprint)
            .response_bytes(reply.len())
            .finish();
        Ok(GateReply {
            reply,
        })
    }

    /// Returns current ledger usage.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Ledger`] when ledger state is unavailable.
    pub fn usage(&self) -> Result<QuotaSnapshot, GateError> {
        self.ledger.snapshot().map_err(GateError::Ledger)
    }

    /// Records a security posture event with the gate's current limit.
    pub fn record_security(&self, kind: &str, message: String) {
        let daily_limit = self.ledger.snapshot().map_or(0, |snapshot| snapshot.limit);
        self.audit.record_security(&SecurityAuditEvent::new(SecurityAuditEventParams {
            kind: kind.to_string(),
            message: Some(message),
            production: self.production,
            daily_limit,
        }));
    }

    /// Starts an audit event builder.
    fn emit(
        &self,
        requester: &RequesterKey,
        event: GateEventKind,
        fingerprint: Fingerprint,
    ) -> EventBuilder<'_> {
        EventBuilder {
            sink: self.audit.as_ref(),
            params: GateAuditEventParams {
                event,
                requester: requester.clone(),
                fingerprint,
                error_kind: None,
                content_family: None,
                message: None,
                response_bytes: None,
            },
        }
    }
}

/// Accumulates optional audit fields before writing.
struct EventBuilder<'a> {
    /// Destination sink.
    sink: &'a dyn GateAuditSink,
    /// Event fields.
    params: GateAuditEventParams,
}

impl EventBuilder<'_> {
    /// Sets the error kind label.
    const fn error(mut self, kind: &'static str) -> Self {
        self.params.error_kind = Some(kind);
        self
    }

    /// Sets the denylist family for content rejections.
    const fn content_family(mut self, family: Option<ContentFamily>) -> Self {
        self.params.content_family = family;
        self
    }

    /// Sets the redacted message.
    fn message(mut self, message: String) -> Self {
        self.params.message = Some(message);
        self
    }

    /// Sets the reply size.
    const fn response_bytes(mut self, bytes: usize) -> Self {
        self.params.response_bytes = Some(bytes);
        self
    }

    /// Writes the event.
    fn finish(self) {
        self.sink.record(&GateAuditEvent::new(self.params));
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
