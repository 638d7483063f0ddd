// admission-gate-server/src/gate/tests.rs
// ============================================================================
// Module: Admission Gate Unit Tests
// Description: Sequencing, quota accounting, and audit redaction.
// Purpose: Verify the gate consumes quota only on downstream success.
// Dependencies: admission-gate-core, tokio
// ============================================================================

//! ## Overview
//! Drives the gate with a scripted completion client and a capturing sink.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions."
)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use admission_gate_core::ContentFamily;
use admission_gate_core::InMemoryQuotaLedger;
use admission_gate_core::InputSanitizer;
use admission_gate_core::QuotaDecision;
use admission_gate_core::QuotaError;
use admission_gate_core::QuotaLedger;
use admission_gate_core::QuotaLimits;
use admission_gate_core::QuotaSnapshot;
use admission_gate_core::RequesterKey;
use admission_gate_core::SanitizeConstraints;
use admission_gate_core::SanitizeErrorKind;
use admission_gate_core::SanitizedInput;
use async_trait::async_trait;

use super::AdmissionGate;
use super::GateError;
use crate::audit::GateAuditEvent;
use crate::audit::GateAuditSink;
use crate::audit::GateEventKind;
use crate::audit::SecurityAuditEvent;
use crate::completion::CompletionClient;
use crate::completion::CompletionError;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Completion client that replays scripted outcomes and counts calls.
#[derive(Default)]
struct ScriptedCompletion {
    outcomes: Mutex<VecDeque<Result<String, CompletionError>>>,
    seen: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl ScriptedCompletion {
    fn with(outcomes: Vec<Result<String, CompletionError>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, input: &SanitizedInput) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(input.as_str().to_string());
        self.outcomes.lock().unwrap().pop_front().unwrap_or_else(|| Ok("ok".to_string()))
    }
}

/// Sink that keeps every event in memory.
#[derive(Default)]
struct CapturingSink {
    events: Mutex<Vec<GateAuditEvent>>,
    security: Mutex<Vec<SecurityAuditEvent>>,
}

impl CapturingSink {
    fn kinds(&self) -> Vec<GateEventKind> {
        self.events.lock().unwrap().iter().map(|event| event.event).collect()
    }
}

impl GateAuditSink for CapturingSink {
    fn record(&self, event: &GateAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_security(&self, event: &SecurityAuditEvent) {
        self.security.lock().unwrap().push(event.clone());
    }
}

/// Ledger whose admit or record step fails.
struct FailingLedger {
    fail_admit: bool,
}

impl QuotaLedger for FailingLedger {
    fn admit(&self, _key: &RequesterKey) -> Result<QuotaDecision, QuotaError> {
        if self.fail_admit {
            return Err(QuotaError::Unavailable("lock poisoned".to_string()));
        }
        Ok(QuotaDecision::allow())
    }

    fn record(&self, _key: &RequesterKey) -> Result<(), QuotaError> {
        Err(QuotaError::Unavailable("lock poisoned".to_string()))
    }

    fn snapshot(&self) -> Result<QuotaSnapshot, QuotaError> {
        Err(QuotaError::Unavailable("lock poisoned".to_string()))
    }
}

fn failing_gate(
    fail_admit: bool,
) -> (AdmissionGate, Arc<ScriptedCompletion>, Arc<CapturingSink>) {
    let completion = ScriptedCompletion::with(vec![Ok("rest and fluids".to_string())]);
    let sink = Arc::new(CapturingSink::default());
    let gate = AdmissionGate::new(
        InputSanitizer::new().unwrap(),
        SanitizeConstraints::default(),
        Arc::new(FailingLedger {
            fail_admit,
        }),
        completion.clone(),
        sink.clone(),
    );
    (gate, completion, sink)
}

struct Harness {
    gate: AdmissionGate,
    ledger: Arc<InMemoryQuotaLedger>,
    completion: Arc<ScriptedCompletion>,
    sink: Arc<CapturingSink>,
}

fn harness(limit: u32, outcomes: Vec<Result<String, CompletionError>>) -> Harness {
    let ledger = Arc::new(InMemoryQuotaLedger::new(QuotaLimits {
        daily_limit: limit,
        per_key_limit: None,
    }));
    let completion = ScriptedCompletion::with(outcomes);
    let sink = Arc::new(CapturingSink::default());
    let gate = AdmissionGate::new(
        InputSanitizer::new().unwrap(),
        SanitizeConstraints::default(),
        ledger.clone(),
        completion.clone(),
        sink.clone(),
    );
    Harness {
        gate,
        ledger,
        completion,
        sink,
    }
}

fn requester() -> RequesterKey {
    RequesterKey::new("203.0.113.9")
}

// ============================================================================
// SECTION: Sequencing
// ============================================================================

#[tokio::test]
async fn success_forwards_cleaned_text_and_records_usage() {
    let h = harness(5, vec![Ok("take a rest".to_string())]);
    let reply = h.gate.submit(&requester(), Some("  mild   <b>headache</b> ")).await.unwrap();
    assert_eq!(reply.reply, "take a rest");
    assert_eq!(h.completion.seen.lock().unwrap().as_slice(), ["mild headache"]);
    assert_eq!(h.ledger.snapshot().unwrap().used, 1);
    assert_eq!(h.sink.kinds(), [GateEventKind::Request, GateEventKind::Success]);
    let events = h.sink.events.lock().unwrap();
    assert_eq!(events[1].response_bytes, Some("take a rest".len()));
}

#[tokio::test]
async fn validation_failure_skips_ledger_and_upstream() {
    let h = harness(5, vec![]);
    let err = h.gate.submit(&requester(), Some("<script>x</script>")).await.unwrap_err();
    assert!(matches!(err, GateError::Validation(_)));
    assert_eq!(err.kind(), SanitizeErrorKind::DisallowedContent.as_str());
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.ledger.snapshot().unwrap().distinct_keys, 0);
    assert_eq!(h.sink.kinds(), [GateEventKind::ValidationFailed]);
    let events = h.sink.events.lock().unwrap();
    assert_eq!(events[0].content_family, Some(ContentFamily::ActiveMarkup));
}

#[tokio::test]
async fn length_rejection_carries_no_content_family() {
    let h = harness(5, vec![]);
    let _ = h.gate.submit(&requester(), Some("ab")).await.unwrap_err();
    let events = h.sink.events.lock().unwrap();
    assert_eq!(events[0].error_kind, Some("too_short"));
    assert_eq!(events[0].content_family, None);
}

#[tokio::test]
async fn absent_input_is_invalid_type() {
    let h = harness(5, vec![]);
    let err = h.gate.submit(&requester(), None).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_type");
    let events = h.sink.events.lock().unwrap();
    assert!(events[0].fingerprint.is_empty_sentinel());
}

#[tokio::test]
async fn exhausted_budget_rejects_before_upstream() {
    let h = harness(2, vec![]);
    for _ in 0 .. 2 {
        h.gate.submit(&requester(), Some("sore throat")).await.unwrap();
    }
    let err = h.gate.submit(&RequesterKey::new("other"), Some("sore throat")).await.unwrap_err();
    assert!(matches!(err, GateError::QuotaExhausted(_)));
    assert!(err.to_string().contains('2'));
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.sink.kinds().last(), Some(&GateEventKind::QuotaExhausted));
}

// ============================================================================
// SECTION: Upstream Failures
// ============================================================================

#[tokio::test]
async fn upstream_failure_does_not_consume_quota() {
    let h = harness(1, vec![Err(CompletionError::Status {
        status: 502,
    })]);
    let err = h.gate.submit(&requester(), Some("back pain")).await.unwrap_err();
    assert!(matches!(err, GateError::UpstreamOther));
    assert_eq!(h.ledger.snapshot().unwrap().used, 0);
    assert!(h.gate.submit(&requester(), Some("back pain")).await.is_ok());
}

#[tokio::test]
async fn upstream_auth_failure_is_generic_and_audited() {
    let h = harness(5, vec![Err(CompletionError::Auth)]);
    let err = h.gate.submit(&requester(), Some("dizzy spells")).await.unwrap_err();
    assert!(matches!(err, GateError::UpstreamAuthFailure));
    assert_eq!(err.to_string(), "An authentication error occurred.");
    let security = h.sink.security.lock().unwrap();
    assert_eq!(security.len(), 1);
    assert_eq!(security[0].kind, "upstream_auth_failure");
    assert_eq!(security[0].daily_limit, 5);
}

#[tokio::test]
async fn transport_messages_mentioning_keys_are_redacted() {
    let h = harness(5, vec![Err(CompletionError::Transport(
        "invalid api key sk-live-123".to_string(),
    ))]);
    let err = h.gate.submit(&requester(), Some("itchy skin")).await.unwrap_err();
    assert_eq!(err.to_string(), "An error occurred. Please try again later.");
    let events = h.sink.events.lock().unwrap();
    let upstream = events.iter().find(|event| event.event == GateEventKind::UpstreamError).unwrap();
    assert_eq!(upstream.message.as_deref(), Some("authentication error"));
}

// ============================================================================
// SECTION: Ledger Failures
// ============================================================================

#[tokio::test]
async fn unavailable_ledger_on_admit_is_audited_before_upstream() {
    let (gate, completion, sink) = failing_gate(true);
    let err = gate.submit(&requester(), Some("sore throat")).await.unwrap_err();
    assert!(matches!(err, GateError::Ledger(_)));
    assert_eq!(err.to_string(), "An error occurred. Please try again later.");
    assert_eq!(completion.calls.load(Ordering::SeqCst), 0);
    assert_eq!(sink.kinds(), [GateEventKind::LedgerUnavailable]);
    let events = sink.events.lock().unwrap();
    assert_eq!(events[0].error_kind, Some("ledger_unavailable"));
    assert!(!events[0].fingerprint.is_empty_sentinel());
}

#[tokio::test]
async fn unavailable_ledger_on_record_still_audits_the_completion() {
    let (gate, completion, sink) = failing_gate(false);
    let err = gate.submit(&requester(), Some("sore throat")).await.unwrap_err();
    assert_eq!(err.kind(), "ledger_unavailable");
    assert_eq!(completion.calls.load(Ordering::SeqCst), 1);
    assert_eq!(sink.kinds(), [GateEventKind::Request, GateEventKind::LedgerUnavailable]);
    let events = sink.events.lock().unwrap();
    assert_eq!(events[1].error_kind, Some("ledger_unavailable"));
    assert_eq!(events[1].response_bytes, Some("rest and fluids".len()));
    assert_eq!(events[1].requester, requester());
}

// ============================================================================
// SECTION: Redaction
// ============================================================================

#[tokio::test]
async fn audit_events_never_carry_submitted_text() {
    let h = harness(1, vec![Ok("reply".to_string())]);
    let _ = h.gate.submit(&requester(), Some("persistent cough")).await;
    let _ = h.gate.submit(&requester(), Some("DROP everything")).await;
    let _ = h.gate.submit(&requester(), Some("persistent cough")).await;
    for event in h.sink.events.lock().unwrap().iter() {
        let json = serde_json::to_string(event).unwrap();
        assert!(!json.contains("cough"));
        assert!(!json.contains("DROP"));
    }
}
