// admission-gate-server/src/lib.rs
// ============================================================================
// Module: Admission Gate Server Library
// Description: Gate orchestration, completion client, audit, and HTTP surface.
// Purpose: Wire the core primitives into a running admission service.
// Dependencies: admission-gate-core, admission-gate-config, axum, reqwest
// ============================================================================

//! ## Overview
//! The server crate composes the sanitizer, quota ledger, and completion
//! client into an [`AdmissionGate`] and exposes it over HTTP with a
//! Content-Security-Policy header on every response.
//!
//! Security posture: every inbound request is untrusted; raw submitted text
//! never reaches the audit log, only its fingerprint.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod completion;
pub mod gate;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::FileAuditSink;
pub use audit::GateAuditEvent;
pub use audit::GateAuditSink;
pub use audit::GateEventKind;
pub use audit::NoopAuditSink;
pub use audit::SecurityAuditEvent;
pub use audit::StderrAuditSink;
pub use completion::CompletionClient;
pub use completion::CompletionError;
pub use completion::OpenAiCompletionClient;
pub use gate::AdmissionGate;
pub use gate::GateError;
pub use gate::GateReply;
pub use server::GateServer;
pub use server::ServerError;
