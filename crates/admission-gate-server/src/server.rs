// admission-gate-server/src/server.rs
// ============================================================================
// Module: Gate HTTP Server
// Description: HTTP surface for the admission gate.
// Purpose: Expose the diagnose and usage endpoints with a CSP header.
// Dependencies: admission-gate-config, admission-gate-core, axum, tokio
// ============================================================================

//! ## Overview
//! Routes:
//!
//! - `POST /diagnose` takes `{ "userInput": <text> }` and answers
//!   `200 { "reply" }` or `{ "error" }` with 400, 413, 429, or 500.
//! - `GET /rate-limit-status` reports shared quota usage.
//!
//! Every response, including rejections and unknown routes, carries the
//! Content-Security-Policy header (or its report-only variant).
//!
//! Security posture: inputs are untrusted. The requester key trusts
//! `X-Forwarded-For` as-is, which is only sound behind a trusted proxy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use admission_gate_config::AuditConfig;
use admission_gate_config::GateConfig;
use admission_gate_config::PolicySection;
use admission_gate_core::InMemoryQuotaLedger;
use admission_gate_core::InputSanitizer;
use admission_gate_core::RequesterKey;
use admission_gate_core::build_policy;
use admission_gate_core::policy_header_name;
use admission_gate_core::policy_header_value;
use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::Request;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderMap;
use axum::http::HeaderName;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;

use crate::audit::FileAuditSink;
use crate::audit::GateAuditSink;
use crate::audit::NoopAuditSink;
use crate::audit::StderrAuditSink;
use crate::completion::CompletionClient;
use crate::completion::OpenAiCompletionClient;
use crate::gate::AdmissionGate;
use crate::gate::GateError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON field carrying the submitted text.
const USER_INPUT_FIELD: &str = "userInput";
/// Forwarded-for header consulted first for the requester key.
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
/// Real-ip header consulted second for the requester key.
const REAL_IP_HEADER: &str = "x-real-ip";
/// Message returned for bodies over the configured limit.
const BODY_TOO_LARGE_MESSAGE: &str = "Request body too large.";

// ============================================================================
// SECTION: Gate Server
// ============================================================================

/// Admission gate HTTP server.
pub struct GateServer {
    /// Validated configuration.
    config: GateConfig,
    /// Shared admission gate.
    gate: Arc<AdmissionGate>,
    /// Precomputed policy header.
    policy: PolicyHeader,
}

impl GateServer {
    /// Builds a server with the OpenAI completion client and the configured
    /// audit sink.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the config is invalid, the API key is
    /// missing, or a collaborator cannot be built.
    pub fn from_config(config: GateConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let api_key =
            config.completion.api_key().map_err(|err| ServerError::Config(err.to_string()))?;
        let completion = OpenAiCompletionClient::from_config(&config.completion, api_key)
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let audit = build_audit_sink(&config.audit)?;
        Self::with_collaborators(config, Arc::new(completion), audit)
    }

    /// Builds a server around explicit completion and audit collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the config is invalid.
    pub fn with_collaborators(
        config: GateConfig,
        completion: Arc<dyn CompletionClient>,
        audit: Arc<dyn GateAuditSink>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let constraints =
            config.sanitize_constraints().map_err(|err| ServerError::Config(err.to_string()))?;
        let sanitizer = InputSanitizer::new().map_err(|err| ServerError::Init(err.to_string()))?;
        let ledger = Arc::new(InMemoryQuotaLedger::new(config.quota_limits()));
        let gate = AdmissionGate::new(sanitizer, constraints, ledger, completion, audit)
            .with_production(config.server.production);
        let policy = PolicyHeader::from_config(&config.policy, config.server.production)?;
        Ok(Self {
            config,
            gate: Arc::new(gate),
            policy,
        })
    }

    /// Builds the HTTP router.
    #[must_use]
    pub fn router(&self) -> Router {
        Router::new()
            .route("/diagnose", post(handle_diagnose))
            .route("/rate-limit-status", get(handle_status))
            .with_state(Arc::clone(&self.gate))
            .layer(DefaultBodyLimit::max(self.config.server.max_body_bytes))
            .layer(middleware::from_fn_with_state(self.policy.clone(), apply_policy_header))
    }

    /// Binds the configured address and serves until the listener fails.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr =
            self.config.server.bind_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|_| ServerError::Transport("http bind failed".to_string()))?;
        self.serve_on(listener).await
    }

    /// Serves on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when serving fails.
    pub async fn serve_on(self, listener: TcpListener) -> Result<(), ServerError> {
        let addr = listener
            .local_addr()
            .map_err(|_| ServerError::Transport("listener address unavailable".to_string()))?;
        self.announce(addr);
        let app = self.router();
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|_| ServerError::Transport("http server failed".to_string()))
    }

    /// Emits the startup banner and the startup security event.
    fn announce(&self, addr: SocketAddr) {
        let server = &self.config.server;
        let daily_limit = self.config.quota.daily_limit;
        let _ = writeln!(
            std::io::stderr(),
            "admission-gate: listening on http://{addr}; global daily limit {daily_limit} \
             requests"
        );
        if !server.production && !addr.ip().is_loopback() {
            let _ = writeln!(
                std::io::stderr(),
                "admission-gate: WARNING: development policy on a non-loopback bind; set \
                 server.production for deployed instances"
            );
        }
        if !self.config.audit.enabled {
            let _ = writeln!(std::io::stderr(), "admission-gate: WARNING: audit logging disabled");
        }
        let mode = if server.production { "production" } else { "development" };
        self.gate.record_security("startup", format!("{mode} mode on {addr}"));
    }
}

/// Builds the audit sink from configuration.
fn build_audit_sink(config: &AuditConfig) -> Result<Arc<dyn GateAuditSink>, ServerError> {
    if !config.enabled {
        return Ok(Arc::new(NoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = FileAuditSink::new(path)
                .map_err(|err| ServerError::Init(format!("audit log open failed: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(StderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Policy Header
// ============================================================================

/// Precomputed policy header name and value.
#[derive(Clone)]
struct PolicyHeader {
    /// Enforcing or report-only header name.
    name: HeaderName,
    /// Joined directive list.
    value: HeaderValue,
}

impl PolicyHeader {
    /// Builds the header from policy settings and the production switch.
    fn from_config(policy: &PolicySection, production: bool) -> Result<Self, ServerError> {
        let directives = build_policy(&policy.directives(), production);
        let value = HeaderValue::from_str(&policy_header_value(&directives))
            .map_err(|_| ServerError::Config("policy header value is not valid".to_string()))?;
        Ok(Self {
            name: HeaderName::from_static(policy_header_name(policy.report_only)),
            value,
        })
    }
}

/// Adds the policy header to every response.
async fn apply_policy_header(
    State(policy): State<PolicyHeader>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(policy.name, policy.value);
    response
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Error response body.
#[derive(Serialize)]
struct ErrorBody {
    /// User-facing message.
    error: String,
}

/// Usage response body.
#[derive(Serialize)]
struct StatusBody {
    /// Shared budget usage.
    global: GlobalUsage,
    /// Number of requester keys seen.
    #[serde(rename = "ipCount")]
    ip_count: usize,
}

/// Shared budget usage.
#[derive(Serialize)]
struct GlobalUsage {
    /// Requests counted today.
    used: u64,
    /// Global ceiling.
    limit: u32,
    /// Requests left today.
    remaining: u64,
}

/// Handles `POST /diagnose`.
async fn handle_diagnose(
    State(gate): State<Arc<AdmissionGate>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let bytes = match body {
        Ok(bytes) => bytes,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            let message = BODY_TOO_LARGE_MESSAGE.to_string();
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, message);
        }
        Err(_) => Bytes::new(),
    };
    let requester = requester_key(&headers, peer);
    let input = user_input(&bytes);
    match gate.submit(&requester, input.as_deref()).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => error_response(status_for(&err), err.to_string()),
    }
}

/// Handles `GET /rate-limit-status`.
async fn handle_status(State(gate): State<Arc<AdmissionGate>>) -> Response {
    match gate.usage() {
        Ok(snapshot) => Json(StatusBody {
            global: GlobalUsage {
                used: snapshot.used,
                limit: snapshot.limit,
                remaining: snapshot.remaining,
            },
            ip_count: snapshot.distinct_keys,
        })
        .into_response(),
        Err(err) => error_response(status_for(&err), err.to_string()),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a JSON error response.
fn error_response(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message,
        }),
    )
        .into_response()
}

/// Maps a gate error to its HTTP status.
const fn status_for(err: &GateError) -> StatusCode {
    match err {
        GateError::Validation(_) => StatusCode::BAD_REQUEST,
        GateError::QuotaExhausted(_) => StatusCode::TOO_MANY_REQUESTS,
        GateError::UpstreamAuthFailure | GateError::UpstreamOther | GateError::Ledger(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Derives the requester key from proxy headers and the socket peer.
fn requester_key(headers: &HeaderMap, peer: SocketAddr) -> RequesterKey {
    RequesterKey::from_origin(
        header_str(headers, FORWARDED_FOR_HEADER),
        header_str(headers, REAL_IP_HEADER),
        Some(peer.ip()),
    )
}

/// Returns a header value when it is visible ASCII.
fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Extracts the submitted text; `None` for malformed JSON or a non-string
/// field.
fn user_input(bytes: &[u8]) -> Option<String> {
    let payload: Value = serde_json::from_slice(bytes).ok()?;
    payload.get(USER_INPUT_FIELD).and_then(Value::as_str).map(str::to_string)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Gate server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
