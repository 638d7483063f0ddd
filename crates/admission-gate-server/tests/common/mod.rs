// admission-gate-server/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Shared fixtures for admission gate server tests.
// Purpose: Spin up in-process servers with a scripted completion client.
// Dependencies: admission-gate-config, admission-gate-server, tokio
// ============================================================================

//! ## Overview
//! Servers bind to an ephemeral loopback port and run on the test runtime.
//! The completion collaborator is replaced by [`FakeCompletion`], so no test
//! ever reaches a real upstream.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use admission_gate_config::GateConfig;
use admission_gate_core::SanitizedInput;
use admission_gate_server::CompletionClient;
use admission_gate_server::CompletionError;
use admission_gate_server::GateServer;
use admission_gate_server::NoopAuditSink;
use async_trait::async_trait;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Fake Completion
// ============================================================================

/// Scripted outcome for every call.
#[derive(Clone)]
pub enum Outcome {
    /// Reply with fixed text.
    Reply(String),
    /// Fail with a credential rejection.
    Auth,
    /// Fail with an upstream status.
    Status(u16),
}

/// Completion client with a fixed outcome and a call counter.
pub struct FakeCompletion {
    /// Outcome returned on every call.
    outcome: Outcome,
    /// Completion call counter.
    calls: AtomicUsize,
}

impl FakeCompletion {
    /// Creates a fake with a fixed outcome.
    pub fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    /// Creates a fake that always replies with `text`.
    pub fn replying(text: &str) -> Arc<Self> {
        Self::new(Outcome::Reply(text.to_string()))
    }

    /// Returns the number of completion calls seen.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for FakeCompletion {
    async fn complete(&self, _input: &SanitizedInput) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Reply(text) => Ok(text.clone()),
            Outcome::Auth => Err(CompletionError::Auth),
            Outcome::Status(status) => Err(CompletionError::Status {
                status: *status,
            }),
        }
    }
}

// ============================================================================
// SECTION: Server Harness
// ============================================================================

/// Running test server.
pub struct TestServer {
    /// Bound loopback address.
    pub addr: SocketAddr,
    /// Client shared by the test.
    pub client: reqwest::Client,
}

impl TestServer {
    /// Returns the absolute URL for `path`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Posts a raw body to `/diagnose`.
    pub async fn diagnose(&self, body: &str) -> reqwest::Response {
        self.client
            .post(self.url("/diagnose"))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }

    /// Posts `text` to `/diagnose` on behalf of a forwarded client address.
    pub async fn diagnose_as(&self, forwarded_for: &str, text: &str) -> reqwest::Response {
        self.client
            .post(self.url("/diagnose"))
            .header("x-forwarded-for", forwarded_for)
            .json(&serde_json::json!({ "userInput": text }))
            .send()
            .await
            .unwrap()
    }

    /// Fetches `/rate-limit-status` as JSON.
    pub async fn status(&self) -> serde_json::Value {
        self.client.get(self.url("/rate-limit-status")).send().await.unwrap().json().await.unwrap()
    }
}

/// Parses a TOML config or panics with the validation error.
pub fn config(toml: &str) -> GateConfig {
    GateConfig::from_toml_str(toml).unwrap()
}

/// Starts a server on an ephemeral port.
pub async fn spawn_server(config: GateConfig, completion: Arc<FakeCompletion>) -> TestServer {
    let server =
        GateServer::with_collaborators(config, completion, Arc::new(NoopAuditSink)).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve_on(listener));
    TestServer {
        addr,
        client: reqwest::Client::new(),
    }
}
