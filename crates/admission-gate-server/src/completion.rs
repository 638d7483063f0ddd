// admission-gate-server/src/completion.rs
// ============================================================================
// Module: Completion Client
// Description: Downstream chat-completion collaborator for the admission gate.
// Purpose: Forward sanitized text to an OpenAI-compatible endpoint.
// Dependencies: admission-gate-config, admission-gate-core, async-trait, reqwest
// ============================================================================

//! ## Overview
//! [`CompletionClient`] is the seam between the gate and the expensive
//! downstream call. [`OpenAiCompletionClient`] posts the sanitized text and a
//! fixed system instruction to `{base_url}/chat/completions` with bearer auth
//! and bounded connect and request timeouts.
//!
//! Security posture: upstream error text may echo credentials. Messages are
//! passed through [`redact_upstream_message`] before they reach a log or a
//! response.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use admission_gate_config::CompletionConfig;
use admission_gate_core::SanitizedInput;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixed system instruction sent ahead of every user message.
pub const SYSTEM_PROMPT: &str = "You are a medical patient adviser. Patients describe their \
symptoms to you. Respond calmly and reassuringly.

Answer format:
Initial assessment:
   One short, reassuring sentence that places the symptoms in context.
Possible causes:
   List 3-4 harmless explanations as bullet points, at most one line each.
What may help now:
   Reassure again and, where appropriate, suggest over-the-counter products.
Legal notice:
   State that this is only an assessment and not a diagnosis.

Rules:
- Do not name serious diagnoses.
- Always give an answer, even when uncertain.
- Language: plain, understandable, professional.
- No political, religious, or esoteric references.
- Stay friendly, reassuring, and professional.";

/// Generic replacement for upstream messages that may carry credentials.
pub const REDACTED_AUTH_MESSAGE: &str = "authentication error";

/// Lowercase substrings that trigger redaction.
const CREDENTIAL_MARKERS: [&str; 3] = ["api", "key", "auth"];

/// Path appended to the configured base URL.
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";

// ============================================================================
// SECTION: Public Types
// ============================================================================

/// Completion collaborator interface.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Requests a reply for sanitized text.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError`] when the downstream call fails.
    async fn complete(&self, input: &SanitizedInput) -> Result<String, CompletionError>;
}

/// OpenAI-compatible completion client.
pub struct OpenAiCompletionClient {
    /// Full chat-completions endpoint.
    endpoint: String,
    /// Bearer credential.
    api_key: String,
    /// Model identifier.
    model: String,
    /// Sampling temperature.
    temperature: f64,
    /// HTTP client configured with timeouts.
    client: Client,
}

impl OpenAiCompletionClient {
    /// Builds a client from completion settings and a resolved API key.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Client`] when the HTTP client cannot be
    /// built.
    pub fn from_config(
        config: &CompletionConfig,
        api_key: String,
    ) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| CompletionError::Client(err.to_string()))?;
        let base = config.base_url.trim().trim_end_matches('/');
        Ok(Self {
            endpoint: format!("{base}{CHAT_COMPLETIONS_PATH}"),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            client,
        })
    }

    /// Returns the endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, input: &SanitizedInput) -> Result<String, CompletionError> {
        let auth = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| CompletionError::Auth)?;
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: input.as_str(),
                },
            ],
            temperature: self.temperature,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, auth)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    CompletionError::Transport("completion request timed out".to_string())
                } else {
                    CompletionError::Transport(redact_upstream_message(&err.to_string()))
                }
            })?;
        match response.status() {
            status if status.is_success() => {
                let payload: ChatResponse = response
                    .json()
                    .await
                    .map_err(|err| CompletionError::Malformed(err.to_string()))?;
                payload
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.message.content)
                    .ok_or_else(|| CompletionError::Malformed("response has no content".to_string()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(CompletionError::Auth),
            status => Err(CompletionError::Status {
                status: status.as_u16(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Chat-completions request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    /// Model identifier.
    model: &'a str,
    /// System and user messages, in order.
    messages: [ChatMessage<'a>; 2],
    /// Sampling temperature.
    temperature: f64,
}

/// One chat message.
#[derive(Serialize)]
struct ChatMessage<'a> {
    /// Author role.
    role: &'static str,
    /// Message text.
    content: &'a str,
}

/// Chat-completions response body, reduced to the fields used.
#[derive(Deserialize)]
struct ChatResponse {
    /// Candidate replies.
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

/// One candidate reply.
#[derive(Deserialize)]
struct ChatChoice {
    /// Reply message.
    message: ChatReplyMessage,
}

/// Reply message content.
#[derive(Deserialize)]
struct ChatReplyMessage {
    /// Reply text; absent for tool-call replies.
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Completion failures.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The upstream rejected the credential (HTTP 401/403).
    #[error("authentication error")]
    Auth,
    /// The upstream answered with a non-success status.
    #[error("completion upstream returned status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },
    /// Network failure or timeout.
    #[error("completion transport error: {0}")]
    Transport(String),
    /// The upstream reply could not be decoded.
    #[error("completion response malformed: {0}")]
    Malformed(String),
    /// The HTTP client could not be constructed.
    #[error("completion client error: {0}")]
    Client(String),
}

impl CompletionError {
    /// Returns true when the failure is an upstream credential rejection.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth)
    }

    /// Returns the message safe to log.
    #[must_use]
    pub fn redacted_message(&self) -> String {
        redact_upstream_message(&self.to_string())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Replaces messages that mention credentials with a generic message.
///
/// Matching is case-insensitive on the substrings `api`, `key`, and `auth`.
#[must_use]
pub fn redact_upstream_message(message: &str) -> String {
    let lowered = message.to_ascii_lowercase();
    if CREDENTIAL_MARKERS.iter().any(|marker| lowered.contains(marker)) {
        REDACTED_AUTH_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
