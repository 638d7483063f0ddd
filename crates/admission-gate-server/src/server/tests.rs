// admission-gate-server/src/server/tests.rs
// ============================================================================
// Module: Gate HTTP Server Unit Tests
// Description: Request parsing, requester derivation, and status mapping.
// Purpose: Pin the HTTP helpers without binding a socket.
// Dependencies: admission-gate-server, axum
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only assertions."
)]

use std::net::SocketAddr;

use admission_gate_config::PolicySection;
use admission_gate_core::QuotaError;
use admission_gate_core::SanitizeError;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::http::StatusCode;

use super::PolicyHeader;
use super::requester_key;
use super::status_for;
use super::user_input;
use crate::gate::GateError;

fn peer() -> SocketAddr {
    "192.0.2.10:55000".parse().unwrap()
}

#[test]
fn requester_prefers_first_forwarded_entry() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.5 , 10.0.0.1"));
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
    assert_eq!(requester_key(&headers, peer()).as_str(), "203.0.113.5");
}

#[test]
fn requester_falls_back_to_real_ip_then_peer() {
    let mut headers = HeaderMap::new();
    headers.insert("x-forwarded-for", HeaderValue::from_static(" , "));
    headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
    assert_eq!(requester_key(&headers, peer()).as_str(), "198.51.100.2");
    assert_eq!(requester_key(&HeaderMap::new(), peer()).as_str(), "192.0.2.10");
}

#[test]
fn user_input_requires_string_field() {
    assert_eq!(user_input(br#"{"userInput":"fever"}"#).as_deref(), Some("fever"));
    assert_eq!(user_input(br#"{"userInput":42}"#), None);
    assert_eq!(user_input(br#"{"other":"fever"}"#), None);
    assert_eq!(user_input(b"not json"), None);
    assert_eq!(user_input(b""), None);
}

#[test]
fn gate_errors_map_to_statuses() {
    assert_eq!(status_for(&GateError::Validation(SanitizeError::InvalidType)), StatusCode::BAD_REQUEST);
    assert_eq!(
        status_for(&GateError::QuotaExhausted("full".to_string())),
        StatusCode::TOO_MANY_REQUESTS
    );
    assert_eq!(status_for(&GateError::UpstreamAuthFailure), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status_for(&GateError::UpstreamOther), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        status_for(&GateError::Ledger(QuotaError::Unavailable("poisoned".to_string()))),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn report_only_switches_header_name() {
    let policy = PolicySection {
        report_only: true,
        report_uri: Some("/csp".to_string()),
        ..PolicySection::default()
    };
    let header = PolicyHeader::from_config(&policy, true).unwrap();
    assert_eq!(header.name.as_str(), "content-security-policy-report-only");
    let value = header.value.to_str().unwrap();
    assert!(value.ends_with("upgrade-insecure-requests; report-uri /csp"));
}
