// admission-gate-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for config loading and offline command helpers.
// Purpose: Ensure the CLI renders the same policy and verdicts as the server.
// Dependencies: admission-gate-cli main helpers
// ============================================================================

//! ## Overview
//! Exercises `load_config`, `render_policy`, and `sanitize_verdict`, and
//! checks the clap definition for consistency.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::PathBuf;

use admission_gate_config::GateConfig;
use admission_gate_core::SanitizeErrorKind;
use clap::CommandFactory;
use clap::Parser;

use super::Cli;
use super::Commands;
use super::ConfigCommand;
use super::load_config;
use super::render_policy;
use super::sanitize_verdict;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("admission-gate.toml");
    fs::write(&path, body).unwrap();
    path
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn clap_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn nested_config_commands_parse() {
    let cli = Cli::try_parse_from(["admission-gate", "config", "example"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommand::Example
        })
    ));
    let cli = Cli::try_parse_from(["admission-gate", "config", "check", "--config", "gate.toml"])
        .unwrap();
    match cli.command {
        Some(Commands::Config {
            command: ConfigCommand::Check(check),
        }) => assert_eq!(check.config, Some(PathBuf::from("gate.toml"))),
        _ => panic!("expected config check"),
    }
}

#[test]
fn production_flag_only_switches_production_on() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[server]\nproduction = false\n");
    assert!(load_config(Some(&path), true).unwrap().server.production);

    let path = write_config(&dir, "[server]\nproduction = true\n");
    assert!(load_config(Some(&path), false).unwrap().server.production);
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(Some(&dir.path().join("absent.toml")), false).unwrap_err();
    assert!(err.to_string().starts_with("config load failed"));
}

#[test]
fn policy_rendering_follows_mode_and_delivery() {
    let mut config = GateConfig::default();
    let dev = render_policy(&config, false);
    assert!(dev.starts_with("default-src 'self'"));
    assert!(dev.contains("http://localhost:3000"));

    config.server.production = true;
    config.policy.report_only = true;
    let prod = render_policy(&config, true);
    assert!(prod.starts_with("content-security-policy-report-only: default-src 'self'"));
    assert!(prod.ends_with("upgrade-insecure-requests"));
    assert!(!prod.contains("localhost"));
}

#[test]
fn sanitize_verdict_uses_configured_bounds() {
    let mut config = GateConfig::default();
    config.sanitizer.min_length = 10;
    let verdict = sanitize_verdict(&config, "cough").unwrap();
    assert!(!verdict.valid);
    assert_eq!(verdict.error_kind, Some(SanitizeErrorKind::TooShort));
    assert!(verdict.sanitized.is_empty());

    let verdict = sanitize_verdict(&config, "  dry   cough at night  ").unwrap();
    assert!(verdict.valid);
    assert_eq!(verdict.sanitized, "dry cough at night");
    assert_eq!(verdict.error, None);
}
