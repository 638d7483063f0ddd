//! Section validation tests for admission-gate-config.
// admission-gate-config/tests/section_validation.rs
// =============================================================================
// Module: Config Section Validation Tests
// Description: Per-section fail-closed validation rules.
// Purpose: Ensure each out-of-range or inconsistent value is rejected.
// =============================================================================

use admission_gate_config::GateConfig;

type TestResult = Result<(), String>;

fn assert_rejected(toml: &str, needle: &str) -> TestResult {
    match GateConfig::from_toml_str(toml) {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err(format!("expected rejection for:\n{toml}")),
    }
}

fn assert_accepted(toml: &str) -> TestResult {
    GateConfig::from_toml_str(toml).map(|_| ()).map_err(|err| err.to_string())
}

// ============================================================================
// SECTION: Server
// ============================================================================

#[test]
fn server_rejects_zero_body_limit() -> TestResult {
    assert_rejected("[server]\nmax_body_bytes = 0\n", "max_body_bytes")
}

#[test]
fn server_rejects_bad_bind() -> TestResult {
    assert_rejected("[server]\nbind = \"localhost\"\n", "invalid bind address")
}

#[test]
fn server_accepts_ipv6_bind() -> TestResult {
    assert_accepted("[server]\nbind = \"[::1]:8080\"\n")
}

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

#[test]
fn sanitizer_rejects_zero_min() -> TestResult {
    assert_rejected("[sanitizer]\nmin_length = 0\n", "sanitizer.min_length")
}

#[test]
fn sanitizer_rejects_inverted_bounds() -> TestResult {
    assert_rejected("[sanitizer]\nmin_length = 10\nmax_length = 5\n", "must not exceed")
}

#[test]
fn sanitizer_rejects_huge_max() -> TestResult {
    assert_rejected("[sanitizer]\nmax_length = 100001\n", "sanitizer.max_length")
}

#[test]
fn sanitizer_rejects_broken_character_class() -> TestResult {
    assert_rejected("[sanitizer]\nallowed_chars = \"z-a\"\n", "sanitizer.allowed_chars")
}

// ============================================================================
// SECTION: Quota
// ============================================================================

#[test]
fn quota_rejects_zero_daily_limit() -> TestResult {
    assert_rejected("[quota]\ndaily_limit = 0\n", "quota.daily_limit")
}

#[test]
fn quota_rejects_excessive_daily_limit() -> TestResult {
    assert_rejected("[quota]\ndaily_limit = 1000001\n", "quota.daily_limit")
}

#[test]
fn quota_rejects_per_key_above_global() -> TestResult {
    assert_rejected("[quota]\ndaily_limit = 5\nper_key_limit = 6\n", "quota.per_key_limit")
}

#[test]
fn quota_rejects_zero_per_key() -> TestResult {
    assert_rejected("[quota]\nper_key_limit = 0\n", "quota.per_key_limit")
}

// ============================================================================
// SECTION: Policy
// ============================================================================

#[test]
fn policy_rejects_report_uri_with_separator() -> TestResult {
    assert_rejected("[policy]\nreport_uri = \"/csp; script-src *\"\n", "policy.report_uri")
}

#[test]
fn policy_rejects_blank_report_uri() -> TestResult {
    assert_rejected("[policy]\nreport_uri = \"  \"\n", "policy.report_uri")
}

#[test]
fn policy_accepts_report_only() -> TestResult {
    assert_accepted("[policy]\nreport_only = true\nreport_uri = \"https://r.example/csp\"\n")
}

// ============================================================================
// SECTION: Completion
// ============================================================================

#[test]
fn completion_rejects_temperature_out_of_range() -> TestResult {
    assert_rejected("[completion]\ntemperature = 2.5\n", "completion.temperature")?;
    assert_rejected("[completion]\ntemperature = -0.1\n", "completion.temperature")
}

#[test]
fn completion_rejects_empty_model() -> TestResult {
    assert_rejected("[completion]\nmodel = \" \"\n", "completion.model")
}

#[test]
fn completion_rejects_schemeless_base_url() -> TestResult {
    assert_rejected("[completion]\nbase_url = \"api.openai.com\"\n", "completion.base_url")
}

#[test]
fn completion_rejects_timeouts_out_of_range() -> TestResult {
    assert_rejected("[completion]\nconnect_timeout_ms = 0\n", "completion.connect_timeout_ms")?;
    assert_rejected("[completion]\nrequest_timeout_ms = 999999\n", "completion.request_timeout_ms")
}

#[test]
fn completion_rejects_blank_key_env() -> TestResult {
    assert_rejected("[completion]\napi_key_env = \"\"\n", "completion.api_key_env")
}

// ============================================================================
// SECTION: Audit
// ============================================================================

#[test]
fn audit_rejects_empty_path() -> TestResult {
    assert_rejected("[audit]\npath = \"\"\n", "audit.path")
}
