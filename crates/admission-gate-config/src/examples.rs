// admission-gate-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical `admission-gate.toml` with every section spelled out at its
//! default value. Optional keys are present as comments.

/// Returns a canonical example `admission-gate.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "127.0.0.1:3000"
production = false
max_body_bytes = 65536

[sanitizer]
min_length = 3
max_length = 2000
allow_markup = false
# allowed_chars = "a-zA-Z0-9 .,!?"

[quota]
daily_limit = 50
# per_key_limit = 10

[policy]
allow_inline_style = true
allow_inline_script = true
allow_eval = false
report_only = false
# report_uri = "/api/csp-report"

[completion]
base_url = "https://api.openai.com/v1"
model = "gpt-4"
temperature = 0.7
api_key_env = "OPENAI_API_KEY"
connect_timeout_ms = 2000
request_timeout_ms = 30000

[audit]
enabled = true
# path = "admission-gate-audit.jsonl"
"#,
    )
}
