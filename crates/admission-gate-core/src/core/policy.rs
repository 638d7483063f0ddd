// admission-gate-core/src/core/policy.rs
// ============================================================================
// Module: Policy Director
// Description: Content-Security-Policy directive builder.
// Purpose: Constrain what delivered pages may execute or load.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`build_policy`] turns a small configuration record plus the production
//! switch into an ordered list of CSP directives. The fixed directive order is
//! `default-src`, `script-src`, `style-src`, `font-src`, `img-src`,
//! `connect-src`, `object-src`, `base-uri`, `form-action`, `frame-ancestors`,
//! followed by the conditional `upgrade-insecure-requests` and `report-uri`.
//! Each directive name appears at most once. There is no state and no I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Enforcing policy header name.
pub const CSP_HEADER: &str = "content-security-policy";
/// Report-only policy header name.
pub const CSP_REPORT_ONLY_HEADER: &str = "content-security-policy-report-only";

/// Separator between directives in the header value.
const DIRECTIVE_SEPARATOR: &str = "; ";

/// Fallback directive name.
const DEFAULT_SRC: &str = "default-src";
/// Script directive name.
const SCRIPT_SRC: &str = "script-src";
/// Style directive name.
const STYLE_SRC: &str = "style-src";
/// Font directive name.
const FONT_SRC: &str = "font-src";
/// Image directive name.
const IMG_SRC: &str = "img-src";
/// Fetch/XHR/WebSocket directive name.
const CONNECT_SRC: &str = "connect-src";
/// Plugin directive name.
const OBJECT_SRC: &str = "object-src";
/// `<base>` directive name.
const BASE_URI: &str = "base-uri";
/// Form target directive name.
const FORM_ACTION: &str = "form-action";
/// Embedding directive name.
const FRAME_ANCESTORS: &str = "frame-ancestors";
/// Transport upgrade directive name.
const UPGRADE_INSECURE_REQUESTS: &str = "upgrade-insecure-requests";
/// Violation report directive name.
const REPORT_URI: &str = "report-uri";

/// Same-origin source.
const SELF_SOURCE: &str = "'self'";
/// Deny-all source.
const NONE_SOURCE: &str = "'none'";
/// `data:` URL source.
const DATA_SOURCE: &str = "data:";
/// Inline-allowance token for scripts and styles.
pub const UNSAFE_INLINE_SOURCE: &str = "'unsafe-inline'";
/// Eval-allowance token for scripts.
pub const UNSAFE_EVAL_SOURCE: &str = "'unsafe-eval'";

/// Stylesheet origins for hosted fonts and icons.
const STYLE_ORIGINS: [&str; 2] = ["https://fonts.googleapis.com", "https://use.fontawesome.com"];
/// Font file origin.
const FONT_ORIGIN: &str = "https://fonts.gstatic.com";
/// Backend origin allowed for fetches during local development.
pub const LOCAL_DEV_CONNECT_ORIGIN: &str = "http://localhost:3000";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configurable parts of the policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Allow inline `<style>` and `style=` attributes.
    #[serde(default = "default_true")]
    pub allow_inline_style: bool,
    /// Allow inline `<script>` blocks and handlers.
    #[serde(default = "default_true")]
    pub allow_inline_script: bool,
    /// Allow `eval` and friends.
    #[serde(default)]
    pub allow_eval: bool,
    /// Violation report endpoint, appended last when present. Values holding
    /// `;` or whitespace are dropped.
    #[serde(default)]
    pub report_uri: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            allow_inline_style: true,
            allow_inline_script: true,
            allow_eval: false,
            report_uri: None,
        }
    }
}

/// Serde default helper.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// One named directive and its sources.
struct Directive {
    /// Directive name.
    name: &'static str,
    /// Source expressions, possibly empty.
    sources: Vec<String>,
}

impl Directive {
    /// Creates a directive from static sources.
    fn fixed(name: &'static str, sources: &[&str]) -> Self {
        Self {
            name,
            sources: sources.iter().map(|source| (*source).to_string()).collect(),
        }
    }

    /// Renders `name src1 src2 ...`.
    fn render(&self) -> String {
        if self.sources.is_empty() {
            return self.name.to_string();
        }
        format!("{} {}", self.name, self.sources.join(" "))
    }
}

/// Builds the ordered directive list.
#[must_use]
pub fn build_policy(config: &PolicyConfig, is_production: bool) -> Vec<String> {
    let mut directives = Vec::with_capacity(12);
    directives.push(Directive::fixed(DEFAULT_SRC, &[SELF_SOURCE]));

    let mut script = Directive::fixed(SCRIPT_SRC, &[SELF_SOURCE]);
    if config.allow_inline_script {
        script.sources.push(UNSAFE_INLINE_SOURCE.to_string());
    }
    if config.allow_eval {
        script.sources.push(UNSAFE_EVAL_SOURCE.to_string());
    }
    directives.push(script);

    let mut style = Directive::fixed(STYLE_SRC, &[SELF_SOURCE]);
    style.sources.extend(STYLE_ORIGINS.iter().map(|origin| (*origin).to_string()));
    if config.allow_inline_style {
        style.sources.push(UNSAFE_INLINE_SOURCE.to_string());
    }
    directives.push(style);

    directives.push(Directive::fixed(FONT_SRC, &[SELF_SOURCE, FONT_ORIGIN, DATA_SOURCE]));
    directives.push(Directive::fixed(IMG_SRC, &[SELF_SOURCE, DATA_SOURCE]));

    let mut connect = Directive::fixed(CONNECT_SRC, &[SELF_SOURCE]);
    if !is_production {
        connect.sources.push(LOCAL_DEV_CONNECT_ORIGIN.to_string());
    }
    directives.push(connect);

    directives.push(Directive::fixed(OBJECT_SRC, &[NONE_SOURCE]));
    directives.push(Directive::fixed(BASE_URI, &[SELF_SOURCE]));
    directives.push(Directive::fixed(FORM_ACTION, &[SELF_SOURCE]));
    directives.push(Directive::fixed(FRAME_ANCESTORS, &[NONE_SOURCE]));

    if is_production {
        directives.push(Directive::fixed(UPGRADE_INSECURE_REQUESTS, &[]));
    }
    let report_uri = config.report_uri.as_deref().map(str::trim);
    if let Some(uri) = report_uri.filter(|uri| is_single_source(uri)) {
        directives.push(Directive::fixed(REPORT_URI, &[uri]));
    }

    directives.iter().map(Directive::render).collect()
}

/// Returns true when `source` is one non-empty token that cannot open a
/// second directive.
fn is_single_source(source: &str) -> bool {
    !source.is_empty() && !source.contains(';') && !source.contains(char::is_whitespace)
}

/// Joins a directive list into a single header value.
#[must_use]
pub fn policy_header_value(directives: &[String]) -> String {
    directives.join(DIRECTIVE_SEPARATOR)
}

/// Returns the header name for enforcing or report-only delivery.
#[must_use]
pub const fn policy_header_name(report_only: bool) -> &'static str {
    if report_only { CSP_REPORT_ONLY_HEADER } else { CSP_HEADER }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
