// admission-gate-config/src/config.rs
// ============================================================================
// Module: Admission Gate Configuration
// Description: Configuration loading and validation for the admission gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: admission-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file resolved from an explicit path,
//! then `ADMISSION_GATE_CONFIG`, then `admission-gate.toml` in the working
//! directory. Every section has defaults, so an empty file is a valid config.
//! Missing or invalid configuration fails closed.
//!
//! Security posture: config inputs are untrusted. The completion API key is
//! never stored in the file; only the name of the environment variable that
//! carries it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use admission_gate_core::CharacterClass;
use admission_gate_core::PolicyConfig;
use admission_gate_core::QuotaLimits;
use admission_gate_core::SanitizeConstraints;
use admission_gate_core::runtime::quota::DEFAULT_DAILY_LIMIT;
use admission_gate_core::sanitize::DEFAULT_MAX_LENGTH;
use admission_gate_core::sanitize::DEFAULT_MIN_LENGTH;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "admission-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "ADMISSION_GATE_CONFIG";
/// Environment variable used to override `server.production`.
pub const PRODUCTION_ENV_VAR: &str = "ADMISSION_GATE_PRODUCTION";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Default listen address.
const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// Default request body ceiling in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;
/// Upper bound for `sanitizer.max_length`.
pub(crate) const MAX_SANITIZER_LENGTH: usize = 100_000;
/// Upper bound for `quota.daily_limit`.
pub(crate) const MAX_DAILY_LIMIT: u32 = 1_000_000;

/// Default completion endpoint base.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Default completion model.
const DEFAULT_MODEL: &str = "gpt-4";
/// Default sampling temperature.
const DEFAULT_TEMPERATURE: f64 = 0.7;
/// Highest accepted sampling temperature.
const MAX_TEMPERATURE: f64 = 2.0;
/// Default environment variable carrying the API key.
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;
/// Default whole-request timeout.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
/// Connect timeout bounds.
const CONNECT_TIMEOUT_RANGE_MS: (u64, u64) = (100, 60_000);
/// Request timeout bounds.
const REQUEST_TIMEOUT_RANGE_MS: (u64, u64) = (1_000, 300_000);

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Admission gate configuration root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Input sanitizer bounds.
    #[serde(default)]
    pub sanitizer: SanitizerConfig,
    /// Shared quota ceilings.
    #[serde(default)]
    pub quota: QuotaConfig,
    /// Content-Security-Policy settings.
    #[serde(default)]
    pub policy: PolicySection,
    /// Downstream completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,
    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl GateConfig {
    /// Loads configuration from disk using the default resolution rules and
    /// applies the production override from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.apply_production_override(env::var(PRODUCTION_ENV_VAR).ok().as_deref())?;
        Ok(config)
    }

    /// Parses and validates configuration text without touching the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.sanitizer.validate()?;
        self.quota.validate()?;
        self.policy.validate()?;
        self.completion.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    /// Applies an `ADMISSION_GATE_PRODUCTION` value, when present.
    ///
    /// Accepts `1`, `true`, `0`, and `false` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any other value.
    pub fn apply_production_override(&mut self, value: Option<&str>) -> Result<(), ConfigError> {
        let Some(raw) = value else {
            return Ok(());
        };
        self.server.production = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" => true,
            "0" | "false" => false,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "{PRODUCTION_ENV_VAR} must be true, false, 1, or 0"
                )));
            }
        };
        Ok(())
    }

    /// Builds the sanitizer constraint record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the character class fails to
    /// compile.
    pub fn sanitize_constraints(&self) -> Result<SanitizeConstraints, ConfigError> {
        self.sanitizer.constraints()
    }

    /// Builds the quota ceilings.
    #[must_use]
    pub const fn quota_limits(&self) -> QuotaLimits {
        QuotaLimits {
            daily_limit: self.quota.daily_limit,
            per_key_limit: self.quota.per_key_limit,
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Production switch; tightens the content policy.
    #[serde(default)]
    pub production: bool,
    /// Maximum accepted request body size.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            production: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Parses the bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates listener configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

/// Sanitizer bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizerConfig {
    /// Minimum trimmed length in characters.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Maximum trimmed length in characters.
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Keep markup instead of stripping and escaping it.
    #[serde(default)]
    pub allow_markup: bool,
    /// Optional character class body, e.g. `a-zA-Z0-9 `.
    #[serde(default)]
    pub allowed_chars: Option<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            allow_markup: false,
            allowed_chars: None,
        }
    }
}

impl SanitizerConfig {
    /// Builds the core constraint record.
    fn constraints(&self) -> Result<SanitizeConstraints, ConfigError> {
        let allowed_chars = self
            .allowed_chars
            .as_deref()
            .map(CharacterClass::new)
            .transpose()
            .map_err(|err| ConfigError::Invalid(format!("sanitizer.allowed_chars: {err}")))?;
        Ok(SanitizeConstraints {
            min_length: self.min_length,
            max_length: self.max_length,
            allow_markup: self.allow_markup,
            allowed_chars,
        })
    }

    /// Validates sanitizer bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_length == 0 {
            return Err(ConfigError::Invalid(
                "sanitizer.min_length must be greater than zero".to_string(),
            ));
        }
        if self.min_length > self.max_length {
            return Err(ConfigError::Invalid(
                "sanitizer.min_length must not exceed sanitizer.max_length".to_string(),
            ));
        }
        if self.max_length > MAX_SANITIZER_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "sanitizer.max_length must be at most {MAX_SANITIZER_LENGTH}"
            )));
        }
        self.constraints()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Quota
// ============================================================================

/// Quota ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Global requests per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    /// Optional requests per requester per UTC day.
    #[serde(default)]
    pub per_key_limit: Option<u32>,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: DEFAULT_DAILY_LIMIT,
            per_key_limit: None,
        }
    }
}

impl QuotaConfig {
    /// Validates quota ceilings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.daily_limit == 0 || self.daily_limit > MAX_DAILY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "quota.daily_limit must be between 1 and {MAX_DAILY_LIMIT}"
            )));
        }
        if let Some(per_key) = self.per_key_limit
            && (per_key == 0 || per_key > self.daily_limit)
        {
            return Err(ConfigError::Invalid(
                "quota.per_key_limit must be between 1 and quota.daily_limit".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Policy
// ============================================================================

/// Content-Security-Policy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySection {
    /// Allow inline styles.
    #[serde(default = "default_true")]
    pub allow_inline_style: bool,
    /// Allow inline scripts.
    #[serde(default = "default_true")]
    pub allow_inline_script: bool,
    /// Allow `eval`.
    #[serde(default)]
    pub allow_eval: bool,
    /// Deliver the policy with the report-only header.
    #[serde(default)]
    pub report_only: bool,
    /// Violation report endpoint.
    #[serde(default)]
    pub report_uri: Option<String>,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            allow_inline_style: true,
            allow_inline_script: true,
            allow_eval: false,
            report_only: false,
            report_uri: None,
        }
    }
}

impl PolicySection {
    /// Returns the directive-level configuration for the policy director.
    #[must_use]
    pub fn directives(&self) -> PolicyConfig {
        PolicyConfig {
            allow_inline_style: self.allow_inline_style,
            allow_inline_script: self.allow_inline_script,
            allow_eval: self.allow_eval,
            report_uri: self.report_uri.clone(),
        }
    }

    /// Validates policy settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(uri) = &self.report_uri {
            if uri.trim().is_empty() {
                return Err(ConfigError::Invalid("policy.report_uri must not be empty".to_string()));
            }
            if uri.contains(';') || uri.chars().any(char::is_whitespace) {
                return Err(ConfigError::Invalid(
                    "policy.report_uri must not contain ';' or whitespace".to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Completion
// ============================================================================

/// Downstream completion service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// API base URL; `/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Environment variable holding the bearer key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: default_api_key_env(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
        }
    }
}

impl CompletionConfig {
    /// Reads the API key from the configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the variable is unset or blank.
    pub fn api_key(&self) -> Result<String, ConfigError> {
        match env::var(&self.api_key_env) {
            Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
            _ => Err(ConfigError::Invalid(format!(
                "completion api key missing: set {}",
                self.api_key_env
            ))),
        }
    }

    /// Validates completion settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let base = self.base_url.trim();
        if !(base.starts_with("https://") || base.starts_with("http://")) {
            return Err(ConfigError::Invalid(
                "completion.base_url must include http:// or https://".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("completion.model must be set".to_string()));
        }
        if !(0.0 ..= MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "completion.temperature must be between 0 and {MAX_TEMPERATURE}"
            )));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid("completion.api_key_env must be set".to_string()));
        }
        check_range(
            "completion.connect_timeout_ms",
            self.connect_timeout_ms,
            CONNECT_TIMEOUT_RANGE_MS,
        )?;
        check_range(
            "completion.request_timeout_ms",
            self.request_timeout_ms,
            REQUEST_TIMEOUT_RANGE_MS,
        )?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit log settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Optional JSON-lines file; stderr when absent.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
        }
    }
}

impl AuditConfig {
    /// Validates audit settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid("audit.path must not be empty".to_string()));
            }
            validate_path(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Rejects values outside an inclusive range.
fn check_range(field: &str, value: u64, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Serde default for `server.bind`.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Serde default for `server.max_body_bytes`.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Serde default for `sanitizer.min_length`.
const fn default_min_length() -> usize {
    DEFAULT_MIN_LENGTH
}

/// Serde default for `sanitizer.max_length`.
const fn default_max_length() -> usize {
    DEFAULT_MAX_LENGTH
}

/// Serde default for `quota.daily_limit`.
const fn default_daily_limit() -> u32 {
    DEFAULT_DAILY_LIMIT
}

/// Serde default for boolean flags that start enabled.
const fn default_true() -> bool {
    true
}

/// Serde default for `completion.base_url`.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Serde default for `completion.model`.
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Serde default for `completion.temperature`.
const fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Serde default for `completion.api_key_env`.
fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

/// Serde default for `completion.connect_timeout_ms`.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Serde default for `completion.request_timeout_ms`.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

// ============================================================================
// SECTION: Tests
// ============================================================================
