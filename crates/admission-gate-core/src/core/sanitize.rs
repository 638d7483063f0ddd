// admission-gate-core/src/core/sanitize.rs
// ============================================================================
// Module: Input Sanitizer
// Description: Validation and cleaning of untrusted submitted text.
// Purpose: Reject malformed or abusive input before it reaches the gate.
// Dependencies: regex, serde, thiserror
// ============================================================================

//! ## Overview
//! [`InputSanitizer::sanitize`] is a pure function of the submitted text and a
//! [`SanitizeConstraints`] record. The pipeline is fixed:
//!
//! 1. absent input fails with [`SanitizeErrorKind::InvalidType`],
//! 2. the text is trimmed and length-checked in characters,
//! 3. a markup probe rejects active markup before anything is stripped,
//! 4. when markup is disallowed, tag-like spans are stripped and then the HTML
//!    significant characters are escaped,
//! 5. an optional character class must match the whole escaped string,
//! 6. the escaped text is scanned against the content denylist,
//! 7. whitespace runs collapse to a single space.
//!
//! Stripping must precede escaping. Escaping first would turn `&lt;b&gt;`
//! style entities into text the stripper cannot see.
//!
//! Security posture: the denylist is a best-effort layer. Output encoding at
//! render time remains the primary defense; never relax step 4 on the
//! assumption that step 6 catches everything.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default minimum trimmed length for submitted text.
pub const DEFAULT_MIN_LENGTH: usize = 3;
/// Default maximum trimmed length for submitted text.
pub const DEFAULT_MAX_LENGTH: usize = 2_000;

/// Tag-like spans removed when markup is disallowed.
const TAG_SPAN_PATTERN: &str = r"<[^>]*>";
/// Whitespace runs collapsed on success.
const WHITESPACE_PATTERN: &str = r"\s+";
/// Active markup openers checked against the trimmed, unstripped text.
const MARKUP_PROBE_PATTERN: &str =
    r"(?i)<script|javascript:|<iframe|<object|<embed|data:text/html|<[^>]*\bon[a-z]+\s*=";
/// SQL keyword family. Word boundaries are ASCII-only, so a keyword glued to
/// a non-ASCII letter still matches.
const SQL_KEYWORD_PATTERN: &str =
    r"(?i)(?-u:\b)(select|insert|update|delete|drop|create|alter|exec|execute)(?-u:\b)";
/// Script and event-handler keyword family, with ASCII-only word boundaries.
const SCRIPT_KEYWORD_PATTERN: &str =
    r"(?i)(?-u:\b)(script|javascript|onerror|onload|onclick)(?-u:\b)";
/// Pseudo-URL scheme family.
const PSEUDO_URL_PATTERN: &str = r"(?i)(javascript:|data:|vbscript:)";
/// Embed-like tag fragment family.
const EMBED_TAG_PATTERN: &str = r"(?i)(<iframe|<object|<embed)";

// ============================================================================
// SECTION: Constraints
// ============================================================================

/// Allowed character class, compiled once into an anchored matcher.
///
/// # Invariants
/// - The matcher is always `^[<class>]+$`.
#[derive(Debug, Clone)]
pub struct CharacterClass {
    /// Class body as configured (without brackets).
    source: String,
    /// Anchored whole-string matcher.
    matcher: Regex,
}

impl CharacterClass {
    /// Compiles a character class body such as `a-zA-Z0-9 .,`.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizerBuildError::InvalidPattern`] when the class does not
    /// compile.
    pub fn new(class: &str) -> Result<Self, SanitizerBuildError> {
        if class.is_empty() {
            return Err(SanitizerBuildError::InvalidPattern(
                "character class must be non-empty".to_string(),
            ));
        }
        let matcher = Regex::new(&format!("^[{class}]+$"))
            .map_err(|err| SanitizerBuildError::InvalidPattern(err.to_string()))?;
        Ok(Self {
            source: class.to_string(),
            matcher,
        })
    }

    /// Returns the configured class body.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true when every character of `text` is in the class.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

/// Constraints applied to one sanitize call.
#[derive(Debug, Clone)]
pub struct SanitizeConstraints {
    /// Minimum trimmed length in characters.
    pub min_length: usize,
    /// Maximum trimmed length in characters.
    pub max_length: usize,
    /// Keep markup as-is instead of stripping and escaping it.
    pub allow_markup: bool,
    /// Optional whole-string character class.
    pub allowed_chars: Option<CharacterClass>,
}

impl Default for SanitizeConstraints {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            max_length: DEFAULT_MAX_LENGTH,
            allow_markup: false,
            allowed_chars: None,
        }
    }
}

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Stable labels for sanitizer rejections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitizeErrorKind {
    /// Input absent or not text.
    InvalidType,
    /// Trimmed input below the minimum length.
    TooShort,
    /// Trimmed input above the maximum length.
    TooLong,
    /// Escaped input outside the allowed character class.
    DisallowedCharacters,
    /// Input matched the markup probe or the content denylist.
    DisallowedContent,
}

impl SanitizeErrorKind {
    /// Returns the audit label for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidType => "invalid_type",
            Self::TooShort => "too_short",
            Self::TooLong => "too_long",
            Self::DisallowedCharacters => "disallowed_characters",
            Self::DisallowedContent => "disallowed_content",
        }
    }
}

impl fmt::Display for SanitizeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern family that caused a content rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFamily {
    /// Active markup found before stripping.
    ActiveMarkup,
    /// SQL keyword.
    SqlKeyword,
    /// Script or event-handler keyword.
    ScriptKeyword,
    /// `javascript:`, `data:`, or `vbscript:` scheme.
    PseudoUrl,
    /// `<iframe`, `<object`, or `<embed` fragment.
    EmbedTag,
}

/// Sanitizer rejection. Display strings are safe to show to end users and
/// never echo the submitted content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    /// Input absent or not text.
    #[error("invalid input: input must be text")]
    InvalidType,
    /// Trimmed input below the minimum length.
    #[error("input too short: at least {min} characters required")]
    TooShort {
        /// Configured minimum length.
        min: usize,
    },
    /// Trimmed input above the maximum length.
    #[error("input too long: at most {max} characters allowed")]
    TooLong {
        /// Configured maximum length.
        max: usize,
    },
    /// Escaped input outside the allowed character class.
    #[error("input contains characters that are not allowed")]
    DisallowedCharacters,
    /// Input matched the markup probe or the content denylist.
    #[error("input contains content that is not allowed")]
    DisallowedContent {
        /// Matching pattern family.
        family: ContentFamily,
    },
}

impl SanitizeError {
    /// Returns the stable kind label for this rejection.
    #[must_use]
    pub const fn kind(&self) -> SanitizeErrorKind {
        match self {
            Self::InvalidType => SanitizeErrorKind::InvalidType,
            Self::TooShort {
                ..
            } => SanitizeErrorKind::TooShort,
            Self::TooLong {
                ..
            } => SanitizeErrorKind::TooLong,
            Self::DisallowedCharacters => SanitizeErrorKind::DisallowedCharacters,
            Self::DisallowedContent {
                ..
            } => SanitizeErrorKind::DisallowedContent,
        }
    }

    /// Returns the matching pattern family for content rejections.
    #[must_use]
    pub const fn family(&self) -> Option<ContentFamily> {
        match self {
            Self::DisallowedContent {
                family,
            } => Some(*family),
            _ => None,
        }
    }
}

/// Errors raised while building a sanitizer or character class.
#[derive(Debug, Error)]
pub enum SanitizerBuildError {
    /// A pattern failed to compile.
    #[error("invalid sanitizer pattern: {0}")]
    InvalidPattern(String),
}

/// Cleaned text that passed every sanitizer check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SanitizedInput(String);

impl SanitizedInput {
    /// Returns the cleaned text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the cleaned text.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Flat verdict view of a sanitize call, used by diagnostics output.
///
/// # Invariants
/// - `sanitized` is empty whenever `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// Whether the input passed.
    pub valid: bool,
    /// Cleaned text on success, empty otherwise.
    pub sanitized: String,
    /// Rejection kind on failure.
    pub error_kind: Option<SanitizeErrorKind>,
    /// User-facing rejection message on failure.
    pub error: Option<String>,
}

impl From<Result<SanitizedInput, SanitizeError>> for ValidationResult {
    fn from(result: Result<SanitizedInput, SanitizeError>) -> Self {
        match result {
            Ok(input) => Self {
                valid: true,
                sanitized: input.into_string(),
                error_kind: None,
                error: None,
            },
            Err(err) => Self {
                valid: false,
                sanitized: String::new(),
                error_kind: Some(err.kind()),
                error: Some(err.to_string()),
            },
        }
    }
}

// ============================================================================
// SECTION: Sanitizer
// ============================================================================

/// Compiled denylist pattern.
#[derive(Debug, Clone)]
struct DenyPattern {
    /// Family reported on match.
    family: ContentFamily,
    /// Case-insensitive matcher.
    matcher: Regex,
}

/// Input sanitizer with its pattern set compiled once.
#[derive(Debug, Clone)]
pub struct InputSanitizer {
    /// Tag-like span stripper.
    tag_span: Regex,
    /// Whitespace run matcher.
    whitespace: Regex,
    /// Active markup probe.
    markup_probe: Regex,
    /// Content denylist, scanned in order.
    denylist: Vec<DenyPattern>,
}

impl InputSanitizer {
    /// Compiles the built-in pattern set.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizerBuildError::InvalidPattern`] when a built-in pattern
    /// fails to compile.
    pub fn new() -> Result<Self, SanitizerBuildError> {
        let denylist = [
            (ContentFamily::SqlKeyword, SQL_KEYWORD_PATTERN),
            (ContentFamily::ScriptKeyword, SCRIPT_KEYWORD_PATTERN),
            (ContentFamily::PseudoUrl, PSEUDO_URL_PATTERN),
            (ContentFamily::EmbedTag, EMBED_TAG_PATTERN),
        ]
        .into_iter()
        .map(|(family, pattern)| {
            compile(pattern).map(|matcher| DenyPattern {
                family,
                matcher,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tag_span: compile(TAG_SPAN_PATTERN)?,
            whitespace: compile(WHITESPACE_PATTERN)?,
            markup_probe: compile(MARKUP_PROBE_PATTERN)?,
            denylist,
        })
    }

    /// Validates and cleans submitted text.
    ///
    /// `None` stands for an absent or non-text field.
    ///
    /// # Errors
    ///
    /// Returns [`SanitizeError`] describing the first failed check.
    pub fn sanitize(
        &self,
        input: Option<&str>,
        constraints: &SanitizeConstraints,
    ) -> Result<SanitizedInput, SanitizeError> {
        let Some(raw) = input else {
            return Err(SanitizeError::InvalidType);
        };
        let trimmed = raw.trim();
        let length = trimmed.chars().count();
        if length < constraints.min_length {
            return Err(SanitizeError::TooShort {
                min: constraints.min_length,
            });
        }
        if length > constraints.max_length {
            return Err(SanitizeError::TooLong {
                max: constraints.max_length,
            });
        }
        if self.markup_probe.is_match(trimmed) {
            return Err(SanitizeError::DisallowedContent {
                family: ContentFamily::ActiveMarkup,
            });
        }

        let cleaned = if constraints.allow_markup {
            trimmed.to_string()
        } else {
            let stripped = self.tag_span.replace_all(trimmed, "");
            escape_html(&stripped)
        };

        if let Some(class) = &constraints.allowed_chars
            && !class.matches(&cleaned)
        {
            return Err(SanitizeError::DisallowedCharacters);
        }

        if let Some(family) = self.scan_denylist(&cleaned) {
            return Err(SanitizeError::DisallowedContent {
                family,
            });
        }

        let collapsed = self.whitespace.replace_all(&cleaned, " ");
        Ok(SanitizedInput(collapsed.into_owned()))
    }

    /// Runs [`Self::sanitize`] and flattens the outcome.
    #[must_use]
    pub fn validate(
        &self,
        input: Option<&str>,
        constraints: &SanitizeConstraints,
    ) -> ValidationResult {
        ValidationResult::from(self.sanitize(input, constraints))
    }

    /// Returns the first denylist family matching the text.
    fn scan_denylist(&self, text: &str) -> Option<ContentFamily> {
        self.denylist
            .iter()
            .find(|pattern| pattern.matcher.is_match(text))
            .map(|pattern| pattern.family)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Compiles a built-in pattern.
fn compile(pattern: &str) -> Result<Regex, SanitizerBuildError> {
    Regex::new(pattern).map_err(|err| SanitizerBuildError::InvalidPattern(err.to_string()))
}

/// Escapes `&`, `<`, `>`, `"`, `'`, and `/`.
///
/// Equivalent to replacing each character in that order: `&` is handled first
/// and no replacement introduces a character escaped later.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
