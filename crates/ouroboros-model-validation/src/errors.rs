//! Validation messages and error types
//!
//! Validation failures are data: they are collected as [`Message`] values and
//! returned next to the validated model. Mistakes made while declaring models
//! or rules are contract violations and surface as [`DescriptorError`],
//! [`RuleError`] or [`ValidatorError`].

use std::fmt;
use thiserror::Error;

// ============================================================================
// Validator Result
// ============================================================================

/// Result type for validator entry points
pub type ValidatorResult<T> = Result<T, ValidatorError>;

// ============================================================================
// Severity
// ============================================================================

/// Ordered classification of a validation message
///
/// `None` is the floor: a message with `None` severity is not a failure and is
/// never kept in a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    /// Not a failure
    #[default]
    None,
    /// Informational
    Info,
    /// Suspicious but acceptable
    Warning,
    /// Invalid
    Error,
}

impl Severity {
    /// Whether a message with this severity counts as a failure
    pub fn is_failure(self) -> bool {
        self > Self::None
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A single validation failure
///
/// `member_paths` holds fully qualified member paths once the message has been
/// recorded through a validation context (e.g. `orders[2].lines[0].sku`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Message {
    /// Message severity
    pub severity: Severity,

    /// Human-readable text
    pub text: String,

    /// Member paths the message refers to
    pub member_paths: Vec<String>,
}

impl Message {
    /// Create a new message
    pub fn new<I, S>(severity: Severity, text: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            severity,
            text: text.into(),
            member_paths: members.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an error message
    pub fn error<I, S>(text: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Severity::Error, text, members)
    }

    /// Create a warning message
    pub fn warning<I, S>(text: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Severity::Warning, text, members)
    }

    /// First member path, if any
    pub fn member(&self) -> Option<&str> {
        self.member_paths.first().map(String::as_str)
    }

    /// Prefix every member path with `prefix`
    ///
    /// A message without members is pinned to the prefix itself, minus the
    /// trailing separator, so nested model-wide failures keep their location.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        if prefix.is_empty() {
            return self;
        }

        if self.member_paths.is_empty() {
            self.member_paths
                .push(prefix.trim_end_matches('.').to_string());
        } else {
            for member in &mut self.member_paths {
                member.insert_str(0, prefix);
            }
        }

        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.member_paths.is_empty() {
            write!(f, "{} [{}]", self.text, self.severity)
        } else {
            write!(
                f,
                "{}: {} [{}]",
                self.member_paths.join(", "),
                self.text,
                self.severity
            )
        }
    }
}

// ============================================================================
// Contract Violations
// ============================================================================

/// Invalid rule construction or use
#[derive(Debug, Clone, Error)]
pub enum RuleError {
    #[error("rule `{rule}` must be bound to at least one field")]
    NoMembers { rule: &'static str },

    #[error("invalid bounds: minimum {min} exceeds maximum {max}")]
    InvalidBounds { min: String, max: String },

    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("rule set `{rule_set}` expects a `{expected}` instance")]
    ModelMismatch {
        rule_set: String,
        expected: &'static str,
    },
}

/// Invalid model declaration
#[derive(Debug, Clone, Error)]
pub enum DescriptorError {
    #[error("model `{model}` declares field `{field}` more than once")]
    DuplicateField { model: &'static str, field: String },

    #[error("model `{model}` declares a field with an empty name")]
    EmptyFieldName { model: &'static str },

    #[error(transparent)]
    Rule(#[from] RuleError),
}

/// Errors returned by the model validator
#[derive(Debug, Clone, Error)]
pub enum ValidatorError {
    #[error("no model instance supplied for validation")]
    MissingModel,

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error(transparent)]
    Rule(#[from] RuleError),
}
