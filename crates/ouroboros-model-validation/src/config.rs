//! Configuration options for validation behavior

use crate::errors::Severity;

// ============================================================================
// Validator Config
// ============================================================================

/// Configuration options for a [`ModelValidator`](crate::ModelValidator)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Messages must be strictly above this severity to be kept
    pub min_severity: Severity,

    /// Descend into nested model fields and sequence elements
    pub validate_nested: bool,

    /// Run model-level rules
    pub type_rules: bool,

    /// Run `SelfValidate` hooks
    pub self_validation: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_severity: Severity::None,
            validate_nested: true,
            type_rules: true,
            self_validation: true,
        }
    }
}

impl ValidatorConfig {
    /// Create a new validator config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the severity floor
    pub fn min_severity(mut self, severity: Severity) -> Self {
        self.min_severity = severity;
        self
    }

    /// Keep only errors
    pub fn errors_only(mut self) -> Self {
        self.min_severity = Severity::Warning;
        self
    }

    /// Enable or disable nested traversal
    pub fn validate_nested(mut self, enabled: bool) -> Self {
        self.validate_nested = enabled;
        self
    }

    /// Enable or disable model-level rules
    pub fn type_rules(mut self, enabled: bool) -> Self {
        self.type_rules = enabled;
        self
    }

    /// Enable or disable self-validation hooks
    pub fn self_validation(mut self, enabled: bool) -> Self {
        self.self_validation = enabled;
        self
    }

    /// Whether a message of `severity` is kept
    pub fn retains(&self, severity: Severity) -> bool {
        severity.is_failure() && severity > self.min_severity
    }
}

// ============================================================================
// Tests
// ============================================================================
