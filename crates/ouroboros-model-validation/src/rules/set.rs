//! Rule sets
//!
//! A named, ordered, immutable group of rules over one model type. A rule set
//! can be run on its own against any validation context, or attached to a
//! model as a single type rule.

use crate::context::{ModelContext, ValidationContext};
use crate::errors::{Message, RuleError};
use crate::rules::Rule;
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

// ============================================================================
// Rule Set
// ============================================================================

/// Named, ordered collection of rules for model `M`
pub struct RuleSet<M> {
    name: String,
    rules: Vec<Arc<dyn Rule<M>>>,
}

impl<M: Any> RuleSet<M> {
    /// Start building a rule set
    pub fn builder(name: impl Into<String>) -> RuleSetBuilder<M> {
        RuleSetBuilder {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against the instance held by `ctx`
    ///
    /// All rules run in order; their failures are concatenated and qualified
    /// with the context path. Messages with severity `None` are dropped.
    /// Fails with [`RuleError::ModelMismatch`] when the instance is not an `M`.
    pub fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Message>, RuleError> {
        let Some(model_ctx) = ctx.narrow::<M>() else {
            warn!(
                rule_set = %self.name,
                expected = type_name::<M>(),
                "Rule set applied to a mismatched model"
            );
            return Err(RuleError::ModelMismatch {
                rule_set: self.name.clone(),
                expected: type_name::<M>(),
            });
        };

        Ok(self
            .evaluate(&model_ctx)
            .into_iter()
            .map(|message| ctx.qualify(message))
            .collect())
    }

    fn evaluate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message> {
        self.rules
            .iter()
            .flat_map(|rule| rule.validate(ctx))
            .filter(|message| message.severity.is_failure())
            .collect()
    }
}

impl<M: Any> Rule<M> for RuleSet<M> {
    fn validate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message> {
        self.evaluate(ctx)
    }
}

impl<M> Clone for RuleSet<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            rules: self.rules.clone(),
        }
    }
}

impl<M> fmt::Debug for RuleSet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSet")
            .field("name", &self.name)
            .field("model", &type_name::<M>())
            .field("rules_count", &self.rules.len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`RuleSet`]
pub struct RuleSetBuilder<M> {
    name: String,
    rules: Vec<Arc<dyn Rule<M>>>,
}

impl<M: Any> RuleSetBuilder<M> {
    /// Append a rule; rules run in insertion order
    pub fn rule(mut self, rule: impl Rule<M> + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    pub fn build(self) -> RuleSet<M> {
        RuleSet {
            name: self.name,
            rules: self.rules,
        }
    }
}

impl<M> fmt::Debug for RuleSetBuilder<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleSetBuilder")
            .field("name", &self.name)
            .field("rules_count", &self.rules.len())
            .finish()
    }
}
