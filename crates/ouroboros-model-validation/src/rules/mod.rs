//! Rule composition layer
//!
//! Two kinds of rules exist:
//!
//! - [`ValueRule<V>`] checks one field value of type `V`; it is attached to a
//!   field with [`FieldBuilder::rule`](crate::FieldBuilder::rule).
//! - [`Rule<M>`] checks a whole model of type `M` and may bind several
//!   members; it is attached with [`ModelBuilder::rule`](crate::ModelBuilder::rule)
//!   or grouped in a [`RuleSet`].
//!
//! Predicates answer with a three-valued [`Outcome`]. `Indeterminate` is used
//! when a rule cannot decide, typically because a service it needs is not
//! registered, and never produces a failure.

pub mod field;
pub mod model;
pub mod set;

pub use field::{
    check, check_with, email, length, max, max_length, min, min_length, not_blank, one_of,
    pattern, range, url, Check, CheckWith, Length, NotBlank, OneOf, Pattern, Range,
};
pub use model::{conditional_required, fields_equal, ConditionalRequired, FieldsEqual, ModelRule};
pub use set::{RuleSet, RuleSetBuilder};

use crate::context::{ModelContext, ValidationContext};
use crate::descriptor::{FieldAccessor, ModelAccessor};
use crate::errors::{Message, Severity};
use crate::services::MessageTemplate;
use crate::value::FieldValue;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Outcome
// ============================================================================

/// Result of a rule predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The value satisfies the rule
    Valid,
    /// The value violates the rule
    Invalid,
    /// The rule could not be evaluated; treated as no failure
    Indeterminate,
}

impl Outcome {
    pub fn is_invalid(self) -> bool {
        matches!(self, Self::Invalid)
    }
}

impl From<bool> for Outcome {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

impl From<Option<bool>> for Outcome {
    fn from(valid: Option<bool>) -> Self {
        valid.map_or(Self::Indeterminate, Self::from)
    }
}

// ============================================================================
// Rule Traits
// ============================================================================

/// Rule over a single field value of type `V`
pub trait ValueRule<V>: Send + Sync {
    /// Check the value
    fn check(&self, value: &V, ctx: &ValidationContext<'_>) -> Outcome;

    /// Message reported on failure
    fn message(&self) -> &MessageTemplate;

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

/// Rule over a whole model of type `M`
///
/// Member names in returned messages are relative to the model.
pub trait Rule<M>: Send + Sync {
    fn validate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message>;
}

// ============================================================================
// Type Erasure
// ============================================================================

/// Field rule with the value type erased
pub(crate) trait FieldRule: Send + Sync {
    fn evaluate(&self, value: &dyn FieldValue, ctx: &ValidationContext<'_>) -> Option<Message>;
}

pub(crate) struct TypedFieldRule<V, R> {
    rule: R,
    _value: PhantomData<fn(&V)>,
}

impl<V, R> TypedFieldRule<V, R> {
    pub(crate) fn new(rule: R) -> Self {
        Self {
            rule,
            _value: PhantomData,
        }
    }
}

impl<V, R> FieldRule for TypedFieldRule<V, R>
where
    V: FieldValue,
    R: ValueRule<V>,
{
    fn evaluate(&self, value: &dyn FieldValue, ctx: &ValidationContext<'_>) -> Option<Message> {
        let typed = value.as_any().downcast_ref::<V>()?;

        match self.rule.check(typed, ctx) {
            Outcome::Invalid => Some(ctx.field_message(self.rule.severity(), self.rule.message())),
            Outcome::Valid | Outcome::Indeterminate => None,
        }
    }
}

/// Model rule with the model type erased
pub(crate) trait ErasedRule: Send + Sync {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Message>;
}

pub(crate) struct TypedRule<M, R> {
    rule: R,
    _model: PhantomData<fn(&M)>,
}

impl<M, R> TypedRule<M, R> {
    pub(crate) fn new(rule: R) -> Self {
        Self {
            rule,
            _model: PhantomData,
        }
    }
}

impl<M, R> ErasedRule for TypedRule<M, R>
where
    M: Any,
    R: Rule<M>,
{
    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Message> {
        match ctx.narrow::<M>() {
            Some(model_ctx) => self.rule.validate(&model_ctx),
            None => Vec::new(),
        }
    }
}

// ============================================================================
// Selector
// ============================================================================

/// Named field of model `M`, used by multi-field rules
pub struct Selector<M> {
    name: String,
    display_name: String,
    get: Arc<dyn ModelAccessor<M>>,
}

impl<M: Any> Selector<M> {
    /// Select field `name` read by `get`
    pub fn new<V, F>(name: impl Into<String>, get: F) -> Self
    where
        V: FieldValue,
        F: for<'a> Fn(&'a M) -> &'a V + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            get: Arc::new(FieldAccessor::<M, V, F>::new(get)),
        }
    }

    /// Name used in rendered messages
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.display_name
    }

    /// Read the selected field
    pub fn value<'a>(&self, model: &'a M) -> &'a dyn FieldValue {
        self.get.get(model)
    }
}

impl<M> Clone for Selector<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            get: Arc::clone(&self.get),
        }
    }
}

impl<M> fmt::Debug for Selector<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .finish()
    }
}

/// Build a [`Selector`] for a named struct field
///
/// ```rust,ignore
/// let tracking = selector!(Shipment, tracking_code);
/// ```
#[macro_export]
macro_rules! selector {
    ($model:ty, $field:ident) => {
        $crate::rules::Selector::new(stringify!($field), |model: &$model| &model.$field)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_bool() {
        assert_eq!(Outcome::from(true), Outcome::Valid);
        assert_eq!(Outcome::from(false), Outcome::Invalid);
    }

    #[test]
    fn test_outcome_from_option() {
        assert_eq!(Outcome::from(Some(true)), Outcome::Valid);
        assert_eq!(Outcome::from(Some(false)), Outcome::Invalid);
        assert_eq!(Outcome::from(None), Outcome::Indeterminate);
        assert!(!Outcome::Indeterminate.is_invalid());
    }

    struct Pair {
        left: i32,
    }

    #[test]
    fn test_selector_reads_field() {
        let selector = Selector::new("left", |pair: &Pair| &pair.left).display_name("Left");
        let pair = Pair { left: 9 };

        assert_eq!(selector.name(), "left");
        assert_eq!(selector.label(), "Left");
        assert_eq!(
            selector.value(&pair).as_any().downcast_ref::<i32>(),
            Some(&9)
        );
    }
}
