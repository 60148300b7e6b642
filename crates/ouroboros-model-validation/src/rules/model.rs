//! Model-level rules
//!
//! Rules that look at more than one field of a model: a free-form
//! [`ModelRule`], field equality and conditional required checks.

use crate::context::{ModelContext, ValidationContext};
use crate::descriptor::{FieldAccessor, TypedAccessor};
use crate::errors::{Message, RuleError, Severity};
use crate::rules::{Outcome, Rule, Selector};
use crate::services::MessageTemplate;
use crate::value::{is_missing, FieldValue};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Predicates
// ============================================================================

trait Predicate<M>: Send + Sync {
    fn test(&self, model: &M, ctx: &ValidationContext<'_>) -> Outcome;
}

struct FnPredicate<P, O> {
    predicate: P,
    _outcome: PhantomData<fn() -> O>,
}

impl<P, O> FnPredicate<P, O> {
    fn boxed<M>(predicate: P) -> Box<dyn Predicate<M>>
    where
        P: Fn(&M, &ValidationContext<'_>) -> O + Send + Sync + 'static,
        O: Into<Outcome> + 'static,
    {
        Box::new(Self {
            predicate,
            _outcome: PhantomData,
        })
    }
}

impl<M, P, O> Predicate<M> for FnPredicate<P, O>
where
    P: Fn(&M, &ValidationContext<'_>) -> O + Send + Sync,
    O: Into<Outcome>,
{
    fn test(&self, model: &M, ctx: &ValidationContext<'_>) -> Outcome {
        (self.predicate)(model, ctx).into()
    }
}

// ============================================================================
// Model Rule
// ============================================================================

/// Predicate over a whole model, reported on the bound members
///
/// `{field}` in the message renders as the bound member names.
pub struct ModelRule<M> {
    members: Vec<String>,
    message: MessageTemplate,
    severity: Severity,
    predicate: Box<dyn Predicate<M>>,
}

impl<M: Any> ModelRule<M> {
    /// Bind `predicate` to `members`
    ///
    /// Fails with [`RuleError::NoMembers`] when no member is given.
    pub fn new<I, S, P, O>(
        members: I,
        message: impl Into<MessageTemplate>,
        predicate: P,
    ) -> Result<Self, RuleError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        P: Fn(&M, &ValidationContext<'_>) -> O + Send + Sync + 'static,
        O: Into<Outcome> + 'static,
    {
        let members: Vec<String> = members.into_iter().map(Into::into).collect();
        if members.is_empty() {
            return Err(RuleError::NoMembers { rule: "model_rule" });
        }

        Ok(Self {
            members,
            message: message.into(),
            severity: Severity::Error,
            predicate: FnPredicate::boxed(predicate),
        })
    }

    /// Set the failure severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Bound member names
    pub fn members(&self) -> &[String] {
        &self.members
    }
}

impl<M: Any> Rule<M> for ModelRule<M> {
    fn validate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message> {
        match self.predicate.test(ctx.model(), ctx) {
            Outcome::Invalid => {
                let text = self.message.render(&self.members.join(", "), ctx.services());
                vec![Message::new(self.severity, text, self.members.clone())]
            }
            Outcome::Valid | Outcome::Indeterminate => Vec::new(),
        }
    }
}

impl<M> fmt::Debug for ModelRule<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRule")
            .field("members", &self.members)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .finish()
    }
}

// ============================================================================
// Fields Equal
// ============================================================================

/// Two fields of the same type must hold equal values
///
/// The failure is reported on the left member.
pub struct FieldsEqual<M, V> {
    left: String,
    right: String,
    get_left: Arc<dyn TypedAccessor<M, V>>,
    get_right: Arc<dyn TypedAccessor<M, V>>,
    message: MessageTemplate,
    severity: Severity,
}

/// Field `left` must equal field `right`
pub fn fields_equal<M, V, L, R>(left: &str, get_left: L, right: &str, get_right: R) -> FieldsEqual<M, V>
where
    M: Any,
    V: FieldValue + PartialEq,
    L: for<'a> Fn(&'a M) -> &'a V + Send + Sync + 'static,
    R: for<'a> Fn(&'a M) -> &'a V + Send + Sync + 'static,
{
    FieldsEqual {
        left: left.to_string(),
        right: right.to_string(),
        get_left: Arc::new(FieldAccessor::<M, V, L>::new(get_left)),
        get_right: Arc::new(FieldAccessor::<M, V, R>::new(get_right)),
        message: format!("{{field}} must match {}", right).into(),
        severity: Severity::Error,
    }
}

impl<M, V> FieldsEqual<M, V> {
    /// Replace the failure message
    pub fn with_message(mut self, message: impl Into<MessageTemplate>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the failure severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}

impl<M, V> Rule<M> for FieldsEqual<M, V>
where
    M: Any,
    V: PartialEq + 'static,
{
    fn validate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message> {
        let model = ctx.model();
        if self.get_left.get(model) == self.get_right.get(model) {
            return Vec::new();
        }

        let text = self.message.render(&self.left, ctx.services());
        vec![Message::new(self.severity, text, [self.left.as_str()])]
    }
}

impl<M, V> fmt::Debug for FieldsEqual<M, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldsEqual")
            .field("left", &self.left)
            .field("right", &self.right)
            .field("severity", &self.severity)
            .finish()
    }
}

// ============================================================================
// Conditional Required
// ============================================================================

const CONDITIONAL_REQUIRED_MESSAGE: &str = "{field} is required";

/// Required semantics applied to several fields while a condition holds
///
/// The condition is evaluated once per model; each selected field that is
/// missing yields its own failure.
pub struct ConditionalRequired<M> {
    condition: Box<dyn Predicate<M>>,
    selectors: Vec<Selector<M>>,
    message: MessageTemplate,
    severity: Severity,
}

/// Require every field in `selectors` while `condition` holds
///
/// The condition may answer `bool`, `Option<bool>` or [`Outcome`]; only a
/// definite `Valid` answer enables the check. Fails with
/// [`RuleError::NoMembers`] when no selector is given.
pub fn conditional_required<M, C, O, I>(
    condition: C,
    selectors: I,
) -> Result<ConditionalRequired<M>, RuleError>
where
    M: Any,
    C: Fn(&M, &ValidationContext<'_>) -> O + Send + Sync + 'static,
    O: Into<Outcome> + 'static,
    I: IntoIterator<Item = Selector<M>>,
{
    let selectors: Vec<Selector<M>> = selectors.into_iter().collect();
    if selectors.is_empty() {
        return Err(RuleError::NoMembers {
            rule: "conditional_required",
        });
    }

    Ok(ConditionalRequired {
        condition: FnPredicate::boxed(condition),
        selectors,
        message: CONDITIONAL_REQUIRED_MESSAGE.into(),
        severity: Severity::Error,
    })
}

impl<M> ConditionalRequired<M> {
    /// Replace the failure message
    pub fn with_message(mut self, message: impl Into<MessageTemplate>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the failure severity
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn selectors(&self) -> &[Selector<M>] {
        &self.selectors
    }
}

impl<M: Any> Rule<M> for ConditionalRequired<M> {
    fn validate(&self, ctx: &ModelContext<'_, M>) -> Vec<Message> {
        let model = ctx.model();
        if self.condition.test(model, ctx) != Outcome::Valid {
            return Vec::new();
        }

        self.selectors
            .iter()
            .filter(|selector| is_missing(selector.value(model)))
            .map(|selector| {
                let text = self.message.render(selector.label(), ctx.services());
                Message::new(self.severity, text, [selector.name()])
            })
            .collect()
    }
}

impl<M> fmt::Debug for ConditionalRequired<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalRequired")
            .field("selectors", &self.selectors)
            .field("message", &self.message)
            .field("severity", &self.severity)
            .finish()
    }
}
