//! Built-in field rules
//!
//! Every rule that applies to a value type `T` also applies to `Option<T>`;
//! an absent optional value passes, leaving presence to the required rule.
//! Text rules treat the empty string the same way.

use crate::context::ValidationContext;
use crate::errors::{RuleError, Severity};
use crate::formats;
use crate::rules::{Outcome, ValueRule};
use crate::services::MessageTemplate;
use crate::value::HasLength;
use regex::Regex;
use std::fmt::Display;
use std::marker::PhantomData;
use std::ops::RangeInclusive;

/// Message and severity setters shared by the built-in rules
macro_rules! rule_options {
    () => {
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
    };
}

/// `ValueRule` impls for a rule over `Option<T>` delegating to `T`
macro_rules! optional_rule {
    ($rule:ty, $value:ty $(, $($bounds:tt)+)?) => {
        impl$(<$($bounds)+>)? ValueRule<Option<$value>> for $rule {
            fn check(&self, value: &Option<$value>, ctx: &ValidationContext<'_>) -> Outcome {
                match value {
                    Some(inner) => ValueRule::<$value>::check(self, inner, ctx),
                    None => Outcome::Valid,
                }
            }

            fn message(&self) -> &MessageTemplate {
                &self.message
            }

            fn severity(&self) -> Severity {
                self.severity
            }
        }
    };
}

// ============================================================================
// Range
// ============================================================================

/// Inclusive bounds on an ordered value
#[derive(Debug, Clone)]
pub struct Range<T> {
    min: Option<T>,
    max: Option<T>,
    message: MessageTemplate,
    severity: Severity,
}

/// Value must lie within `bounds`
pub fn range<T: PartialOrd + Display>(bounds: RangeInclusive<T>) -> Result<Range<T>, RuleError> {
    let (min, max) = bounds.into_inner();
    if min > max {
        return Err(RuleError::InvalidBounds {
            min: min.to_string(),
            max: max.to_string(),
        });
    }

    let message = format!("{{field}} must be between {} and {}", min, max);
    Ok(Range {
        min: Some(min),
        max: Some(max),
        message: message.into(),
        severity: Severity::Error,
    })
}

/// Value must be at least `min`
pub fn min<T: PartialOrd + Display>(min: T) -> Range<T> {
    let message = format!("{{field}} must be at least {}", min);
    Range {
        min: Some(min),
        max: None,
        message: message.into(),
        severity: Severity::Error,
    }
}

/// Value must be at most `max`
pub fn max<T: PartialOrd + Display>(max: T) -> Range<T> {
    let message = format!("{{field}} must be at most {}", max);
    Range {
        min: None,
        max: Some(max),
        message: message.into(),
        severity: Severity::Error,
    }
}

impl<T: PartialOrd> Range<T> {
    rule_options!();

    /// Whether `value` lies within the bounds; NaN never does
    pub fn contains(&self, value: &T) -> bool {
        let above_min = self.min.as_ref().map_or(true, |min| value >= min);
        let below_max = self.max.as_ref().map_or(true, |max| value <= max);
        above_min && below_max
    }
}

impl<T: PartialOrd + Send + Sync> ValueRule<T> for Range<T> {
    fn check(&self, value: &T, _ctx: &ValidationContext<'_>) -> Outcome {
        self.contains(value).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

optional_rule!(Range<T>, T, T: PartialOrd + Send + Sync);

// ============================================================================
// Length
// ============================================================================

/// Bounds on the length of text or a collection
#[derive(Debug, Clone)]
pub struct Length {
    min: Option<usize>,
    max: Option<usize>,
    message: MessageTemplate,
    severity: Severity,
}

/// Length must lie within `bounds`
pub fn length(bounds: RangeInclusive<usize>) -> Result<Length, RuleError> {
    let (min, max) = bounds.into_inner();
    if min > max {
        return Err(RuleError::InvalidBounds {
            min: min.to_string(),
            max: max.to_string(),
        });
    }

    Ok(Length {
        min: Some(min),
        max: Some(max),
        message: format!("{{field}} must have between {} and {} items", min, max).into(),
        severity: Severity::Error,
    })
}

/// Length must be at least `min`
pub fn min_length(min: usize) -> Length {
    Length {
        min: Some(min),
        max: None,
        message: format!("{{field}} must have at least {} items", min).into(),
        severity: Severity::Error,
    }
}

/// Length must be at most `max`
pub fn max_length(max: usize) -> Length {
    Length {
        min: None,
        max: Some(max),
        message: format!("{{field}} must have at most {} items", max).into(),
        severity: Severity::Error,
    }
}

impl Length {
    rule_options!();

    fn accepts(&self, length: usize) -> bool {
        self.min.map_or(true, |min| length >= min) && self.max.map_or(true, |max| length <= max)
    }
}

impl<V: HasLength> ValueRule<V> for Length {
    fn check(&self, value: &V, _ctx: &ValidationContext<'_>) -> Outcome {
        self.accepts(value.length()).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

optional_rule!(Length, V, V: HasLength);

// ============================================================================
// Pattern
// ============================================================================

/// Text must match a regular expression
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    message: MessageTemplate,
    severity: Severity,
}

/// Text must match `expr`
pub fn pattern(expr: &str) -> Result<Pattern, RuleError> {
    Ok(Pattern {
        regex: Regex::new(expr)?,
        message: "{field} has an invalid format".into(),
        severity: Severity::Error,
    })
}

/// Text must be an email address
pub fn email() -> Pattern {
    Pattern {
        regex: formats::email_regex().clone(),
        message: "{field} must be a valid email address".into(),
        severity: Severity::Error,
    }
}

/// Text must be an http(s) URL
pub fn url() -> Pattern {
    Pattern {
        regex: formats::url_regex().clone(),
        message: "{field} must be a valid URL".into(),
        severity: Severity::Error,
    }
}

impl Pattern {
    rule_options!();

    fn matches(&self, text: &str) -> Outcome {
        (text.is_empty() || self.regex.is_match(text)).into()
    }
}

impl ValueRule<String> for Pattern {
    fn check(&self, value: &String, _ctx: &ValidationContext<'_>) -> Outcome {
        self.matches(value)
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

impl ValueRule<&'static str> for Pattern {
    fn check(&self, value: &&'static str, _ctx: &ValidationContext<'_>) -> Outcome {
        self.matches(value)
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

optional_rule!(Pattern, String);

// ============================================================================
// Not Blank
// ============================================================================

/// Non-empty text must contain a non-whitespace character
#[derive(Debug, Clone)]
pub struct NotBlank {
    message: MessageTemplate,
    severity: Severity,
}

pub fn not_blank() -> NotBlank {
    NotBlank {
        message: "{field} must not be blank".into(),
        severity: Severity::Error,
    }
}

impl NotBlank {
    rule_options!();
}

impl ValueRule<String> for NotBlank {
    fn check(&self, value: &String, _ctx: &ValidationContext<'_>) -> Outcome {
        (value.is_empty() || !value.trim().is_empty()).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

optional_rule!(NotBlank, String);

// ============================================================================
// One Of
// ============================================================================

/// Value must equal one of the allowed values
#[derive(Debug, Clone)]
pub struct OneOf<T> {
    allowed: Vec<T>,
    message: MessageTemplate,
    severity: Severity,
}

pub fn one_of<T, I>(allowed: I) -> OneOf<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    OneOf {
        allowed: allowed.into_iter().collect(),
        message: "{field} is not an allowed value".into(),
        severity: Severity::Error,
    }
}

impl<T: PartialEq> OneOf<T> {
    rule_options!();
}

impl<T: PartialEq + Send + Sync> ValueRule<T> for OneOf<T> {
    fn check(&self, value: &T, _ctx: &ValidationContext<'_>) -> Outcome {
        self.allowed.contains(value).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

optional_rule!(OneOf<T>, T, T: PartialEq + Send + Sync);

// ============================================================================
// Predicates
// ============================================================================

/// Custom predicate over a field value
pub struct Check<V, F, O> {
    predicate: F,
    message: MessageTemplate,
    severity: Severity,
    _marker: PhantomData<fn(&V) -> O>,
}

/// Value must satisfy `predicate`; answer with `bool`, `Option<bool>` or
/// [`Outcome`]
pub fn check<V, F, O>(predicate: F, message: impl Into<MessageTemplate>) -> Check<V, F, O>
where
    F: Fn(&V) -> O + Send + Sync,
    O: Into<Outcome>,
{
    Check {
        predicate,
        message: message.into(),
        severity: Severity::Error,
        _marker: PhantomData,
    }
}

impl<V, F, O> Check<V, F, O> {
    rule_options!();
}

impl<V, F, O> ValueRule<V> for Check<V, F, O>
where
    F: Fn(&V) -> O + Send + Sync,
    O: Into<Outcome>,
{
    fn check(&self, value: &V, _ctx: &ValidationContext<'_>) -> Outcome {
        (self.predicate)(value).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Custom predicate with access to the validation context and its services
pub struct CheckWith<V, F, O> {
    predicate: F,
    message: MessageTemplate,
    severity: Severity,
    _marker: PhantomData<fn(&V) -> O>,
}

/// Value must satisfy `predicate`, which may resolve services from the
/// context and answer [`Outcome::Indeterminate`] when one is missing
pub fn check_with<V, F, O>(predicate: F, message: impl Into<MessageTemplate>) -> CheckWith<V, F, O>
where
    F: Fn(&V, &ValidationContext<'_>) -> O + Send + Sync,
    O: Into<Outcome>,
{
    CheckWith {
        predicate,
        message: message.into(),
        severity: Severity::Error,
        _marker: PhantomData,
    }
}

impl<V, F, O> CheckWith<V, F, O> {
    rule_options!();
}

impl<V, F, O> ValueRule<V> for CheckWith<V, F, O>
where
    F: Fn(&V, &ValidationContext<'_>) -> O + Send + Sync,
    O: Into<Outcome>,
{
    fn check(&self, value: &V, ctx: &ValidationContext<'_>) -> Outcome {
        (self.predicate)(value, ctx).into()
    }

    fn message(&self) -> &MessageTemplate {
        &self.message
    }

    fn severity(&self) -> Severity {
        self.severity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidatorConfig;
    use crate::context::ValidationState;
    use crate::services::Services;

    fn with_ctx(test: impl FnOnce(&ValidationContext<'_>)) {
        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::default();
        let instance = ();
        let ctx = state.context(&instance, &services, &config);
        test(&ctx);
    }

    #[test]
    fn test_range_bounds() {
        with_ctx(|ctx| {
            let rule = range(0..=150).expect("valid bounds");
            assert_eq!(ValueRule::<i32>::check(&rule, &0, ctx), Outcome::Valid);
            assert_eq!(ValueRule::<i32>::check(&rule, &150, ctx), Outcome::Valid);
            assert_eq!(ValueRule::<i32>::check(&rule, &-1, ctx), Outcome::Invalid);
            assert_eq!(
                ValueRule::<Option<i32>>::check(&rule, &None, ctx),
                Outcome::Valid
            );
        });
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert!(matches!(
            range(10..=1),
            Err(RuleError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn test_float_nan_is_out_of_range() {
        assert!(!min(0.0_f64).contains(&f64::NAN));
        assert!(min(0.0_f64).contains(&0.5));
    }

    #[test]
    fn test_length_counts_characters() {
        with_ctx(|ctx| {
            let rule = max_length(3);
            assert_eq!(rule.check(&"héé".to_string(), ctx), Outcome::Valid);
            assert_eq!(rule.check(&"hééé".to_string(), ctx), Outcome::Invalid);
            assert_eq!(
                ValueRule::<Vec<i32>>::check(&min_length(1), &Vec::new(), ctx),
                Outcome::Invalid
            );
        });
    }

    #[test]
    fn test_pattern() {
        with_ctx(|ctx| {
            let rule = pattern(r"^\d{3}-\d{4}$").expect("valid regex");
            assert_eq!(rule.check(&"123-4567".to_string(), ctx), Outcome::Valid);
            assert_eq!(rule.check(&"abc-defg".to_string(), ctx), Outcome::Invalid);
            assert_eq!(rule.check(&String::new(), ctx), Outcome::Valid);
        });

        assert!(matches!(pattern("("), Err(RuleError::InvalidPattern(_))));
    }

    #[test]
    fn test_email_and_url() {
        with_ctx(|ctx| {
            assert_eq!(
                email().check(&"user@example.com".to_string(), ctx),
                Outcome::Valid
            );
            assert_eq!(
                email().check(&"not-an-email".to_string(), ctx),
                Outcome::Invalid
            );
            assert_eq!(
                url().check(&"https://example.com/a".to_string(), ctx),
                Outcome::Valid
            );
        });
    }

    #[test]
    fn test_not_blank_and_one_of() {
        with_ctx(|ctx| {
            assert_eq!(not_blank().check(&"   ".to_string(), ctx), Outcome::Invalid);
            assert_eq!(not_blank().check(&" a ".to_string(), ctx), Outcome::Valid);

            let rule = one_of(["eur", "usd"]);
            assert_eq!(rule.check(&"eur", ctx), Outcome::Valid);
            assert_eq!(rule.check(&"gbp", ctx), Outcome::Invalid);
        });
    }

    #[test]
    fn test_check_predicates() {
        with_ctx(|ctx| {
            let even = check(|value: &i32| value % 2 == 0, "{field} must be even");
            assert_eq!(even.check(&4, ctx), Outcome::Valid);
            assert_eq!(even.check(&3, ctx), Outcome::Invalid);

            let unknown = check_with(
                |_value: &i32, ctx: &ValidationContext<'_>| {
                    ctx.service::<Vec<i32>>().map(|blocked| !blocked.contains(&1))
                },
                "{field} is blocked",
            );
            assert_eq!(unknown.check(&1, ctx), Outcome::Indeterminate);
        });
    }
}
