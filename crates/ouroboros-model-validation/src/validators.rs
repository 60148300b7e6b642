//! Core validation engine
//!
//! Walks a model instance depth-first using the cached descriptors of the
//! [`DescriptorStore`] and collects every failure as a path-qualified
//! [`Message`].

use crate::config::ValidatorConfig;
use crate::context::{ValidationContext, ValidationState};
use crate::descriptor::{FieldDescriptor, Model, ModelDescriptor, ModelType};
use crate::errors::{Message, Severity, ValidatorError, ValidatorResult};
use crate::services::Services;
use crate::store::DescriptorStore;
use crate::value::FieldValue;
use std::any::type_name;
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// Public API
// ============================================================================

/// Validate a model with the default validator
///
/// # Example
///
/// ```
/// use ouroboros_model_validation::rules::min;
/// use ouroboros_model_validation::{validate, DescriptorError, Model, ModelBuilder};
///
/// struct Person {
///     name: String,
///     age: i32,
/// }
///
/// impl Model for Person {
///     fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
///         model.field("name", |p| &p.name).required();
///         model.field("age", |p| &p.age).rule(min(0));
///         Ok(())
///     }
/// }
///
/// let result = validate(Person { name: String::new(), age: -1 }).unwrap();
/// let members: Vec<_> = result.messages.iter().filter_map(|m| m.member()).collect();
/// assert_eq!(members, vec!["name", "age"]);
/// ```
pub fn validate<T: Model>(model: T) -> ValidatorResult<Validated<T>> {
    ModelValidator::new().validate(model)
}

/// A validated model paired with its failures
#[derive(Debug, Clone)]
pub struct Validated<T> {
    /// The model, unchanged
    pub model: T,

    /// Failures in traversal order
    pub messages: Vec<Message>,
}

impl<T> Validated<T> {
    /// Check that no message has `Error` severity
    pub fn is_valid(&self) -> bool {
        !self
            .messages
            .iter()
            .any(|message| message.severity == Severity::Error)
    }

    /// Messages with `Error` severity
    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.messages
            .iter()
            .filter(|message| message.severity == Severity::Error)
    }

    pub fn into_parts(self) -> (T, Vec<Message>) {
        (self.model, self.messages)
    }
}

// ============================================================================
// Model Validator
// ============================================================================

/// Validates model instances against their declared rules
#[derive(Debug, Clone)]
pub struct ModelValidator {
    store: Arc<DescriptorStore>,
    services: Services,
    config: ValidatorConfig,
}

impl Default for ModelValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelValidator {
    /// Validator backed by the global descriptor store
    pub fn new() -> Self {
        Self::with_store(DescriptorStore::global())
    }

    /// Validator backed by `store`
    pub fn with_store(store: Arc<DescriptorStore>) -> Self {
        Self {
            store,
            services: Services::new(),
            config: ValidatorConfig::default(),
        }
    }

    /// Services available to rules
    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    pub fn config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &Arc<DescriptorStore> {
        &self.store
    }

    /// Validate `model`, returning it with its failures
    pub fn validate<T: Model>(&self, model: T) -> ValidatorResult<Validated<T>> {
        let messages = self.validate_ref(&model)?;
        Ok(Validated { model, messages })
    }

    /// Validate an optional model; `None` is a caller error
    pub fn validate_option<T: Model>(&self, model: Option<T>) -> ValidatorResult<Validated<T>> {
        let model = model.ok_or(ValidatorError::MissingModel)?;
        self.validate(model)
    }

    /// Validate a borrowed model, returning only its failures
    pub fn validate_ref<T: Model>(&self, model: &T) -> ValidatorResult<Vec<Message>> {
        let Some(descriptor) = self.store.get(ModelType::of::<T>())? else {
            trace!(model = type_name::<T>(), "Model has no rules");
            return Ok(Vec::new());
        };

        let state = ValidationState::new();
        let ctx = state.context(model, &self.services, &self.config);
        self.validate_node(&ctx, &descriptor)?;

        let messages = state.into_messages();
        debug!(
            model = type_name::<T>(),
            messages = messages.len(),
            "Validated model"
        );
        Ok(messages)
    }

    fn validate_node(
        &self,
        ctx: &ValidationContext<'_>,
        descriptor: &ModelDescriptor,
    ) -> ValidatorResult<()> {
        if !ctx.enter() {
            trace!(path = ctx.path(), "Instance already visited");
            return Ok(());
        }

        for field in descriptor.fields() {
            let Some(value) = field.value(ctx.instance()) else {
                continue;
            };
            let field_ctx = ctx.for_field(field);

            if let Some(message) = field.required_rule().evaluate(value, &field_ctx) {
                field_ctx.record(message);
                continue;
            }

            for rule in field.rules() {
                if let Some(message) = rule.evaluate(value, &field_ctx) {
                    field_ctx.record(message);
                }
            }

            if self.config.validate_nested {
                self.validate_nested(&field_ctx, field, value)?;
            }
        }

        if self.config.type_rules {
            for rule in descriptor.type_rules() {
                for message in rule.validate(ctx) {
                    ctx.record(message);
                }
            }
        }

        if self.config.self_validation {
            if let Some(self_validation) = descriptor.self_validation() {
                for message in self_validation(ctx.instance(), ctx) {
                    ctx.record(message);
                }
            }
        }

        Ok(())
    }

    fn validate_nested(
        &self,
        ctx: &ValidationContext<'_>,
        field: &FieldDescriptor,
        value: &dyn FieldValue,
    ) -> ValidatorResult<()> {
        let Some(resolved) = value.resolve() else {
            return Ok(());
        };
        if resolved.is_default() || !field.is_nested_model(&self.store)? {
            return Ok(());
        }

        let Some(model) = field.shape().nested_model() else {
            return Ok(());
        };
        let Some(descriptor) = self.store.get(model)? else {
            return Ok(());
        };

        match resolved.elements() {
            Some(items) => {
                for (index, item) in items.into_iter().enumerate() {
                    if let Some(element) = item.resolve() {
                        self.validate_node(&ctx.nested(element.as_any(), Some(index)), &descriptor)?;
                    }
                }
            }
            None => self.validate_node(&ctx.nested(resolved.as_any(), None), &descriptor)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModelBuilder;
    use crate::errors::DescriptorError;
    use crate::rules::{max_length, min};

    #[derive(Debug)]
    struct Person {
        name: String,
        age: i32,
    }

    impl Model for Person {
        fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
            model
                .field("name", |p| &p.name)
                .required()
                .rule(max_length(3));
            model.field("age", |p| &p.age).rule(min(0));
            Ok(())
        }
    }

    struct Untracked {
        note: String,
    }

    impl Model for Untracked {
        fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
            model.field("note", |u| &u.note);
            Ok(())
        }
    }

    fn validator() -> ModelValidator {
        ModelValidator::with_store(Arc::new(DescriptorStore::new()))
    }

    #[test]
    fn test_required_short_circuits_field_rules() {
        let result = validator()
            .validate(Person {
                name: String::new(),
                age: -1,
            })
            .unwrap();

        assert_eq!(result.messages.len(), 2);
        assert_eq!(result.messages[0].member(), Some("name"));
        assert_eq!(result.messages[0].text, "name is required");
        assert_eq!(result.messages[1].member(), Some("age"));
        assert!(!result.is_valid());
    }

    #[test]
    fn test_all_field_rules_run() {
        let messages = validator()
            .validate_ref(&Person {
                name: "Grace".to_string(),
                age: -5,
            })
            .unwrap();

        let members: Vec<_> = messages.iter().filter_map(Message::member).collect();
        assert_eq!(members, vec!["name", "age"]);
    }

    #[test]
    fn test_model_without_rules_is_valid() {
        let result = validator()
            .validate(Untracked {
                note: String::new(),
            })
            .unwrap();
        assert!(result.messages.is_empty());
        assert!(result.is_valid());
    }

    #[test]
    fn test_missing_model_is_an_error() {
        let err = validator().validate_option::<Person>(None).unwrap_err();
        assert!(matches!(err, ValidatorError::MissingModel));
    }

    #[test]
    fn test_validated_parts() {
        let result = validator()
            .validate(Person {
                name: "Ada".to_string(),
                age: 36,
            })
            .unwrap();
        assert_eq!(result.errors().count(), 0);

        let (person, messages) = result.into_parts();
        assert_eq!(person.name, "Ada");
        assert!(messages.is_empty());
    }
}
