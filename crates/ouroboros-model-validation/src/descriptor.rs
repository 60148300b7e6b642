//! Model and field descriptors
//!
//! A model type declares its fields and rules once, through
//! [`Model::describe`]. The resulting [`ModelDescriptor`] is built and cached
//! by the [`DescriptorStore`](crate::DescriptorStore) and is immutable from
//! then on, apart from the lazily resolved nested-model flag of each field.
//!
//! # Example
//!
//! ```rust
//! use ouroboros_model_validation::rules::min;
//! use ouroboros_model_validation::{DescriptorError, Model, ModelBuilder};
//!
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Model for Person {
//!     fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
//!         model.field("name", |p| &p.name).required();
//!         model.field("age", |p| &p.age).rule(min(0));
//!         Ok(())
//!     }
//! }
//! ```

use crate::context::ValidationContext;
use crate::errors::{DescriptorError, Message, Severity};
use crate::rules::{ErasedRule, FieldRule, Outcome, Rule, TypedFieldRule, TypedRule, ValueRule};
use crate::services::MessageTemplate;
use crate::store::DescriptorStore;
use crate::value::{is_missing, FieldValue, TypeKey, TypeShape};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

// ============================================================================
// Model Traits
// ============================================================================

/// A type whose instances can be validated
pub trait Model: Any + Sized {
    /// Declare the fields and rules of this model
    ///
    /// Runs once per store, while the store holds its write lock. A
    /// declaration must not look up descriptors itself, e.g. through
    /// [`DescriptorStore::global`]; doing so deadlocks.
    fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError>;
}

/// Arbitrary cross-field validation supplied by the model itself
///
/// Register with [`ModelBuilder::self_validating`]. Member names in returned
/// messages are relative to the model; the context adds the path prefix.
pub trait SelfValidate {
    fn validate(&self, ctx: &ValidationContext<'_>) -> Vec<Message>;
}

pub(crate) type SelfValidator = fn(&dyn Any, &ValidationContext<'_>) -> Vec<Message>;

fn run_self_validation<M: Model + SelfValidate>(
    instance: &dyn Any,
    ctx: &ValidationContext<'_>,
) -> Vec<Message> {
    instance
        .downcast_ref::<M>()
        .map(|model| model.validate(ctx))
        .unwrap_or_default()
}

// ============================================================================
// Model Type
// ============================================================================

/// Identity of a model type plus the recipe for its descriptor
#[derive(Clone, Copy)]
pub struct ModelType {
    key: TypeKey,
    define: fn() -> Result<ModelDescriptor, DescriptorError>,
}

impl ModelType {
    /// Model type of `M`
    pub fn of<M: Model>() -> Self {
        Self {
            key: TypeKey::of::<M>(),
            define: define::<M>,
        }
    }

    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn id(&self) -> TypeId {
        self.key.id()
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    /// Run the model's declaration
    pub(crate) fn define(&self) -> Result<ModelDescriptor, DescriptorError> {
        (self.define)()
    }
}

fn define<M: Model>() -> Result<ModelDescriptor, DescriptorError> {
    let mut builder = ModelBuilder::<M>::new();
    M::describe(&mut builder)?;
    builder.finish()
}

impl PartialEq for ModelType {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ModelType {}

impl fmt::Debug for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelType").field(&self.key).finish()
    }
}

// ============================================================================
// Accessors
// ============================================================================

/// Reads a field from an erased model instance
pub(crate) trait InstanceAccessor: Send + Sync {
    fn get<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn FieldValue>;
}

/// Reads a field from a typed model instance
pub(crate) trait ModelAccessor<M>: Send + Sync {
    fn get<'a>(&self, model: &'a M) -> &'a dyn FieldValue;
}

/// Reads a typed field from a typed model instance
pub(crate) trait TypedAccessor<M, V>: Send + Sync {
    fn get<'a>(&self, model: &'a M) -> &'a V;
}

pub(crate) struct FieldAccessor<M, V, F> {
    get: F,
    _marker: PhantomData<fn(&M) -> &V>,
}

impl<M, V, F> FieldAccessor<M, V, F> {
    pub(crate) fn new(get: F) -> Self {
        Self {
            get,
            _marker: PhantomData,
        }
    }
}

impl<M, V, F> InstanceAccessor for FieldAccessor<M, V, F>
where
    M: Any,
    V: FieldValue,
    F: for<'a> Fn(&'a M) -> &'a V + Send + Sync,
{
    fn get<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn FieldValue> {
        instance
            .downcast_ref::<M>()
            .map(|model| (self.get)(model) as &dyn FieldValue)
    }
}

impl<M, V, F> ModelAccessor<M> for FieldAccessor<M, V, F>
where
    V: FieldValue,
    F: for<'a> Fn(&'a M) -> &'a V + Send + Sync,
{
    fn get<'a>(&self, model: &'a M) -> &'a dyn FieldValue {
        (self.get)(model)
    }
}

impl<M, V, F> TypedAccessor<M, V> for FieldAccessor<M, V, F>
where
    F: for<'a> Fn(&'a M) -> &'a V + Send + Sync,
{
    fn get<'a>(&self, model: &'a M) -> &'a V {
        (self.get)(model)
    }
}

// ============================================================================
// Required Rule
// ============================================================================

const REQUIRED_MESSAGE: &str = "{field} is required";

/// Required semantics of a field
///
/// `Absent` is the placeholder used by fields without a required rule; it
/// always passes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequiredRule {
    #[default]
    Absent,
    Present {
        message: MessageTemplate,
        severity: Severity,
    },
}

impl RequiredRule {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }

    /// Check `value` against required semantics
    pub fn check(&self, value: &dyn FieldValue) -> Outcome {
        match self {
            Self::Absent => Outcome::Valid,
            Self::Present { .. } => (!is_missing(value)).into(),
        }
    }

    pub(crate) fn evaluate(
        &self,
        value: &dyn FieldValue,
        ctx: &ValidationContext<'_>,
    ) -> Option<Message> {
        let Self::Present { message, severity } = self else {
            return None;
        };

        match self.check(value) {
            Outcome::Invalid => Some(ctx.field_message(*severity, message)),
            Outcome::Valid | Outcome::Indeterminate => None,
        }
    }
}

// ============================================================================
// Field Descriptor
// ============================================================================

/// Metadata of one model field
pub struct FieldDescriptor {
    name: String,
    display_name: String,
    required: RequiredRule,
    rules: Vec<Arc<dyn FieldRule>>,
    shape: TypeShape,
    nested: OnceCell<bool>,
    default_value: Option<String>,
    accessor: Arc<dyn InstanceAccessor>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used in rendered messages
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn required_rule(&self) -> &RequiredRule {
        &self.required
    }

    /// Number of non-required rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub(crate) fn rules(&self) -> &[Arc<dyn FieldRule>] {
        &self.rules
    }

    /// Whether the field declares any rule, required included
    pub fn has_rules(&self) -> bool {
        self.required.is_present() || !self.rules.is_empty()
    }

    /// Declared shape of the field type
    pub fn shape(&self) -> &TypeShape {
        &self.shape
    }

    /// Debug rendering of the field type's zero value
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// Read this field from a model instance
    pub fn value<'a>(&self, instance: &'a dyn Any) -> Option<&'a dyn FieldValue> {
        self.accessor.get(instance)
    }

    /// Nested-model flag, if already resolved
    pub fn nested_resolved(&self) -> Option<bool> {
        self.nested.get().copied()
    }

    /// Whether the field's declared type is itself validatable
    ///
    /// Resolved through `store` on first use when descriptor construction
    /// could not decide it because of a cycle in the model graph.
    pub fn is_nested_model(&self, store: &DescriptorStore) -> Result<bool, DescriptorError> {
        self.nested
            .get_or_try_init(|| store.is_validatable_shape(&self.shape))
            .copied()
    }

    pub(crate) fn resolve_nested(&self, nested: bool) {
        let _ = self.nested.set(nested);
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("required", &self.required.is_present())
            .field("rules_count", &self.rules.len())
            .field("shape", &self.shape)
            .field("nested", &self.nested.get())
            .field("default_value", &self.default_value)
            .finish()
    }
}

// ============================================================================
// Model Descriptor
// ============================================================================

/// Cached metadata of one model type
pub struct ModelDescriptor {
    model_type: TypeKey,
    type_rules: Vec<Arc<dyn ErasedRule>>,
    fields: Vec<FieldDescriptor>,
    self_validation: Option<SelfValidator>,
}

impl ModelDescriptor {
    pub fn model_type(&self) -> TypeKey {
        self.model_type
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn type_rule_count(&self) -> usize {
        self.type_rules.len()
    }

    pub(crate) fn type_rules(&self) -> &[Arc<dyn ErasedRule>] {
        &self.type_rules
    }

    pub fn has_self_validation(&self) -> bool {
        self.self_validation.is_some()
    }

    pub(crate) fn self_validation(&self) -> Option<SelfValidator> {
        self.self_validation
    }

    /// Whether the model declares any rule of its own
    pub(crate) fn has_declared_rules(&self) -> bool {
        !self.type_rules.is_empty()
            || self.self_validation.is_some()
            || self.fields.iter().any(FieldDescriptor::has_rules)
    }
}

impl fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("model_type", &self.model_type)
            .field("type_rules_count", &self.type_rules.len())
            .field("fields", &self.fields)
            .field("has_self_validation", &self.has_self_validation())
            .finish()
    }
}

// ============================================================================
// Builders
// ============================================================================

/// Collects the declaration of model `M`
pub struct ModelBuilder<M> {
    type_rules: Vec<Arc<dyn ErasedRule>>,
    fields: Vec<FieldDescriptor>,
    self_validation: Option<SelfValidator>,
    error: Option<DescriptorError>,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> ModelBuilder<M> {
    fn new() -> Self {
        Self {
            type_rules: Vec::new(),
            fields: Vec::new(),
            self_validation: None,
            error: None,
            _model: PhantomData,
        }
    }

    /// Declare a field
    pub fn field<V, F>(&mut self, name: &str, get: F) -> FieldBuilder<'_, M, V>
    where
        V: FieldValue,
        F: for<'a> Fn(&'a M) -> &'a V + Send + Sync + 'static,
    {
        let model = std::any::type_name::<M>();

        if self.error.is_none() {
            if name.is_empty() {
                self.error = Some(DescriptorError::EmptyFieldName { model });
            } else if self.fields.iter().any(|field| field.name == name) {
                self.error = Some(DescriptorError::DuplicateField {
                    model,
                    field: name.to_string(),
                });
            }
        }

        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            display_name: name.to_string(),
            required: RequiredRule::Absent,
            rules: Vec::new(),
            shape: V::shape(),
            nested: OnceCell::new(),
            default_value: V::default_display(),
            accessor: Arc::new(FieldAccessor::<M, V, F>::new(get)),
        });

        let index = self.fields.len() - 1;
        FieldBuilder {
            field: &mut self.fields[index],
            _marker: PhantomData,
        }
    }

    /// Attach a model-level rule
    pub fn rule(&mut self, rule: impl Rule<M> + 'static) -> &mut Self {
        self.type_rules.push(Arc::new(TypedRule::<M, _>::new(rule)));
        self
    }

    /// Run the model's own [`SelfValidate`] implementation
    pub fn self_validating(&mut self) -> &mut Self
    where
        M: SelfValidate,
    {
        self.self_validation = Some(run_self_validation::<M>);
        self
    }

    fn finish(self) -> Result<ModelDescriptor, DescriptorError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        Ok(ModelDescriptor {
            model_type: TypeKey::of::<M>(),
            type_rules: self.type_rules,
            fields: self.fields,
            self_validation: self.self_validation,
        })
    }
}

/// Configures one declared field
pub struct FieldBuilder<'b, M, V> {
    field: &'b mut FieldDescriptor,
    _marker: PhantomData<fn(&M) -> &V>,
}

impl<M: Model, V: FieldValue> FieldBuilder<'_, M, V> {
    /// Require a present, non-empty, non-default value
    pub fn required(self) -> Self {
        self.required_with(REQUIRED_MESSAGE)
    }

    /// Require a value, with a custom message
    pub fn required_with(self, message: impl Into<MessageTemplate>) -> Self {
        self.field.required = RequiredRule::Present {
            message: message.into(),
            severity: Severity::Error,
        };
        self
    }

    /// Name used in rendered messages
    pub fn display_name(self, name: impl Into<String>) -> Self {
        self.field.display_name = name.into();
        self
    }

    /// Attach a value rule; rules run in attachment order
    pub fn rule<R>(self, rule: R) -> Self
    where
        R: ValueRule<V> + 'static,
    {
        self.field.rules.push(Arc::new(TypedFieldRule::<V, R>::new(rule)));
        self
    }
}
