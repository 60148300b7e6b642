//! Injected services and message templates
//!
//! Rules may depend on collaborators that are not part of the model, such as a
//! lookup table or a clock. Those are registered on a [`Services`] container
//! and resolved by type from the validation context. A rule whose service is
//! missing should answer [`Outcome::Indeterminate`](crate::Outcome).

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Services
// ============================================================================

/// Type-keyed service container
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    resources: Option<Arc<dyn MessageResources>>,
}

impl Services {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service value
    pub fn with<T: Any + Send + Sync>(self, value: T) -> Self {
        self.with_shared(Arc::new(value))
    }

    /// Register an already shared service value
    pub fn with_shared<T: Any + Send + Sync>(mut self, value: Arc<T>) -> Self {
        self.entries.insert(TypeId::of::<T>(), value);
        self
    }

    /// Register the message resources used by resource templates
    pub fn with_resources(mut self, resources: impl MessageResources + 'static) -> Self {
        self.resources = Some(Arc::new(resources));
        self
    }

    /// Resolve a service by type
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|entry| entry.downcast::<T>().ok())
    }

    /// Whether a service of type `T` is registered
    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Registered message resources
    pub fn resources(&self) -> Option<&dyn MessageResources> {
        self.resources.as_deref()
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no services are registered
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("services_count", &self.entries.len())
            .field("has_resources", &self.resources.is_some())
            .finish()
    }
}

// ============================================================================
// Message Resources
// ============================================================================

/// Source of message text for resource-keyed templates
pub trait MessageResources: Send + Sync {
    /// Look up the text registered under `key`
    fn lookup(&self, key: &str) -> Option<String>;
}

impl MessageResources for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ============================================================================
// Message Template
// ============================================================================

/// Message text attached to a rule
///
/// Templates may reference the validated member with `{field}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageTemplate {
    /// Literal text
    Static(Cow<'static, str>),
    /// Key resolved through [`MessageResources`]; the key itself is used when
    /// no resource is registered
    Resource(Cow<'static, str>),
}

impl MessageTemplate {
    /// Create a literal template
    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Static(text.into())
    }

    /// Create a resource-keyed template
    pub fn resource(key: impl Into<Cow<'static, str>>) -> Self {
        Self::Resource(key.into())
    }

    /// Render the template for `field`
    pub fn render(&self, field: &str, services: &Services) -> String {
        let raw = match self {
            Self::Static(text) => text.to_string(),
            Self::Resource(key) => services
                .resources()
                .and_then(|resources| resources.lookup(key))
                .unwrap_or_else(|| key.to_string()),
        };

        raw.replace("{field}", field)
    }
}

impl From<&'static str> for MessageTemplate {
    fn from(text: &'static str) -> Self {
        Self::Static(Cow::Borrowed(text))
    }
}

impl From<String> for MessageTemplate {
    fn from(text: String) -> Self {
        Self::Static(Cow::Owned(text))
    }
}

// ============================================================================
// Tests
// ============================================================================
