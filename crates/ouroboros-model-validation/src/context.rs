//! Validation context
//!
//! A [`ValidationContext`] describes the position of the validator in the
//! object graph: the instance under validation, the member being checked and
//! the qualified path prefix that leads to it (e.g. `orders[2].lines[0].`).
//! It also carries the injected services and the per-run state shared by all
//! contexts of one validation call.

use crate::config::ValidatorConfig;
use crate::descriptor::FieldDescriptor;
use crate::errors::{Message, Severity};
use crate::services::{MessageTemplate, Services};
use crate::value::FieldValue;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::ops::Deref;
use std::sync::Arc;

// ============================================================================
// Validation State
// ============================================================================

/// Identity of a visited instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct InstanceKey {
    addr: usize,
    type_id: TypeId,
}

/// Mutable state of a single validation run
#[derive(Default)]
pub struct ValidationState {
    messages: RefCell<Vec<Message>>,
    visited: RefCell<HashSet<InstanceKey>>,
}

impl ValidationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root context for `instance`
    pub fn context<'a>(
        &'a self,
        instance: &'a dyn Any,
        services: &'a Services,
        config: &'a ValidatorConfig,
    ) -> ValidationContext<'a> {
        ValidationContext {
            path: String::new(),
            instance,
            member: None,
            services,
            config,
            state: self,
        }
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages.into_inner()
    }
}

impl fmt::Debug for ValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationState")
            .field("messages_count", &self.messages.borrow().len())
            .field("visited_count", &self.visited.borrow().len())
            .finish()
    }
}

// ============================================================================
// Validation Context
// ============================================================================

/// Position of the validator in the object graph
#[derive(Clone)]
pub struct ValidationContext<'a> {
    path: String,
    instance: &'a dyn Any,
    member: Option<&'a FieldDescriptor>,
    services: &'a Services,
    config: &'a ValidatorConfig,
    state: &'a ValidationState,
}

impl<'a> ValidationContext<'a> {
    /// Qualified prefix of the current instance, ending with `.` when non-empty
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Instance under validation
    pub fn instance(&self) -> &'a dyn Any {
        self.instance
    }

    /// Member currently being checked
    pub fn member(&self) -> Option<&'a FieldDescriptor> {
        self.member
    }

    pub fn member_name(&self) -> Option<&'a str> {
        self.member.map(FieldDescriptor::name)
    }

    pub fn services(&self) -> &'a Services {
        self.services
    }

    pub fn config(&self) -> &'a ValidatorConfig {
        self.config
    }

    /// Resolve an injected service
    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services.get::<T>()
    }

    /// Value of the current member, if any
    pub fn value(&self) -> Option<&'a dyn FieldValue> {
        self.member.and_then(|member| member.value(self.instance))
    }

    /// Context for checking `field` of the current instance
    pub fn for_field<'b>(&'b self, field: &'b FieldDescriptor) -> ValidationContext<'b> {
        ValidationContext {
            path: self.path.clone(),
            instance: self.instance,
            member: Some(field),
            services: self.services,
            config: self.config,
            state: self.state,
        }
    }

    /// Context for a nested instance reached through the current member
    ///
    /// `index` is the element position when the member is a sequence.
    pub fn nested<'b>(&'b self, value: &'b dyn Any, index: Option<usize>) -> ValidationContext<'b> {
        let mut path = self.path.clone();
        if let Some(name) = self.member_name() {
            path.push_str(name);
        }
        if let Some(index) = index {
            path.push_str(&format!("[{}]", index));
        }
        path.push('.');

        ValidationContext {
            path,
            instance: value,
            member: None,
            services: self.services,
            config: self.config,
            state: self.state,
        }
    }

    /// Typed view of the context, when the instance is an `M`
    pub fn narrow<M: Any>(&self) -> Option<ModelContext<'a, M>> {
        let model = self.instance.downcast_ref::<M>()?;
        Some(ModelContext {
            inner: self.clone(),
            model,
        })
    }

    /// Record a message, qualified with the current path
    ///
    /// Returns false when the message falls below the severity floor.
    pub fn record(&self, message: Message) -> bool {
        if !self.config.retains(message.severity) {
            return false;
        }

        let qualified = self.qualify(message);
        self.state.messages.borrow_mut().push(qualified);
        true
    }

    /// Prefix the message's member paths with the current path
    pub fn qualify(&self, message: Message) -> Message {
        message.with_prefix(&self.path)
    }

    /// Mark the current instance as visited; false if it already was
    ///
    /// Zero-sized instances share one address and cannot close a reference
    /// cycle, so they are always entered.
    pub(crate) fn enter(&self) -> bool {
        if mem::size_of_val(self.instance) == 0 {
            return true;
        }

        let key = InstanceKey {
            addr: self.instance as *const dyn Any as *const () as usize,
            type_id: Any::type_id(self.instance),
        };
        self.state.visited.borrow_mut().insert(key)
    }

    /// Failure message for the current member rendered from `template`
    pub fn field_message(&self, severity: Severity, template: &MessageTemplate) -> Message {
        let (name, display) = match self.member {
            Some(member) => (member.name(), member.display_name()),
            None => ("", ""),
        };

        let text = template.render(display, self.services);
        if name.is_empty() {
            Message::new(severity, text, Vec::<String>::new())
        } else {
            Message::new(severity, text, [name])
        }
    }
}

impl fmt::Debug for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationContext")
            .field("path", &self.path)
            .field("member", &self.member_name())
            .field("services", self.services)
            .field("config", self.config)
            .finish()
    }
}

// ============================================================================
// Model Context
// ============================================================================

/// Validation context narrowed to a model of type `M`
pub struct ModelContext<'a, M> {
    inner: ValidationContext<'a>,
    model: &'a M,
}

impl<'a, M> ModelContext<'a, M> {
    /// The model under validation
    pub fn model(&self) -> &'a M {
        self.model
    }

    pub fn context(&self) -> &ValidationContext<'a> {
        &self.inner
    }
}

impl<'a, M> Deref for ModelContext<'a, M> {
    type Target = ValidationContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<M> fmt::Debug for ModelContext<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("model", &std::any::type_name::<M>())
            .field("context", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_context_has_empty_path() {
        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::default();
        let instance = 5_i32;
        let ctx = state.context(&instance, &services, &config);

        assert_eq!(ctx.path(), "");
        assert!(ctx.member().is_none());
        assert!(ctx.value().is_none());
        assert_eq!(ctx.narrow::<i32>().map(|m| *m.model()), Some(5));
        assert!(ctx.narrow::<String>().is_none());
    }

    #[test]
    fn test_nested_paths() {
        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::default();
        let root = ();
        let element = 1_u8;
        let ctx = state.context(&root, &services, &config);

        let indexed = ctx.nested(&element, Some(2));
        assert_eq!(indexed.path(), "[2].");

        indexed.record(Message::error("bad", ["sku"]));
        assert_eq!(
            state.into_messages()[0].member_paths,
            vec!["[2].sku".to_string()]
        );
    }

    #[test]
    fn test_record_applies_severity_floor() {
        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::new().errors_only();
        let root = ();
        let ctx = state.context(&root, &services, &config);

        assert!(!ctx.record(Message::warning("odd", ["a"])));
        assert!(!ctx.record(Message::new(Severity::None, "fine", ["a"])));
        assert!(ctx.record(Message::error("bad", ["a"])));
        assert_eq!(state.into_messages().len(), 1);
    }

    #[test]
    fn test_enter_tracks_instances() {
        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::default();
        let first = 1_u32;
        let second = 1_u32;

        assert!(state.context(&first, &services, &config).enter());
        assert!(!state.context(&first, &services, &config).enter());
        assert!(state.context(&second, &services, &config).enter());
    }

    #[test]
    fn test_enter_always_admits_zero_sized_instances() {
        struct Marker;

        let state = ValidationState::new();
        let services = Services::new();
        let config = ValidatorConfig::default();
        let markers = [Marker, Marker];

        assert!(state.context(&markers[0], &services, &config).enter());
        assert!(state.context(&markers[1], &services, &config).enter());
        assert!(state.context(&markers[0], &services, &config).enter());
    }
}
