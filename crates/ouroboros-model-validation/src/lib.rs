//! Ouroboros Model Validation
//!
//! Declarative validation of in-memory data models.
//!
//! A model type declares its fields and rules once through [`Model::describe`].
//! The [`DescriptorStore`] turns that declaration into a cached
//! [`ModelDescriptor`], and the [`ModelValidator`] walks live instances
//! depth-first, descending into nested models and sequence elements, and
//! collects every failure as a path-qualified [`Message`] such as
//! `orders[2].lines[0].sku`.
//!
//! # Features
//!
//! - **Default**: Descriptor store, validator and built-in rules
//! - **serde**: `Serialize` for [`Message`] and [`Severity`]
//!
//! # Example
//!
//! ```rust
//! use ouroboros_model_validation::rules::{min, not_blank};
//! use ouroboros_model_validation::{validate, DescriptorError, Model, ModelBuilder};
//!
//! struct Line {
//!     sku: String,
//!     quantity: u32,
//! }
//!
//! impl Model for Line {
//!     fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
//!         model.field("sku", |l| &l.sku).required().rule(not_blank());
//!         model.field("quantity", |l| &l.quantity).rule(min(1));
//!         Ok(())
//!     }
//! }
//!
//! struct Order {
//!     lines: Vec<Line>,
//! }
//!
//! impl Model for Order {
//!     fn describe(model: &mut ModelBuilder<Self>) -> Result<(), DescriptorError> {
//!         model.field("lines", |o| &o.lines).required();
//!         Ok(())
//!     }
//! }
//!
//! let order = Order {
//!     lines: vec![
//!         Line { sku: "A-1".to_string(), quantity: 2 },
//!         Line { sku: String::new(), quantity: 1 },
//!     ],
//! };
//!
//! let result = validate(order).unwrap();
//! assert_eq!(result.messages.len(), 1);
//! assert_eq!(result.messages[0].member(), Some("lines[1].sku"));
//! ```

// Public modules
pub mod config;
pub mod context;
pub mod descriptor;
pub mod errors;
pub mod formats;
pub mod rules;
pub mod services;
pub mod store;
pub mod validators;
pub mod value;

// Re-export commonly used types
pub use config::ValidatorConfig;
pub use context::{ModelContext, ValidationContext, ValidationState};
pub use descriptor::{
    FieldBuilder, FieldDescriptor, Model, ModelBuilder, ModelDescriptor, ModelType, RequiredRule,
    SelfValidate,
};
pub use errors::{
    DescriptorError, Message, RuleError, Severity, ValidatorError, ValidatorResult,
};
pub use rules::{conditional_required, Outcome, Rule, RuleSet, Selector, ValueRule};
pub use services::{MessageResources, MessageTemplate, Services};
pub use store::DescriptorStore;
pub use validators::{validate, ModelValidator, Validated};
pub use value::{is_missing, FieldValue, HasLength, TypeKey, TypeShape};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
