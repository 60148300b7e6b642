//! Opaque field values
//!
//! The engine never inspects a field value beyond what [`FieldValue`]
//! exposes: a default check, transparent unwrapping of wrapper types,
//! element enumeration for sequences and the declared [`TypeShape`] used
//! while building model descriptors.

use crate::descriptor::{Model, ModelType};
use std::any::{type_name, Any, TypeId};
use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::{Arc, OnceLock};

// ============================================================================
// Type Identity
// ============================================================================

/// Runtime type identity with a readable name
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key for type `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Fully qualified type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ============================================================================
// Type Shape
// ============================================================================

/// Declared shape of a field type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeShape {
    /// A value the engine never descends into
    Leaf(TypeKey),
    /// A model type
    Model(ModelType),
    /// A sequence of elements
    Sequence(Box<TypeShape>),
}

impl TypeShape {
    /// Model type reachable from this shape, unwrapping at most one sequence
    pub fn nested_model(&self) -> Option<ModelType> {
        match self {
            Self::Model(model) => Some(*model),
            Self::Sequence(inner) => match inner.as_ref() {
                Self::Model(model) => Some(*model),
                _ => None,
            },
            Self::Leaf(_) => None,
        }
    }
}

// ============================================================================
// Field Value
// ============================================================================

/// Upcast helper for trait objects
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A value held by a model field
///
/// Implemented for primitives, strings, common containers, transparent
/// wrappers and every [`Model`].
pub trait FieldValue: AsAny {
    /// Declared shape of this type
    fn shape() -> TypeShape
    where
        Self: Sized;

    /// Whether the value equals its type's zero value
    fn is_default(&self) -> bool;

    /// Unwrap transparent wrappers; `None` when nothing is present
    fn resolve(&self) -> Option<&dyn FieldValue>;

    /// Elements, when the value is a sequence
    fn elements(&self) -> Option<Vec<&dyn FieldValue>> {
        None
    }

    /// Debug rendering of the type's zero value
    fn default_display() -> Option<String>
    where
        Self: Sized,
    {
        None
    }
}

/// Required-check shared by field descriptors and conditional rules
///
/// A value is missing when nothing is present, when it is an empty sequence,
/// or when it equals its type's zero value.
pub fn is_missing(value: &dyn FieldValue) -> bool {
    match value.resolve() {
        None => true,
        Some(resolved) => match resolved.elements() {
            Some(items) => items.is_empty(),
            None => resolved.is_default(),
        },
    }
}

macro_rules! leaf_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn shape() -> TypeShape {
                    TypeShape::Leaf(TypeKey::of::<$ty>())
                }

                fn is_default(&self) -> bool {
                    *self == <$ty>::default()
                }

                fn resolve(&self) -> Option<&dyn FieldValue> {
                    Some(self)
                }

                fn default_display() -> Option<String> {
                    Some(format!("{:?}", <$ty>::default()))
                }
            }
        )*
    };
}

leaf_values!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    &'static str,
);

/// Type keys of the leaf types known to never be validatable
pub(crate) fn leaf_type_keys() -> Vec<TypeKey> {
    vec![
        TypeKey::of::<()>(),
        TypeKey::of::<bool>(),
        TypeKey::of::<char>(),
        TypeKey::of::<i8>(),
        TypeKey::of::<i16>(),
        TypeKey::of::<i32>(),
        TypeKey::of::<i64>(),
        TypeKey::of::<i128>(),
        TypeKey::of::<isize>(),
        TypeKey::of::<u8>(),
        TypeKey::of::<u16>(),
        TypeKey::of::<u32>(),
        TypeKey::of::<u64>(),
        TypeKey::of::<u128>(),
        TypeKey::of::<usize>(),
        TypeKey::of::<f32>(),
        TypeKey::of::<f64>(),
        TypeKey::of::<String>(),
        TypeKey::of::<&'static str>(),
    ]
}

impl<M: Model> FieldValue for M {
    fn shape() -> TypeShape {
        TypeShape::Model(ModelType::of::<M>())
    }

    fn is_default(&self) -> bool {
        false
    }

    fn resolve(&self) -> Option<&dyn FieldValue> {
        Some(self)
    }
}

// ============================================================================
// Transparent Wrappers
// ============================================================================

impl<T: FieldValue> FieldValue for Option<T> {
    fn shape() -> TypeShape {
        T::shape()
    }

    fn is_default(&self) -> bool {
        self.as_ref().map_or(true, FieldValue::is_default)
    }

    fn resolve(&self) -> Option<&dyn FieldValue> {
        self.as_ref().and_then(FieldValue::resolve)
    }

    fn default_display() -> Option<String> {
        Some("None".to_string())
    }
}

macro_rules! shared_values {
    ($($wrapper:ident),*) => {
        $(
            impl<T: FieldValue> FieldValue for $wrapper<T> {
                fn shape() -> TypeShape {
                    T::shape()
                }

                fn is_default(&self) -> bool {
                    (**self).is_default()
                }

                fn resolve(&self) -> Option<&dyn FieldValue> {
                    (**self).resolve()
                }

                fn default_display() -> Option<String> {
                    T::default_display()
                }
            }
        )*
    };
}

shared_values!(Rc, Arc);

macro_rules! lazy_values {
    ($($cell:ident),*) => {
        $(
            impl<T: FieldValue> FieldValue for $cell<T> {
                fn shape() -> TypeShape {
                    T::shape()
                }

                fn is_default(&self) -> bool {
                    self.get().map_or(true, FieldValue::is_default)
                }

                fn resolve(&self) -> Option<&dyn FieldValue> {
                    self.get().and_then(FieldValue::resolve)
                }
            }
        )*
    };
}

lazy_values!(OnceCell, OnceLock);

// ============================================================================
// Sequences
// ============================================================================

macro_rules! sequence_values {
    ($($seq:ident),*) => {
        $(
            impl<T: FieldValue> FieldValue for $seq<T> {
                fn shape() -> TypeShape {
                    TypeShape::Sequence(Box::new(T::shape()))
                }

                fn is_default(&self) -> bool {
                    self.is_empty()
                }

                fn resolve(&self) -> Option<&dyn FieldValue> {
                    Some(self)
                }

                fn elements(&self) -> Option<Vec<&dyn FieldValue>> {
                    Some(self.iter().map(|item| item as &dyn FieldValue).collect())
                }

                fn default_display() -> Option<String> {
                    Some("[]".to_string())
                }
            }
        )*
    };
}

sequence_values!(Vec, VecDeque, BTreeSet);

impl<T, S> FieldValue for HashSet<T, S>
where
    T: FieldValue,
    S: 'static,
{
    fn shape() -> TypeShape {
        TypeShape::Sequence(Box::new(T::shape()))
    }

    fn is_default(&self) -> bool {
        self.is_empty()
    }

    fn resolve(&self) -> Option<&dyn FieldValue> {
        Some(self)
    }

    fn elements(&self) -> Option<Vec<&dyn FieldValue>> {
        Some(self.iter().map(|item| item as &dyn FieldValue).collect())
    }

    fn default_display() -> Option<String> {
        Some("{}".to_string())
    }
}

impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    fn shape() -> TypeShape {
        TypeShape::Sequence(Box::new(T::shape()))
    }

    fn is_default(&self) -> bool {
        N == 0
    }

    fn resolve(&self) -> Option<&dyn FieldValue> {
        Some(self)
    }

    fn elements(&self) -> Option<Vec<&dyn FieldValue>> {
        Some(self.iter().map(|item| item as &dyn FieldValue).collect())
    }
}

// ============================================================================
// Length
// ============================================================================

/// Values with a measurable length
pub trait HasLength {
    fn length(&self) -> usize;
}

impl HasLength for String {
    /// Length in characters, not bytes
    fn length(&self) -> usize {
        self.chars().count()
    }
}

impl HasLength for &'static str {
    fn length(&self) -> usize {
        self.chars().count()
    }
}

impl<T> HasLength for Vec<T> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T> HasLength for VecDeque<T> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T> HasLength for BTreeSet<T> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T, S> HasLength for HashSet<T, S> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<T, const N: usize> HasLength for [T; N] {
    fn length(&self) -> usize {
        N
    }
}

impl<K, V> HasLength for BTreeMap<K, V> {
    fn length(&self) -> usize {
        self.len()
    }
}

impl<K, V, S> HasLength for HashMap<K, V, S> {
    fn length(&self) -> usize {
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_defaults() {
        assert!(0_i32.is_default());
        assert!(!7_i32.is_default());
        assert!(String::new().is_default());
        assert!(!"x".to_string().is_default());
        assert_eq!(<i64 as FieldValue>::default_display(), Some("0".to_string()));
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(&Option::<String>::None));
        assert!(is_missing(&Some(String::new())));
        assert!(!is_missing(&Some("a".to_string())));
        assert!(is_missing(&Vec::<i32>::new()));
        assert!(!is_missing(&vec![0_i32]));
        assert!(is_missing(&0_u8));
    }

    #[test]
    fn test_transparent_wrappers() {
        let shared = Arc::new(Some(5_i32));
        let resolved = shared.resolve().expect("value present");
        assert_eq!(resolved.as_any().downcast_ref::<i32>(), Some(&5));

        let cell: OnceCell<String> = OnceCell::new();
        assert!(cell.resolve().is_none());
        assert!(cell.is_default());
    }

    #[test]
    fn test_sequence_shapes() {
        assert_eq!(
            <Vec<i32> as FieldValue>::shape(),
            TypeShape::Sequence(Box::new(TypeShape::Leaf(TypeKey::of::<i32>())))
        );
        assert_eq!(
            <Option<Arc<String>> as FieldValue>::shape(),
            TypeShape::Leaf(TypeKey::of::<String>())
        );
        assert!(<Vec<Vec<i32>> as FieldValue>::shape().nested_model().is_none());
    }

    #[test]
    fn test_elements() {
        let values = vec![1_i32, 2, 3];
        let items = values.elements().expect("sequence");
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_any().downcast_ref::<i32>(), Some(&2));
        assert!(5_i32.elements().is_none());
    }

    #[test]
    fn test_length() {
        assert_eq!("héllo".to_string().length(), 5);
        assert_eq!(vec![1, 2].length(), 2);
    }
}
