//! Descriptor store
//!
//! Builds [`ModelDescriptor`]s on first use and caches them for the lifetime
//! of the store. A model type is validatable when it declares any rule or
//! when one of its fields holds a validatable model; types that are neither
//! are remembered as such so the question is answered only once.
//!
//! Cycles in the model graph (`A` holds a `B` which holds an `A`) are handled
//! with an ancestor stack: a field that leads back to a type still under
//! construction is left unresolved. Types whose answer hangs on such a field
//! are held as pending and decided once the outermost lookup completes, so
//! no type is built twice. Unresolved fields of published descriptors are
//! decided lazily on first use, see
//! [`FieldDescriptor::is_nested_model`](crate::FieldDescriptor::is_nested_model).

use crate::descriptor::{ModelDescriptor, ModelType};
use crate::errors::DescriptorError;
use crate::value::{leaf_type_keys, TypeShape};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

static GLOBAL: Lazy<Arc<DescriptorStore>> = Lazy::new(|| Arc::new(DescriptorStore::new()));

// ============================================================================
// Store State
// ============================================================================

struct StoreState {
    descriptors: HashMap<TypeId, Arc<ModelDescriptor>>,
    not_validatable: HashSet<TypeId>,
}

impl StoreState {
    fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
            not_validatable: leaf_type_keys().iter().map(|key| key.id()).collect(),
        }
    }

    /// Cached answer for `id`, if any
    fn lookup(&self, id: TypeId) -> Option<Option<Arc<ModelDescriptor>>> {
        if let Some(descriptor) = self.descriptors.get(&id) {
            return Some(Some(Arc::clone(descriptor)));
        }
        if self.not_validatable.contains(&id) {
            return Some(None);
        }
        None
    }
}

/// Answer of a resolution step
enum Resolution {
    /// Final answer, safe to cache
    Resolved(Option<Arc<ModelDescriptor>>),
    /// Depends on a type still under construction
    Provisional,
}

// ============================================================================
// Descriptor Store
// ============================================================================

/// Thread-safe cache of model descriptors
pub struct DescriptorStore {
    state: RwLock<StoreState>,
    builds: AtomicUsize,
}

impl DescriptorStore {
    /// Create an empty, isolated store
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::new()),
            builds: AtomicUsize::new(0),
        }
    }

    /// Process-wide store shared by default validators
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Descriptor of `model`, or `None` if the type is not validatable
    ///
    /// The descriptor is built at most once per store.
    pub fn get(&self, model: ModelType) -> Result<Option<Arc<ModelDescriptor>>, DescriptorError> {
        if let Some(cached) = self.state.read().lookup(model.id()) {
            trace!(model = model.name(), "Descriptor cache hit");
            return Ok(cached);
        }

        let mut state = self.state.write();
        if let Some(cached) = state.lookup(model.id()) {
            return Ok(cached);
        }

        let mut walk = Walk::default();
        let answer = self.resolve(&mut state, model, &mut walk)?;
        settle(&mut state, walk.pending);

        match answer {
            Resolution::Resolved(descriptor) => Ok(descriptor),
            Resolution::Provisional => Ok(state.lookup(model.id()).flatten()),
        }
    }

    /// Whether instances of `model` are validatable
    pub fn is_validatable(&self, model: ModelType) -> Result<bool, DescriptorError> {
        Ok(self.get(model)?.is_some())
    }

    /// Whether a field of `shape` holds a validatable model
    ///
    /// Sequences are unwrapped one level only.
    pub fn is_validatable_shape(&self, shape: &TypeShape) -> Result<bool, DescriptorError> {
        match shape.nested_model() {
            Some(model) => {
                trace!(model = model.name(), "Resolving nested model flag");
                self.is_validatable(model)
            }
            None => Ok(false),
        }
    }

    /// Number of descriptors built so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    /// Number of cached validatable descriptors
    pub fn len(&self) -> usize {
        self.state.read().descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn resolve(
        &self,
        state: &mut StoreState,
        model: ModelType,
        walk: &mut Walk,
    ) -> Result<Resolution, DescriptorError> {
        if let Some(cached) = state.lookup(model.id()) {
            return Ok(Resolution::Resolved(cached));
        }
        if walk.ancestors.contains(&model.id()) {
            trace!(model = model.name(), "Cycle in model graph");
            return Ok(Resolution::Provisional);
        }
        if walk.pending.contains_key(&model.id()) {
            return Ok(Resolution::Provisional);
        }

        let descriptor = model.define()?;
        self.builds.fetch_add(1, Ordering::Relaxed);

        walk.ancestors.push(model.id());
        let mut provisional = false;
        let mut nested = false;

        for field in descriptor.fields() {
            let answer = match field.shape() {
                TypeShape::Leaf(key) => {
                    state.not_validatable.insert(key.id());
                    Resolution::Resolved(None)
                }
                shape => match shape.nested_model() {
                    Some(inner) => self.resolve(state, inner, walk)?,
                    None => Resolution::Resolved(None),
                },
            };

            match answer {
                Resolution::Resolved(inner) => {
                    nested |= inner.is_some();
                    field.resolve_nested(inner.is_some());
                }
                Resolution::Provisional => provisional = true,
            }
        }
        walk.ancestors.pop();

        if descriptor.has_declared_rules() || nested {
            return Ok(Resolution::Resolved(Some(publish(state, descriptor))));
        }

        if provisional {
            trace!(model = model.name(), "Descriptor pending on a cycle");
            walk.pending.insert(model.id(), descriptor);
            return Ok(Resolution::Provisional);
        }

        state.not_validatable.insert(model.id());
        debug!(model = model.name(), "Model type is not validatable");
        Ok(Resolution::Resolved(None))
    }
}

/// Bookkeeping of one top-level resolution
#[derive(Default)]
struct Walk {
    /// Types under construction, outermost first
    ancestors: Vec<TypeId>,
    /// Built descriptors whose answer depends on a cycle
    pending: HashMap<TypeId, ModelDescriptor>,
}

/// Decide the descriptors left pending once every cycle has closed
///
/// A pending type is validatable when one of its undecided fields reaches
/// a published descriptor, directly or through other pending types.
fn settle(state: &mut StoreState, pending: HashMap<TypeId, ModelDescriptor>) {
    if pending.is_empty() {
        return;
    }

    let mut validatable = HashSet::new();
    loop {
        let before = validatable.len();
        for (id, descriptor) in &pending {
            if !validatable.contains(id)
                && undecided_targets(descriptor).any(|target| {
                    state.descriptors.contains_key(&target) || validatable.contains(&target)
                })
            {
                validatable.insert(*id);
            }
        }
        if validatable.len() == before {
            break;
        }
    }

    for (id, descriptor) in pending {
        for field in descriptor.fields() {
            if field.nested_resolved().is_none() {
                if let Some(target) = field.shape().nested_model() {
                    let reaches = state.descriptors.contains_key(&target.id())
                        || validatable.contains(&target.id());
                    field.resolve_nested(reaches);
                }
            }
        }

        if validatable.contains(&id) {
            publish(state, descriptor);
        } else {
            state.not_validatable.insert(id);
            debug!(
                model = descriptor.model_type().name(),
                "Model type is not validatable"
            );
        }
    }
}

fn publish(state: &mut StoreState, descriptor: ModelDescriptor) -> Arc<ModelDescriptor> {
    let descriptor = Arc::new(descriptor);
    let model_type = descriptor.model_type();
    state
        .descriptors
        .insert(model_type.id(), Arc::clone(&descriptor));
    debug!(
        model = model_type.name(),
        fields = descriptor.fields().len(),
        type_rules = descriptor.type_rule_count(),
        "Built model descriptor"
    );
    descriptor
}

/// Model types behind the fields of `descriptor` that are still undecided
fn undecided_targets(descriptor: &ModelDescriptor) -> impl Iterator<Item = TypeId> + '_ {
    descriptor
        .fields()
        .iter()
        .filter(|field| field.nested_resolved().is_none())
        .filter_map(|field| field.shape().nested_model())
        .map(|target| target.id())
}

impl Default for DescriptorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DescriptorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("DescriptorStore")
            .field("descriptors_count", &state.descriptors.len())
            .field("not_validatable_count", &state.not_validatable.len())
            .field("builds", &self.build_count())
            .finish()
    }
}
