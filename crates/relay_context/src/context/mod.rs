//! The resource store and requirement resolution.
//!
//! A [`Context`] maps [`ResourceKey`]s to stored values or resolvers. It
//! resolves a callable's [`RequirementsDeclaration`] into [`Arguments`],
//! invokes the callable, and files the result back per its
//! [`ReturnsDeclaration`].
//!
//! # Hierarchical Scoping
//!
//! Contexts can be nested. A child sees everything its ancestors hold, and a
//! hit found in an ancestor is cached in the child:
//!
//! ```text
//! Context (run: Config, Connection)
//!    │
//!    └── Child (scope body: Transaction)
//!           │
//!           └── Child (nested scope body: Savepoint)
//! ```
//!
//! Adding a key the child already holds locally fails; adding a key only an
//! ancestor holds shadows it.
//!
//! # Resolution
//!
//! For each requirement, in order:
//!
//! 1. Try each candidate key (see [`Requirement::candidate_keys`]). A resolver
//!    found there is given the declared default unless projections follow.
//! 2. Apply the requirement's projections; a projection yielding nothing
//!    stops the chain.
//! 3. Fall back to the declared default.
//! 4. Bind the context itself if the requirement asks for it.
//! 5. Otherwise fail with [`ResourceError::Unsatisfied`].

mod arguments;

use hashbrown::HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

pub use arguments::Arguments;
pub(crate) use arguments::Slot;

use crate::declaration::{
    DefaultValue, Requirement, RequirementsDeclaration, ReturnsDeclaration, Target,
};
use crate::error::{CallError, ResourceError};
use crate::resource::{ResolvableValue, Resolver, ResourceKey, Value};
use crate::step::{Returned, Step};

/// The per-execution resource store.
///
/// All operations take `&self`: resolvers receive the context they are
/// resolving in and may add to it or replace themselves while it is being
/// read. No lock is held while a resolver or callable runs.
///
/// # Ownership Model
///
/// ```text
/// Context<'parent>
/// ├── parent: Option<&'parent Context>   (read-only parent access)
/// ├── entries: RwLock<HashMap>            (owned, added in this scope)
/// └── cache: RwLock<HashMap>              (owned, hits found in ancestors)
/// ```
#[derive(Default)]
pub struct Context<'parent> {
    parent: Option<&'parent Context<'parent>>,
    entries: RwLock<HashMap<ResourceKey, ResolvableValue>>,
    cache: RwLock<HashMap<ResourceKey, ResolvableValue>>,
}

impl<'parent> Context<'parent> {
    /// Creates an empty root context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: None,
            entries: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a child context backed by this one.
    #[must_use]
    pub fn child(&'parent self) -> Context<'parent> {
        Context {
            parent: Some(self),
            entries: RwLock::new(HashMap::new()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Builder pattern: adds a value under its type and returns self.
    ///
    /// # Errors
    ///
    /// Same as [`add`](Self::add).
    pub fn with<T: Send + Sync + 'static>(self, value: T) -> Result<Self, ResourceError> {
        self.add(value)?;
        Ok(self)
    }

    /// Returns the parent context, if any.
    #[must_use]
    pub fn parent(&self) -> Option<&Context<'parent>> {
        self.parent
    }

    // ─────────────────────────────────────────────────────────────────────
    // Store operations
    // ─────────────────────────────────────────────────────────────────────

    /// Adds a value under the key of its type.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Duplicate`] if this context already holds the key.
    pub fn add<T: Send + Sync + 'static>(&self, value: T) -> Result<(), ResourceError> {
        self.add_value(Value::new(value))
    }

    /// Adds a type-erased value under the key of its runtime type.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Duplicate`] if this context already holds the key.
    pub fn add_value(&self, value: Value) -> Result<(), ResourceError> {
        let key = ResourceKey::from(value.type_key());
        self.insert(key, ResolvableValue::Value(value))
    }

    /// Adds a value under an explicit key.
    ///
    /// # Errors
    ///
    /// [`ResourceError::InvalidKey`] for the empty key and
    /// [`ResourceError::Duplicate`] if this context already holds the key.
    pub fn add_as(&self, key: ResourceKey, value: Value) -> Result<(), ResourceError> {
        self.insert(key, ResolvableValue::Value(value))
    }

    /// Registers a resolver to be called whenever `key` is read.
    ///
    /// # Errors
    ///
    /// Same as [`add_as`](Self::add_as).
    pub fn add_resolver(&self, key: ResourceKey, resolver: Resolver) -> Result<(), ResourceError> {
        self.insert(key, ResolvableValue::Resolver(resolver))
    }

    /// Stores `entry` under `key` in this context, overwriting any local entry.
    ///
    /// Memoizing resolvers use this to replace themselves with their value.
    ///
    /// # Errors
    ///
    /// [`ResourceError::InvalidKey`] for the empty key.
    pub fn replace(&self, key: ResourceKey, entry: ResolvableValue) -> Result<(), ResourceError> {
        if !key.is_valid() {
            return Err(ResourceError::InvalidKey);
        }
        tracing::trace!(key = %key, "replacing resource");
        self.entries.write().insert(key, entry);
        Ok(())
    }

    /// Removes the local entry under `key`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Missing`] if this context holds no such entry.
    pub fn remove(&self, key: &ResourceKey) -> Result<ResolvableValue, ResourceError> {
        self.remove_if_present(key)
            .ok_or_else(|| ResourceError::Missing { key: key.clone() })
    }

    /// Removes the local entry under `key`, if there is one.
    pub fn remove_if_present(&self, key: &ResourceKey) -> Option<ResolvableValue> {
        self.entries.write().remove(key)
    }

    fn insert(&self, key: ResourceKey, entry: ResolvableValue) -> Result<(), ResourceError> {
        if !key.is_valid() {
            return Err(ResourceError::InvalidKey);
        }
        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(ResourceError::Duplicate { key });
        }
        tracing::trace!(key = %key, resolver = entry.is_resolver(), "adding resource");
        entries.insert(key, entry);
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup (hierarchical)
    // ─────────────────────────────────────────────────────────────────────

    /// Returns `true` if `key` is held here or by any ancestor.
    #[must_use]
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.contains_local(key)
            || self.cache.read().contains_key(key)
            || self.parent.is_some_and(|parent| parent.contains(key))
    }

    /// Returns `true` if `key` was added to this context itself.
    #[must_use]
    pub fn contains_local(&self, key: &ResourceKey) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the number of entries added to this context itself.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing was added to this context itself.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns the keys added to this context itself, sorted by display form.
    #[must_use]
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.entries.read().keys().cloned().collect();
        keys.sort_by_cached_key(ToString::to_string);
        keys
    }

    /// Reads `key`, returning `None` if nothing resolves.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Provider`] if a resolver fails.
    pub fn get(&self, key: &ResourceKey) -> Result<Option<Value>, ResourceError> {
        self.get_or(key, None)
    }

    /// Reads `key`, returning `default` if nothing is stored.
    ///
    /// A resolver found under `key` is called with this context and
    /// `default`, and its answer is returned as is.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Provider`] if a resolver fails.
    pub fn get_or(
        &self,
        key: &ResourceKey,
        default: Option<&Value>,
    ) -> Result<Option<Value>, ResourceError> {
        match self.lookup(key) {
            None => Ok(default.cloned()),
            Some(entry) => self.read_entry(key, entry, default),
        }
    }

    fn read_entry(
        &self,
        key: &ResourceKey,
        entry: ResolvableValue,
        default: Option<&Value>,
    ) -> Result<Option<Value>, ResourceError> {
        match entry {
            ResolvableValue::Value(value) => Ok(Some(value)),
            ResolvableValue::Resolver(resolver) => {
                tracing::trace!(key = %key, "running resolver");
                resolver(self, default).map_err(|source| ResourceError::Provider {
                    key: key.clone(),
                    source,
                })
            }
        }
    }

    /// Reads the `T` stored under its type.
    ///
    /// Returns `Ok(None)` if nothing is stored or the stored value is not a `T`.
    ///
    /// # Errors
    ///
    /// [`ResourceError::Provider`] if a resolver fails.
    pub fn get_as<T: Send + Sync + 'static>(&self) -> Result<Option<Arc<T>>, ResourceError> {
        Ok(self
            .get(&ResourceKey::of::<T>())?
            .and_then(|value| value.downcast::<T>()))
    }

    /// Finds the entry for `key`, walking up the parents on a local miss and
    /// caching an ancestor's entry here.
    fn lookup(&self, key: &ResourceKey) -> Option<ResolvableValue> {
        if let Some(entry) = self.entries.read().get(key) {
            return Some(entry.clone());
        }
        if let Some(entry) = self.cache.read().get(key) {
            return Some(entry.clone());
        }
        let found = self.parent?.lookup(key)?;
        self.cache.write().insert(key.clone(), found.clone());
        Some(found)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Calling
    // ─────────────────────────────────────────────────────────────────────

    /// Resolves `requires` and invokes `step` with the resulting arguments.
    ///
    /// # Errors
    ///
    /// [`CallError::Resource`] if a requirement cannot be satisfied, and
    /// [`CallError::Callable`] if the step itself fails.
    pub fn call(
        &self,
        step: &Step,
        requires: &RequirementsDeclaration,
    ) -> Result<Returned, CallError> {
        let mut positional = Vec::new();
        let mut named = Vec::new();

        for requirement in requires {
            let slot = self.resolve(step, requirement)?;
            match requirement.target_slot() {
                Target::Positional => positional.push(slot),
                Target::Named(name) => named.push((name.clone(), slot)),
            }
        }

        tracing::trace!(step = %step.name(), "calling");
        step.invoke(Arguments::new(self, positional, named))
            .map_err(|source| CallError::Callable {
                callable: step.name().to_string(),
                source,
            })
    }

    /// Calls `step` and files its result per `returns`.
    ///
    /// The result is also returned so the caller can inspect it.
    ///
    /// # Errors
    ///
    /// Same as [`call`](Self::call), plus [`ResourceError::Duplicate`] and
    /// [`ResourceError::ReturnShape`] while filing.
    pub fn extract(
        &self,
        step: &Step,
        requires: &RequirementsDeclaration,
        returns: &ReturnsDeclaration,
    ) -> Result<Returned, CallError> {
        let result = self.call(step, requires)?;
        self.file(step, &result, returns)?;
        Ok(result)
    }

    fn resolve(&self, step: &Step, requirement: &Requirement) -> Result<Slot, ResourceError> {
        // The default has the projected type, so resolvers only see it when
        // there is nothing to project.
        let default = match requirement.default_slot() {
            Some(DefaultValue::Value(value)) if requirement.ops().is_empty() => Some(value),
            _ => None,
        };

        let mut found = None;
        for key in requirement.candidate_keys() {
            let Some(entry) = self.lookup(&key) else {
                continue;
            };
            if let Some(value) = self.read_entry(&key, entry, default)? {
                found = Some(value);
                break;
            }
        }

        let mut slot = found.and_then(|value| {
            requirement
                .ops()
                .iter()
                .try_fold(value, |current, op| op.apply(&current))
                .map(Slot::Value)
        });

        if slot.is_none() {
            slot = match requirement.default_slot() {
                Some(DefaultValue::Value(value)) => Some(Slot::Value(value.clone())),
                Some(DefaultValue::Absent) => Some(Slot::Absent),
                None => None,
            };
        }

        if slot.is_none() && requirement.key().is_context() {
            slot = Some(Slot::Context);
        }

        slot.ok_or_else(|| ResourceError::Unsatisfied {
            requirement: requirement.to_string(),
            callable: step.name().to_string(),
        })
    }

    fn file(
        &self,
        step: &Step,
        result: &Returned,
        returns: &ReturnsDeclaration,
    ) -> Result<(), ResourceError> {
        let shape_error = || ResourceError::ReturnShape {
            callable: step.name().to_string(),
            expected: returns.to_string(),
            found: result.shape(),
        };

        match returns {
            ReturnsDeclaration::Ignore => Ok(()),
            ReturnsDeclaration::Infer => match result {
                Returned::None => Ok(()),
                Returned::Value(value) => self.add_value(value.clone()),
                Returned::Sequence(values) => values
                    .iter()
                    .try_for_each(|value| self.add_value(value.clone())),
                Returned::Mapping(pairs) => self.add_pairs(pairs),
            },
            ReturnsDeclaration::Single(key) => match result.clone().into_single_value() {
                Some(value) => self.add_as(key.clone(), value),
                None => Ok(()),
            },
            ReturnsDeclaration::Sequence(keys) => match result {
                Returned::Sequence(values) if values.len() == keys.len() => keys
                    .iter()
                    .zip(values)
                    .try_for_each(|(key, value)| self.add_as(key.clone(), value.clone())),
                _ => Err(shape_error()),
            },
            ReturnsDeclaration::Mapping => match result {
                Returned::Mapping(pairs) => self.add_pairs(pairs),
                _ => Err(shape_error()),
            },
        }
    }

    fn add_pairs(&self, pairs: &[(ResourceKey, Value)]) -> Result<(), ResourceError> {
        pairs
            .iter()
            .try_for_each(|(key, value)| self.add_as(key.clone(), value.clone()))
    }
}
