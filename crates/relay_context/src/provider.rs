//! Deferred resources computed on first read.

use crate::context::Context;
use crate::declaration::RequirementsDeclaration;
use crate::error::BoxError;
use crate::resource::{ResolvableValue, Resolver, ResourceKey, Value, resolver};
use crate::step::Step;

/// A step whose result is produced on demand when a key is read.
///
/// Registered into a context as a [`Resolver`]. With caching enabled (the
/// default) the first successful read replaces the resolver with its value in
/// the context that was read from, so the step runs at most once per context.
#[derive(Debug, Clone)]
pub struct Provider {
    step: Step,
    requires: RequirementsDeclaration,
    cache: bool,
}

impl Provider {
    /// Creates a caching provider using the step's own requirements.
    #[must_use]
    pub fn new(step: Step) -> Self {
        let requires = step.requirements().clone();
        Self {
            step,
            requires,
            cache: true,
        }
    }

    /// Overrides the requirements resolved before the step runs.
    #[must_use]
    pub fn with_requirements(mut self, requires: RequirementsDeclaration) -> Self {
        self.requires = requires;
        self
    }

    /// Sets whether the first result replaces the resolver.
    #[must_use]
    pub fn cached(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the provided step.
    #[must_use]
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Returns `true` if results are memoized.
    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache
    }

    /// Builds the resolver to register under `key`.
    #[must_use]
    pub fn resolver(&self, key: ResourceKey) -> Resolver {
        let provider = self.clone();
        resolver(move |context, default| provider.resolve(context, &key, default))
    }

    fn resolve(
        &self,
        context: &Context<'_>,
        key: &ResourceKey,
        default: Option<&Value>,
    ) -> Result<Option<Value>, BoxError> {
        tracing::debug!(key = %key, step = %self.step.name(), "providing resource");
        let Some(value) = context
            .call(&self.step, &self.requires)?
            .into_single_value()
        else {
            return Ok(default.cloned());
        };
        if self.cache {
            context.replace(key.clone(), ResolvableValue::Value(value.clone()))?;
        }
        Ok(Some(value))
    }
}
