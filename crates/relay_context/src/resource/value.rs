//! Stored values and resolvers.

use core::any::Any;
use core::fmt;
use std::sync::Arc;

use super::key::TypeKey;
use crate::context::Context;
use crate::error::BoxError;

/// A resource that wraps the rest of a chain's execution.
///
/// When a call point returns a scoped [`Value`], the runner enters it, runs
/// the remainder of the chain inside it, and exits it afterwards, whether the
/// remainder succeeded or failed.
///
/// # Example
///
/// ```
/// use relay_context::resource::{Scope, Value};
/// use relay_context::error::BoxError;
///
/// struct Transaction;
///
/// impl Scope for Transaction {
///     fn enter(&self) -> Result<Option<Value>, BoxError> {
///         Ok(None)
///     }
///
///     fn exit(
///         &self,
///         error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
///     ) -> Result<bool, BoxError> {
///         // roll back on error, never swallow it
///         let _rolled_back = error.is_some();
///         Ok(false)
///     }
/// }
///
/// let value = Value::scoped(Transaction);
/// assert!(value.as_scope().is_some());
/// ```
pub trait Scope: Send + Sync + 'static {
    /// Enters the scope.
    ///
    /// A returned value other than the scope itself is added to the context
    /// the scoped remainder runs in.
    ///
    /// # Errors
    ///
    /// Any error aborts the chain before the remainder runs; `exit` is not called.
    fn enter(&self) -> Result<Option<Value>, BoxError>;

    /// Exits the scope, receiving the error the remainder failed with, if any.
    ///
    /// Returning `Ok(true)` swallows that error.
    ///
    /// # Errors
    ///
    /// A returned error replaces whatever the remainder produced.
    fn exit(
        &self,
        error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
    ) -> Result<bool, BoxError>;
}

/// A type-erased, cheaply cloneable value held by the context.
///
/// Values remember the [`TypeKey`] of what they hold, which is the key used
/// when a result is filed by its runtime type.
#[derive(Clone)]
pub struct Value {
    inner: Arc<dyn Any + Send + Sync>,
    type_key: TypeKey,
    scope: Option<Arc<dyn Scope>>,
}

impl Value {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an already shared value without copying it.
    #[must_use]
    pub fn from_arc<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_key: TypeKey::of::<T>(),
            scope: None,
        }
    }

    /// Wraps a [`Scope`] so the runner will enter and exit it.
    #[must_use]
    pub fn scoped<T: Scope>(resource: T) -> Self {
        let shared = Arc::new(resource);
        Self {
            inner: shared.clone(),
            type_key: TypeKey::of::<T>(),
            scope: Some(shared as Arc<dyn Scope>),
        }
    }

    /// Returns the runtime type tag of the wrapped value.
    #[must_use]
    pub fn type_key(&self) -> TypeKey {
        self.type_key
    }

    /// Returns `true` if the wrapped value is a `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.inner.is::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Returns a shared handle to the wrapped value as a `T`.
    #[must_use]
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.inner.clone().downcast::<T>().ok()
    }

    /// Returns the scope facet, if this value was created with [`Value::scoped`].
    #[must_use]
    pub fn as_scope(&self) -> Option<&Arc<dyn Scope>> {
        self.scope.as_ref()
    }

    /// Returns `true` if both values share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Value) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.inner), Arc::as_ptr(&other.inner))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("type", &self.type_key.type_name())
            .field("scoped", &self.scope.is_some())
            .finish()
    }
}

/// A deferred value computation.
///
/// Called with the context being read from and the default the reader
/// supplied. Returning `Ok(None)` means the value is missing.
pub type Resolver =
    Arc<dyn Fn(&Context<'_>, Option<&Value>) -> Result<Option<Value>, BoxError> + Send + Sync>;

/// Wraps a closure as a [`Resolver`].
pub fn resolver<F>(f: F) -> Resolver
where
    F: Fn(&Context<'_>, Option<&Value>) -> Result<Option<Value>, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// An entry in the context store: either a plain value or a resolver.
#[derive(Clone)]
pub enum ResolvableValue {
    /// An already computed value.
    Value(Value),
    /// A resolver run each time the entry is read.
    Resolver(Resolver),
}

impl ResolvableValue {
    /// Returns the plain value, if this entry is not a resolver.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Resolver(_) => None,
        }
    }

    /// Returns `true` if this entry is a resolver.
    #[must_use]
    pub fn is_resolver(&self) -> bool {
        matches!(self, Self::Resolver(_))
    }
}

impl From<Value> for ResolvableValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Debug for ResolvableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Counter {
        value: i32,
    }

    struct Noop;

    impl Scope for Noop {
        fn enter(&self) -> Result<Option<Value>, BoxError> {
            Ok(None)
        }

        fn exit(
            &self,
            _error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
        ) -> Result<bool, BoxError> {
            Ok(false)
        }
    }

    #[test]
    fn downcast_round_trip() {
        let value = Value::new(Counter { value: 3 });
        assert!(value.is::<Counter>());
        assert_eq!(value.downcast_ref::<Counter>(), Some(&Counter { value: 3 }));
        assert!(value.downcast_ref::<String>().is_none());
        assert_eq!(value.downcast::<Counter>().unwrap().value, 3);
    }

    #[test]
    fn type_key_tracks_wrapped_type() {
        let value = Value::new(5_u8);
        assert_eq!(value.type_key(), TypeKey::of::<u8>());
    }

    #[test]
    fn clones_share_identity() {
        let value = Value::new(Counter { value: 1 });
        let copy = value.clone();
        let other = Value::new(Counter { value: 1 });

        assert!(value.ptr_eq(&copy));
        assert!(!value.ptr_eq(&other));
    }

    #[test]
    fn scoped_values_expose_scope_facet() {
        let scoped = Value::scoped(Noop);
        assert!(scoped.as_scope().is_some());
        assert!(scoped.is::<Noop>());
        assert!(Value::new(Counter { value: 0 }).as_scope().is_none());
    }

    #[test]
    fn resolvable_value_accessors() {
        let plain = ResolvableValue::from(Value::new(1_i32));
        assert!(!plain.is_resolver());
        assert!(plain.value().is_some());

        let resolver: Resolver = Arc::new(|_, _| Ok(None));
        let deferred = ResolvableValue::Resolver(resolver);
        assert!(deferred.is_resolver());
        assert!(deferred.value().is_none());
    }
}
