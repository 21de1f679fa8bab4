//! Callables, steps and their results.
//!
//! A [`Step`] pairs a [`Callable`] with the declarations it carries by
//! default. Steps are cheap to clone; clones share the callable, and two
//! steps are "the same step" when they share it (see [`Step::same_callable`]).
//!
//! # Example
//!
//! ```
//! use relay_context::context::{Arguments, Context};
//! use relay_context::declaration::{Requirement, ReturnsDeclaration};
//! use relay_context::error::BoxError;
//! use relay_context::step::{Returned, Step};
//!
//! struct Celsius(f64);
//! struct Fahrenheit(f64);
//!
//! fn convert(args: Arguments<'_>) -> Result<Returned, BoxError> {
//!     let celsius = args.value::<Celsius>(0)?;
//!     Ok(Returned::value(Fahrenheit(celsius.0 * 1.8 + 32.0)))
//! }
//!
//! let step = Step::new(convert)
//!     .requires(Requirement::of::<Celsius>())
//!     .returns(ReturnsDeclaration::of::<Fahrenheit>());
//!
//! let context = Context::new();
//! context.add(Celsius(100.0)).unwrap();
//! context
//!     .extract(&step, step.requirements(), step.returns_declaration())
//!     .unwrap();
//!
//! let fahrenheit = context.get_as::<Fahrenheit>().unwrap().unwrap();
//! assert_eq!(fahrenheit.0, 212.0);
//! ```

use core::fmt;
use std::sync::Arc;

use variadics_please::all_tuples;

use crate::context::Arguments;
use crate::declaration::{RequirementsDeclaration, ReturnsDeclaration};
use crate::error::BoxError;
use crate::resource::{ResourceKey, Scope, Value};

/// Something a call point can invoke.
///
/// Implemented for every `Fn(Arguments<'_>) -> Result<Returned, BoxError>`.
pub trait Callable: Send + Sync + 'static {
    /// Invokes the callable with its resolved arguments.
    ///
    /// # Errors
    ///
    /// Whatever the callable fails with; the error is passed through opaquely.
    fn call(&self, args: Arguments<'_>) -> Result<Returned, BoxError>;
}

impl<F> Callable for F
where
    F: for<'a> Fn(Arguments<'a>) -> Result<Returned, BoxError> + Send + Sync + 'static,
{
    fn call(&self, args: Arguments<'_>) -> Result<Returned, BoxError> {
        self(args)
    }
}

/// The result of invoking a callable.
#[derive(Debug, Clone, Default)]
pub enum Returned {
    /// Nothing was returned.
    #[default]
    None,
    /// A single value, possibly a [`Scope`].
    Value(Value),
    /// An ordered sequence of values.
    Sequence(Vec<Value>),
    /// Key/value pairs to be filed under their keys.
    Mapping(Vec<(ResourceKey, Value)>),
}

impl Returned {
    /// A single value.
    #[must_use]
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Value::new(value))
    }

    /// A scoped resource the runner will enter and exit.
    #[must_use]
    pub fn scoped<T: Scope>(resource: T) -> Self {
        Self::Value(Value::scoped(resource))
    }

    /// An ordered sequence of values.
    #[must_use]
    pub fn sequence(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Sequence(values.into_iter().collect())
    }

    /// Key/value pairs.
    #[must_use]
    pub fn mapping<K: Into<ResourceKey>>(pairs: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Mapping(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` if nothing was returned.
    #[must_use]
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the single value, if this is one.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Borrows the single value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_value().and_then(Value::downcast_ref)
    }

    /// Returns the scope facet of a single scoped value.
    #[must_use]
    pub fn scope(&self) -> Option<&Arc<dyn Scope>> {
        self.as_value().and_then(Value::as_scope)
    }

    /// Collapses the result into one value.
    ///
    /// Sequences become a `Vec<Value>` and mappings a
    /// `Vec<(ResourceKey, Value)>`; `None` stays `None`.
    #[must_use]
    pub fn into_single_value(self) -> Option<Value> {
        match self {
            Self::None => None,
            Self::Value(value) => Some(value),
            Self::Sequence(values) => Some(Value::new(values)),
            Self::Mapping(pairs) => Some(Value::new(pairs)),
        }
    }

    /// A short description of the result's shape, used in error messages.
    #[must_use]
    pub fn shape(&self) -> String {
        match self {
            Self::None => "nothing".to_string(),
            Self::Value(value) => format!("a <{}>", value.type_key().short_name()),
            Self::Sequence(values) => format!("a sequence of {}", values.len()),
            Self::Mapping(pairs) => format!("a mapping of {}", pairs.len()),
        }
    }
}

/// Conversion into a [`Returned`].
///
/// Tuples become sequences, so a callable declared with
/// `ReturnsDeclaration::Sequence` can simply return `(a, b).into_returned()`.
pub trait IntoReturned {
    /// Performs the conversion.
    fn into_returned(self) -> Returned;
}

impl IntoReturned for Returned {
    fn into_returned(self) -> Returned {
        self
    }
}

impl IntoReturned for () {
    fn into_returned(self) -> Returned {
        Returned::None
    }
}

impl IntoReturned for Value {
    fn into_returned(self) -> Returned {
        Returned::Value(self)
    }
}

impl<T: Send + Sync + 'static> IntoReturned for Option<T> {
    fn into_returned(self) -> Returned {
        self.map_or(Returned::None, Returned::value)
    }
}

macro_rules! impl_into_returned_tuple {
    ($($item:ident),*) => {
        impl<$($item: Send + Sync + 'static),*> IntoReturned for ($($item,)*) {
            #[expect(non_snake_case, reason = "tuple fields are bound by their type names")]
            fn into_returned(self) -> Returned {
                let ($($item,)*) = self;
                Returned::Sequence(vec![$(Value::new($item)),*])
            }
        }
    };
}

all_tuples!(impl_into_returned_tuple, 1, 8, T);

/// A callable with its default declarations.
#[derive(Clone)]
pub struct Step {
    callable: Arc<dyn Callable>,
    name: String,
    requires: RequirementsDeclaration,
    returns: ReturnsDeclaration,
}

impl Step {
    /// Wraps a function or closure, naming it after its type.
    #[must_use]
    pub fn new<F>(callable: F) -> Self
    where
        F: for<'a> Fn(Arguments<'a>) -> Result<Returned, BoxError> + Send + Sync + 'static,
    {
        Self::from_callable(callable)
    }

    /// Wraps any [`Callable`], naming it after its type.
    #[must_use]
    pub fn from_callable<C: Callable>(callable: C) -> Self {
        Self::from_arc(Arc::new(callable), short_type_name::<C>())
    }

    /// Wraps a shared callable under an explicit name.
    #[must_use]
    pub fn from_arc(callable: Arc<dyn Callable>, name: impl Into<String>) -> Self {
        Self {
            callable,
            name: name.into(),
            requires: RequirementsDeclaration::new(),
            returns: ReturnsDeclaration::Infer,
        }
    }

    /// Renames the step. The callable identity is unchanged.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Merges `requires` into the step's requirements.
    #[must_use]
    pub fn requires(mut self, requires: impl Into<RequirementsDeclaration>) -> Self {
        self.requires = self.requires.merge(&requires.into());
        self
    }

    /// Sets how the step's result is filed.
    #[must_use]
    pub fn returns(mut self, returns: ReturnsDeclaration) -> Self {
        self.returns = returns;
        self
    }

    /// Returns the step's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step's own requirements.
    #[must_use]
    pub fn requirements(&self) -> &RequirementsDeclaration {
        &self.requires
    }

    /// Returns the step's own returns declaration.
    #[must_use]
    pub fn returns_declaration(&self) -> &ReturnsDeclaration {
        &self.returns
    }

    /// Returns `true` if both steps wrap the same callable.
    #[must_use]
    pub fn same_callable(&self, other: &Step) -> bool {
        core::ptr::addr_eq(Arc::as_ptr(&self.callable), Arc::as_ptr(&other.callable))
    }

    /// Invokes the callable.
    ///
    /// # Errors
    ///
    /// Whatever the callable fails with.
    pub fn invoke(&self, args: Arguments<'_>) -> Result<Returned, BoxError> {
        self.callable.call(args)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("requires", &self.requires.to_string())
            .field("returns", &self.returns)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn short_type_name<F>() -> String {
    let full = core::any::type_name::<F>();
    // "my_crate::module::function" -> "function",
    // "my_crate::module::function::{{closure}}" -> "function::{{closure}}"
    let trimmed = full.trim_end_matches("::{{closure}}");
    let start = trimmed.rfind("::").map_or(0, |idx| idx + 2);
    full[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::Requirement;

    fn produce(_args: Arguments<'_>) -> Result<Returned, BoxError> {
        Ok(Returned::value(1_i32))
    }

    #[test]
    fn step_named_after_function() {
        assert_eq!(Step::new(produce).name(), "produce");
    }

    #[test]
    fn builder_keeps_callable_identity() {
        let step = Step::new(produce);
        let decorated = step
            .clone()
            .named("renamed")
            .requires(Requirement::of::<i32>())
            .returns(ReturnsDeclaration::Ignore);

        assert!(step.same_callable(&decorated));
        assert!(!step.same_callable(&Step::new(produce)));
        assert_eq!(decorated.requirements().len(), 1);
        assert_eq!(step.requirements().len(), 0);
    }

    #[test]
    fn tuples_become_sequences() {
        let returned = (1_i32, "two").into_returned();
        match returned {
            Returned::Sequence(values) => {
                assert_eq!(values.len(), 2);
                assert_eq!(values[0].downcast_ref::<i32>(), Some(&1));
                assert_eq!(values[1].downcast_ref::<&str>(), Some(&"two"));
            }
            other => panic!("expected a sequence, got {}", other.shape()),
        }
    }

    #[test]
    fn option_and_unit_conversions() {
        assert!(().into_returned().is_none());
        assert!(None::<i32>.into_returned().is_none());
        assert_eq!(Some(3_u8).into_returned().downcast_ref::<u8>(), Some(&3));
    }

    #[test]
    fn into_single_value_collapses_sequences() {
        let value = Returned::sequence([Value::new(1_i32), Value::new(2_i32)])
            .into_single_value()
            .unwrap();
        assert_eq!(value.downcast_ref::<Vec<Value>>().map(Vec::len), Some(2));
        assert!(Returned::None.into_single_value().is_none());
    }
}
