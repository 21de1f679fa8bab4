//! Resolved arguments handed to a callable.

use std::sync::Arc;

use super::Context;
use crate::error::ArgumentError;
use crate::resource::Value;

/// One resolved argument.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// A resolved or default value.
    Value(Value),
    /// An absent (`None`) default.
    Absent,
    /// The context itself.
    Context,
}

/// The arguments resolved for one call, positional and named.
///
/// Accessors are typed; asking for the wrong type is an [`ArgumentError`],
/// which converts into the callable's error with `?`.
pub struct Arguments<'a> {
    context: &'a Context<'a>,
    positional: Vec<Slot>,
    named: Vec<(String, Slot)>,
}

impl<'a> Arguments<'a> {
    pub(crate) fn new(
        context: &'a Context<'a>,
        positional: Vec<Slot>,
        named: Vec<(String, Slot)>,
    ) -> Self {
        Self {
            context,
            positional,
            named,
        }
    }

    /// Returns the number of positional arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positional.len()
    }

    /// Returns `true` if there are no positional arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Returns the names of the named arguments, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.named.iter().map(|(name, _)| name.as_str())
    }

    /// Borrows positional argument `index` as a `T`.
    ///
    /// # Errors
    ///
    /// Fails if the slot does not exist, is absent, holds the context, or
    /// holds another type.
    pub fn value<T: 'static>(&self, index: usize) -> Result<&T, ArgumentError> {
        required(self.positional_slot(index)?, &index.to_string())
    }

    /// Borrows positional argument `index` as a `T`, or `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Fails if the slot does not exist, holds the context, or holds another type.
    pub fn optional<T: 'static>(&self, index: usize) -> Result<Option<&T>, ArgumentError> {
        optional(self.positional_slot(index)?, &index.to_string())
    }

    /// Returns a shared handle to positional argument `index` as a `T`.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value).
    pub fn arc<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ArgumentError> {
        shared(self.positional_slot(index)?, &index.to_string())
    }

    /// Returns positional argument `index` untyped, or `None` if it is
    /// absent or the context.
    #[must_use]
    pub fn raw(&self, index: usize) -> Option<&Value> {
        match self.positional.get(index) {
            Some(Slot::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Returns the context bound to positional argument `index`.
    ///
    /// # Errors
    ///
    /// Fails if the slot does not exist or was not bound to the context.
    pub fn context(&self, index: usize) -> Result<&'a Context<'a>, ArgumentError> {
        self.bound_context(self.positional_slot(index)?, &index.to_string())
    }

    /// Borrows the named argument `name` as a `T`.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value).
    pub fn named<T: 'static>(&self, name: &str) -> Result<&T, ArgumentError> {
        required(self.named_slot(name)?, name)
    }

    /// Borrows the named argument `name` as a `T`, or `None` if it is absent.
    ///
    /// # Errors
    ///
    /// Same as [`optional`](Self::optional).
    pub fn named_optional<T: 'static>(&self, name: &str) -> Result<Option<&T>, ArgumentError> {
        optional(self.named_slot(name)?, name)
    }

    /// Returns a shared handle to the named argument `name` as a `T`.
    ///
    /// # Errors
    ///
    /// Same as [`value`](Self::value).
    pub fn named_arc<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, ArgumentError> {
        shared(self.named_slot(name)?, name)
    }

    /// Returns the context bound to the named argument `name`.
    ///
    /// # Errors
    ///
    /// Fails if the slot does not exist or was not bound to the context.
    pub fn named_context(&self, name: &str) -> Result<&'a Context<'a>, ArgumentError> {
        self.bound_context(self.named_slot(name)?, name)
    }

    fn positional_slot(&self, index: usize) -> Result<&Slot, ArgumentError> {
        self.positional
            .get(index)
            .ok_or_else(|| ArgumentError::NotFound(index.to_string()))
    }

    fn named_slot(&self, name: &str) -> Result<&Slot, ArgumentError> {
        self.named
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, slot)| slot)
            .ok_or_else(|| ArgumentError::NotFound(name.to_string()))
    }

    fn bound_context(&self, slot: &Slot, label: &str) -> Result<&'a Context<'a>, ArgumentError> {
        match slot {
            Slot::Context => Ok(self.context),
            _ => Err(ArgumentError::ContextMismatch(label.to_string())),
        }
    }
}

fn optional<'s, T: 'static>(slot: &'s Slot, label: &str) -> Result<Option<&'s T>, ArgumentError> {
    match slot {
        Slot::Absent => Ok(None),
        Slot::Context => Err(ArgumentError::ContextMismatch(label.to_string())),
        Slot::Value(value) => value
            .downcast_ref::<T>()
            .map(Some)
            .ok_or_else(|| wrong_type::<T>(label)),
    }
}

fn required<'s, T: 'static>(slot: &'s Slot, label: &str) -> Result<&'s T, ArgumentError> {
    optional(slot, label)?.ok_or_else(|| ArgumentError::Absent(label.to_string()))
}

fn shared<T: Send + Sync + 'static>(slot: &Slot, label: &str) -> Result<Arc<T>, ArgumentError> {
    match slot {
        Slot::Absent => Err(ArgumentError::Absent(label.to_string())),
        Slot::Context => Err(ArgumentError::ContextMismatch(label.to_string())),
        Slot::Value(value) => value.downcast::<T>().ok_or_else(|| wrong_type::<T>(label)),
    }
}

fn wrong_type<T>(label: &str) -> ArgumentError {
    ArgumentError::WrongType {
        slot: label.to_string(),
        expected: core::any::type_name::<T>(),
    }
}
