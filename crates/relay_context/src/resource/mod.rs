//! Resource keys and stored values.
//!
//! - [`TypeKey`] - Runtime type tag
//! - [`ResourceKey`] - `(tag, discriminator)` slot identifier
//! - [`Value`] - Type-erased stored value, optionally carrying a [`Scope`]
//! - [`ResolvableValue`] - A stored value or a deferred [`Resolver`]

mod key;
mod value;

pub use key::{ResourceKey, TypeKey};
pub use value::{ResolvableValue, Resolver, Scope, Value, resolver};
