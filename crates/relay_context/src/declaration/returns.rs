//! Returns declarations.

use core::fmt;

use crate::resource::ResourceKey;

/// Declares how a callable's result is filed into the context.
///
/// | Declaration | Result filed as |
/// |-------------|-----------------|
/// | `Infer` | by the runtime type of each value; `None` is skipped |
/// | `Ignore` | discarded |
/// | `Single(key)` | the whole result under `key` |
/// | `Sequence(keys)` | element *i* under `keys[i]` |
/// | `Mapping` | each returned `(key, value)` pair |
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReturnsDeclaration {
    /// File by runtime type.
    #[default]
    Infer,
    /// Discard the result.
    Ignore,
    /// File the whole result under one key.
    Single(ResourceKey),
    /// File each element of a sequence result under its own key.
    Sequence(Vec<ResourceKey>),
    /// File each pair of a mapping result.
    Mapping,
}

impl ReturnsDeclaration {
    /// Files the whole result under `key`.
    #[must_use]
    pub fn single(key: impl Into<ResourceKey>) -> Self {
        Self::Single(key.into())
    }

    /// Files a `T` result under its type.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Single(ResourceKey::of::<T>())
    }

    /// Files element *i* of a sequence result under `keys[i]`.
    #[must_use]
    pub fn sequence<K: Into<ResourceKey>>(keys: impl IntoIterator<Item = K>) -> Self {
        Self::Sequence(keys.into_iter().map(Into::into).collect())
    }

    /// Returns the single key, for declarations that have one.
    #[must_use]
    pub fn single_key(&self) -> Option<&ResourceKey> {
        match self {
            Self::Single(key) => Some(key),
            _ => None,
        }
    }
}

impl fmt::Display for ReturnsDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infer => f.write_str("returns(<inferred>)"),
            Self::Ignore => f.write_str("returns(<ignored>)"),
            Self::Single(key) => write!(f, "returns({key})"),
            Self::Sequence(keys) => {
                f.write_str("returns(")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}")?;
                }
                f.write_str(")")
            }
            Self::Mapping => f.write_str("returns(<mapping>)"),
        }
    }
}
