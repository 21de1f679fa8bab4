//! Resource keys.
//!
//! A [`ResourceKey`] names one slot in a [`Context`](crate::context::Context).
//! It combines an optional type tag ([`TypeKey`]) with an optional string
//! discriminator, so the same type can be stored several times under
//! different names, and name-only slots can hold values of any type.

use core::any::TypeId;
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::context::Context;

/// A runtime type tag.
///
/// Equality and hashing use the [`TypeId`] only; the type name is carried
/// for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Creates the tag for `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: core::any::type_name::<T>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Returns the full type name.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.name
    }

    /// Returns the type name without its module path.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            // Keep generic arguments intact, only strip the outer path.
            Some(idx) => &self.name[idx + 2..],
            None => self.name,
        }
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

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Identifies a slot in the context store.
///
/// A key is a `(tag, discriminator)` pair. Either half may be absent, but not
/// both: [`ResourceKey::is_valid`] is `false` for the empty key and the
/// context refuses to store under it.
///
/// # Example
///
/// ```
/// use relay_context::resource::ResourceKey;
///
/// struct Database;
///
/// let by_type = ResourceKey::of::<Database>();
/// let by_both = ResourceKey::named::<Database>("replica");
/// let by_name = ResourceKey::name("replica");
///
/// assert_ne!(by_type, by_both);
/// assert_eq!(by_both.tag_only(), Some(by_type));
/// assert_eq!(by_both.discriminator_only(), Some(by_name));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    tag: Option<TypeKey>,
    discriminator: Option<String>,
}

impl ResourceKey {
    /// Creates a key from its raw parts.
    #[must_use]
    pub fn new(tag: Option<TypeKey>, discriminator: Option<String>) -> Self {
        Self { tag, discriminator }
    }

    /// A key for values of type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(Some(TypeKey::of::<T>()), None)
    }

    /// A key for values of type `T` under a discriminator.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(discriminator: impl Into<String>) -> Self {
        Self::new(Some(TypeKey::of::<T>()), Some(discriminator.into()))
    }

    /// A discriminator-only key.
    #[must_use]
    pub fn name(discriminator: impl Into<String>) -> Self {
        Self::new(None, Some(discriminator.into()))
    }

    /// The key a requirement uses to ask for the context itself.
    #[must_use]
    pub fn context() -> Self {
        Self::of::<Context<'static>>()
    }

    /// Returns the type tag, if any.
    #[must_use]
    pub fn tag(&self) -> Option<TypeKey> {
        self.tag
    }

    /// Returns the discriminator, if any.
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// Returns `false` for the empty key, which cannot be stored under.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.tag.is_some() || self.discriminator.is_some()
    }

    /// Returns `true` if this key asks for the context itself.
    #[must_use]
    pub fn is_context(&self) -> bool {
        self.discriminator.is_none() && self.tag == Some(TypeKey::of::<Context<'static>>())
    }

    /// The same key without its discriminator, when both halves are set.
    #[must_use]
    pub fn tag_only(&self) -> Option<Self> {
        match (&self.tag, &self.discriminator) {
            (Some(tag), Some(_)) => Some(Self::new(Some(*tag), None)),
            _ => None,
        }
    }

    /// The same key without its tag, when both halves are set.
    #[must_use]
    pub fn discriminator_only(&self) -> Option<Self> {
        match (&self.tag, &self.discriminator) {
            (Some(_), Some(name)) => Some(Self::name(name.clone())),
            _ => None,
        }
    }
}

impl From<TypeKey> for ResourceKey {
    fn from(tag: TypeKey) -> Self {
        Self::new(Some(tag), None)
    }
}

impl From<&str> for ResourceKey {
    fn from(discriminator: &str) -> Self {
        Self::name(discriminator)
    }
}

impl From<String> for ResourceKey {
    fn from(discriminator: String) -> Self {
        Self::name(discriminator)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.tag, &self.discriminator) {
            (Some(tag), Some(name)) => write!(f, "<{tag}> '{name}'"),
            (Some(tag), None) => write!(f, "<{tag}>"),
            (None, Some(name)) => write!(f, "'{name}'"),
            (None, None) => f.write_str("<invalid key>"),
        }
    }
}
