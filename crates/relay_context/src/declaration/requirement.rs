//! Single requirements and the projections applied to them.

use core::fmt;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::resource::{ResourceKey, Value};

/// Whether a projection reads an attribute or an item.
///
/// Only affects how the projection is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Field or method access, shown as `.name`.
    Attr,
    /// Keyed or indexed access, shown as `[key]`.
    Item,
}

/// A derived-value operation applied to a resolved resource.
///
/// Projections narrow a stored value down to the part a callable needs, for
/// example a single field of a configuration struct. A projection that
/// returns `None`, or that receives a value of the wrong type, yields
/// "missing" and the requirement falls back to its default.
///
/// # Example
///
/// ```
/// use relay_context::declaration::Projection;
/// use relay_context::resource::Value;
///
/// struct Config { port: u16 }
///
/// let port = Projection::attr("port", |config: &Config| Some(config.port));
/// let value = port.apply(&Value::new(Config { port: 8080 })).unwrap();
/// assert_eq!(value.downcast_ref::<u16>(), Some(&8080));
/// assert_eq!(port.to_string(), ".port");
/// ```
#[derive(Clone)]
pub struct Projection {
    kind: ProjectionKind,
    name: String,
    apply: Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>,
}

impl Projection {
    /// Creates a projection from a type-erased function.
    #[must_use]
    pub fn new(
        kind: ProjectionKind,
        name: impl Into<String>,
        apply: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Projects an attribute of a `T`.
    #[must_use]
    pub fn attr<T, U>(
        name: impl Into<String>,
        get: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Self
    where
        T: 'static,
        U: Send + Sync + 'static,
    {
        Self::new(ProjectionKind::Attr, name, move |value| {
            value.downcast_ref::<T>().and_then(&get).map(Value::new)
        })
    }

    /// Projects an item of a `T` using a custom accessor.
    #[must_use]
    pub fn item<T, U>(
        key: impl Into<String>,
        get: impl Fn(&T) -> Option<U> + Send + Sync + 'static,
    ) -> Self
    where
        T: 'static,
        U: Send + Sync + 'static,
    {
        Self::new(ProjectionKind::Item, key, move |value| {
            value.downcast_ref::<T>().and_then(&get).map(Value::new)
        })
    }

    /// Projects the entry under `key` of a `HashMap<String, V>` or
    /// `BTreeMap<String, V>`.
    #[must_use]
    pub fn key<V: Clone + Send + Sync + 'static>(key: impl Into<String>) -> Self {
        let key = key.into();
        let lookup = key.clone();
        Self::new(ProjectionKind::Item, key, move |value| {
            if let Some(map) = value.downcast_ref::<HashMap<String, V>>() {
                return map.get(&lookup).cloned().map(Value::new);
            }
            value
                .downcast_ref::<BTreeMap<String, V>>()
                .and_then(|map| map.get(&lookup))
                .cloned()
                .map(Value::new)
        })
    }

    /// Projects the element at `index` of a `Vec<V>`.
    #[must_use]
    pub fn index<V: Clone + Send + Sync + 'static>(index: usize) -> Self {
        Self::new(ProjectionKind::Item, index.to_string(), move |value| {
            value
                .downcast_ref::<Vec<V>>()
                .and_then(|items| items.get(index))
                .cloned()
                .map(Value::new)
        })
    }

    /// Applies the projection, returning `None` for "missing".
    #[must_use]
    pub fn apply(&self, value: &Value) -> Option<Value> {
        (self.apply)(value)
    }

    /// Returns the projection kind.
    #[must_use]
    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Returns the attribute name or item key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Projection")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ProjectionKind::Attr => write!(f, ".{}", self.name),
            ProjectionKind::Item => write!(f, "[{}]", self.name),
        }
    }
}

/// The value a requirement falls back to when nothing resolves.
#[derive(Debug, Clone)]
pub enum DefaultValue {
    /// Use this value.
    Value(Value),
    /// Pass an absent argument (`None`).
    Absent,
}

/// How a resolved requirement is passed to the callable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Next positional argument.
    Positional,
    /// Named (targeted) argument.
    Named(String),
}

/// A declared input of a callable.
///
/// # Example
///
/// ```
/// use relay_context::declaration::{Requirement, Target};
/// use relay_context::resource::ResourceKey;
///
/// struct Database;
///
/// let requirement = Requirement::named::<Database>("replica")
///     .optional()
///     .target("db");
///
/// assert_eq!(
///     requirement.candidate_keys(),
///     vec![
///         ResourceKey::named::<Database>("replica"),
///         ResourceKey::of::<Database>(),
///         ResourceKey::name("replica"),
///     ]
/// );
/// assert_eq!(requirement.target_slot(), &Target::Named("db".into()));
/// ```
#[derive(Debug, Clone)]
pub struct Requirement {
    key: ResourceKey,
    fallbacks: Vec<ResourceKey>,
    default: Option<DefaultValue>,
    ops: Vec<Projection>,
    target: Target,
}

impl Requirement {
    /// Requires whatever is stored under `key`.
    #[must_use]
    pub fn new(key: impl Into<ResourceKey>) -> Self {
        Self {
            key: key.into(),
            fallbacks: Vec::new(),
            default: None,
            ops: Vec::new(),
            target: Target::Positional,
        }
    }

    /// Requires a `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(ResourceKey::of::<T>())
    }

    /// Requires a `T` stored under `name`.
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::new(ResourceKey::named::<T>(name))
    }

    /// Requires whatever is stored under the discriminator `name`.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::new(ResourceKey::name(name))
    }

    /// Requires the context itself.
    #[must_use]
    pub fn context() -> Self {
        Self::new(ResourceKey::context())
    }

    /// Adds an explicit fallback key, tried after the primary key.
    #[must_use]
    pub fn fallback(mut self, key: impl Into<ResourceKey>) -> Self {
        self.fallbacks.push(key.into());
        self
    }

    /// Falls back to `value` when nothing resolves.
    #[must_use]
    pub fn default_value<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.default(DefaultValue::Value(Value::new(value)))
    }

    /// Sets the default explicitly.
    #[must_use]
    pub fn default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Passes an absent argument when nothing resolves.
    #[must_use]
    pub fn optional(self) -> Self {
        self.default(DefaultValue::Absent)
    }

    /// Appends a projection.
    #[must_use]
    pub fn project(mut self, projection: Projection) -> Self {
        self.ops.push(projection);
        self
    }

    /// Passes the resolved value as the named argument `name`.
    #[must_use]
    pub fn target(mut self, name: impl Into<String>) -> Self {
        self.target = Target::Named(name.into());
        self
    }

    /// Returns the primary key.
    #[must_use]
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    /// Returns the default, if one was declared.
    #[must_use]
    pub fn default_slot(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// Returns the projections, in application order.
    #[must_use]
    pub fn ops(&self) -> &[Projection] {
        &self.ops
    }

    /// Returns how the argument is passed.
    #[must_use]
    pub fn target_slot(&self) -> &Target {
        &self.target
    }

    /// Returns the keys tried during resolution, in order.
    ///
    /// The primary key comes first, then explicit fallbacks, then the
    /// tag-only and discriminator-only halves of the primary key. Invalid and
    /// repeated keys are skipped.
    #[must_use]
    pub fn candidate_keys(&self) -> Vec<ResourceKey> {
        let implied = [self.key.tag_only(), self.key.discriminator_only()];
        let mut keys: Vec<ResourceKey> = Vec::with_capacity(self.fallbacks.len() + 3);
        let all = core::iter::once(self.key.clone())
            .chain(self.fallbacks.iter().cloned())
            .chain(implied.into_iter().flatten());
        for key in all {
            if key.is_valid() && !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        for op in &self.ops {
            write!(f, "{op}")?;
        }
        match &self.default {
            Some(DefaultValue::Absent) => f.write_str(" = None")?,
            Some(DefaultValue::Value(value)) => {
                write!(f, " = <{}>", value.type_key().short_name())?;
            }
            None => {}
        }
        if let Target::Named(name) = &self.target {
            write!(f, " as {name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Config {
        port: u16,
        hosts: Vec<String>,
    }

    fn config() -> Value {
        Value::new(Config {
            port: 80,
            hosts: vec!["a".into(), "b".into()],
        })
    }

    #[test]
    fn attr_projection_reads_field() {
        let port = Projection::attr("port", |c: &Config| Some(c.port));
        let value = port.apply(&config()).unwrap();
        assert_eq!(value.downcast_ref::<u16>(), Some(&80));
    }

    #[test]
    fn attr_projection_on_wrong_type_is_missing() {
        let port = Projection::attr("port", |c: &Config| Some(c.port));
        assert!(port.apply(&Value::new(5_i32)).is_none());
    }

    #[test]
    fn key_projection_reads_maps() {
        let mut hash = HashMap::new();
        hash.insert("a".to_string(), 1_i32);
        let mut btree = BTreeMap::new();
        btree.insert("a".to_string(), 2_i32);

        let projection = Projection::key::<i32>("a");
        let from_hash = projection.apply(&Value::new(hash)).unwrap();
        let from_btree = projection.apply(&Value::new(btree)).unwrap();

        assert_eq!(from_hash.downcast_ref::<i32>(), Some(&1));
        assert_eq!(from_btree.downcast_ref::<i32>(), Some(&2));
        assert!(
            Projection::key::<i32>("b")
                .apply(&Value::new(HashMap::<String, i32>::new()))
                .is_none()
        );
    }

    #[test]
    fn index_projection_reads_vec() {
        let projection = Projection::index::<String>(1);
        let value = projection
            .apply(&Value::new(vec!["x".to_string(), "y".to_string()]))
            .unwrap();
        assert_eq!(value.downcast_ref::<String>().unwrap(), "y");
        assert!(
            Projection::index::<String>(5)
                .apply(&Value::new(Vec::<String>::new()))
                .is_none()
        );
    }

    #[test]
    fn chained_projections_display() {
        let requirement = Requirement::of::<Config>()
            .project(Projection::attr("hosts", |c: &Config| Some(c.hosts.clone())))
            .project(Projection::index::<String>(0))
            .optional()
            .target("host");

        assert_eq!(requirement.to_string(), "<Config>.hosts[0] = None as host");
    }

    #[test]
    fn candidate_keys_for_type_only_key() {
        let requirement = Requirement::of::<Config>();
        assert_eq!(
            requirement.candidate_keys(),
            vec![ResourceKey::of::<Config>()]
        );
    }

    #[test]
    fn candidate_keys_skip_duplicates_and_invalid() {
        let requirement = Requirement::named::<Config>("main")
            .fallback(ResourceKey::of::<Config>())
            .fallback(ResourceKey::new(None, None))
            .fallback(ResourceKey::name("other"));

        assert_eq!(
            requirement.candidate_keys(),
            vec![
                ResourceKey::named::<Config>("main"),
                ResourceKey::of::<Config>(),
                ResourceKey::name("other"),
                ResourceKey::name("main"),
            ]
        );
    }
}
