//! Error types for context operations.

use crate::resource::ResourceKey;

/// An opaque error raised by user code (callables, resolvers, scopes).
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors raised by the context store and requirement resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The empty key (no tag, no discriminator) cannot be stored under.
    #[error("cannot store a resource without a type or a name")]
    InvalidKey,

    /// The key is already present in this context.
    #[error("context already contains {key}")]
    Duplicate {
        /// The occupied key.
        key: ResourceKey,
    },

    /// A strict removal found nothing under the key.
    #[error("context does not contain {key}")]
    Missing {
        /// The absent key.
        key: ResourceKey,
    },

    /// A requirement resolved to nothing and had no default.
    #[error("{requirement} could not be satisfied for {callable}")]
    Unsatisfied {
        /// The requirement, as displayed.
        requirement: String,
        /// The callable that declared it.
        callable: String,
    },

    /// A resolver registered under the key failed.
    #[error("resolving {key} failed: {source}")]
    Provider {
        /// The key being resolved.
        key: ResourceKey,
        /// The resolver's error.
        #[source]
        source: BoxError,
    },

    /// A result did not have the shape its returns declaration expects.
    #[error("{callable} returned {found}, but {expected} was declared")]
    ReturnShape {
        /// The callable whose result was filed.
        callable: String,
        /// What the declaration expected.
        expected: String,
        /// What was actually returned.
        found: String,
    },
}

/// Errors raised by [`Context::call`](crate::context::Context::call) and
/// [`Context::extract`](crate::context::Context::extract).
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// Resolving arguments or filing results failed.
    #[error(transparent)]
    Resource(#[from] ResourceError),

    /// The callable itself failed.
    #[error("{callable} failed: {source}")]
    Callable {
        /// The callable's name.
        callable: String,
        /// The callable's error.
        #[source]
        source: BoxError,
    },
}

/// Errors raised when a callable reads its resolved arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    /// No argument was resolved for the slot.
    #[error("no argument {0}")]
    NotFound(String),

    /// The slot holds an absent (`None`) default.
    #[error("argument {0} is absent")]
    Absent(String),

    /// The slot holds a value of another type.
    #[error("argument {slot} is not a {expected}")]
    WrongType {
        /// The slot, as displayed.
        slot: String,
        /// The requested type.
        expected: &'static str,
    },

    /// The slot holds the context, or a context was requested from a value slot.
    #[error("argument {0} does not match the context binding")]
    ContextMismatch(String),
}
