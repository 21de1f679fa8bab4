//! Error types for chain construction and execution.

use core::fmt::Write as _;

use relay_context::error::{BoxError, ResourceError};
use relay_context::resource::ResourceKey;

/// Errors raised while building or reshaping a chain.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The label is already attached to another point.
    #[error("label '{label}' already points to {owner}")]
    DuplicateLabel {
        /// The colliding label.
        label: String,
        /// The point that owns the label, as displayed.
        owner: String,
    },

    /// No point carries the label.
    #[error("no point is labelled '{0}'")]
    UnknownLabel(String),

    /// A label was added to a chain with no points.
    #[error("cannot attach label '{0}' to an empty chain")]
    EmptyChain(String),

    /// Two lazy providers were registered for the same key.
    #[error("lazy providers {existing} and {incoming} both provide {key}")]
    LazyProviderCollision {
        /// The contested key.
        key: ResourceKey,
        /// The provider already registered.
        existing: String,
        /// The provider being registered.
        incoming: String,
    },

    /// A lazy step must declare the single key it provides.
    #[error("lazy step {step} must return a single key")]
    LazyNeedsKey {
        /// The offending step.
        step: String,
    },
}

/// Errors raised while running a chain.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The runner's lazy providers could not be registered.
    #[error("registering lazy providers failed: {0}")]
    Providers(#[source] ResourceError),

    /// A point's requirements could not be resolved, or its result filed.
    #[error("{source} while calling {point}{trail}", trail = trail(.ran, .remaining))]
    Resolution {
        /// The failing point, as displayed.
        point: String,
        /// The context error.
        source: ResourceError,
        /// Points that already ran, in order.
        ran: Vec<String>,
        /// Points still to run, in order.
        remaining: Vec<String>,
    },

    /// A step failed.
    #[error("{point} failed: {source}")]
    Step {
        /// The failing point's step name.
        point: String,
        /// The step's error.
        source: BoxError,
    },

    /// Entering a scope failed.
    #[error("entering scope returned by {point} failed: {source}")]
    ScopeEnter {
        /// The point that returned the scope.
        point: String,
        /// The scope's error.
        source: BoxError,
    },

    /// A scope's exit raised its own error.
    #[error("exiting scope returned by {point} failed: {source}")]
    ScopeExit {
        /// The point that returned the scope.
        point: String,
        /// The error raised by the exit.
        source: BoxError,
    },

    /// Scopes nested deeper than the runner allows.
    #[error("scope depth {depth} exceeds the maximum of {max}")]
    ScopeDepthExceeded {
        /// The depth that was reached.
        depth: usize,
        /// The configured maximum.
        max: usize,
    },
}

fn trail(ran: &[String], remaining: &[String]) -> String {
    let mut out = String::new();
    for (heading, points) in [("already called", ran), ("still to call", remaining)] {
        if points.is_empty() {
            continue;
        }
        let _ = write!(out, "\n{heading}:");
        for point in points {
            let _ = write!(out, "\n    {point}");
        }
    }
    out
}
