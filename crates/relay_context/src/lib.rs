//! The resource store at the core of relay.
//!
//! `relay_context` holds everything a single step needs to run:
//!
//! - [`resource`] - Resource keys and type-erased values
//! - [`declaration`] - Requirement and return declarations
//! - [`mod@context`] - The hierarchical [`Context`](context::Context) store and
//!   requirement resolution
//! - [`step`] - Callables and the results they return
//! - [`provider`] - Deferred resources computed on first read
//! - [`error`] - Error types
//!
//! Chains of steps and their execution live in `relay_chain`.

/// Resource keys and stored values.
pub mod resource;

/// Requirement and return declarations.
pub mod declaration;

/// The resource store and requirement resolution.
pub mod context;

/// Callables, steps and results.
pub mod step;

/// Deferred resources.
pub mod provider;

/// Error types.
pub mod error;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::context::*;
    pub use crate::declaration::*;
    pub use crate::error::*;
    pub use crate::provider::*;
    pub use crate::resource::*;
    pub use crate::step::*;
}
