//! # Relay Internal Library
//!
//! Re-exports the core relay crates for convenience.

/// Resource keys, declarations and the context store.
pub use relay_context;

/// Call chains and their execution.
pub use relay_chain;

/// Tracing subscriber setup.
pub use relay_tracing;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use relay_chain::prelude::*;
}
