//! A dependency-ordered call-chain execution engine.

pub use relay_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use relay_internal::prelude::*;
}
