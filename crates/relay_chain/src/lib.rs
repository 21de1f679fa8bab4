//! Call chains for relay.
//!
//! `relay_chain` orders steps into a chain and runs them against a
//! [`Context`](relay_context::context::Context):
//!
//! - [`point`] - Call points, the nodes of a chain
//! - [`registration`] - Steps with the declarations and label they are added with
//! - [`modifier`] - Cursors for inserting relative to a labelled point
//! - [`runner`] - The chain owner, copying, replacement and execution
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```
//! use relay_chain::prelude::*;
//!
//! struct Order(u32);
//! struct Invoice(String);
//!
//! let mut runner = Runner::new();
//! runner
//!     .add(Registration::new(Step::new(|_| Ok(Returned::value(Order(7))))).label("load"))
//!     .unwrap();
//! runner
//!     .add(
//!         Step::new(|args: Arguments<'_>| {
//!             let order = args.value::<Order>(0)?;
//!             Ok(Returned::value(Invoice(format!("invoice #{}", order.0))))
//!         })
//!         .requires(Requirement::of::<Order>()),
//!     )
//!     .unwrap();
//!
//! let result = runner.run().unwrap();
//! assert_eq!(result.downcast_ref::<Invoice>().unwrap().0, "invoice #7");
//! ```

/// Call points.
pub mod point;

/// Registrations and chainable items.
pub mod registration;

/// Insertion cursors.
pub mod modifier;

/// The chain owner and its execution.
pub mod runner;

/// Error types.
pub mod error;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::*;
    pub use crate::modifier::*;
    pub use crate::point::*;
    pub use crate::registration::*;
    pub use crate::runner::*;
    pub use relay_context::prelude::*;
}
