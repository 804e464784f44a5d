//! fieldperm: filter serialized output field by field, per request.
//!
//! Re-exports [`fieldperm_core`] at the root; the CLI framework is available
//! behind the `cli` feature.

pub use fieldperm_core::*;

#[cfg(feature = "cli")]
pub use fieldperm_cli as cli;
