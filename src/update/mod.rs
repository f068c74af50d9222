//! # Updates
//!
//! Update maps, the action algebra available through `util()`, and the
//! translation into store mutation tokens.

mod action;
mod translator;
mod updates;

pub use action::{Action, ActionKind, Delta, Util};
pub use translator::translate;
pub use updates::{UpdateValue, Updates};
