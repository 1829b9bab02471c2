//! Terminal side of a reconciliation run
//!
//! The engine itself lives in the `declarative` crate; this module renders
//! its diff and drives its progress and confirmation callbacks.

pub mod differ;
pub mod report;

pub use differ::display_diff;
pub use report::{PromptConfirm, TerminalProgress, print_summary};
