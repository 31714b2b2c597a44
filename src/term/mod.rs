//! Date-range selection.
//!
//! Turns the four dependent start/end choices into a `DateInterval`.

pub mod selector;

pub use selector::*;
