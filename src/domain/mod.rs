//! Domain types used throughout the dashboard.
//!
//! This module defines:
//!
//! - calendar helpers (`YearMonth`, `DateInterval`, `last_day_of_month`)
//! - loaded table rows (`CaseRecord`, `PopulationRecord`)
//! - the per-prefecture series, input encoding and the run configuration

pub mod types;

pub use types::*;
