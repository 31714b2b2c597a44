//! `covid-dash` library crate.
//!
//! The binary (`covid`) is a thin wrapper around this library so that:
//!
//! - the selector and metrics logic is testable without spawning processes
//! - the TUI and the text report share one pipeline
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod metrics;
pub mod plot;
pub mod report;
pub mod term;
pub mod tui;
