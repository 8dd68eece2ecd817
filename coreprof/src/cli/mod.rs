//! Command-line interface for coreprof
//!
//! This module contains CLI argument parsing and terminal output

pub mod args;
pub mod display;

pub use args::{Args, MetricArg};
