//! Command-line interface for fastocr.
//!
//! Provides commands for submitting images, querying task status and
//! history, and running worker pools.

mod commands;

pub use commands::{parse_cli, run_with_cli, Cli, Commands};
