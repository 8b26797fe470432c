//! Command-line interface module
//!
//! Argument parsing only; the commands themselves live in the crate root.

pub mod args;

pub use args::*;
