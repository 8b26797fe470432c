//! Error handling module
//!
//! Defines the top-level error type and maps typed module errors to exit codes

pub mod types;

pub use types::*;
