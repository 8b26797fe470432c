//! Operations module
//!
//! Coordinates the `project` and `values` commands: resolve, fetch, merge
//! and the template pipeline.

pub mod fetch;
pub mod project;
pub mod values;

pub use fetch::fetch_into;
pub use project::{ProjectOperation, ProjectSummary};
pub use values::ValuesOperation;
