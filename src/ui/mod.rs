//! Interactive terminal input for template values

pub mod form;

pub use form::{DialoguerPrompter, Prompter, populate};
