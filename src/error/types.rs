//! Custom error types with exit codes

use crate::config::ResolutionError;
use crate::sources::{ClientError, FetchError, FetchFailures};
use crate::template::TemplateError;
use thiserror::Error;

/// Errors raised by graftset itself rather than by a subsystem
///
/// Resolution, fetch and template failures keep their own typed errors;
/// [`exit_code_for`] maps those by type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GraftError {
    /// Configuration Error - missing or invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Filesystem Error - file operation failed
    #[error("Filesystem error: {message}")]
    Filesystem { message: String },
}

impl GraftError {
    /// Get the appropriate exit code for this error type
    #[must_use]
    #[inline]
    pub const fn exit_code(&self) -> i32 {
        match *self {
            Self::Configuration { .. } => 1,
            Self::Filesystem { .. } => 5,
        }
    }

    /// Create a configuration error
    #[inline]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a filesystem error
    #[inline]
    pub fn filesystem<S: Into<String>>(message: S) -> Self {
        Self::Filesystem {
            message: message.into(),
        }
    }
}

/// Pick the process exit code for an error returned by the library
///
/// Walks the error chain and returns the code of the first typed error found.
/// Errors that carry no graftset type exit with 1.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(graft) = cause.downcast_ref::<GraftError>() {
            return graft.exit_code();
        }
        if cause.downcast_ref::<ResolutionError>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<FetchFailures>().is_some()
            || cause.downcast_ref::<FetchError>().is_some()
            || cause.downcast_ref::<ClientError>().is_some()
        {
            return 3;
        }
        if cause.downcast_ref::<TemplateError>().is_some() {
            return 4;
        }
    }
    1
}
