//! Source clients, resolution and concurrent fetching
//!
//! A [`SourceClient`] turns a resolved [`TargetSource`] into an in-memory
//! filesystem rooted at the source's declared path. The [`SourceService`]
//! resolves a selection against the configuration, binds one client to each
//! target and fetches them all concurrently.

pub mod blob;
pub mod file;
pub mod git;
pub mod merge;
pub mod service;

pub use merge::{SafeFs, copy_tree};
pub use service::{FetchOutcome, FetchStreams, FetchedSource, SourceService, pat_env_key};

use crate::config::{Source, SourceAuth, SourceType};
use crate::system::MemorySystem;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use thiserror::Error;

/// A source selected for this run, with its auth bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSource {
    pub source: Source,
    pub auth: Option<SourceAuth>,
}

impl TargetSource {
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.source.alias
    }
}

/// Cancellation shared by every fetch of one run
///
/// Cloning shares the flag. A deadline, when set, cancels once it passes.
#[derive(Debug, Clone, Default)]
pub struct FetchContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl FetchContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fail with [`ClientError::Cancelled`] once cancelled
    pub fn check(&self) -> Result<(), ClientError> {
        if self.is_cancelled() {
            Err(ClientError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Fetches one kind of source
///
/// Clients hold no per-source state, so one instance is shared by every
/// concurrent fetch of its kind.
pub trait SourceClient: Send + Sync {
    fn kind(&self) -> SourceType;

    /// Fetch `target` into a fresh filesystem whose `/` is the source's
    /// declared path
    fn fetch(&self, target: &TargetSource, ctx: &FetchContext)
    -> Result<MemorySystem, ClientError>;
}

/// A client paired with the one source it will fetch
///
/// Immutable once built; each fetch task owns its own copy.
#[derive(Clone)]
pub struct BoundClient {
    client: Arc<dyn SourceClient>,
    target: TargetSource,
}

impl BoundClient {
    #[must_use]
    pub fn new(client: Arc<dyn SourceClient>, target: TargetSource) -> Self {
        Self { client, target }
    }

    #[must_use]
    pub const fn target(&self) -> &TargetSource {
        &self.target
    }

    #[must_use]
    pub fn kind(&self) -> SourceType {
        self.client.kind()
    }

    /// Fetch the bound source, failing early if `ctx` is already cancelled
    pub fn fetch(&self, ctx: &FetchContext) -> Result<MemorySystem, ClientError> {
        ctx.check()?;
        self.client.fetch(&self.target, ctx)
    }
}

impl fmt::Debug for BoundClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundClient")
            .field("kind", &self.client.kind())
            .field("target", &self.target)
            .finish()
    }
}

/// Failure inside a single source client
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ClientError {
    #[error("mismatched or no auth method ({expected}) for url: {url}")]
    AuthMismatch { expected: &'static str, url: String },

    #[error("failed to create ssh auth for {path}: {message}")]
    CredentialLoad { path: String, message: String },

    #[error("fetching {kind} sources is not implemented")]
    NotImplemented { kind: SourceType },

    #[error("source {alias} has no url")]
    MissingUrl { alias: String },

    #[error("unsupported url {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("invalid source path {path}: {message}")]
    InvalidPath { path: String, message: String },

    #[error("path {path} not found in fetched source")]
    PathNotFound { path: String },

    #[error("failed to clone {url}: {source}")]
    Clone {
        url: String,
        #[source]
        source: git2::Error,
    },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("fetch task panicked: {message}")]
    Panicked { message: String },

    #[error("failed to start fetch task: {source}")]
    Spawn {
        #[source]
        source: io::Error,
    },
}

/// A client failure attributed to its source
#[derive(Error, Debug)]
#[error("source {alias}: {cause}")]
pub struct FetchError {
    pub alias: String,
    #[source]
    pub cause: ClientError,
}

/// Every fetch failure of one run, reported together
#[derive(Error, Debug)]
#[error("the following errors occurred while fetching: {}", flatten_errors(.0))]
pub struct FetchFailures(pub Vec<FetchError>);

fn flatten_errors(errors: &[FetchError]) -> String {
    errors.iter().map(|e| format!("{e}; ")).collect()
}
