//! Object storage source client
//!
//! Not implemented yet; fetches fail with [`ClientError::NotImplemented`].

use super::{ClientError, FetchContext, SourceClient, TargetSource};
use crate::config::SourceType;
use crate::system::MemorySystem;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct BlobClient;

impl BlobClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SourceClient for BlobClient {
    fn kind(&self) -> SourceType {
        SourceType::Blob
    }

    fn fetch(
        &self,
        target: &TargetSource,
        _ctx: &FetchContext,
    ) -> Result<MemorySystem, ClientError> {
        debug!(source = target.alias(), "blob sources are not supported");
        Err(ClientError::NotImplemented {
            kind: SourceType::Blob,
        })
    }
}
