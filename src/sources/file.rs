//! Local directory source client
//!
//! Not implemented yet: every fetch reports [`ClientError::NotImplemented`]
//! so that a selection containing a file source fails loudly instead of
//! producing an empty tree.

use super::{ClientError, FetchContext, SourceClient, TargetSource};
use crate::config::SourceType;
use crate::system::MemorySystem;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub struct FileClient;

impl FileClient {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SourceClient for FileClient {
    fn kind(&self) -> SourceType {
        SourceType::File
    }

    fn fetch(
        &self,
        target: &TargetSource,
        _ctx: &FetchContext,
    ) -> Result<MemorySystem, ClientError> {
        debug!(source = target.alias(), "file sources are not supported");
        Err(ClientError::NotImplemented {
            kind: SourceType::File,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Source;

    #[test]
    fn fetch_is_not_implemented() {
        let target = TargetSource {
            source: Source {
                alias: "local".to_owned(),
                source_type: SourceType::File,
                url: None,
                path: "/templates".to_owned(),
                reference: None,
                source_auth_alias: None,
            },
            auth: None,
        };

        let err = FileClient::new()
            .fetch(&target, &FetchContext::new())
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::NotImplemented {
                kind: SourceType::File
            }
        ));
        assert_eq!(err.to_string(), "fetching file sources is not implemented");
    }
}
