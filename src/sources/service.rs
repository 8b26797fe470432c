//! Source resolution and concurrent fetching

use super::blob::BlobClient;
use super::file::FileClient;
use super::git::GitClient;
use super::merge::SafeFs;
use super::{BoundClient, ClientError, FetchContext, FetchError, FetchFailures, SourceClient, TargetSource};
use crate::config::{ResolutionError, Selection, SourceAuth, SourceConfig, SourceType};
use crate::error::GraftError;
use crate::system::{MemorySystem, System};
use anyhow::Result;
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use tracing::{debug, error, info};

/// Prefix of the environment variables that override auth PATs
pub const ENV_PREFIX: &str = "GRAFTSET";

/// Environment variable that overrides the PAT of `auth_alias`
///
/// The alias is upper-cased and `-` becomes `_`:
/// `azure-devops` -> `GRAFTSET_AZURE_DEVOPS_PAT`.
#[must_use]
pub fn pat_env_key(auth_alias: &str) -> String {
    let alias: String = auth_alias
        .chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect();
    format!("{ENV_PREFIX}_{alias}_PAT")
}

/// A successfully fetched source
#[derive(Clone)]
pub struct FetchedSource {
    pub alias: String,
    pub filesystem: MemorySystem,
}

/// The two result streams of [`SourceService::fetch_all`]
///
/// Both close once every fetch task has finished.
pub struct FetchStreams {
    pub filesystems: Receiver<FetchedSource>,
    pub errors: Receiver<FetchError>,
}

/// What draining the fetch streams produced
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Aliases merged into the target, in completion order
    pub merged: Vec<String>,
    pub failures: Vec<FetchError>,
}

impl FetchOutcome {
    /// Succeed only when no source failed
    pub fn into_result(self) -> Result<Vec<String>, FetchFailures> {
        if self.failures.is_empty() {
            Ok(self.merged)
        } else {
            Err(FetchFailures(self.failures))
        }
    }
}

impl FetchStreams {
    /// Merge every fetched tree into `target` under `dest_root`, then
    /// collect the failures
    ///
    /// Successful fetches are merged even when siblings failed.
    ///
    /// # Errors
    ///
    /// Returns an error if a fetched tree cannot be copied into the target.
    pub fn drain_into(self, target: &SafeFs<'_>, dest_root: &Path) -> Result<FetchOutcome> {
        let mut outcome = FetchOutcome::default();

        for fetched in self.filesystems {
            target
                .copy_into(&fetched.filesystem, Path::new("/"), dest_root)
                .map_err(|e| {
                    GraftError::filesystem(format!("merging source {}: {e}", fetched.alias))
                })?;
            outcome.merged.push(fetched.alias);
        }
        outcome.failures = self.errors.into_iter().collect();

        Ok(outcome)
    }
}

/// Resolves a selection into bound clients and fetches them
pub struct SourceService {
    system: Arc<dyn System>,
    clients: HashMap<SourceType, Arc<dyn SourceClient>>,
    targets: Vec<BoundClient>,
    defaults: BTreeMap<String, String>,
}

impl SourceService {
    #[must_use]
    pub fn new(system: Arc<dyn System>) -> Self {
        Self {
            system,
            clients: HashMap::new(),
            targets: Vec::new(),
            defaults: BTreeMap::new(),
        }
    }

    /// Use `client` for every source of its kind instead of the built-in one
    #[must_use]
    pub fn with_client(mut self, client: Arc<dyn SourceClient>) -> Self {
        self.clients.insert(client.kind(), client);
        self
    }

    /// Expand `selection` into target sources with their auth bound
    ///
    /// Every auth's PAT is first overridden from its environment variable
    /// when one is set. A source listed twice is fetched once.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first unknown set, source or auth alias.
    pub fn resolve(
        &mut self,
        config: &SourceConfig,
        selection: &Selection,
    ) -> Result<&[BoundClient], ResolutionError> {
        let mut auths = config.source_auths.clone();
        self.enrich_auths(&mut auths);
        let auths: HashMap<&str, &SourceAuth> =
            auths.iter().map(|a| (a.auth_alias.as_str(), a)).collect();
        let sources: HashMap<&str, _> = config
            .sources
            .iter()
            .map(|s| (s.alias.as_str(), s))
            .collect();

        let (aliases, defaults) = match *selection {
            Selection::SourceSet(ref set_alias) => {
                let set = config
                    .source_sets
                    .iter()
                    .find(|set| set.alias == *set_alias)
                    .ok_or_else(|| ResolutionError::UnknownSourceSet {
                        alias: set_alias.clone(),
                    })?;
                (set.sources.as_slice(), set.values.clone())
            }
            Selection::Sources(ref aliases) => (aliases.as_slice(), BTreeMap::new()),
        };
        if aliases.is_empty() {
            return Err(ResolutionError::EmptySelection);
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(aliases.len());
        for alias in aliases {
            if !seen.insert(alias.as_str()) {
                continue;
            }
            let source = *sources
                .get(alias.as_str())
                .ok_or_else(|| ResolutionError::UnknownSource {
                    alias: alias.clone(),
                })?;

            let auth = match source.source_auth_alias.as_deref().filter(|a| !a.is_empty()) {
                None => None,
                Some(auth_alias) => Some((*auths.get(auth_alias).ok_or_else(|| {
                    ResolutionError::UnknownAuth {
                        source_alias: source.alias.clone(),
                        auth_alias: auth_alias.to_owned(),
                    }
                })?)
                .clone()),
            };

            let client = self.client_for(source.source_type);
            targets.push(BoundClient::new(
                client,
                TargetSource {
                    source: source.clone(),
                    auth,
                },
            ));
        }

        info!(
            targets = targets.len(),
            aliases = ?targets.iter().map(|t| t.target().alias()).collect::<Vec<_>>(),
            "resolved sources"
        );
        self.targets = targets;
        self.defaults = defaults;
        Ok(&self.targets)
    }

    /// Override each auth's PAT from `GRAFTSET_<ALIAS>_PAT` when set and
    /// non-empty
    pub fn enrich_auths(&self, auths: &mut [SourceAuth]) {
        for auth in auths {
            let key = pat_env_key(&auth.auth_alias);
            if let Ok(value) = self.system.env_var(&key)
                && !value.is_empty()
            {
                debug!(auth = %auth.auth_alias, env = %key, "PAT overridden from environment");
                auth.pat = Some(value);
            }
        }
    }

    fn client_for(&mut self, kind: SourceType) -> Arc<dyn SourceClient> {
        let system = &self.system;
        Arc::clone(self.clients.entry(kind).or_insert_with(|| -> Arc<dyn SourceClient> {
            match kind {
                SourceType::Git => Arc::new(GitClient::new(Arc::clone(system))),
                SourceType::File => Arc::new(FileClient::new()),
                SourceType::Blob => Arc::new(BlobClient::new()),
            }
        }))
    }

    #[must_use]
    pub fn targets(&self) -> &[BoundClient] {
        &self.targets
    }

    /// Default values of the resolved source set, keyed by dotted path
    #[must_use]
    pub const fn defaults(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Fetch every resolved target, one thread per target
    ///
    /// Failures never stop sibling fetches. A client that panics is reported
    /// as a failure of its source. Results arrive in completion order on the
    /// returned streams, which close when the last task ends.
    #[must_use]
    pub fn fetch_all(&self, ctx: &FetchContext) -> FetchStreams {
        let (fs_tx, filesystems) = mpsc::channel();
        let (err_tx, errors) = mpsc::channel();

        for bound in &self.targets {
            let alias = bound.target().alias().to_owned();
            let task = {
                let bound = bound.clone();
                let ctx = ctx.clone();
                let fs_tx = fs_tx.clone();
                let err_tx = err_tx.clone();
                let alias = alias.clone();
                move || {
                    info!(source = %alias, kind = %bound.kind(), "fetching source");
                    let result = panic::catch_unwind(AssertUnwindSafe(|| bound.fetch(&ctx)))
                        .unwrap_or_else(|payload| {
                            Err(ClientError::Panicked {
                                message: panic_message(payload.as_ref()),
                            })
                        });
                    match result {
                        Ok(filesystem) => {
                            info!(source = %alias, "fetched source");
                            let _sent = fs_tx.send(FetchedSource { alias, filesystem });
                        }
                        Err(cause) => {
                            error!(source = %alias, error = %cause, "failed to fetch source");
                            let _sent = err_tx.send(FetchError { alias, cause });
                        }
                    }
                }
            };

            if let Err(source) = thread::Builder::new()
                .name(format!("fetch-{alias}"))
                .spawn(task)
            {
                let _sent = err_tx.send(FetchError {
                    alias,
                    cause: ClientError::Spawn { source },
                });
            }
        }

        FetchStreams {
            filesystems,
            errors,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_key_follows_alias() {
        assert_eq!(pat_env_key("ado"), "GRAFTSET_ADO_PAT");
        assert_eq!(pat_env_key("azure-devops"), "GRAFTSET_AZURE_DEVOPS_PAT");
        assert_eq!(pat_env_key("gh_main"), "GRAFTSET_GH_MAIN_PAT");
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        let literal = panic::catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(panic_message(literal.as_ref()), "static");

        let formatted = panic::catch_unwind(|| panic!("code {}", 7)).unwrap_err();
        assert_eq!(panic_message(formatted.as_ref()), "code 7");
    }
}
