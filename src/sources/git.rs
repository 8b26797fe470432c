//! Git source client
//!
//! Clones a single branch with libgit2 into a temporary directory (shallow
//! for remote transports), then loads the declared sub-path into a [`MemorySystem`]
//! whose root is that sub-path.

use super::merge::copy_tree;
use super::{ClientError, FetchContext, SourceClient, TargetSource};
use crate::config::{SourceAuth, SourceType};
use crate::system::{MemorySystem, RealSystem, System};
use crate::utils::path::source_subpath;
use git2::build::RepoBuilder;
use git2::{Cred, Direction, FetchOptions, Remote, RemoteCallbacks};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tempfile::TempDir;
use tracing::debug;

/// `user@host:path`, the scp-like form git accepts for ssh
static SCP_LIKE_URL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._~-]+@[A-Za-z0-9.-]+:[^/]"));

/// Default ssh user when an auth has no user name
const SSH_USER: &str = "git";

/// How a git URL is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Https,
    Ssh,
    Local,
}

impl Transport {
    /// Classify a git URL by its scheme
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] for anything that is not an
    /// `http(s)://`, `ssh://`, scp-like `user@host:path` or `file://` URL.
    pub fn detect(url: &str) -> Result<Self, ClientError> {
        let lower = url.to_ascii_lowercase();
        if lower.starts_with("https://") || lower.starts_with("http://") {
            return Ok(Self::Https);
        }
        if lower.starts_with("ssh://") || is_scp_like(url)? {
            return Ok(Self::Ssh);
        }
        if lower.starts_with("file://") {
            return Ok(Self::Local);
        }

        Err(ClientError::InvalidUrl {
            url: url.to_owned(),
            message: "expected an https://, ssh://, user@host:path or file:// url".to_owned(),
        })
    }

    /// Shallow fetches are only supported by the network transports
    #[must_use]
    pub const fn supports_shallow(self) -> bool {
        !matches!(self, Self::Local)
    }
}

fn is_scp_like(url: &str) -> Result<bool, ClientError> {
    match *SCP_LIKE_URL {
        Ok(ref pattern) => Ok(pattern.is_match(url)),
        Err(ref err) => Err(ClientError::InvalidUrl {
            url: url.to_owned(),
            message: err.to_string(),
        }),
    }
}

/// Credentials chosen for one clone
#[derive(Debug, Clone, PartialEq, Eq)]
enum GitAuth {
    Anonymous,
    Basic { user: String, secret: String },
    SshKey { user: String, private_key: String },
}

/// Clones git sources over https, ssh or the local transport
pub struct GitClient {
    system: Arc<dyn System>,
}

impl GitClient {
    /// `system` is used to read ssh key files
    #[must_use]
    pub fn new(system: Arc<dyn System>) -> Self {
        Self { system }
    }

    /// Pick the credentials the URL's transport needs from the bound auth
    ///
    /// Checked before any network access.
    fn select_auth(
        &self,
        url: &str,
        transport: Transport,
        auth: Option<&SourceAuth>,
    ) -> Result<GitAuth, ClientError> {
        match transport {
            Transport::Local => Ok(GitAuth::Anonymous),
            Transport::Https => match auth {
                None => Ok(GitAuth::Anonymous),
                Some(auth) => {
                    let secret = auth.http_secret().ok_or_else(|| ClientError::AuthMismatch {
                        expected: "PAT",
                        url: url.to_owned(),
                    })?;
                    Ok(GitAuth::Basic {
                        user: auth.user_name.clone(),
                        secret: secret.to_owned(),
                    })
                }
            },
            Transport::Ssh => {
                let auth = auth.ok_or_else(|| ClientError::AuthMismatch {
                    expected: "ssh",
                    url: url.to_owned(),
                })?;
                let key_path = auth.ssh_key().ok_or_else(|| ClientError::AuthMismatch {
                    expected: "ssh",
                    url: url.to_owned(),
                })?;
                let private_key = self.load_private_key(key_path)?;
                let user = if auth.user_name.is_empty() {
                    SSH_USER.to_owned()
                } else {
                    auth.user_name.clone()
                };
                Ok(GitAuth::SshKey { user, private_key })
            }
        }
    }

    fn load_private_key(&self, key_path: &str) -> Result<String, ClientError> {
        let contents = self
            .system
            .read_to_string(Path::new(key_path))
            .map_err(|e| ClientError::CredentialLoad {
                path: key_path.to_owned(),
                message: e.to_string(),
            })?;

        if !contents.contains("PRIVATE KEY") {
            return Err(ClientError::CredentialLoad {
                path: key_path.to_owned(),
                message: "file does not contain a private key".to_owned(),
            });
        }

        Ok(contents)
    }
}

impl SourceClient for GitClient {
    fn kind(&self) -> SourceType {
        SourceType::Git
    }

    fn fetch(
        &self,
        target: &TargetSource,
        ctx: &FetchContext,
    ) -> Result<MemorySystem, ClientError> {
        let source = &target.source;
        let url = source
            .url
            .as_deref()
            .ok_or_else(|| ClientError::MissingUrl {
                alias: source.alias.clone(),
            })?;
        let subpath = source_subpath(&source.path).map_err(|e| ClientError::InvalidPath {
            path: source.path.clone(),
            message: e.to_string(),
        })?;

        let transport = Transport::detect(url)?;
        let auth = self.select_auth(url, transport, target.auth.as_ref())?;
        ctx.check()?;

        let checkout = TempDir::new().map_err(|e| ClientError::Filesystem {
            path: std::env::temp_dir(),
            source: e,
        })?;
        debug!(
            source = %source.alias,
            url,
            ?transport,
            dest = %checkout.path().display(),
            "cloning git source"
        );
        clone(url, transport, &auth, source.reference.as_deref(), checkout.path(), ctx)?;

        let root = checkout.path().join(&subpath);
        let local = RealSystem::new();
        if !local.is_dir(&root) {
            return Err(ClientError::PathNotFound {
                path: source.path.clone(),
            });
        }

        let tree = MemorySystem::new();
        let copied = copy_tree(&local, &root, &tree, Path::new("/")).map_err(|e| {
            ClientError::Filesystem {
                path: e.path,
                source: e.source,
            }
        })?;
        debug!(source = %source.alias, files = copied, "loaded git source");

        Ok(tree)
    }
}

/// Credential and cancellation callbacks for one remote operation
fn remote_callbacks(auth: &GitAuth, ctx: &FetchContext) -> RemoteCallbacks<'static> {
    let mut callbacks = RemoteCallbacks::new();
    match auth.clone() {
        GitAuth::Anonymous => {}
        GitAuth::Basic { user, secret } => {
            callbacks.credentials(move |_url, _username, _allowed| {
                Cred::userpass_plaintext(&user, &secret)
            });
        }
        GitAuth::SshKey { user, private_key } => {
            callbacks.credentials(move |_url, username, _allowed| {
                Cred::ssh_key_from_memory(username.unwrap_or(&user), None, &private_key, None)
            });
        }
    }
    let transfer_ctx = ctx.clone();
    callbacks.transfer_progress(move |_progress| !transfer_ctx.is_cancelled());
    callbacks
}

/// Ask the remote which branch its `HEAD` points at
fn remote_default_branch(url: &str, auth: &GitAuth, ctx: &FetchContext) -> Result<String, git2::Error> {
    let mut remote = Remote::create_detached(url)?;
    let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks(auth, ctx)), None)?;
    let head = connection.default_branch()?;
    let head = head
        .as_str()
        .ok_or_else(|| git2::Error::from_str("remote HEAD is not valid UTF-8"))?;

    head.strip_prefix("refs/heads/")
        .map(str::to_owned)
        .ok_or_else(|| git2::Error::from_str(&format!("remote HEAD is not a branch: {head}")))
}

/// Clone a single branch of `url` into `into`
///
/// Without a `reference` the remote's default branch is used. The origin
/// remote only tracks that branch, so no other branch tip is downloaded.
fn clone(
    url: &str,
    transport: Transport,
    auth: &GitAuth,
    reference: Option<&str>,
    into: &Path,
    ctx: &FetchContext,
) -> Result<(), ClientError> {
    let clone_error = |source: git2::Error| {
        if ctx.is_cancelled() {
            ClientError::Cancelled
        } else {
            ClientError::Clone {
                url: url.to_owned(),
                source,
            }
        }
    };

    let branch = match reference.filter(|r| !r.is_empty()) {
        Some(reference) => reference.to_owned(),
        None => remote_default_branch(url, auth, ctx).map_err(clone_error)?,
    };
    ctx.check()?;
    debug!(url, branch = %branch, "cloning single branch");

    let mut fetch_options = FetchOptions::new();
    fetch_options.remote_callbacks(remote_callbacks(auth, ctx));
    if transport.supports_shallow() {
        fetch_options.depth(1);
    }

    let tracked = branch.clone();
    let mut builder = RepoBuilder::new();
    builder
        .fetch_options(fetch_options)
        .branch(&branch)
        .remote_create(move |repo, name, url| {
            let refspec = format!("+refs/heads/{tracked}:refs/remotes/{name}/{tracked}");
            repo.remote_with_fetch(name, url, &refspec)
        });

    builder.clone(url, into).map_err(clone_error)?;

    Ok(())
}
