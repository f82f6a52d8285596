use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::AccountCollection;
use crate::error::{AuthError, Result};

/// Per-integration JSON credential files under one directory.
///
/// There is no file locking: a save writes the caller's in-memory collection
/// verbatim, so two processes editing the same integration at once race and
/// the last writer wins.
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, integration: &str) -> PathBuf {
        self.dir.join(format!("{}.json", integration))
    }

    /// Create the credentials directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        match fs::create_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(source) => Err(AuthError::StoreWrite {
                path: self.dir.clone(),
                source,
            }),
        }
    }

    // -- Accounts ---------------------------------------------------------------

    pub fn load(&self, integration: &str) -> Result<AccountCollection> {
        let path = self.path_for(integration);
        if !path.exists() {
            debug!(integration, path = %path.display(), "no credential file yet");
            return Ok(AccountCollection::new());
        }

        let contents = fs::read_to_string(&path).map_err(|source| AuthError::StoreRead {
            path: path.clone(),
            source,
        })?;
        let accounts: AccountCollection = serde_json::from_str(&contents)
            .map_err(|source| AuthError::MalformedStore { path: path.clone(), source })?;

        debug!(integration, accounts = accounts.len(), "loaded credentials");
        Ok(accounts)
    }

    /// Write `accounts` as the full collection for `integration`.
    ///
    /// Returns the path written.
    pub fn save(&self, integration: &str, accounts: &AccountCollection) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.path_for(integration);
        let contents = serde_json::to_string_pretty(accounts).map_err(|source| {
            AuthError::MalformedStore {
                path: path.clone(),
                source,
            }
        })?;

        fs::write(&path, contents).map_err(|source| AuthError::StoreWrite {
            path: path.clone(),
            source,
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600)).map_err(|source| {
                AuthError::StoreWrite {
                    path: path.clone(),
                    source,
                }
            })?;
        }

        info!(integration, accounts = accounts.len(), path = %path.display(), "saved credentials");
        Ok(path)
    }
}

/// Render `path` relative to the working directory when possible.
pub fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(cwd).ok().map(|rel| Path::new(".").join(rel)))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
