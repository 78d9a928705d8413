// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON file credential store used by the command-line host.
//!
//! Every mutation rewrites the whole file through a temporary sibling and a
//! rename, so readers never observe a half-written file.

use super::{CredentialStore, StoreError};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Entries = BTreeMap<String, String>;

/// Credential store persisted as a flat JSON object.
pub struct FileCredentialStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn load(&self) -> Result<Entries, StoreError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if data.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        let tmp = self.path.with_extension("tmp");
        write_private(&tmp, json.as_bytes()).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, ()> {
        // A panic while holding the lock cannot leave the file half-written.
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for FileCredentialStore {
    fn save(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let _guard = self.guard();
        Ok(self.load()?.remove(key))
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.guard();
        let mut entries = self.load()?;
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }
}

/// Write `contents` to `path`, readable by the owner only before any byte lands.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // The mode only applies on creation; a leftover file keeps its own.
    restrict_permissions(&file)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}
