//! Encrypted key-value configuration store.
//!
//! Secrets and plain values live in two separate maps that share one JSON
//! file. The file is read once when the store is opened; afterwards the
//! in-memory maps are authoritative and every mutation rewrites the file.

pub mod sealer;

use crate::config::Config;
use crate::core::error::StoreError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sealer::SecretSealer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    secrets: BTreeMap<String, String>,
    #[serde(default)]
    values: BTreeMap<String, String>,
}

pub struct SecureStore {
    path: PathBuf,
    sealer: Box<dyn SecretSealer>,
    data: StoreFile,
}

impl SecureStore {
    pub fn default_path() -> PathBuf {
        Config::app_dir().join("store.json")
    }

    /// Opens the store at the default location, sealed to the current user.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(Self::default_path(), sealer::for_current_user())
    }

    pub fn open(path: impl Into<PathBuf>, sealer: Box<dyn SecretSealer>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let data = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                StoreFile::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            StoreFile::default()
        };

        debug!(
            path = %path.display(),
            secrets = data.secrets.len(),
            values = data.values.len(),
            "opened secure store"
        );

        Ok(Self { path, sealer, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set_secret(&mut self, name: &str, plaintext: &str) -> Result<(), StoreError> {
        if name.is_empty() || plaintext.is_empty() {
            return Err(StoreError::InvalidArgument(
                "key name and value cannot be empty".to_string(),
            ));
        }

        let encoded = STANDARD.encode(self.sealer.seal(plaintext.as_bytes())?);
        self.commit(|data| {
            data.secrets.insert(name.to_string(), encoded);
        })
    }

    /// `Ok(None)` when the name was never stored; `Err` when the stored blob
    /// cannot be decoded or unsealed.
    pub fn get_secret(&self, name: &str) -> Result<Option<String>, StoreError> {
        let Some(encoded) = self.data.secrets.get(name) else {
            return Ok(None);
        };

        let plaintext = STANDARD
            .decode(encoded)
            .map_err(|e| StoreError::Decryption(e.to_string()))
            .and_then(|sealed| self.sealer.unseal(&sealed))
            .and_then(|bytes| {
                String::from_utf8(bytes).map_err(|e| StoreError::Decryption(e.to_string()))
            })
            .inspect_err(|e| debug!(key = name, error = %e, "failed to read secret"))?;

        Ok(Some(plaintext))
    }

    pub fn has_secret(&self, name: &str) -> bool {
        self.data.secrets.contains_key(name)
    }

    /// Returns whether an entry was removed.
    pub fn remove_secret(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.data.secrets.contains_key(name) {
            return Ok(false);
        }
        self.commit(|data| {
            data.secrets.remove(name);
        })?;
        Ok(true)
    }

    pub fn set_value(&mut self, name: &str, value: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidArgument(
                "key name cannot be empty".to_string(),
            ));
        }
        self.commit(|data| {
            data.values.insert(name.to_string(), value.to_string());
        })
    }

    pub fn get_value(&self, name: &str) -> Option<&str> {
        self.data.values.get(name).map(String::as_str)
    }

    pub fn remove_value(&mut self, name: &str) -> Result<bool, StoreError> {
        if !self.data.values.contains_key(name) {
            return Ok(false);
        }
        self.commit(|data| {
            data.values.remove(name);
        })?;
        Ok(true)
    }

    /// Applies `update` to a copy, writes it, and only then makes it current.
    fn commit(&mut self, update: impl FnOnce(&mut StoreFile)) -> Result<(), StoreError> {
        let mut next = self.data.clone();
        update(&mut next);

        write_file(&self.path, &next).inspect_err(|e| {
            debug!(path = %self.path.display(), error = %e, "failed to save secure store")
        })?;

        self.data = next;
        Ok(())
    }
}

fn write_file(path: &Path, data: &StoreFile) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(data)?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies on creation; tighten files left by older versions
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
