//! Key-value storage for the operator's bearer token and cached identity.
//!
//! The API client and session gate take the store as an injected
//! `Arc<dyn CredentialStore>`: [`MemoryStore`] for tests and throwaway
//! sessions, [`FileStore`] for the encrypted on-disk store.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use secrecy::{ExposeSecret, Secret};

use crate::services::encryption::{self, EncryptionError, StoreCipher};

/// Bearer token returned by a successful login
pub const AUTH_TOKEN_KEY: &str = "auth_token";
/// JSON-serialized [`crate::models::User`] of the logged-in operator
pub const USER_DATA_KEY: &str = "user_data";

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Credential encryption error: {0}")]
    Encryption(#[from] EncryptionError),
}

pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Encrypted JSON file: `{"<key>": "<base64 sealed value>"}`.
///
/// Nothing touches the disk until the first operation.
pub struct FileStore {
    path: PathBuf,
    key: Option<Secret<String>>,
    cipher: Mutex<Option<StoreCipher>>,
}

impl FileStore {
    /// `key` is a passphrase; when absent a random key file is kept next to the store.
    pub fn new(path: impl Into<PathBuf>, key: Option<Secret<String>>) -> Self {
        Self {
            path: path.into(),
            key,
            cipher: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn key_file_path(&self) -> PathBuf {
        self.path.with_extension("key")
    }

    fn with_cipher<T>(
        &self,
        f: impl FnOnce(&StoreCipher) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.cipher.lock();
        if let Some(cipher) = guard.as_ref() {
            return f(cipher);
        }

        let passphrase = match &self.key {
            Some(key) => key.expose_secret().clone(),
            None => self.load_or_create_key_file()?,
        };
        let cipher = StoreCipher::new(&encryption::derive_key(&passphrase))?;
        let result = f(&cipher);
        *guard = Some(cipher);
        result
    }

    fn load_or_create_key_file(&self) -> Result<String, StoreError> {
        let key_path = self.key_file_path();
        match fs::read_to_string(&key_path) {
            Ok(material) => return Ok(material.trim().to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let material = encryption::generate_key_material()?;
        write_private(&key_path, material.as_bytes())?;
        tracing::info!(path = %key_path.display(), "Created credential store key file");
        Ok(material)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        write_private(&self.path, &bytes)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.read_entries()?;
        match entries.get(key) {
            Some(sealed) => self.with_cipher(|cipher| Ok(Some(cipher.open(sealed)?))),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let sealed = self.with_cipher(|cipher| Ok(cipher.seal(value)?))?;
        let mut entries = self.read_entries()?;
        entries.insert(key.to_string(), sealed);
        self.write_entries(&entries)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_entries()?;
        if entries.remove(key).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

/// Writes via a temp file and rename so readers never see a partial file.
fn write_private(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
