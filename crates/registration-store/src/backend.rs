//! Persistence backends for the registration state.

use crate::error::StoreError;
use crate::types::{RegistrationRecord, Registrations};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Domain separator mixed into passphrase-derived keys.
const KEY_DERIVATION_CONTEXT: &str = "device-gatekeeper/registrations";

/// Nonce size for AES-GCM (96 bits = 12 bytes).
const NONCE_SIZE: usize = 12;

/// Plain JSON document on disk, four-space indented.
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the document via a temp file and rename.
    pub async fn save(&self, registrations: &Registrations) -> Result<(), StoreError> {
        let data = to_document(registrations)?;
        write_atomic(&self.path, &data).await?;

        debug!("Saved registrations ({} bytes) to {:?}", data.len(), self.path);
        Ok(())
    }

    /// Load the document.
    ///
    /// A missing file is created holding an empty document. A file that is
    /// not a JSON object is logged and treated as empty. Malformed entries
    /// are logged and skipped. A file that exists but cannot be read is an
    /// error.
    pub async fn load(&self) -> Result<Registrations, StoreError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "Data file not found at {:?}, creating an empty one",
                    self.path
                );
                let registrations = Registrations::new();
                self.save(&registrations).await?;
                return Ok(registrations);
            }
            Err(e) => return Err(e.into()),
        };

        match parse_document(&data) {
            Ok(registrations) => {
                info!(
                    "Loaded {} registered and {} pending devices from {:?}",
                    registrations.registered_count(),
                    registrations.pending_count(),
                    self.path
                );
                Ok(registrations)
            }
            Err(e) => {
                warn!(
                    "Data file {:?} is not a valid registrations document ({}), starting empty",
                    self.path, e
                );
                Ok(Registrations::new())
            }
        }
    }
}

/// AES-256-GCM sealed document on disk.
///
/// File format: [12 bytes nonce][ciphertext with auth tag]
pub struct EncryptedFileBackend {
    path: PathBuf,
    key: [u8; 32],
}

impl EncryptedFileBackend {
    /// Create a backend with an explicit 32-byte key.
    pub fn with_key(path: impl Into<PathBuf>, key: [u8; 32]) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// Create a backend whose key is derived from a passphrase.
    pub fn from_passphrase(path: impl Into<PathBuf>, passphrase: &str) -> Self {
        Self::with_key(path, derive_key(passphrase))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, registrations: &Registrations) -> Result<(), StoreError> {
        let plaintext = serde_json::to_vec(registrations)?;
        let data = seal(&plaintext, &self.key)?;
        write_atomic(&self.path, &data).await?;

        debug!(
            "Saved encrypted registrations ({} bytes) to {:?}",
            data.len(),
            self.path
        );
        Ok(())
    }

    /// Load and decrypt the document.
    ///
    /// Returns an empty state if the file doesn't exist. A file that fails
    /// to decrypt is an error.
    pub async fn load(&self) -> Result<Registrations, StoreError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "Encrypted data file not found at {:?}, starting empty",
                    self.path
                );
                return Ok(Registrations::new());
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext = open(&data, &self.key).map_err(|_| {
            StoreError::Encryption(format!(
                "Failed to decrypt {:?}. Check the configured encryption key.",
                self.path
            ))
        })?;
        let registrations = parse_document(&plaintext)?;

        info!(
            "Loaded {} registered and {} pending devices from encrypted {:?}",
            registrations.registered_count(),
            registrations.pending_count(),
            self.path
        );
        Ok(registrations)
    }
}

/// Storage backend for the registration store.
pub enum Backend {
    /// Plain JSON file
    Json(JsonFileBackend),
    /// Encrypted file
    Encrypted(EncryptedFileBackend),
    /// In-memory only (no persistence)
    Memory,
}

impl Backend {
    pub fn json(path: impl Into<PathBuf>) -> Self {
        Backend::Json(JsonFileBackend::new(path))
    }

    pub fn encrypted(path: impl Into<PathBuf>, passphrase: &str) -> Self {
        Backend::Encrypted(EncryptedFileBackend::from_passphrase(path, passphrase))
    }

    pub fn memory() -> Self {
        Backend::Memory
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Backend::Json(_) => "json",
            Backend::Encrypted(_) => "encrypted",
            Backend::Memory => "memory",
        }
    }

    pub async fn save(&self, registrations: &Registrations) -> Result<(), StoreError> {
        match self {
            Backend::Json(b) => b.save(registrations).await,
            Backend::Encrypted(b) => b.save(registrations).await,
            Backend::Memory => {
                debug!("Memory backend: save is a no-op");
                Ok(())
            }
        }
    }

    pub async fn load(&self) -> Result<Registrations, StoreError> {
        match self {
            Backend::Json(b) => b.load().await,
            Backend::Encrypted(b) => b.load().await,
            Backend::Memory => {
                debug!("Memory backend: returning empty state");
                Ok(Registrations::new())
            }
        }
    }
}

/// On-disk document with records left unparsed.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    registered_users: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pending_users: BTreeMap<String, serde_json::Value>,
}

/// Parse a stored document one record at a time.
///
/// Fails only if the document itself is not the expected object. Entries
/// that are not valid records, or whose ID already appeared, are skipped.
fn parse_document(data: &[u8]) -> Result<Registrations, serde_json::Error> {
    let raw: RawDocument = serde_json::from_slice(data)?;
    let mut registrations = Registrations::new();

    for (computer_id, value) in raw.registered_users {
        let loaded = serde_json::from_value::<RegistrationRecord>(value)
            .map_err(StoreError::from)
            .and_then(|record| registrations.insert_registered(&computer_id, record));
        if let Err(e) = loaded {
            warn!(computer_id = %computer_id, "Skipping registered entry: {}", e);
        }
    }

    for (computer_id, value) in raw.pending_users {
        let loaded = serde_json::from_value::<RegistrationRecord>(value)
            .map_err(StoreError::from)
            .and_then(|record| registrations.register(&computer_id, record));
        if let Err(e) = loaded {
            warn!(computer_id = %computer_id, "Skipping pending entry: {}", e);
        }
    }

    Ok(registrations)
}

/// Serialize with the four-space indent the data file has always used.
fn to_document(registrations: &Registrations) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    registrations.serialize(&mut serializer)?;
    Ok(buf)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

/// SHA256(context || passphrase)
fn derive_key(passphrase: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DERIVATION_CONTEXT.as_bytes());
    hasher.update(passphrase.as_bytes());
    let hash = hasher.finalize();

    let mut key = [0u8; 32];
    key.copy_from_slice(&hash);
    key
}

fn seal(plaintext: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, StoreError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher.encrypt(nonce, plaintext)?;

    let mut data = nonce_bytes.to_vec();
    data.extend(ciphertext);
    Ok(data)
}

fn open(data: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, StoreError> {
    if data.len() < NONCE_SIZE {
        return Err(StoreError::Encryption("Data too short".into()));
    }

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
    Ok(cipher.decrypt(nonce, &data[NONCE_SIZE..])?)
}
