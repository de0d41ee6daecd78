//! Registration store errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Computer ID already exists: {0}")]
    AlreadyExists(String),

    #[error("Computer ID not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Persistence(String),

    #[error("Encryption error: {0}")]
    Encryption(String),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Persistence(format!("JSON serialization error: {}", e))
    }
}

impl From<aes_gcm::Error> for StoreError {
    fn from(_: aes_gcm::Error) -> Self {
        StoreError::Encryption("AES-GCM encryption/decryption failed".to_string())
    }
}
