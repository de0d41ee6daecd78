//! Device registration store.
//!
//! Devices are submitted into a pending set, moved into the registered set
//! when an admin approves them, and removed when unregistered. A computer ID
//! is never present in both sets. State is written through to a JSON file,
//! an encrypted file, or nowhere.

mod backend;
mod error;
mod store;
mod types;

pub use backend::{Backend, EncryptedFileBackend, JsonFileBackend};
pub use error::StoreError;
pub use store::RegistrationStore;
pub use types::{RegistrationRecord, Registrations};
