//! Device Gatekeeper - admin-approved device registration service.
//!
//! Clients submit a (username, computer ID, app version) registration which
//! waits in a pending set until an admin approves it. Approved devices can
//! then be verified by computer ID, and unregistered again by an admin.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;

pub use auth::{AdminAuthorizer, DenyAll, StaticCredentials};
pub use config::Config;
pub use error::GatekeeperError;
pub use registration_store::{Backend, RegistrationRecord, RegistrationStore, StoreError};
