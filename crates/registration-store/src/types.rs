//! Registration records and the two-set registration state.

use crate::error::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A device registration as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationRecord {
    /// Name the client registered under
    pub username: String,

    /// Application version reported at registration
    pub app_version: String,

    /// When the registration request was accepted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl RegistrationRecord {
    /// Create a record stamped with the current time.
    pub fn new(username: impl Into<String>, app_version: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            app_version: app_version.into(),
            submitted_at: Some(Utc::now()),
        }
    }
}

/// Pending and registered devices keyed by computer ID.
///
/// A computer ID lives in at most one of the two maps. Records are only
/// inserted, moved or removed, never edited. The serialized form is the
/// `{"registered_users": {..}, "pending_users": {..}}` document kept on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registrations {
    #[serde(rename = "registered_users", default)]
    registered: BTreeMap<String, RegistrationRecord>,

    #[serde(rename = "pending_users", default)]
    pending: BTreeMap<String, RegistrationRecord>,
}

impl Registrations {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the ID is known in either set.
    pub fn contains(&self, computer_id: &str) -> bool {
        self.registered.contains_key(computer_id) || self.pending.contains_key(computer_id)
    }

    pub fn is_pending(&self, computer_id: &str) -> bool {
        self.pending.contains_key(computer_id)
    }

    pub fn is_registered(&self, computer_id: &str) -> bool {
        self.registered.contains_key(computer_id)
    }

    /// Add a pending registration.
    pub fn register(
        &mut self,
        computer_id: &str,
        record: RegistrationRecord,
    ) -> Result<(), StoreError> {
        if self.contains(computer_id) {
            return Err(StoreError::AlreadyExists(computer_id.to_string()));
        }
        self.pending.insert(computer_id.to_string(), record);
        Ok(())
    }

    /// Add a device straight to the registered set.
    pub(crate) fn insert_registered(
        &mut self,
        computer_id: &str,
        record: RegistrationRecord,
    ) -> Result<(), StoreError> {
        if self.contains(computer_id) {
            return Err(StoreError::AlreadyExists(computer_id.to_string()));
        }
        self.registered.insert(computer_id.to_string(), record);
        Ok(())
    }

    /// Move a pending registration into the registered set.
    pub fn approve(&mut self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        let record = self
            .pending
            .remove(computer_id)
            .ok_or_else(|| StoreError::NotFound(computer_id.to_string()))?;
        self.registered
            .insert(computer_id.to_string(), record.clone());
        Ok(record)
    }

    /// Drop a pending registration without approving it.
    pub fn reject(&mut self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        self.pending
            .remove(computer_id)
            .ok_or_else(|| StoreError::NotFound(computer_id.to_string()))
    }

    /// Remove a device from the registered set.
    pub fn unregister(&mut self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        self.registered
            .remove(computer_id)
            .ok_or_else(|| StoreError::NotFound(computer_id.to_string()))
    }

    /// Look up a registered device.
    pub fn registered(&self, computer_id: &str) -> Option<&RegistrationRecord> {
        self.registered.get(computer_id)
    }

    /// Look up a pending registration.
    pub fn pending(&self, computer_id: &str) -> Option<&RegistrationRecord> {
        self.pending.get(computer_id)
    }

    /// Registered devices ordered by computer ID.
    pub fn list_registered(&self) -> Vec<(String, RegistrationRecord)> {
        self.registered
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Pending registrations ordered by computer ID.
    pub fn list_pending(&self) -> Vec<(String, RegistrationRecord)> {
        self.pending
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }
}
