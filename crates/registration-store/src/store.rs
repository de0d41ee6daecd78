//! Lock-guarded registration store with write-through persistence.

use crate::backend::Backend;
use crate::error::StoreError;
use crate::types::{RegistrationRecord, Registrations};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument};

/// Pending and registered devices behind a single lock.
///
/// Every mutation holds the write lock across both the in-memory change and
/// the save, so no reader sees a record in neither or both sets and saves
/// land in mutation order. If the save fails the in-memory change stands and
/// the error is returned; the next successful save writes the full state.
pub struct RegistrationStore {
    state: RwLock<Registrations>,
    backend: Backend,
}

impl RegistrationStore {
    /// Load existing state from the backend.
    pub async fn open(backend: Backend) -> Result<Self, StoreError> {
        let registrations = backend.load().await?;
        info!(
            backend = backend.kind(),
            registered = registrations.registered_count(),
            pending = registrations.pending_count(),
            "Registration store opened"
        );
        Ok(Self::new(registrations, backend))
    }

    /// Wrap already-loaded state.
    pub fn new(registrations: Registrations, backend: Backend) -> Self {
        Self {
            state: RwLock::new(registrations),
            backend,
        }
    }

    /// Empty store without persistence.
    pub fn in_memory() -> Self {
        Self::new(Registrations::new(), Backend::memory())
    }

    /// Submit a registration for admin approval.
    #[instrument(skip(self))]
    pub async fn register(
        &self,
        computer_id: &str,
        username: &str,
        app_version: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.register(computer_id, RegistrationRecord::new(username, app_version))?;
        self.persist(&state).await?;

        debug!("Pending registration added for {}", computer_id);
        Ok(())
    }

    /// Approve a pending registration.
    #[instrument(skip(self))]
    pub async fn approve(&self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state.approve(computer_id)?;
        self.persist(&state).await?;
        Ok(record)
    }

    /// Discard a pending registration.
    #[instrument(skip(self))]
    pub async fn reject(&self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state.reject(computer_id)?;
        self.persist(&state).await?;
        Ok(record)
    }

    /// Remove a registered device.
    #[instrument(skip(self))]
    pub async fn unregister(&self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        let mut state = self.state.write().await;
        let record = state.unregister(computer_id)?;
        self.persist(&state).await?;
        Ok(record)
    }

    /// Look up a registered device.
    pub async fn verify(&self, computer_id: &str) -> Result<RegistrationRecord, StoreError> {
        self.state
            .read()
            .await
            .registered(computer_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(computer_id.to_string()))
    }

    pub async fn list_registered(&self) -> Vec<(String, RegistrationRecord)> {
        self.state.read().await.list_registered()
    }

    pub async fn list_pending(&self) -> Vec<(String, RegistrationRecord)> {
        self.state.read().await.list_pending()
    }

    /// (pending, registered)
    pub async fn counts(&self) -> (usize, usize) {
        let state = self.state.read().await;
        (state.pending_count(), state.registered_count())
    }

    /// Copy of the current state.
    pub async fn snapshot(&self) -> Registrations {
        self.state.read().await.clone()
    }

    async fn persist(&self, state: &Registrations) -> Result<(), StoreError> {
        self.backend.save(state).await.map_err(|e| {
            error!(backend = self.backend.kind(), "Failed to save registrations: {}", e);
            e
        })
    }
}
