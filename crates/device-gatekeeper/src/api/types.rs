//! API request and response types.

use serde::{Deserialize, Serialize};

/// JSON body of `POST /register`.
///
/// Fields are optional so a missing one surfaces as a validation error
/// rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub computer_id: Option<String>,
    pub app_version: Option<String>,
}

/// JSON body of `POST /verify`.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub computer_id: Option<String>,
}

/// Form posted by the admin views to approve, reject or unregister a device.
#[derive(Debug, Default, Deserialize)]
pub struct DeviceForm {
    pub computer_id: Option<String>,
}

/// Form posted to `POST /delete_user`.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteUserForm {
    pub computer_id: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
}

/// `{"message": ...}` response body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub pending_count: usize,
    pub registered_count: usize,
}
