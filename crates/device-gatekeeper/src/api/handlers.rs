//! HTTP request handlers.

use super::types::{
    DeleteUserForm, DeviceForm, HealthResponse, MessageResponse, RegisterRequest, VerifyRequest,
};
use super::AppState;
use crate::error::GatekeeperError;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Form, Json,
};
use registration_store::StoreError;
use tracing::{info, warn};

/// Health check endpoint.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let (pending_count, registered_count) = state.store.counts().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        pending_count,
        registered_count,
    })
}

/// Submit a device for admin approval.
///
/// A body that is not a JSON object of string fields counts as missing data.
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, GatekeeperError> {
    let request = body.map(|Json(r)| r).unwrap_or_else(|e| {
        warn!(reason = %e.body_text(), "Unreadable registration body");
        RegisterRequest::default()
    });

    let (Some(username), Some(computer_id), Some(app_version)) = (
        non_empty(request.username),
        non_empty(request.computer_id),
        non_empty(request.app_version),
    ) else {
        warn!("Registration request with missing fields");
        return Err(GatekeeperError::Validation("Missing data!".to_string()));
    };

    info!(
        computer_id = %computer_id,
        username = %username,
        app_version = %app_version,
        "Registration request received"
    );

    state
        .store
        .register(&computer_id, &username, &app_version)
        .await
        .inspect_err(|e| {
            if matches!(e, StoreError::AlreadyExists(_)) {
                warn!(computer_id = %computer_id, "Registration for known computer ID");
            }
        })?;

    Ok(Json(MessageResponse::new(
        "Registration request submitted and awaiting admin approval.",
    )))
}

/// Approve a pending registration.
pub async fn approve_user(
    State(state): State<AppState>,
    Form(form): Form<DeviceForm>,
) -> Result<Json<MessageResponse>, GatekeeperError> {
    let computer_id = form.computer_id.unwrap_or_default();

    let record = state
        .store
        .approve(&computer_id)
        .await
        .map_err(not_found("Computer ID not found in pending approvals."))?;

    info!(computer_id = %computer_id, username = %record.username, "Device approved");

    Ok(Json(MessageResponse::new(format!(
        "User {} approved successfully.",
        record.username
    ))))
}

/// Discard a pending registration.
pub async fn reject_user(
    State(state): State<AppState>,
    Form(form): Form<DeviceForm>,
) -> Result<Json<MessageResponse>, GatekeeperError> {
    let computer_id = form.computer_id.unwrap_or_default();

    let record = state
        .store
        .reject(&computer_id)
        .await
        .map_err(not_found("Computer ID not found in pending approvals."))?;

    info!(computer_id = %computer_id, username = %record.username, "Registration rejected");

    Ok(Json(MessageResponse::new(format!(
        "User {} rejected.",
        record.username
    ))))
}

/// Remove a registered device.
pub async fn unregister_user(
    State(state): State<AppState>,
    Form(form): Form<DeviceForm>,
) -> Result<Json<MessageResponse>, GatekeeperError> {
    let computer_id = form.computer_id.unwrap_or_default();

    let record = state
        .store
        .unregister(&computer_id)
        .await
        .map_err(not_found("Computer ID not found in registered users."))?;

    info!(computer_id = %computer_id, username = %record.username, "Device unregistered");

    Ok(Json(MessageResponse::new(format!(
        "User {} unregistered successfully.",
        record.username
    ))))
}

/// Remove a registered device after checking admin credentials.
pub async fn delete_user(
    State(state): State<AppState>,
    Form(form): Form<DeleteUserForm>,
) -> Result<Json<MessageResponse>, GatekeeperError> {
    let admin_username = form.admin_username.unwrap_or_default();
    let admin_password = form.admin_password.unwrap_or_default();

    if !state.authorizer.authorize(&admin_username, &admin_password) {
        warn!(admin_username = %admin_username, "Rejected delete with invalid admin credentials");
        return Err(GatekeeperError::Unauthorized);
    }

    let computer_id = form.computer_id.unwrap_or_default();

    let record = state
        .store
        .unregister(&computer_id)
        .await
        .map_err(not_found("Computer ID not found in registered users."))?;

    info!(computer_id = %computer_id, username = %record.username, "Device deleted by admin");

    Ok(Json(MessageResponse::new(format!(
        "User {} deleted successfully.",
        record.username
    ))))
}

/// Check whether a device is registered.
///
/// Both outcomes answer with a `{"message": ...}` body. An unreadable body
/// is treated like an unknown device.
pub async fn verify(
    State(state): State<AppState>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, (StatusCode, Json<MessageResponse>)> {
    let computer_id = body
        .ok()
        .and_then(|Json(request)| request.computer_id)
        .unwrap_or_default();

    match state.store.verify(&computer_id).await {
        Ok(record) => Ok(Json(MessageResponse::new(format!(
            "User {} is verified!",
            record.username
        )))),
        Err(_) => {
            info!(computer_id = %computer_id, "Verification failed for unknown device");
            Err((
                StatusCode::NOT_FOUND,
                Json(MessageResponse::new("Computer not registered!")),
            ))
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Map `NotFound` to a 404 carrying `message`; anything else converts as usual.
fn not_found(message: &'static str) -> impl Fn(StoreError) -> GatekeeperError {
    move |e| match e {
        StoreError::NotFound(_) => GatekeeperError::NotFound(message.to_string()),
        other => other.into(),
    }
}
