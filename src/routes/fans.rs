use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::{AppState, COOKIE_NAME};
use crate::upstream::{CommandPayload, DeviceState};
use crate::vault::CredentialRecord;

const LIST_FAILED: &str = "Failed to fetch fans";
const COMMAND_FAILED: &str = "Failed to send command";

#[derive(Serialize)]
pub struct FansResponse {
    fans: Vec<DeviceState>,
}

fn open_session(
    state: &AppState,
    jar: &CookieJar,
    op: &'static str,
) -> Result<CredentialRecord, ApiError> {
    let token = jar.get(COOKIE_NAME).map(|c| c.value());
    state.vault.open(token).map_err(|e| ApiError::from_core(e, op))
}

/// GET /api/fans: list the session's fans
pub async fn list_fans(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<FansResponse>, ApiError> {
    let record = open_session(&state, &jar, LIST_FAILED)?;

    let fans = state
        .vault
        .list_fans(&record)
        .await
        .map_err(|e| ApiError::from_core(e, LIST_FAILED))?;

    tracing::debug!(count = fans.len(), "Fans listed");
    Ok(Json(FansResponse { fans }))
}

/// POST /api/fans/{id}/command: relay a command to one fan
pub async fn send_command(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let record = open_session(&state, &jar, COMMAND_FAILED)?;

    let payload =
        CommandPayload::from_slice(&body).map_err(|e| ApiError::from_core(e, COMMAND_FAILED))?;

    // Detached so a client disconnect cannot abort a half-sent command.
    let vault = state.vault.clone();
    let id = device_id.clone();
    let task = tokio::spawn(async move { vault.send_command(&record, &id, &payload).await });

    match task.await {
        Ok(Ok(_ack)) => {
            tracing::info!(device_id = %device_id, "Command relayed");
            Ok(Json(json!({ "ok": true })))
        }
        Ok(Err(e)) => Err(ApiError::from_core(e, COMMAND_FAILED)),
        Err(join_err) => {
            tracing::error!(device_id = %device_id, error = %join_err, "Command task failed");
            Err(ApiError::OperationFailed(COMMAND_FAILED))
        }
    }
}
