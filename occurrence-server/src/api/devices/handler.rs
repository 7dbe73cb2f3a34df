//! Device API handlers

use axum::{Json, extract::State};
use shared::models::{Device, DeviceCreate};

use crate::core::ServerState;
use crate::db::repository::device;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Device>>> {
    let devices = device::find_all(&state.pool).await?;
    Ok(Json(devices))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DeviceCreate>,
) -> AppResult<Json<Device>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    let created = device::create(&state.pool, payload).await?;
    tracing::info!(device_id = created.id, name = %created.name, "Device created");
    Ok(Json(created))
}
