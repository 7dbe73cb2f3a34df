//! User administration handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{CountryGrant, CountryPermission, User, UserCreate};

use crate::auth::password::hash_password;
use crate::core::ServerState;
use crate::db::repository::{country, country_permission, user};
use crate::utils::validation::{MAX_NAME_LEN, MAX_PASSWORD_LEN, validate_required_text};
use crate::utils::{AppError, AppResult, ErrorCode};

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<User>>> {
    let users = user::find_all(&state.pool).await?;
    Ok(Json(users))
}

/// Create a user, grant the requested countries and the external-partner country
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<UserCreate>,
) -> AppResult<Json<User>> {
    let created = provision_user(&state, payload).await?;
    Ok(Json(created))
}

pub async fn provision_user(state: &ServerState, payload: UserCreate) -> AppResult<User> {
    validate_required_text(&payload.username, "username", MAX_NAME_LEN)?;
    validate_required_text(&payload.password, "password", MAX_PASSWORD_LEN)?;
    for country_id in &payload.country_ids {
        require_country(state, *country_id).await?;
    }

    let hash = hash_password(&payload.password)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))?;
    let created = user::create(&state.pool, &payload, &hash).await?;

    let grants = payload.country_ids.iter().copied().chain(state.partner_country_id);
    for country_id in grants {
        country_permission::ensure_granted(&state.pool, created.id, country_id).await?;
    }

    tracing::info!(
        user_id = created.id,
        username = %created.username,
        is_superuser = created.is_superuser,
        "User provisioned"
    );
    Ok(created)
}

pub async fn list_countries(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Vec<CountryPermission>>> {
    require_user(&state, id).await?;
    let grants = country_permission::find_by_user(&state.pool, id).await?;
    Ok(Json(grants))
}

pub async fn grant_country(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(payload): Json<CountryGrant>,
) -> AppResult<Json<CountryPermission>> {
    require_user(&state, id).await?;
    require_country(&state, payload.country_id).await?;
    let grant = country_permission::grant(&state.pool, id, payload.country_id).await?;
    tracing::info!(user_id = id, country_id = payload.country_id, "Country granted");
    Ok(Json(grant))
}

pub async fn revoke_country(
    State(state): State<ServerState>,
    Path((id, country_id)): Path<(i64, i64)>,
) -> AppResult<Json<bool>> {
    require_user(&state, id).await?;
    country_permission::revoke(&state.pool, id, country_id).await?;
    tracing::info!(user_id = id, country_id, "Country revoked");
    Ok(Json(true))
}

async fn require_user(state: &ServerState, id: i64) -> AppResult<User> {
    user::find_by_id(&state.pool, id).await?.ok_or_else(|| {
        AppError::with_message(ErrorCode::UserNotFound, format!("User {id} not found"))
    })
}

async fn require_country(state: &ServerState, id: i64) -> AppResult<()> {
    match country::find_by_id(&state.pool, id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::with_message(
            ErrorCode::CountryNotFound,
            format!("Country {id} not found"),
        )
        .with_detail("field", "country_ids")),
    }
}
