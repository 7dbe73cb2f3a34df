//! Authentication handlers

use std::time::Duration;

use axum::{Json, extract::State};
use shared::client::{LoginRequest, LoginResponse, UserInfo};
use shared::models::User;

use crate::auth::password::verify_password;
use crate::core::ServerState;
use crate::db::repository::{country_permission, user};
use crate::security_log;
use crate::tickets::Viewer;
use crate::utils::{AppError, AppResult, ErrorCode};

/// Fixed delay before answering a login attempt
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// Check credentials and issue a token
///
/// Unknown user and wrong password produce the same error.
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let username = req.username.trim().to_string();
    let found = user::find_by_username(&state.pool, &username).await?;

    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let account = match found {
        Some(u) if verify_password(&req.password, &u.password_hash) => u,
        other => {
            let reason = if other.is_some() {
                "invalid_password"
            } else {
                "user_not_found"
            };
            security_log!("WARN", "login_failed", username = username.clone(), reason = reason);
            return Err(AppError::invalid_credentials());
        }
    };

    if !account.is_active {
        security_log!("WARN", "login_disabled", username = username.clone());
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let token = state
        .get_jwt_service()
        .generate_token(account.id, &account.username, account.is_superuser)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(
        user_id = account.id,
        username = %account.username,
        "User logged in"
    );

    let user = user_info(&state, account).await?;
    Ok(Json(LoginResponse { token, user }))
}

/// Current user with groups and permitted countries
pub async fn me(State(state): State<ServerState>, viewer: Viewer) -> AppResult<Json<UserInfo>> {
    let account = user::find_by_id(&state.pool, viewer.user_id)
        .await?
        .ok_or_else(AppError::not_authenticated)?;
    Ok(Json(user_info(&state, account).await?))
}

async fn user_info(state: &ServerState, account: User) -> AppResult<UserInfo> {
    let permitted_countries = country_permission::permitted_countries(&state.pool, account.id).await?;
    Ok(UserInfo {
        id: account.id,
        display_name: account.display_name(),
        username: account.username,
        is_superuser: account.is_superuser,
        groups: account.groups,
        permitted_countries,
    })
}
