//! `Viewer` extractor
//!
//! Loads the caller's user row, groups and country grants once per request.
//! Everything downstream (visibility, edit rights) works from this snapshot.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::ErrorCode;
use sqlx::SqlitePool;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::{country_permission, user};
use crate::security_log;
use crate::tickets::Viewer;
use crate::utils::{AppError, AppResult};

/// Resolve the identity snapshot for an authenticated user
pub async fn load_viewer(pool: &SqlitePool, current: &CurrentUser) -> AppResult<Viewer> {
    let Some(user) = user::find_by_id(pool, current.id).await? else {
        security_log!("WARN", "unknown_user", user_id = current.id);
        return Err(AppError::not_authenticated());
    };
    if !user.is_active {
        security_log!(
            "WARN",
            "account_disabled",
            user_id = user.id,
            username = user.username.clone()
        );
        return Err(AppError::new(ErrorCode::AccountDisabled));
    }

    let permitted_countries = country_permission::permitted_country_ids(pool, user.id).await?;
    Ok(Viewer {
        user_id: user.id,
        display_name: user.display_name(),
        is_superuser: user.is_superuser,
        groups: user.groups.iter().cloned().collect(),
        username: user.username,
        permitted_countries,
    })
}

impl FromRequestParts<ServerState> for Viewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(viewer) = parts.extensions.get::<Viewer>() {
            return Ok(viewer.clone());
        }
        let current = CurrentUser::from_request_parts(parts, state).await?;
        let viewer = load_viewer(&state.pool, &current).await?;
        parts.extensions.insert(viewer.clone());
        Ok(viewer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use crate::db::repository::country;
    use shared::models::{GROUP_SEMI_ADMIN, UserCreate};

    #[tokio::test]
    async fn viewer_carries_groups_and_grants() {
        let db = DbService::memory().await.unwrap();
        let created = user::create(
            &db.pool,
            &UserCreate {
                username: "mboss".into(),
                password: "x".into(),
                first_name: "Maria".into(),
                last_name: "Boss".into(),
                groups: vec![GROUP_SEMI_ADMIN.into()],
                ..Default::default()
            },
            "hash",
        )
        .await
        .unwrap();
        let brazil = country::get_or_create(&db.pool, "Brazil").await.unwrap();
        country_permission::grant(&db.pool, created.id, brazil.id)
            .await
            .unwrap();

        let current = CurrentUser {
            id: created.id,
            username: created.username.clone(),
            is_superuser: false,
        };
        let viewer = load_viewer(&db.pool, &current).await.unwrap();
        assert_eq!(viewer.display_name, "Maria Boss");
        assert!(viewer.is_semi_admin());
        assert!(viewer.permitted_countries.contains(&brazil.id));
    }

    #[tokio::test]
    async fn deleted_or_disabled_users_are_rejected() {
        let db = DbService::memory().await.unwrap();
        let ghost = CurrentUser {
            id: 99,
            username: "ghost".into(),
            is_superuser: true,
        };
        let err = load_viewer(&db.pool, &ghost).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);

        let created = user::create(
            &db.pool,
            &UserCreate {
                username: "gone".into(),
                password: "x".into(),
                ..Default::default()
            },
            "hash",
        )
        .await
        .unwrap();
        sqlx::query("UPDATE user SET is_active = 0 WHERE id = ?")
            .bind(created.id)
            .execute(&db.pool)
            .await
            .unwrap();
        let current = CurrentUser {
            id: created.id,
            username: "gone".into(),
            is_superuser: false,
        };
        let err = load_viewer(&db.pool, &current).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountDisabled);
    }
}
