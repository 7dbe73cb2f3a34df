//! User Repository
//!
//! Group membership lives in `user_group` and is attached after the row is loaded.

use std::collections::HashMap;

use super::{RepoError, RepoResult};
use shared::error::ErrorCode;
use shared::models::{User, UserCreate};
use sqlx::SqlitePool;

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, password_hash, is_superuser, is_active, created_at";

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<User>> {
    let mut users = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM user ORDER BY username"
    ))
    .fetch_all(pool)
    .await?;

    let rows: Vec<(i64, String)> =
        sqlx::query_as("SELECT user_id, group_name FROM user_group ORDER BY group_name")
            .fetch_all(pool)
            .await?;
    let mut groups: HashMap<i64, Vec<String>> = HashMap::new();
    for (user_id, group) in rows {
        groups.entry(user_id).or_default().push(group);
    }
    for user in &mut users {
        user.groups = groups.remove(&user.id).unwrap_or_default();
    }
    Ok(users)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    with_groups(pool, user).await
}

pub async fn find_by_username(pool: &SqlitePool, username: &str) -> RepoResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM user WHERE username = ? LIMIT 1"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    with_groups(pool, user).await
}

async fn with_groups(pool: &SqlitePool, user: Option<User>) -> RepoResult<Option<User>> {
    match user {
        Some(mut user) => {
            user.groups = find_groups(pool, user.id).await?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}

pub async fn find_groups(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<String>> {
    let groups = sqlx::query_scalar::<_, String>(
        "SELECT group_name FROM user_group WHERE user_id = ? ORDER BY group_name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(groups)
}

/// Active members of `group`
pub async fn find_by_group(pool: &SqlitePool, group: &str) -> RepoResult<Vec<User>> {
    let users = sqlx::query_as::<_, User>(&format!(
        "SELECT {cols} FROM user u JOIN user_group g ON g.user_id = u.id \
         WHERE g.group_name = ? AND u.is_active = 1 ORDER BY u.first_name, u.last_name",
        cols = USER_COLUMNS
            .split(", ")
            .map(|c| format!("u.{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    ))
    .bind(group)
    .fetch_all(pool)
    .await?;
    Ok(users
        .into_iter()
        .map(|mut u| {
            u.groups = vec![group.to_string()];
            u
        })
        .collect())
}

/// Insert the user row and its groups in one transaction
pub async fn create(pool: &SqlitePool, data: &UserCreate, password_hash: &str) -> RepoResult<User> {
    let username = data.username.trim();
    if find_by_username(pool, username).await?.is_some() {
        return Err(RepoError::Business(
            ErrorCode::UsernameExists,
            format!("Username '{username}' already exists"),
        ));
    }

    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        "INSERT INTO user (username, first_name, last_name, password_hash, is_superuser, is_active, created_at) \
         VALUES (?, ?, ?, ?, ?, 1, ?) RETURNING id",
    )
    .bind(username)
    .bind(data.first_name.trim())
    .bind(data.last_name.trim())
    .bind(password_hash)
    .bind(data.is_superuser)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for group in &data.groups {
        let group = group.trim().to_lowercase();
        if group.is_empty() {
            continue;
        }
        sqlx::query("INSERT OR IGNORE INTO user_group (user_id, group_name) VALUES (?, ?)")
            .bind(id)
            .bind(&group)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

pub async fn count(pool: &SqlitePool) -> RepoResult<i64> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM user")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
