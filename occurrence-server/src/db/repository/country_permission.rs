//! Country Permission Repository

use std::collections::BTreeSet;

use super::{RepoError, RepoResult};
use shared::error::ErrorCode;
use shared::models::{Country, CountryPermission};
use sqlx::SqlitePool;

pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<CountryPermission>> {
    let grants = sqlx::query_as::<_, CountryPermission>(
        "SELECT p.id, p.user_id, p.country_id, p.created_at, c.name AS country_name \
         FROM country_permission p JOIN country c ON c.id = p.country_id \
         WHERE p.user_id = ? ORDER BY c.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(grants)
}

pub async fn permitted_country_ids(pool: &SqlitePool, user_id: i64) -> RepoResult<BTreeSet<i64>> {
    let ids = sqlx::query_scalar::<_, i64>(
        "SELECT country_id FROM country_permission WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(ids.into_iter().collect())
}

pub async fn permitted_countries(pool: &SqlitePool, user_id: i64) -> RepoResult<Vec<Country>> {
    let countries = sqlx::query_as::<_, Country>(
        "SELECT c.id, c.name FROM country c \
         JOIN country_permission p ON p.country_id = c.id \
         WHERE p.user_id = ? ORDER BY c.name",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(countries)
}

/// Grant a country; an existing grant is a `PermissionGrantExists` error
pub async fn grant(pool: &SqlitePool, user_id: i64, country_id: i64) -> RepoResult<CountryPermission> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO country_permission (user_id, country_id, created_at) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(country_id)
    .bind(shared::util::now_millis())
    .fetch_one(pool)
    .await
    .map_err(|e| match RepoError::from(e) {
        RepoError::Duplicate(_) => RepoError::Business(
            ErrorCode::PermissionGrantExists,
            format!("User {user_id} already has country {country_id}"),
        ),
        other => other,
    })?;

    find_by_user(pool, user_id)
        .await?
        .into_iter()
        .find(|g| g.id == id)
        .ok_or_else(|| RepoError::Database("Failed to create country permission".into()))
}

/// Grant a country unless it is already granted. Returns whether a row was added.
pub async fn ensure_granted(pool: &SqlitePool, user_id: i64, country_id: i64) -> RepoResult<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO country_permission (user_id, country_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(country_id)
    .bind(shared::util::now_millis())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn revoke(pool: &SqlitePool, user_id: i64, country_id: i64) -> RepoResult<()> {
    let result = sqlx::query("DELETE FROM country_permission WHERE user_id = ? AND country_id = ?")
        .bind(user_id)
        .bind(country_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "User {user_id} has no grant for country {country_id}"
        )));
    }
    Ok(())
}

/// Technicians (active members of `group`) with the names of the countries they are granted
pub async fn group_members_by_country(
    pool: &SqlitePool,
    group: &str,
) -> RepoResult<Vec<(String, i64, String, String, String)>> {
    let rows = sqlx::query_as::<_, (String, i64, String, String, String)>(
        "SELECT c.name, u.id, u.username, u.first_name, u.last_name \
         FROM country_permission p \
         JOIN country c ON c.id = p.country_id \
         JOIN user u ON u.id = p.user_id \
         JOIN user_group g ON g.user_id = u.id \
         WHERE g.group_name = ? AND u.is_active = 1 \
         ORDER BY c.name, u.first_name, u.last_name",
    )
    .bind(group)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
