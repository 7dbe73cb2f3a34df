//! Country Repository

use super::{RepoError, RepoResult};
use shared::error::ErrorCode;
use shared::models::{Country, CountryCreate};
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Country>> {
    let countries = sqlx::query_as::<_, Country>("SELECT id, name FROM country ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(countries)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Country>> {
    let country = sqlx::query_as::<_, Country>("SELECT id, name FROM country WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(country)
}

/// Case-insensitive (ASCII) lookup by name
pub async fn find_by_name(pool: &SqlitePool, name: &str) -> RepoResult<Option<Country>> {
    let country = sqlx::query_as::<_, Country>(
        "SELECT id, name FROM country WHERE name = ? COLLATE NOCASE LIMIT 1",
    )
    .bind(name.trim())
    .fetch_optional(pool)
    .await?;
    Ok(country)
}

pub async fn create(pool: &SqlitePool, data: CountryCreate) -> RepoResult<Country> {
    let name = data.name.trim().to_string();
    if find_by_name(pool, &name).await?.is_some() {
        return Err(RepoError::Business(
            ErrorCode::CountryNameExists,
            format!("Country '{name}' already exists"),
        ));
    }
    let id: i64 = sqlx::query_scalar("INSERT INTO country (name) VALUES (?) RETURNING id")
        .bind(&name)
        .fetch_one(pool)
        .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create country".into()))
}

/// Return the country with this name, creating it if needed
pub async fn get_or_create(pool: &SqlitePool, name: &str) -> RepoResult<Country> {
    if let Some(country) = find_by_name(pool, name).await? {
        return Ok(country);
    }
    create(
        pool,
        CountryCreate {
            name: name.to_string(),
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn get_or_create_is_case_insensitive() {
        let db = DbService::memory().await.unwrap();
        let first = get_or_create(&db.pool, "China").await.unwrap();
        let again = get_or_create(&db.pool, "china").await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(find_all(&db.pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let db = DbService::memory().await.unwrap();
        create(&db.pool, CountryCreate { name: "Brazil".into() })
            .await
            .unwrap();
        let err = create(&db.pool, CountryCreate { name: " BRAZIL ".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Business(ErrorCode::CountryNameExists, _)));
    }
}
