//! Device Repository

use super::{RepoError, RepoResult};
use shared::error::ErrorCode;
use shared::models::{Device, DeviceCreate};
use sqlx::SqlitePool;

pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Device>> {
    let devices = sqlx::query_as::<_, Device>("SELECT id, name FROM device ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(devices)
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Device>> {
    let device = sqlx::query_as::<_, Device>("SELECT id, name FROM device WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(device)
}

pub async fn create(pool: &SqlitePool, data: DeviceCreate) -> RepoResult<Device> {
    let name = data.name.trim().to_string();
    let id: i64 = sqlx::query_scalar("INSERT INTO device (name) VALUES (?) RETURNING id")
        .bind(&name)
        .fetch_one(pool)
        .await
        .map_err(|e| match RepoError::from(e) {
            RepoError::Duplicate(_) => RepoError::Business(
                ErrorCode::DeviceNameExists,
                format!("Device '{name}' already exists"),
            ),
            other => other,
        })?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create device".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn create_and_list() {
        let db = DbService::memory().await.unwrap();
        create(&db.pool, DeviceCreate { name: "Scanner X".into() })
            .await
            .unwrap();
        create(&db.pool, DeviceCreate { name: "Adapter".into() })
            .await
            .unwrap();
        let names: Vec<_> = find_all(&db.pool)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Adapter", "Scanner X"]);
    }

    #[tokio::test]
    async fn duplicate_name_maps_to_device_code() {
        let db = DbService::memory().await.unwrap();
        create(&db.pool, DeviceCreate { name: "Probe".into() })
            .await
            .unwrap();
        let err = create(&db.pool, DeviceCreate { name: "Probe".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Business(ErrorCode::DeviceNameExists, _)));
    }
}
