//! Country Model

use serde::{Deserialize, Serialize};

/// Country entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Country {
    pub id: i64,
    pub name: String,
}

/// Create country payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryCreate {
    pub name: String,
}

/// Link between a user and a country they may see tickets for
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CountryPermission {
    pub id: i64,
    pub user_id: i64,
    pub country_id: i64,
    pub created_at: i64,
    #[serde(default)]
    pub country_name: Option<String>,
}

/// Grant payload for `POST /api/users/{id}/countries`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryGrant {
    pub country_id: i64,
}
