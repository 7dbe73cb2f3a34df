//! Request/response types for the auth and lookup endpoints

use crate::models::Country;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Auth API DTOs
// =============================================================================

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserInfo,
}

/// User information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub is_superuser: bool,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub permitted_countries: Vec<Country>,
}

// =============================================================================
// Lookup DTOs
// =============================================================================

/// Technicians available as responsible party
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsiblesResponse {
    /// country name -> display names of technicians granted that country
    pub by_country: BTreeMap<String, Vec<String>>,
    pub all: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalPartnerResponse {
    pub country: Option<Country>,
}
