//! Device Model

use serde::{Deserialize, Serialize};

/// Device entity (equipment line a ticket is reported against)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Device {
    pub id: i64,
    pub name: String,
}

/// Create device payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCreate {
    pub name: String,
}
