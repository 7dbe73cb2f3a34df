//! Data models
//!
//! Shared between the server and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (SQLite INTEGER PRIMARY KEY).

pub mod country;
pub mod dashboard;
pub mod device;
pub mod listing;
pub mod ticket;
pub mod user;

// Re-exports
pub use country::*;
pub use dashboard::*;
pub use device::*;
pub use listing::*;
pub use ticket::*;
pub use user::*;
