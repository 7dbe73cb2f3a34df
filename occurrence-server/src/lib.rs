//! Occurrence Server - support-ticket tracking backend
//!
//! # Overview
//!
//! Tracks occurrence tickets reported against devices in several countries.
//! Every save recomputes the ticket status from its dates, and every read is
//! filtered to what the caller may see.
//!
//! - **Status engine** (`tickets::status`): derived status and transition checks
//! - **Visibility** (`tickets::visibility`): country and role based filtering
//! - **Listing and dashboard** (`tickets::query`, `tickets::dashboard`)
//! - **Auth** (`auth`): JWT + Argon2
//! - **HTTP API** (`api`): axum routes
//!
//! # Layout
//!
//! ```text
//! occurrence-server/src/
//! ├── core/          # config, state, server, startup errors
//! ├── auth/          # JWT, passwords, middleware, viewer loading
//! ├── api/           # HTTP routes and handlers
//! ├── tickets/       # status engine, visibility, listing, dashboard
//! ├── utils/         # logger, time, validation
//! └── db/            # SQLite pool and repositories
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod db;
pub mod tickets;
pub mod utils;

// Re-export common types
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use tickets::{StatusContext, Viewer, VisibilityScope};
pub use utils::{AppError, AppResult};

// Re-export unified error types from shared
pub use utils::{ApiResponse, ErrorCategory, ErrorCode};

pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// Load `.env` and install the tracing subscriber
///
/// Reads `LOG_LEVEL`, `LOG_JSON` and `LOG_DIR` directly so that warnings
/// raised while building [`Config`] are already captured.
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_json = std::env::var("LOG_JSON")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);
    let log_dir = std::env::var("LOG_DIR").ok();
    if let Some(dir) = &log_dir {
        std::fs::create_dir_all(dir)?;
    }

    init_logger_with_file(log_level.as_deref(), log_json, log_dir.as_deref());
    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
   ____
  / __ \__________ _____________ ____  ________
 / / / / ___/ ___// / / / ___/ ___/ _ \/ __ \/ ___/ _ \
/ /_/ / /__/ /__/ /_/ / /  / /  /  __/ / / / /__/  __/
\____/\___/\___/\__,_/_/  /_/   \___/_/ /_/\___/\___/
    "#
    );
}
