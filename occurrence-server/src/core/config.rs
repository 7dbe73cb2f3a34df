use std::path::PathBuf;

use chrono_tz::Tz;

use crate::auth::JwtConfig;
use crate::utils::time::parse_timezone;

/// Server configuration
///
/// # Environment variables
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | WORK_DIR | ./data | Working directory (database, logs) |
/// | DATABASE_PATH | {WORK_DIR}/occurrences.db | SQLite file |
/// | HTTP_PORT | 3000 | HTTP port |
/// | ENVIRONMENT | development | development / staging / production |
/// | LOG_LEVEL | info | Default level when RUST_LOG is unset |
/// | LOG_DIR | {WORK_DIR}/logs | Rolling log directory (used only if it exists) |
/// | LOG_JSON | false | JSON log lines |
/// | BUSINESS_TIMEZONE | UTC | Timezone that defines "today" |
/// | EXTERNAL_PARTNER_COUNTRY | China | Country whose open tickets await the partner (empty disables) |
/// | PAGE_SIZE | 11 | Tickets per listing page |
/// | REQUEST_TIMEOUT_MS | 30000 | Request timeout |
/// | BOOTSTRAP_ADMIN_USERNAME | admin | Superuser created on first start |
/// | BOOTSTRAP_ADMIN_PASSWORD | (unset) | Password for that superuser; no user is created when unset |
///
/// JWT settings are read by [`JwtConfig::default`].
///
/// ```ignore
/// WORK_DIR=/srv/occurrences HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub work_dir: String,
    /// Explicit database path; `None` means `{work_dir}/occurrences.db`
    pub database_path: Option<String>,
    pub http_port: u16,
    pub environment: String,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
    pub business_timezone: Tz,
    /// Name of the external-partner country; `None` disables the override
    pub external_partner_country: Option<String>,
    pub page_size: u32,
    pub request_timeout_ms: u64,
    pub bootstrap_admin_username: String,
    pub bootstrap_admin_password: Option<String>,
    pub jwt: JwtConfig,
}

impl Config {
    /// Load configuration from environment variables, using defaults for anything unset
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into());
        Self {
            database_path: std::env::var("DATABASE_PATH").ok(),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok(),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            business_timezone: parse_timezone(
                &std::env::var("BUSINESS_TIMEZONE").unwrap_or_else(|_| "UTC".into()),
            ),
            external_partner_country: match std::env::var("EXTERNAL_PARTNER_COUNTRY") {
                Ok(name) if name.trim().is_empty() => None,
                Ok(name) => Some(name.trim().to_string()),
                Err(_) => Some("China".into()),
            },
            page_size: std::env::var("PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(11),
            request_timeout_ms: std::env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30000),
            bootstrap_admin_username: std::env::var("BOOTSTRAP_ADMIN_USERNAME")
                .unwrap_or_else(|_| "admin".into()),
            bootstrap_admin_password: std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok(),
            jwt: JwtConfig::default(),
            work_dir,
        }
    }

    /// Override the working directory and port
    ///
    /// Commonly used in tests
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.database_path = None;
        config.http_port = http_port;
        config
    }

    pub fn database_file(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.work_dir).join("occurrences.db"),
        }
    }

    pub fn log_directory(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.work_dir).join("logs"),
        }
    }

    /// Create the working directory and the log directory
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.work_dir)?;
        std::fs::create_dir_all(self.log_directory())?;
        if let Some(parent) = self.database_file().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
