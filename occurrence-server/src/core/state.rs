use std::path::PathBuf;
use std::sync::Arc;

use shared::models::UserCreate;
use sqlx::SqlitePool;

use crate::auth::JwtService;
use crate::auth::password::hash_password;
use crate::core::{Config, Result, ServerError};
use crate::db::DbService;
use crate::db::repository::{country, ticket, user};
use crate::tickets::{StatusContext, service};
use crate::utils::time::today;

/// Shared request state
///
/// Cheap to clone: the pool and the JWT service are reference counted.
///
/// | Field | Description |
/// |-------|-------------|
/// | config | Immutable configuration |
/// | pool | SQLite connection pool |
/// | jwt_service | Token issuing and validation |
/// | partner_country_id | External-partner country, resolved at startup |
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub pool: SqlitePool,
    pub jwt_service: Arc<JwtService>,
    pub partner_country_id: Option<i64>,
}

impl ServerState {
    /// Initialize in order:
    /// 1. Working directory structure
    /// 2. Database (migrations included)
    /// 3. External-partner country and bootstrap superuser
    /// 4. Startup repair passes over stored tickets
    pub async fn initialize(config: &Config) -> Result<Self> {
        if config.jwt.ephemeral && config.is_production() {
            return Err(ServerError::Config(
                "JWT_SECRET (at least 32 characters) must be set in production".into(),
            ));
        }

        config.ensure_work_dir_structure()?;

        let db_path = config.database_file();
        let db = DbService::new(&db_path.to_string_lossy()).await?;

        let state = Self::with_pool(config.clone(), db.pool).await?;
        state.bootstrap_admin().await?;
        state.repair_tickets().await?;
        Ok(state)
    }

    /// Build state around an existing pool (tests use an in-memory database)
    pub async fn with_pool(config: Config, pool: SqlitePool) -> Result<Self> {
        let partner_country_id = match config.external_partner_country.as_deref() {
            Some(name) => {
                let partner = country::get_or_create(&pool, name).await?;
                tracing::info!(country = %partner.name, id = partner.id, "External-partner country");
                Some(partner.id)
            }
            None => {
                tracing::info!("External-partner override disabled");
                None
            }
        };

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self {
            config,
            pool,
            jwt_service,
            partner_country_id,
        })
    }

    /// "Today" and the partner country, as the status engine needs them
    pub fn status_context(&self) -> StatusContext {
        StatusContext::new(
            today(self.config.business_timezone),
            self.partner_country_id,
        )
    }

    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.work_dir)
    }

    /// Create the configured superuser when the user table is empty
    async fn bootstrap_admin(&self) -> Result<()> {
        if user::count(&self.pool).await? > 0 {
            return Ok(());
        }
        let Some(password) = self.config.bootstrap_admin_password.as_deref() else {
            tracing::warn!("No users exist and BOOTSTRAP_ADMIN_PASSWORD is unset; nobody can log in");
            return Ok(());
        };

        let hash = hash_password(password)
            .map_err(|e| ServerError::Config(format!("Failed to hash bootstrap password: {e}")))?;
        let admin = user::create(
            &self.pool,
            &UserCreate {
                username: self.config.bootstrap_admin_username.clone(),
                password: String::new(),
                is_superuser: true,
                ..Default::default()
            },
            &hash,
        )
        .await?;
        tracing::info!(username = %admin.username, "Bootstrap superuser created");
        Ok(())
    }

    /// Legacy status spellings, missing external codes, stale statuses
    async fn repair_tickets(&self) -> Result<()> {
        let statuses = ticket::normalize_status_values(&self.pool).await?;
        if statuses > 0 {
            tracing::info!(count = statuses, "Rewrote legacy ticket statuses");
        }

        let codes = ticket::backfill_external_codes(&self.pool).await?;
        if codes > 0 {
            tracing::info!(count = codes, "Backfilled missing external codes");
        }

        let refreshed = service::refresh_statuses(&self.pool, &self.status_context()).await?;
        tracing::info!(count = refreshed, "Ticket statuses refreshed");
        Ok(())
    }
}
