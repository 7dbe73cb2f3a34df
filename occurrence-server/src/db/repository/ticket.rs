//! Ticket Repository
//!
//! Rows are written whole: callers load a [`Ticket`], mutate it, run it
//! through the status engine and hand it back here.

use super::{RepoError, RepoResult};
use shared::error::ErrorCode;
use shared::models::Ticket;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Sqlite, SqlitePool};

/// Columns of a joined ticket row, in `Ticket` field order
pub const TICKET_COLUMNS: &str = "t.id, t.external_code, t.reported_date, t.deadline, \
    t.finished_date, t.country_id, t.original_country_id, t.device_id, t.area, t.brand, \
    t.model, t.serial, t.version, t.year, t.contact, t.vin, t.ecu_type, t.engine_type, \
    t.system, t.problem_type, t.key_type, t.technical_reporter, t.responsible_party, \
    t.responsible_key, t.problem_detected, t.technical_feedback, t.manager_feedback, \
    t.responsible_details, t.status, t.created_at, t.updated_at, \
    c.name AS country_name, d.name AS device_name";

/// FROM clause shared by detail and list queries
pub const TICKET_FROM: &str = "FROM ticket t \
    LEFT JOIN country c ON c.id = t.country_id \
    LEFT JOIN device d ON d.id = t.device_id";

const WRITE_COLUMNS: &str = "external_code, reported_date, deadline, finished_date, \
    country_id, original_country_id, device_id, area, brand, model, serial, version, year, \
    contact, vin, ecu_type, engine_type, system, problem_type, key_type, technical_reporter, \
    responsible_party, responsible_key, problem_detected, technical_feedback, \
    manager_feedback, responsible_details, status, updated_at";

type TicketQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

/// Bind every writable column, in `WRITE_COLUMNS` order
fn bind_fields<'q>(query: TicketQuery<'q>, t: &'q Ticket, now: i64) -> TicketQuery<'q> {
    query
        .bind(t.external_code.as_deref())
        .bind(t.reported_date)
        .bind(t.deadline)
        .bind(t.finished_date)
        .bind(t.country_id)
        .bind(t.original_country_id)
        .bind(t.device_id)
        .bind(&t.area)
        .bind(&t.brand)
        .bind(&t.model)
        .bind(&t.serial)
        .bind(&t.version)
        .bind(&t.year)
        .bind(&t.contact)
        .bind(&t.vin)
        .bind(&t.ecu_type)
        .bind(&t.engine_type)
        .bind(&t.system)
        .bind(&t.problem_type)
        .bind(&t.key_type)
        .bind(&t.technical_reporter)
        .bind(t.responsible_party.as_deref())
        .bind(t.responsible_key.as_deref())
        .bind(&t.problem_detected)
        .bind(&t.technical_feedback)
        .bind(&t.manager_feedback)
        .bind(&t.responsible_details)
        .bind(t.status.as_str())
        .bind(now)
}

fn external_code_conflict(err: sqlx::Error, code: Option<&str>) -> RepoError {
    match RepoError::from(err) {
        RepoError::Duplicate(_) => RepoError::Business(
            ErrorCode::ExternalCodeExists,
            format!("External code '{}' already exists", code.unwrap_or_default()),
        ),
        other => other,
    }
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Ticket>> {
    let ticket = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} {TICKET_FROM} WHERE t.id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(ticket)
}

pub async fn exists_external_code(
    pool: &SqlitePool,
    code: &str,
    exclude_id: Option<i64>,
) -> RepoResult<bool> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM ticket WHERE external_code = ? AND id != COALESCE(?, -1) LIMIT 1",
    )
    .bind(code)
    .bind(exclude_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

/// Insert a prepared ticket. When it carries no external code, the new id
/// becomes its code; both writes share one transaction.
pub async fn create(pool: &SqlitePool, ticket: &Ticket) -> RepoResult<Ticket> {
    let now = shared::util::now_millis();
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO ticket ({WRITE_COLUMNS}, created_at) \
         VALUES ({}, ?) RETURNING id",
        vec!["?"; WRITE_COLUMNS.split(',').count()].join(", ")
    );
    let id: i64 = {
        use sqlx::Row;
        let row = bind_fields(sqlx::query(&sql), ticket, now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| external_code_conflict(e, ticket.external_code.as_deref()))?;
        row.try_get("id")?
    };

    if ticket.external_code.is_none() {
        let code = id.to_string();
        sqlx::query("UPDATE ticket SET external_code = ? WHERE id = ?")
            .bind(&code)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| external_code_conflict(e, Some(&code)))?;
    }

    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create ticket".into()))
}

/// Overwrite every writable column of an existing ticket
pub async fn update(pool: &SqlitePool, ticket: &Ticket) -> RepoResult<Ticket> {
    let assignments = WRITE_COLUMNS
        .split(',')
        .map(|c| format!("{} = ?", c.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE ticket SET {assignments} WHERE id = ?");

    let now = shared::util::now_millis();
    let result = bind_fields(sqlx::query(&sql), ticket, now)
        .bind(ticket.id)
        .execute(pool)
        .await
        .map_err(|e| external_code_conflict(e, ticket.external_code.as_deref()))?;

    if result.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::TicketNotFound,
            format!("Ticket {} not found", ticket.id),
        ));
    }
    find_by_id(pool, ticket.id).await?.ok_or_else(|| {
        RepoError::Business(
            ErrorCode::TicketNotFound,
            format!("Ticket {} not found", ticket.id),
        )
    })
}

pub async fn delete(pool: &SqlitePool, id: i64) -> RepoResult<()> {
    let result = sqlx::query("DELETE FROM ticket WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepoError::Business(
            ErrorCode::TicketNotFound,
            format!("Ticket {id} not found"),
        ));
    }
    Ok(())
}

/// Give every ticket without an external code its id as code. Returns the
/// number of rows repaired.
pub async fn backfill_external_codes(pool: &SqlitePool) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE ticket SET external_code = CAST(id AS TEXT) \
         WHERE (external_code IS NULL OR TRIM(external_code) = '') \
         AND NOT EXISTS (SELECT 1 FROM ticket o WHERE o.external_code = CAST(ticket.id AS TEXT))",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Rewrite legacy or unknown status spellings to their current form so SQL
/// filters on `status` match. Returns the number of rows rewritten.
pub async fn normalize_status_values(pool: &SqlitePool) -> RepoResult<u64> {
    let result = sqlx::query(
        "UPDATE ticket SET status = CASE status \
             WHEN 'PROGRESS' THEN 'IN_PROGRESS' \
             WHEN 'AWAITING_CHINA' THEN 'AWAITING_EXTERNAL' \
             WHEN 'AWAITING_CHINA_LATE' THEN 'AWAITING_EXTERNAL_LATE' \
             ELSE 'REQUESTED' END \
         WHERE status NOT IN ('DONE', 'AWAITING_EXTERNAL_LATE', 'AWAITING_EXTERNAL', \
             'LATE', 'IN_PROGRESS', 'REQUESTED')",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Every stored ticket, oldest first (used by the status refresh pass)
pub async fn find_all(pool: &SqlitePool) -> RepoResult<Vec<Ticket>> {
    let tickets = sqlx::query_as::<_, Ticket>(&format!(
        "SELECT {TICKET_COLUMNS} {TICKET_FROM} ORDER BY t.id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(tickets)
}
