//! Dashboard aggregates
//!
//! Counts always start from the viewer's visible set.

use chrono::NaiveDate;
use shared::error::{AppError, AppResult};
use shared::models::{
    DashboardQuery, ResponsibleCount, StatusMatrix, SummaryRow, TicketStatus,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::visibility::Viewer;
use crate::db::repository::RepoError;
use crate::db::repository::ticket::TICKET_FROM;
use crate::utils::time::{month_start, week_start, year_start};

/// Label used for tickets nobody is responsible for
pub const UNASSIGNED: &str = "Unassigned";

/// Inclusive reported-date window; `None` bounds are open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Explicit `from`/`to` win over a named period
    pub fn resolve(query: &DashboardQuery, today: NaiveDate) -> AppResult<Self> {
        if query.from.is_some() || query.to.is_some() {
            if let (Some(from), Some(to)) = (query.from, query.to)
                && from > to
            {
                return Err(AppError::validation("from must not be after to")
                    .with_detail("field", "from"));
            }
            return Ok(Self {
                from: query.from,
                to: query.to,
            });
        }
        let from = match query.period.as_deref().map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(p) if p.eq_ignore_ascii_case("weekly") => week_start(today),
            Some(p) if p.eq_ignore_ascii_case("monthly") => month_start(today),
            Some(p) if p.eq_ignore_ascii_case("yearly") => year_start(today),
            Some(other) => {
                return Err(AppError::validation(format!("Unknown period: {other}"))
                    .with_detail("field", "period"));
            }
        };
        Ok(Self {
            from: Some(from),
            to: Some(today),
        })
    }

    fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        if let Some(from) = self.from {
            qb.push(" AND t.reported_date >= ").push_bind(from);
        }
        if let Some(to) = self.to {
            qb.push(" AND t.reported_date <= ").push_bind(to);
        }
    }
}

/// Counts per `(responsible, status, country)`
pub async fn summary(
    pool: &SqlitePool,
    viewer: &Viewer,
    range: DateRange,
) -> AppResult<Vec<SummaryRow>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT t.responsible_party AS responsible, t.status AS status, \
         c.name AS country, COUNT(*) AS count {TICKET_FROM} WHERE "
    ));
    viewer.scope().push_sql(&mut qb);
    range.push_sql(&mut qb);
    qb.push(" GROUP BY t.responsible_party, t.status, c.name ORDER BY 1, 2, 3");
    let rows = qb
        .build_query_as::<SummaryRow>()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;
    Ok(rows)
}

/// Counts per responsible for one status, largest first
pub async fn by_status(
    pool: &SqlitePool,
    viewer: &Viewer,
    status: TicketStatus,
    range: DateRange,
) -> AppResult<Vec<ResponsibleCount>> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT t.responsible_party AS responsible, COUNT(*) AS count FROM ticket t WHERE ",
    );
    viewer.scope().push_sql(&mut qb);
    qb.push(" AND t.status = ").push_bind(status.as_str());
    range.push_sql(&mut qb);
    qb.push(" GROUP BY t.responsible_party ORDER BY count DESC, responsible ASC");
    let rows = qb
        .build_query_as::<ResponsibleCount>()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;
    Ok(rows)
}

/// responsible -> status label -> count, over every visible ticket
pub async fn matrix(pool: &SqlitePool, viewer: &Viewer) -> AppResult<StatusMatrix> {
    let rows = summary(pool, viewer, DateRange::default()).await?;
    Ok(build_matrix(&rows))
}

pub fn build_matrix(rows: &[SummaryRow]) -> StatusMatrix {
    let mut matrix = StatusMatrix::new();
    for row in rows {
        let responsible = row.responsible.clone().unwrap_or_else(|| UNASSIGNED.to_string());
        *matrix
            .entry(responsible)
            .or_default()
            .entry(row.status.label().to_string())
            .or_default() += row.count;
    }
    matrix
}
