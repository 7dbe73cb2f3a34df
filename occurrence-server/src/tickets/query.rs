//! Ticket listings
//!
//! The viewer's scope is always the first predicate; caller filters are
//! AND-ed after it and can only narrow the result. Counting and paging run
//! on the filtered set.

use serde::Deserialize;
use shared::error::{AppError, AppResult};
use shared::models::{
    Country, Device, FilterOptions, Pagination, SortDirection, SortSpec, Ticket, TicketFilters,
    TicketListQuery, TicketPage, TicketStatus,
};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use super::visibility::{Viewer, VisibilityScope, canonical_name};
use crate::db::repository::RepoError;
use crate::db::repository::ticket::{TICKET_COLUMNS, TICKET_FROM};
use crate::utils::time::parse_date;

/// Sortable columns (request name -> SQL expression)
const SORT_COLUMNS: &[(&str, &str)] = &[
    ("reported_date", "t.reported_date"),
    ("deadline", "t.deadline"),
    ("finished_date", "t.finished_date"),
    ("status", "t.status"),
    ("country", "c.name"),
    ("device", "d.name"),
    ("area", "t.area"),
    ("brand", "t.brand"),
    ("model", "t.model"),
    ("serial", "t.serial"),
    ("year", "t.year"),
    ("version", "t.version"),
    ("responsible", "t.responsible_party"),
    ("technical", "t.technical_reporter"),
];

const DEFAULT_SORT: &str = "t.reported_date";

/// ORDER BY clause for a requested sort; unknown columns fall back to
/// `reported_date` ascending
pub fn order_by(sort: Option<&SortSpec>) -> String {
    let resolved = sort.and_then(|s| {
        SORT_COLUMNS
            .iter()
            .find(|(name, _)| *name == s.column.trim())
            .map(|(_, expr)| (*expr, s.direction))
    });
    let (expr, direction) = resolved.unwrap_or((DEFAULT_SORT, SortDirection::Asc));
    let dir = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!(" ORDER BY {expr} {dir}, t.id {dir}")
}

/// Append `WHERE <scope> [AND <filter>...]`
pub fn push_where(qb: &mut QueryBuilder<'_, Sqlite>, scope: &VisibilityScope, f: &TicketFilters) {
    qb.push(" WHERE ");
    scope.push_sql(qb);

    if !f.status.is_empty() {
        push_in(qb, "t.status", f.status.iter().map(|s| s.as_str().to_string()));
    }
    if !f.country_id.is_empty() {
        push_in(qb, "t.country_id", f.country_id.iter().copied());
    }
    if !f.device_id.is_empty() {
        push_in(qb, "t.device_id", f.device_id.iter().copied());
    }
    if !f.responsible.is_empty() {
        push_in(qb, "t.responsible_key", f.responsible.iter().map(|r| canonical_name(r)));
    }
    if !f.area.is_empty() {
        push_in(qb, "t.area", f.area.iter().map(|a| a.trim().to_uppercase()));
    }
    if !f.brand.is_empty() {
        push_in(qb, "t.brand", f.brand.iter().map(|b| b.trim().to_uppercase()));
    }
    if let Some(term) = f.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(term));
        qb.push(" AND (");
        let columns = [
            "t.external_code",
            "t.serial",
            "t.brand",
            "t.model",
            "t.problem_detected",
            "t.responsible_party",
        ];
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\'");
        }
        qb.push(")");
    }
    if let Some(from) = f.reported_from {
        qb.push(" AND t.reported_date >= ").push_bind(from);
    }
    if let Some(to) = f.reported_to {
        qb.push(" AND t.reported_date <= ").push_bind(to);
    }
}

/// Make `%` and `_` match literally under `ESCAPE '\'`
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn push_in<T, I>(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: I)
where
    I: IntoIterator<Item = T>,
    T: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Send + 'static,
{
    qb.push(" AND ").push(column).push(" IN (");
    let mut separated = qb.separated(", ");
    for value in values {
        separated.push_bind(value);
    }
    separated.push_unseparated(")");
}

/// Page math: pages beyond the range are clamped to the nearest valid page
pub fn paginate(total_records: i64, requested: Option<u32>, page_size: u32) -> Pagination {
    let page_size = page_size.max(1);
    let total = u64::try_from(total_records).unwrap_or(0);
    let total_pages = total.div_ceil(u64::from(page_size)).max(1);
    let total_pages = u32::try_from(total_pages).unwrap_or(u32::MAX);
    let current_page = requested.unwrap_or(1).clamp(1, total_pages);
    Pagination {
        current_page,
        total_pages,
        total_records,
        page_size,
        has_previous: current_page > 1,
        has_next: current_page < total_pages,
    }
}

pub async fn list(
    pool: &SqlitePool,
    viewer: &Viewer,
    query: &TicketListQuery,
    page_size: u32,
) -> AppResult<TicketPage> {
    let scope = viewer.scope();

    let mut count = QueryBuilder::<Sqlite>::new(format!("SELECT COUNT(*) {TICKET_FROM}"));
    push_where(&mut count, &scope, &query.filters);
    let total: i64 = count
        .build_query_scalar()
        .fetch_one(pool)
        .await
        .map_err(RepoError::from)?;

    let pagination = paginate(total, query.page, page_size);
    let offset = i64::from(pagination.current_page - 1) * i64::from(pagination.page_size);

    let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {TICKET_COLUMNS} {TICKET_FROM}"));
    push_where(&mut select, &scope, &query.filters);
    select.push(order_by(query.sort.as_ref()));
    select
        .push(" LIMIT ")
        .push_bind(i64::from(pagination.page_size))
        .push(" OFFSET ")
        .push_bind(offset);
    let tickets: Vec<Ticket> = select
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;

    Ok(TicketPage {
        tickets,
        pagination,
        filter_options: filter_options(pool, &scope).await?,
    })
}

/// Distinct values present in the visible set, ignoring caller filters
pub async fn filter_options(pool: &SqlitePool, scope: &VisibilityScope) -> AppResult<FilterOptions> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT DISTINCT t.status FROM ticket t WHERE ");
    scope.push_sql(&mut qb);
    let raw: Vec<String> = qb
        .build_query_scalar()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;
    let mut statuses: Vec<TicketStatus> = raw.iter().map(|s| TicketStatus::from_legacy(s)).collect();
    statuses.sort();
    statuses.dedup();

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DISTINCT c.id, c.name FROM ticket t JOIN country c ON c.id = t.country_id WHERE ",
    );
    scope.push_sql(&mut qb);
    qb.push(" ORDER BY c.name");
    let countries: Vec<Country> = qb
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DISTINCT d.id, d.name FROM ticket t JOIN device d ON d.id = t.device_id WHERE ",
    );
    scope.push_sql(&mut qb);
    qb.push(" ORDER BY d.name");
    let devices: Vec<Device> = qb
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT DISTINCT t.responsible_party FROM ticket t WHERE t.responsible_party IS NOT NULL AND ",
    );
    scope.push_sql(&mut qb);
    qb.push(" ORDER BY t.responsible_party");
    let responsibles: Vec<String> = qb
        .build_query_scalar()
        .fetch_all(pool)
        .await
        .map_err(RepoError::from)?;

    Ok(FilterOptions {
        statuses,
        countries,
        devices,
        responsibles,
    })
}

/// Query string of `GET /api/tickets`; list values are comma separated
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TicketListParams {
    pub status: Option<String>,
    pub country_id: Option<String>,
    pub device_id: Option<String>,
    pub responsible: Option<String>,
    pub area: Option<String>,
    pub brand: Option<String>,
    pub search: Option<String>,
    pub reported_from: Option<String>,
    pub reported_to: Option<String>,
    pub sort: Option<String>,
    pub direction: Option<String>,
    pub page: Option<u32>,
}

impl TicketListParams {
    pub fn into_query(self) -> AppResult<TicketListQuery> {
        let filters = TicketFilters {
            status: split(&self.status)
                .map(TicketStatus::from_legacy)
                .collect(),
            country_id: parse_ids(&self.country_id, "country_id")?,
            device_id: parse_ids(&self.device_id, "device_id")?,
            responsible: split(&self.responsible).map(str::to_string).collect(),
            area: split(&self.area).map(str::to_string).collect(),
            brand: split(&self.brand).map(str::to_string).collect(),
            search: self.search.filter(|s| !s.trim().is_empty()),
            reported_from: self.reported_from.as_deref().map(parse_date).transpose()?,
            reported_to: self.reported_to.as_deref().map(parse_date).transpose()?,
        };
        let sort = self.sort.map(|column| SortSpec {
            column,
            direction: match self.direction.as_deref() {
                Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
                _ => SortDirection::Asc,
            },
        });
        Ok(TicketListQuery {
            filters,
            sort,
            page: self.page,
        })
    }
}

fn split(value: &Option<String>) -> impl Iterator<Item = &str> {
    value
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_ids(value: &Option<String>, field: &str) -> AppResult<Vec<i64>> {
    split(value)
        .map(|v| {
            v.parse().map_err(|_| {
                AppError::validation(format!("Invalid {field}: {v}")).with_detail("field", field)
            })
        })
        .collect()
}
