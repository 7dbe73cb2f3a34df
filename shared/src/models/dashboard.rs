//! Dashboard aggregates

use super::TicketStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameters shared by the dashboard endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    /// `weekly`, `monthly` or `yearly`; ignored when `from`/`to` are given
    pub period: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<TicketStatus>,
}

/// One `(responsible, status, country)` bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct SummaryRow {
    pub responsible: Option<String>,
    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: TicketStatus,
    pub country: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct ResponsibleCount {
    pub responsible: Option<String>,
    pub count: i64,
}

/// responsible -> status label -> count
pub type StatusMatrix = BTreeMap<String, BTreeMap<String, i64>>;
