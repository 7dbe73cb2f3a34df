//! Ticket listing request/response types

use super::{Country, Device, Ticket, TicketStatus};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Caller-supplied filters. Every non-empty filter narrows the visible set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketFilters {
    pub status: Vec<TicketStatus>,
    pub country_id: Vec<i64>,
    pub device_id: Vec<i64>,
    pub responsible: Vec<String>,
    pub area: Vec<String>,
    pub brand: Vec<String>,
    pub search: Option<String>,
    pub reported_from: Option<NaiveDate>,
    pub reported_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortSpec {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

/// Body of `POST /api/tickets/search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketListQuery {
    pub filters: TicketFilters,
    pub sort: Option<SortSpec>,
    /// 1-based page number
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_records: i64,
    pub page_size: u32,
    pub has_previous: bool,
    pub has_next: bool,
}

/// Distinct values present in the caller's visible set
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterOptions {
    pub statuses: Vec<TicketStatus>,
    pub countries: Vec<Country>,
    pub devices: Vec<Device>,
    pub responsibles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketPage {
    pub tickets: Vec<Ticket>,
    pub pagination: Pagination,
    pub filter_options: FilterOptions,
}
