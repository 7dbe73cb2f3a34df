//! Ticket Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder stored in free-text diagnosis fields until someone fills them in
pub const NOT_IDENTIFIED: &str = "Not identified";

/// Canonical ticket status, derived on every save.
///
/// Variants are listed by precedence, highest first. Stored and serialized as
/// SCREAMING_SNAKE_CASE. Reading accepts the legacy spellings and maps any
/// unrecognized value to `Requested`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", from = "String")]
pub enum TicketStatus {
    Done,
    AwaitingExternalLate,
    AwaitingExternal,
    Late,
    InProgress,
    Requested,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::Done,
        TicketStatus::AwaitingExternalLate,
        TicketStatus::AwaitingExternal,
        TicketStatus::Late,
        TicketStatus::InProgress,
        TicketStatus::Requested,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "DONE",
            Self::AwaitingExternalLate => "AWAITING_EXTERNAL_LATE",
            Self::AwaitingExternal => "AWAITING_EXTERNAL",
            Self::Late => "LATE",
            Self::InProgress => "IN_PROGRESS",
            Self::Requested => "REQUESTED",
        }
    }

    /// Human label shown on the dashboard
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Done => "Concluded",
            Self::AwaitingExternalLate => "Partner late",
            Self::AwaitingExternal => "Awaiting partner",
            Self::Late => "Late",
            Self::InProgress => "In progress",
            Self::Requested => "Requested",
        }
    }

    /// Parse a stored value, including legacy spellings. Never fails.
    pub fn from_legacy(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "DONE" => Self::Done,
            "AWAITING_EXTERNAL_LATE" | "AWAITING_CHINA_LATE" => Self::AwaitingExternalLate,
            "AWAITING_EXTERNAL" | "AWAITING_CHINA" => Self::AwaitingExternal,
            "LATE" => Self::Late,
            "IN_PROGRESS" | "PROGRESS" => Self::InProgress,
            _ => Self::Requested,
        }
    }

    pub const fn is_awaiting_external(&self) -> bool {
        matches!(self, Self::AwaitingExternal | Self::AwaitingExternalLate)
    }
}

impl From<String> for TicketStatus {
    fn from(value: String) -> Self {
        Self::from_legacy(&value)
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket entity (occurrence)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    pub external_code: Option<String>,
    pub reported_date: NaiveDate,
    pub deadline: Option<NaiveDate>,
    pub finished_date: Option<NaiveDate>,

    pub country_id: Option<i64>,
    pub original_country_id: Option<i64>,
    pub device_id: Option<i64>,

    pub area: String,
    pub brand: String,
    pub model: String,
    pub serial: String,
    pub version: String,
    pub year: String,
    pub contact: String,
    pub vin: String,
    pub ecu_type: String,
    pub engine_type: String,
    pub system: String,
    pub problem_type: String,
    pub key_type: String,

    pub technical_reporter: String,
    pub responsible_party: Option<String>,
    /// Canonical form of `responsible_party`, maintained on save
    #[serde(skip_serializing)]
    #[serde(default)]
    pub responsible_key: Option<String>,

    pub problem_detected: String,
    pub technical_feedback: String,
    pub manager_feedback: String,
    pub responsible_details: String,

    #[cfg_attr(feature = "db", sqlx(try_from = "String"))]
    pub status: TicketStatus,

    pub created_at: i64,
    pub updated_at: i64,

    // -- Joined names (LEFT JOIN in list/detail queries) --
    #[serde(default)]
    pub country_name: Option<String>,
    #[serde(default)]
    pub device_name: Option<String>,
}

impl Ticket {
    /// Blank ticket reported on `reported_date`, before any field is filled in
    pub fn blank(reported_date: NaiveDate) -> Self {
        Self {
            id: 0,
            external_code: None,
            reported_date,
            deadline: None,
            finished_date: None,
            country_id: None,
            original_country_id: None,
            device_id: None,
            area: String::new(),
            brand: String::new(),
            model: String::new(),
            serial: String::new(),
            version: String::new(),
            year: String::new(),
            contact: String::new(),
            vin: String::new(),
            ecu_type: String::new(),
            engine_type: String::new(),
            system: String::new(),
            problem_type: String::new(),
            key_type: String::new(),
            technical_reporter: String::new(),
            responsible_party: None,
            responsible_key: None,
            problem_detected: NOT_IDENTIFIED.to_string(),
            technical_feedback: NOT_IDENTIFIED.to_string(),
            manager_feedback: NOT_IDENTIFIED.to_string(),
            responsible_details: NOT_IDENTIFIED.to_string(),
            status: TicketStatus::Requested,
            created_at: 0,
            updated_at: 0,
            country_name: None,
            device_name: None,
        }
    }
}

/// Create ticket payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketCreate {
    pub external_code: Option<String>,
    /// Defaults to today in the business timezone
    pub reported_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub finished_date: Option<NaiveDate>,
    pub country_id: Option<i64>,
    pub device_id: Option<i64>,
    pub area: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub version: Option<String>,
    pub year: Option<String>,
    pub contact: Option<String>,
    pub vin: Option<String>,
    pub ecu_type: Option<String>,
    pub engine_type: Option<String>,
    pub system: Option<String>,
    pub problem_type: Option<String>,
    pub key_type: Option<String>,
    pub technical_reporter: Option<String>,
    pub responsible_party: Option<String>,
    pub problem_detected: Option<String>,
    pub technical_feedback: Option<String>,
    pub manager_feedback: Option<String>,
    pub responsible_details: Option<String>,
    /// Only `AWAITING_EXTERNAL` has a lasting effect; other values are recomputed
    pub status: Option<TicketStatus>,
}

/// Update ticket payload (absent fields are left untouched)
///
/// Nullable dates are cleared through the dedicated transitions
/// (`clear-finished`, `clear-deadline`), not by sending `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketUpdate {
    pub external_code: Option<String>,
    pub reported_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub finished_date: Option<NaiveDate>,
    pub country_id: Option<i64>,
    pub device_id: Option<i64>,
    pub area: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub serial: Option<String>,
    pub version: Option<String>,
    pub year: Option<String>,
    pub contact: Option<String>,
    pub vin: Option<String>,
    pub ecu_type: Option<String>,
    pub engine_type: Option<String>,
    pub system: Option<String>,
    pub problem_type: Option<String>,
    pub key_type: Option<String>,
    pub technical_reporter: Option<String>,
    pub responsible_party: Option<String>,
    pub problem_detected: Option<String>,
    pub technical_feedback: Option<String>,
    pub manager_feedback: Option<String>,
    pub responsible_details: Option<String>,
    pub status: Option<TicketStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_spellings_map_to_current_variants() {
        assert_eq!(TicketStatus::from_legacy("PROGRESS"), TicketStatus::InProgress);
        assert_eq!(
            TicketStatus::from_legacy("AWAITING_CHINA"),
            TicketStatus::AwaitingExternal
        );
        assert_eq!(
            TicketStatus::from_legacy("AWAITING_CHINA_LATE"),
            TicketStatus::AwaitingExternalLate
        );
        assert_eq!(TicketStatus::from_legacy("done"), TicketStatus::Done);
    }

    #[test]
    fn unknown_status_reads_as_requested() {
        assert_eq!(TicketStatus::from_legacy("ARCHIVED"), TicketStatus::Requested);
        assert_eq!(TicketStatus::from_legacy(""), TicketStatus::Requested);
        let parsed: TicketStatus = serde_json::from_str("\"WHATEVER\"").unwrap();
        assert_eq!(parsed, TicketStatus::Requested);
    }

    #[test]
    fn serializes_screaming_snake_case() {
        let json = serde_json::to_string(&TicketStatus::AwaitingExternalLate).unwrap();
        assert_eq!(json, "\"AWAITING_EXTERNAL_LATE\"");
        for status in TicketStatus::ALL {
            assert_eq!(TicketStatus::from_legacy(status.as_str()), status);
        }
    }

    #[test]
    fn precedence_follows_declaration_order() {
        assert!(TicketStatus::Done < TicketStatus::AwaitingExternalLate);
        assert!(TicketStatus::Late < TicketStatus::InProgress);
        assert!(TicketStatus::InProgress < TicketStatus::Requested);
    }

    #[test]
    fn blank_ticket_uses_placeholders() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let ticket = Ticket::blank(date);
        assert_eq!(ticket.problem_detected, NOT_IDENTIFIED);
        assert_eq!(ticket.responsible_details, NOT_IDENTIFIED);
        assert_eq!(ticket.status, TicketStatus::Requested);
    }
}
