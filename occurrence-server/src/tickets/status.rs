//! Status engine
//!
//! Every write path calls [`prepare_for_save`] right before the row is
//! written. The engine is pure: "today" and the external-partner country
//! arrive through [`StatusContext`].
//!
//! Status is chosen by an ordered rule table ([`RULES`], first match wins),
//! then the external-partner country override runs as a separate final step.

use chrono::NaiveDate;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Ticket, TicketStatus};

use super::visibility::canonical_name;

/// Request-scoped inputs the engine needs besides the ticket itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusContext {
    /// Calendar date in the business timezone
    pub today: NaiveDate,
    /// Country whose open tickets always await the external partner
    pub external_partner_country: Option<i64>,
}

impl StatusContext {
    pub fn new(today: NaiveDate, external_partner_country: Option<i64>) -> Self {
        Self {
            today,
            external_partner_country,
        }
    }

    fn is_past(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| d < self.today)
    }
}

/// Names of the entries in [`RULES`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Finished,
    AwaitingPastDeadline,
    Awaiting,
    PastDeadline,
    PromoteRequested,
    OpenDeadline,
    KeepWorkedOn,
    Fallback,
}

/// What a matching rule does to the current status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Set(TicketStatus),
    Keep,
}

type Predicate = fn(&Ticket, &StatusContext) -> bool;

fn finished(t: &Ticket, _: &StatusContext) -> bool {
    t.finished_date.is_some()
}

fn awaiting_past_deadline(t: &Ticket, ctx: &StatusContext) -> bool {
    t.status.is_awaiting_external() && ctx.is_past(t.deadline)
}

fn awaiting(t: &Ticket, _: &StatusContext) -> bool {
    t.status.is_awaiting_external()
}

fn past_deadline(t: &Ticket, ctx: &StatusContext) -> bool {
    ctx.is_past(t.deadline)
}

fn requested_with_deadline(t: &Ticket, _: &StatusContext) -> bool {
    t.deadline.is_some() && t.status == TicketStatus::Requested
}

fn open_deadline(t: &Ticket, _: &StatusContext) -> bool {
    t.deadline.is_some()
}

fn worked_on_without_deadline(t: &Ticket, _: &StatusContext) -> bool {
    t.deadline.is_none() && matches!(t.status, TicketStatus::InProgress | TicketStatus::Done)
}

fn always(_: &Ticket, _: &StatusContext) -> bool {
    true
}

/// Precedence table, evaluated top to bottom. Later predicates may assume
/// every earlier one was false.
pub const RULES: &[(Rule, Predicate, Outcome)] = &[
    (Rule::Finished, finished, Outcome::Set(TicketStatus::Done)),
    (
        Rule::AwaitingPastDeadline,
        awaiting_past_deadline,
        Outcome::Set(TicketStatus::AwaitingExternalLate),
    ),
    (Rule::Awaiting, awaiting, Outcome::Set(TicketStatus::AwaitingExternal)),
    (Rule::PastDeadline, past_deadline, Outcome::Set(TicketStatus::Late)),
    (
        Rule::PromoteRequested,
        requested_with_deadline,
        Outcome::Set(TicketStatus::InProgress),
    ),
    (Rule::OpenDeadline, open_deadline, Outcome::Keep),
    (Rule::KeepWorkedOn, worked_on_without_deadline, Outcome::Keep),
    (Rule::Fallback, always, Outcome::Set(TicketStatus::Requested)),
];

/// First matching rule and the status it yields
pub fn evaluate(ticket: &Ticket, ctx: &StatusContext) -> (Rule, TicketStatus) {
    let (rule, outcome) = RULES
        .iter()
        .find(|(_, applies, _)| applies(ticket, ctx))
        .map(|(rule, _, outcome)| (*rule, *outcome))
        .unwrap_or((Rule::Fallback, Outcome::Set(TicketStatus::Requested)));
    match outcome {
        Outcome::Set(status) => (rule, status),
        Outcome::Keep => (rule, ticket.status),
    }
}

/// Status derived from the general rules (without the country override)
pub fn recompute(ticket: &Ticket, ctx: &StatusContext) -> TicketStatus {
    evaluate(ticket, ctx).1
}

/// Open tickets in the external-partner country always await the partner
pub fn apply_country_override(ticket: &mut Ticket, ctx: &StatusContext) {
    let Some(partner) = ctx.external_partner_country else {
        return;
    };
    if ticket.finished_date.is_none() && ticket.country_id == Some(partner) {
        ticket.status = if ctx.is_past(ticket.deadline) {
            TicketStatus::AwaitingExternalLate
        } else {
            TicketStatus::AwaitingExternal
        };
    }
}

/// Canonical casing for the fields used in filters and reports
pub fn normalize(ticket: &mut Ticket) {
    ticket.area = ticket.area.trim().to_uppercase();
    ticket.brand = ticket.brand.trim().to_uppercase();
    ticket.model = ticket.model.trim().to_uppercase();
    ticket.technical_reporter = capitalize(ticket.technical_reporter.trim());

    ticket.responsible_party = ticket
        .responsible_party
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    ticket.responsible_key = ticket.responsible_party.as_deref().map(canonical_name);
}

/// First character uppercase, the rest lowercase
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Reject date combinations that can never be saved
pub fn validate_dates(ticket: &Ticket) -> AppResult<()> {
    let Some(finished) = ticket.finished_date else {
        return Ok(());
    };
    if finished < ticket.reported_date {
        return Err(AppError::field(ErrorCode::FinishedBeforeReported, "finished_date"));
    }
    if let Some(deadline) = ticket.deadline
        && finished < deadline
    {
        return Err(AppError::field(ErrorCode::FinishedBeforeDeadline, "finished_date"));
    }
    Ok(())
}

/// Single entry point for every write path
pub fn prepare_for_save(ticket: &mut Ticket, ctx: &StatusContext) -> AppResult<()> {
    if ticket.original_country_id.is_none() {
        ticket.original_country_id = ticket.country_id;
    }
    validate_dates(ticket)?;
    normalize(ticket);
    ticket.status = recompute(ticket, ctx);
    apply_country_override(ticket, ctx);
    Ok(())
}

// ── Explicit transitions ────────────────────────────────────────────

/// Reopen a finished ticket
pub fn clear_finished(ticket: &mut Ticket) {
    ticket.finished_date = None;
    if ticket.status == TicketStatus::Done {
        ticket.status = TicketStatus::InProgress;
    }
}

pub fn clear_deadline(ticket: &mut Ticket) {
    ticket.deadline = None;
    if !ticket.status.is_awaiting_external() {
        ticket.status = TicketStatus::Requested;
    }
}

/// Move the ticket back to the country it was first saved with
pub fn revert_country(ticket: &mut Ticket) -> AppResult<()> {
    match ticket.original_country_id {
        Some(original) => {
            ticket.country_id = Some(original);
            Ok(())
        }
        None => Err(AppError::new(ErrorCode::NoOriginalCountry)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARTNER: i64 = 86;
    const BRAZIL: i64 = 55;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn ctx(today: NaiveDate) -> StatusContext {
        StatusContext::new(today, Some(PARTNER))
    }

    fn ticket() -> Ticket {
        let mut t = Ticket::blank(d(2024, 1, 1));
        t.country_id = Some(BRAZIL);
        t
    }

    fn saved(mut t: Ticket, ctx: &StatusContext) -> Ticket {
        prepare_for_save(&mut t, ctx).unwrap();
        t
    }

    #[test]
    fn ticket_lifecycle_through_the_week() {
        // created with no deadline
        let t = saved(ticket(), &ctx(d(2024, 1, 1)));
        assert_eq!(t.status, TicketStatus::Requested);

        // deadline set while it is still ahead
        let mut t = t;
        t.deadline = Some(d(2024, 1, 10));
        let t = saved(t, &ctx(d(2024, 1, 5)));
        assert_eq!(t.status, TicketStatus::InProgress);

        // saved again after the deadline passed
        let t = saved(t, &ctx(d(2024, 1, 11)));
        assert_eq!(t.status, TicketStatus::Late);

        // finished
        let mut t = t;
        t.finished_date = Some(d(2024, 1, 12));
        let t = saved(t, &ctx(d(2024, 1, 12)));
        assert_eq!(t.status, TicketStatus::Done);

        // clearing the deadline keeps it done
        let mut t = t;
        clear_deadline(&mut t);
        let t = saved(t, &ctx(d(2024, 1, 13)));
        assert_eq!(t.status, TicketStatus::Done);
        assert_eq!(t.deadline, None);
    }

    #[test]
    fn finished_dominates_every_other_field() {
        for status in TicketStatus::ALL {
            for country in [Some(BRAZIL), Some(PARTNER), None] {
                for deadline in [None, Some(d(2024, 1, 2)), Some(d(2024, 6, 1))] {
                    let mut t = ticket();
                    t.status = status;
                    t.country_id = country;
                    t.deadline = deadline;
                    t.finished_date = Some(d(2024, 6, 1));
                    let t = saved(t, &ctx(d(2024, 3, 1)));
                    assert_eq!(t.status, TicketStatus::Done, "{status:?} {country:?} {deadline:?}");
                }
            }
        }
    }

    #[test]
    fn partner_country_always_awaits_partner() {
        let today = d(2024, 3, 1);
        for status in TicketStatus::ALL {
            let mut t = ticket();
            t.country_id = Some(PARTNER);
            t.status = status;

            t.deadline = None;
            assert_eq!(saved(t.clone(), &ctx(today)).status, TicketStatus::AwaitingExternal);

            t.deadline = Some(today);
            assert_eq!(saved(t.clone(), &ctx(today)).status, TicketStatus::AwaitingExternal);

            t.deadline = Some(d(2024, 2, 29));
            assert_eq!(
                saved(t, &ctx(today)).status,
                TicketStatus::AwaitingExternalLate
            );
        }
    }

    #[test]
    fn past_deadline_outside_partner_country_is_late() {
        for status in [
            TicketStatus::Requested,
            TicketStatus::InProgress,
            TicketStatus::Late,
            TicketStatus::Done,
        ] {
            let mut t = ticket();
            t.status = status;
            t.deadline = Some(d(2024, 2, 1));
            assert_eq!(saved(t, &ctx(d(2024, 2, 2))).status, TicketStatus::Late);
        }
    }

    #[test]
    fn deadline_today_is_not_late() {
        let mut t = ticket();
        t.deadline = Some(d(2024, 2, 1));
        assert_eq!(saved(t, &ctx(d(2024, 2, 1))).status, TicketStatus::InProgress);
    }

    #[test]
    fn awaiting_state_survives_outside_partner_country() {
        let mut t = ticket();
        t.status = TicketStatus::AwaitingExternal;
        assert_eq!(evaluate(&t, &ctx(d(2024, 2, 1))).0, Rule::Awaiting);

        t.deadline = Some(d(2024, 1, 15));
        let t = saved(t, &ctx(d(2024, 2, 1)));
        assert_eq!(t.status, TicketStatus::AwaitingExternalLate);
    }

    #[test]
    fn worked_on_status_without_deadline_is_kept() {
        for status in [TicketStatus::InProgress, TicketStatus::Done] {
            let mut t = ticket();
            t.status = status;
            assert_eq!(evaluate(&t, &ctx(d(2024, 2, 1))), (Rule::KeepWorkedOn, status));
            assert_eq!(saved(t, &ctx(d(2024, 2, 1))).status, status);
        }

        let mut t = ticket();
        t.status = TicketStatus::Late;
        assert_eq!(saved(t, &ctx(d(2024, 2, 1))).status, TicketStatus::Requested);
    }

    #[test]
    fn future_deadline_only_promotes_requested() {
        let today = d(2024, 2, 1);
        let mut t = ticket();
        t.deadline = Some(d(2024, 3, 1));
        assert_eq!(
            evaluate(&t, &ctx(today)),
            (Rule::PromoteRequested, TicketStatus::InProgress)
        );

        for status in [TicketStatus::InProgress, TicketStatus::Late, TicketStatus::Done] {
            let mut t = ticket();
            t.status = status;
            t.deadline = Some(d(2024, 3, 1));
            assert_eq!(evaluate(&t, &ctx(today)).0, Rule::OpenDeadline);
            assert_eq!(saved(t, &ctx(today)).status, status, "{status:?}");
        }
    }

    #[test]
    fn late_ticket_with_extended_deadline_stays_late() {
        let mut t = ticket();
        t.deadline = Some(d(2024, 1, 10));
        let mut t = saved(t, &ctx(d(2024, 1, 11)));
        assert_eq!(t.status, TicketStatus::Late);

        t.deadline = Some(d(2024, 1, 31));
        let t = saved(t, &ctx(d(2024, 1, 12)));
        assert_eq!(t.status, TicketStatus::Late);
    }

    #[test]
    fn saving_twice_changes_nothing() {
        let mut t = ticket();
        t.area = " north ".into();
        t.brand = "acme".into();
        t.model = "x-200".into();
        t.technical_reporter = "mARIA silva".into();
        t.responsible_party = Some("  Jane   Doe ".into());
        t.deadline = Some(d(2024, 1, 3));
        let c = ctx(d(2024, 1, 5));

        let once = saved(t, &c);
        let twice = saved(once.clone(), &c);
        assert_eq!(once.status, twice.status);
        assert_eq!(once.area, twice.area);
        assert_eq!(once.brand, twice.brand);
        assert_eq!(once.model, twice.model);
        assert_eq!(once.technical_reporter, twice.technical_reporter);
        assert_eq!(once.responsible_key, twice.responsible_key);
    }

    #[test]
    fn normalize_cases_fields() {
        let mut t = ticket();
        t.area = "south east".into();
        t.brand = "scania".into();
        t.model = "r450".into();
        t.technical_reporter = "jOÃO".into();
        t.responsible_party = Some("   ".into());
        normalize(&mut t);
        assert_eq!(t.area, "SOUTH EAST");
        assert_eq!(t.brand, "SCANIA");
        assert_eq!(t.model, "R450");
        assert_eq!(t.technical_reporter, "João");
        assert_eq!(t.responsible_party, None);
        assert_eq!(t.responsible_key, None);
    }

    #[test]
    fn finished_before_reported_is_rejected() {
        let mut t = ticket();
        t.finished_date = Some(d(2023, 12, 31));
        let err = prepare_for_save(&mut t, &ctx(d(2024, 1, 2))).unwrap_err();
        assert_eq!(err.code, ErrorCode::FinishedBeforeReported);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "finished_date");
    }

    #[test]
    fn finished_before_deadline_is_rejected() {
        let mut t = ticket();
        t.deadline = Some(d(2024, 1, 20));
        t.finished_date = Some(d(2024, 1, 10));
        let err = validate_dates(&t).unwrap_err();
        assert_eq!(err.code, ErrorCode::FinishedBeforeDeadline);
    }

    #[test]
    fn clear_finished_reopens_ticket() {
        let mut t = ticket();
        t.finished_date = Some(d(2024, 1, 2));
        let mut t = saved(t, &ctx(d(2024, 1, 3)));
        clear_finished(&mut t);
        assert_eq!(t.status, TicketStatus::InProgress);
        let t = saved(t, &ctx(d(2024, 1, 3)));
        assert_eq!(t.finished_date, None);
        assert_eq!(t.status, TicketStatus::InProgress);
    }

    #[test]
    fn clear_deadline_keeps_awaiting_state() {
        let mut t = ticket();
        t.status = TicketStatus::AwaitingExternalLate;
        t.deadline = Some(d(2024, 1, 2));
        clear_deadline(&mut t);
        let t = saved(t, &ctx(d(2024, 2, 1)));
        assert_eq!(t.status, TicketStatus::AwaitingExternal);
    }

    #[test]
    fn original_country_is_captured_once() {
        let t = saved(ticket(), &ctx(d(2024, 1, 1)));
        assert_eq!(t.original_country_id, Some(BRAZIL));

        let mut t = t;
        t.country_id = Some(PARTNER);
        let mut t = saved(t, &ctx(d(2024, 1, 1)));
        assert_eq!(t.original_country_id, Some(BRAZIL));
        assert_eq!(t.status, TicketStatus::AwaitingExternal);

        revert_country(&mut t).unwrap();
        let t = saved(t, &ctx(d(2024, 1, 1)));
        assert_eq!(t.country_id, Some(BRAZIL));
        assert_eq!(t.status, TicketStatus::AwaitingExternal);
    }

    #[test]
    fn revert_without_snapshot_fails() {
        let mut t = Ticket::blank(d(2024, 1, 1));
        let err = revert_country(&mut t).unwrap_err();
        assert_eq!(err.code, ErrorCode::NoOriginalCountry);
    }

    #[test]
    fn no_partner_configured_means_no_override() {
        let mut t = ticket();
        t.country_id = Some(PARTNER);
        let t = saved(t, &StatusContext::new(d(2024, 1, 1), None));
        assert_eq!(t.status, TicketStatus::Requested);
    }
}
