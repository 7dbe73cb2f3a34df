//! Ticket write path
//!
//! Every mutation loads the ticket through the viewer's scope, checks edit
//! rights, applies the change, then runs [`status::prepare_for_save`]
//! before the row is written.

use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Ticket, TicketCreate, TicketUpdate};
use sqlx::SqlitePool;

use super::status::{self, StatusContext};
use super::visibility::{Viewer, canonical_name};
use crate::db::repository::{country, device, ticket as ticket_repo};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_SHORT_TEXT_LEN, validate_optional_text, validate_text_len,
};

/// Copy every present payload field onto the ticket
macro_rules! assign_present {
    ($ticket:expr, $data:expr; $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $data.$field {
                $ticket.$field = value;
            }
        )+
    };
}

/// Fetch a ticket the viewer is allowed to see. Invisible tickets are
/// reported as missing.
pub async fn fetch_visible(pool: &SqlitePool, viewer: &Viewer, id: i64) -> AppResult<Ticket> {
    ticket_repo::find_by_id(pool, id)
        .await?
        .filter(|t| viewer.scope().permits(t))
        .ok_or_else(|| ticket_not_found(id))
}

/// Whether the viewer may change this (visible) ticket
pub fn can_edit(viewer: &Viewer, ticket: &Ticket) -> bool {
    viewer.can_edit_any()
        || ticket
            .responsible_party
            .as_deref()
            .is_some_and(|name| canonical_name(name) == canonical_name(&viewer.display_name))
}

pub async fn create(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    data: TicketCreate,
) -> AppResult<Ticket> {
    let mut ticket = Ticket::blank(data.reported_date.unwrap_or(ctx.today));
    ticket.external_code = clean_code(data.external_code);
    ticket.deadline = data.deadline;
    ticket.finished_date = data.finished_date;
    ticket.country_id = data.country_id;
    ticket.device_id = data.device_id;
    ticket.responsible_party = data.responsible_party;
    assign_present!(ticket, data;
        area, brand, model, serial, version, year, contact, vin, ecu_type, engine_type,
        system, problem_type, key_type, technical_reporter, problem_detected,
        technical_feedback, manager_feedback, responsible_details, status,
    );

    if !viewer.may_use_country(ticket.country_id) {
        return Err(country_not_permitted(ticket.country_id));
    }
    check_references(pool, &ticket).await?;
    validate_text(&ticket)?;
    if let Some(code) = ticket.external_code.as_deref() {
        if is_generated_code(code) {
            return Err(reserved_code(code));
        }
        if ticket_repo::exists_external_code(pool, code, None).await? {
            return Err(external_code_exists(code));
        }
    }

    status::prepare_for_save(&mut ticket, ctx)?;
    let created = ticket_repo::create(pool, &ticket).await?;
    tracing::info!(
        ticket_id = created.id,
        external_code = ?created.external_code,
        status = %created.status,
        user = %viewer.username,
        "Ticket created"
    );
    Ok(created)
}

pub async fn update(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    id: i64,
    data: TicketUpdate,
) -> AppResult<Ticket> {
    let mut ticket = fetch_editable(pool, viewer, id).await?;

    if let Some(code) = data.external_code {
        let code = clean_code(Some(code)).ok_or_else(|| {
            AppError::field(ErrorCode::RequiredField, "external_code")
        })?;
        if is_generated_code(&code) && code != id.to_string() {
            return Err(reserved_code(&code));
        }
        if ticket_repo::exists_external_code(pool, &code, Some(id)).await? {
            return Err(external_code_exists(&code));
        }
        ticket.external_code = Some(code);
    }
    if let Some(country_id) = data.country_id {
        if !viewer.may_use_country(Some(country_id)) {
            return Err(country_not_permitted(Some(country_id)));
        }
        ticket.country_id = Some(country_id);
    }
    if data.deadline.is_some() {
        ticket.deadline = data.deadline;
    }
    if data.finished_date.is_some() {
        ticket.finished_date = data.finished_date;
    }
    if data.device_id.is_some() {
        ticket.device_id = data.device_id;
    }
    if data.responsible_party.is_some() {
        ticket.responsible_party = data.responsible_party;
    }
    assign_present!(ticket, data;
        reported_date, area, brand, model, serial, version, year, contact, vin, ecu_type,
        engine_type, system, problem_type, key_type, technical_reporter, problem_detected,
        technical_feedback, manager_feedback, responsible_details, status,
    );

    check_references(pool, &ticket).await?;
    validate_text(&ticket)?;
    save(pool, ctx, viewer, ticket, "updated").await
}

/// Reopen a finished ticket
pub async fn clear_finished(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    id: i64,
) -> AppResult<Ticket> {
    let mut ticket = fetch_editable(pool, viewer, id).await?;
    status::clear_finished(&mut ticket);
    save(pool, ctx, viewer, ticket, "finished date cleared").await
}

pub async fn clear_deadline(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    id: i64,
) -> AppResult<Ticket> {
    let mut ticket = fetch_editable(pool, viewer, id).await?;
    status::clear_deadline(&mut ticket);
    save(pool, ctx, viewer, ticket, "deadline cleared").await
}

pub async fn revert_country(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    id: i64,
) -> AppResult<Ticket> {
    let mut ticket = fetch_editable(pool, viewer, id).await?;
    status::revert_country(&mut ticket)?;
    save(pool, ctx, viewer, ticket, "country reverted").await
}

/// Superuser only
pub async fn delete(pool: &SqlitePool, viewer: &Viewer, id: i64) -> AppResult<()> {
    if !viewer.is_superuser {
        return Err(AppError::admin_required());
    }
    ticket_repo::delete(pool, id).await?;
    tracing::info!(ticket_id = id, user = %viewer.username, "Ticket deleted");
    Ok(())
}

/// Re-run [`status::prepare_for_save`] over every stored ticket and persist
/// the ones it changed in any field. Returns the number of tickets rewritten.
pub async fn refresh_statuses(pool: &SqlitePool, ctx: &StatusContext) -> AppResult<u64> {
    let mut changed = 0;
    for mut ticket in ticket_repo::find_all(pool).await? {
        let before = ticket.clone();
        if let Err(e) = status::prepare_for_save(&mut ticket, ctx) {
            tracing::warn!(ticket_id = ticket.id, error = %e, "Skipping ticket with invalid dates");
            continue;
        }
        if ticket != before {
            ticket_repo::update(pool, &ticket).await?;
            changed += 1;
        }
    }
    Ok(changed)
}

async fn fetch_editable(pool: &SqlitePool, viewer: &Viewer, id: i64) -> AppResult<Ticket> {
    let ticket = fetch_visible(pool, viewer, id).await?;
    if !can_edit(viewer, &ticket) {
        crate::security_log!(
            "WARN",
            "ticket_edit_denied",
            username = viewer.username.clone(),
            ticket_id = id
        );
        return Err(AppError::permission_denied(format!(
            "Not allowed to edit ticket {id}"
        )));
    }
    Ok(ticket)
}

async fn save(
    pool: &SqlitePool,
    ctx: &StatusContext,
    viewer: &Viewer,
    mut ticket: Ticket,
    action: &str,
) -> AppResult<Ticket> {
    status::prepare_for_save(&mut ticket, ctx)?;
    let saved = ticket_repo::update(pool, &ticket).await?;
    tracing::info!(
        ticket_id = saved.id,
        status = %saved.status,
        user = %viewer.username,
        "Ticket {action}"
    );
    Ok(saved)
}

async fn check_references(pool: &SqlitePool, ticket: &Ticket) -> AppResult<()> {
    if let Some(id) = ticket.country_id
        && country::find_by_id(pool, id).await?.is_none()
    {
        return Err(AppError::with_message(
            ErrorCode::CountryNotFound,
            format!("Country {id} not found"),
        ));
    }
    if let Some(id) = ticket.device_id
        && device::find_by_id(pool, id).await?.is_none()
    {
        return Err(AppError::with_message(
            ErrorCode::DeviceNotFound,
            format!("Device {id} not found"),
        ));
    }
    Ok(())
}

fn validate_text(t: &Ticket) -> AppResult<()> {
    validate_optional_text(&t.external_code, "external_code", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&t.responsible_party, "responsible_party", MAX_NAME_LEN)?;

    let fields: [(&str, &str, usize); 18] = [
        ("area", &t.area, MAX_NAME_LEN),
        ("brand", &t.brand, MAX_NAME_LEN),
        ("model", &t.model, MAX_NAME_LEN),
        ("serial", &t.serial, MAX_SHORT_TEXT_LEN),
        ("version", &t.version, MAX_SHORT_TEXT_LEN),
        ("year", &t.year, MAX_SHORT_TEXT_LEN),
        ("contact", &t.contact, MAX_NAME_LEN),
        ("vin", &t.vin, MAX_SHORT_TEXT_LEN),
        ("ecu_type", &t.ecu_type, MAX_NAME_LEN),
        ("engine_type", &t.engine_type, MAX_NAME_LEN),
        ("system", &t.system, MAX_NAME_LEN),
        ("problem_type", &t.problem_type, MAX_NAME_LEN),
        ("key_type", &t.key_type, MAX_NAME_LEN),
        ("technical_reporter", &t.technical_reporter, MAX_NAME_LEN),
        ("problem_detected", &t.problem_detected, MAX_NOTE_LEN),
        ("technical_feedback", &t.technical_feedback, MAX_NOTE_LEN),
        ("manager_feedback", &t.manager_feedback, MAX_NOTE_LEN),
        ("responsible_details", &t.responsible_details, MAX_NOTE_LEN),
    ];
    for (field, value, max) in fields {
        validate_text_len(value, field, max)?;
    }
    Ok(())
}

fn clean_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// All-digit codes share the namespace of the codes derived from ticket ids
fn is_generated_code(code: &str) -> bool {
    code.bytes().all(|b| b.is_ascii_digit())
}

fn reserved_code(code: &str) -> AppError {
    AppError::validation(format!(
        "External code '{code}' is reserved for generated ticket codes"
    ))
    .with_detail("field", "external_code")
}

fn ticket_not_found(id: i64) -> AppError {
    AppError::with_message(ErrorCode::TicketNotFound, format!("Ticket {id} not found"))
}

fn external_code_exists(code: &str) -> AppError {
    AppError::with_message(
        ErrorCode::ExternalCodeExists,
        format!("External code '{code}' already exists"),
    )
    .with_detail("field", "external_code")
}

fn country_not_permitted(country_id: Option<i64>) -> AppError {
    let err = AppError::new(ErrorCode::CountryNotPermitted).with_detail("field", "country_id");
    match country_id {
        Some(id) => err.with_detail("country_id", id),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use chrono::NaiveDate;
    use shared::models::{GROUP_SEMI_ADMIN, TicketStatus};
    use std::collections::BTreeSet;

    struct Fixture {
        pool: SqlitePool,
        ctx: StatusContext,
        brazil: i64,
        chile: i64,
        partner: i64,
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    async fn fixture() -> Fixture {
        let db = DbService::memory().await.unwrap();
        let brazil = country::get_or_create(&db.pool, "Brazil").await.unwrap().id;
        let chile = country::get_or_create(&db.pool, "Chile").await.unwrap().id;
        let partner = country::get_or_create(&db.pool, "China").await.unwrap().id;
        Fixture {
            pool: db.pool,
            ctx: StatusContext::new(d(1, 5), Some(partner)),
            brazil,
            chile,
            partner,
        }
    }

    fn superuser() -> Viewer {
        Viewer {
            user_id: 1,
            username: "admin".into(),
            is_superuser: true,
            display_name: "Admin".into(),
            ..Default::default()
        }
    }

    fn technician(countries: &[i64]) -> Viewer {
        Viewer {
            user_id: 2,
            username: "jdoe".into(),
            display_name: "Jane Doe".into(),
            permitted_countries: countries.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn semi_admin(countries: &[i64]) -> Viewer {
        Viewer {
            user_id: 3,
            username: "boss".into(),
            display_name: "Maria Boss".into(),
            groups: BTreeSet::from([GROUP_SEMI_ADMIN.to_string()]),
            permitted_countries: countries.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn payload(country_id: i64, responsible: &str) -> TicketCreate {
        TicketCreate {
            reported_date: Some(d(1, 1)),
            country_id: Some(country_id),
            responsible_party: Some(responsible.into()),
            brand: Some(" acme ".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_runs_engine_and_assigns_code() {
        let f = fixture().await;
        let mut data = payload(f.brazil, "Jane Doe");
        data.deadline = Some(d(1, 10));

        let t = create(&f.pool, &f.ctx, &superuser(), data).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);
        assert_eq!(t.external_code, Some(t.id.to_string()));
        assert_eq!(t.brand, "ACME");
        assert_eq!(t.original_country_id, Some(f.brazil));
        assert_eq!(t.responsible_key.as_deref(), Some("jane doe"));
        assert_eq!(t.country_name.as_deref(), Some("Brazil"));
    }

    #[tokio::test]
    async fn create_rejects_invalid_dates_before_writing() {
        let f = fixture().await;
        let mut data = payload(f.brazil, "Jane Doe");
        data.finished_date = Some(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let err = create(&f.pool, &f.ctx, &superuser(), data).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::FinishedBeforeReported);
        assert!(ticket_repo::find_all(&f.pool).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_outside_permitted_country_is_rejected() {
        let f = fixture().await;
        let viewer = technician(&[f.brazil]);

        let err = create(&f.pool, &f.ctx, &viewer, payload(f.chile, "Jane Doe"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CountryNotPermitted);

        let ok = create(&f.pool, &f.ctx, &viewer, payload(f.brazil, "Jane Doe")).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn duplicate_external_code_is_a_conflict() {
        let f = fixture().await;
        let mut data = payload(f.brazil, "Jane Doe");
        data.external_code = Some("OC-1".into());
        create(&f.pool, &f.ctx, &superuser(), data.clone()).await.unwrap();

        let err = create(&f.pool, &f.ctx, &superuser(), data).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ExternalCodeExists);
    }

    #[tokio::test]
    async fn numeric_codes_stay_free_for_generated_codes() {
        let f = fixture().await;
        let admin = superuser();
        let mut data = payload(f.brazil, "Jane Doe");
        data.external_code = Some(" 2 ".into());
        let err = create(&f.pool, &f.ctx, &admin, data).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.unwrap().get("field").unwrap(), "external_code");

        for _ in 0..3 {
            let t = create(&f.pool, &f.ctx, &admin, TicketCreate::default())
                .await
                .unwrap();
            assert_eq!(t.external_code, Some(t.id.to_string()));
        }
    }

    #[tokio::test]
    async fn update_accepts_only_own_numeric_code() {
        let f = fixture().await;
        let admin = superuser();
        let t = create(&f.pool, &f.ctx, &admin, payload(f.brazil, "Jane Doe"))
            .await
            .unwrap();
        let set_code = |code: String| TicketUpdate {
            external_code: Some(code),
            ..Default::default()
        };

        let future = (t.id + 1).to_string();
        let err = update(&f.pool, &f.ctx, &admin, t.id, set_code(future))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);

        let renamed = update(&f.pool, &f.ctx, &admin, t.id, set_code("OC-7".into()))
            .await
            .unwrap();
        assert_eq!(renamed.external_code.as_deref(), Some("OC-7"));
        let restored = update(&f.pool, &f.ctx, &admin, t.id, set_code(t.id.to_string()))
            .await
            .unwrap();
        assert_eq!(restored.external_code, Some(t.id.to_string()));

        let next = create(&f.pool, &f.ctx, &admin, TicketCreate::default())
            .await
            .unwrap();
        assert_eq!(next.external_code, Some(next.id.to_string()));
    }

    #[tokio::test]
    async fn partner_country_ticket_awaits_partner() {
        let f = fixture().await;
        let mut data = payload(f.partner, "Jane Doe");
        data.deadline = Some(d(1, 3));

        let t = create(&f.pool, &f.ctx, &superuser(), data).await.unwrap();
        assert_eq!(t.status, TicketStatus::AwaitingExternalLate);
    }

    #[tokio::test]
    async fn assignee_may_edit_but_not_others() {
        let f = fixture().await;
        let admin = superuser();
        let mine = create(&f.pool, &f.ctx, &admin, payload(f.brazil, "jane  doe"))
            .await
            .unwrap();
        let theirs = create(&f.pool, &f.ctx, &admin, payload(f.brazil, "John Smith"))
            .await
            .unwrap();

        let viewer = technician(&[f.brazil]);
        let change = TicketUpdate {
            deadline: Some(d(1, 20)),
            ..Default::default()
        };
        let updated = update(&f.pool, &f.ctx, &viewer, mine.id, change.clone())
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);

        let err = update(&f.pool, &f.ctx, &viewer, theirs.id, change)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TicketNotFound);
    }

    #[tokio::test]
    async fn semi_admin_edits_any_ticket_in_scope() {
        let f = fixture().await;
        let t = create(&f.pool, &f.ctx, &superuser(), payload(f.brazil, "John Smith"))
            .await
            .unwrap();
        let change = TicketUpdate {
            finished_date: Some(d(1, 4)),
            ..Default::default()
        };
        let updated = update(&f.pool, &f.ctx, &semi_admin(&[f.brazil]), t.id, change)
            .await
            .unwrap();
        assert_eq!(updated.status, TicketStatus::Done);
    }

    #[tokio::test]
    async fn transitions_persist_recomputed_status() {
        let f = fixture().await;
        let admin = superuser();
        let mut data = payload(f.brazil, "Jane Doe");
        data.deadline = Some(d(1, 3));
        data.finished_date = Some(d(1, 4));
        let t = create(&f.pool, &f.ctx, &admin, data).await.unwrap();
        assert_eq!(t.status, TicketStatus::Done);

        let t = clear_finished(&f.pool, &f.ctx, &admin, t.id).await.unwrap();
        assert_eq!(t.finished_date, None);
        assert_eq!(t.status, TicketStatus::Late);

        let t = clear_deadline(&f.pool, &f.ctx, &admin, t.id).await.unwrap();
        assert_eq!(t.deadline, None);
        assert_eq!(t.status, TicketStatus::Requested);
    }

    #[tokio::test]
    async fn revert_country_restores_first_country() {
        let f = fixture().await;
        let admin = superuser();
        let t = create(&f.pool, &f.ctx, &admin, payload(f.brazil, "Jane Doe"))
            .await
            .unwrap();
        let moved = update(
            &f.pool,
            &f.ctx,
            &admin,
            t.id,
            TicketUpdate {
                country_id: Some(f.partner),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(moved.status, TicketStatus::AwaitingExternal);
        assert_eq!(moved.original_country_id, Some(f.brazil));

        let back = revert_country(&f.pool, &f.ctx, &admin, t.id).await.unwrap();
        assert_eq!(back.country_id, Some(f.brazil));
    }

    #[tokio::test]
    async fn delete_is_superuser_only() {
        let f = fixture().await;
        let t = create(&f.pool, &f.ctx, &superuser(), payload(f.brazil, "Maria Boss"))
            .await
            .unwrap();

        let err = delete(&f.pool, &semi_admin(&[f.brazil]), t.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::AdminRequired);

        delete(&f.pool, &superuser(), t.id).await.unwrap();
        let err = fetch_visible(&f.pool, &superuser(), t.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::TicketNotFound);
    }

    #[tokio::test]
    async fn refresh_marks_overdue_tickets_late() {
        let f = fixture().await;
        let mut data = payload(f.brazil, "Jane Doe");
        data.deadline = Some(d(1, 10));
        let t = create(&f.pool, &f.ctx, &superuser(), data).await.unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);

        let later = StatusContext::new(d(1, 11), Some(f.partner));
        assert_eq!(refresh_statuses(&f.pool, &later).await.unwrap(), 1);
        assert_eq!(refresh_statuses(&f.pool, &later).await.unwrap(), 0);
        let loaded = fetch_visible(&f.pool, &superuser(), t.id).await.unwrap();
        assert_eq!(loaded.status, TicketStatus::Late);
    }

    #[tokio::test]
    async fn refresh_rewrites_normalized_fields_with_unchanged_status() {
        let f = fixture().await;
        let mut raw = Ticket::blank(d(1, 1));
        raw.country_id = Some(f.brazil);
        raw.area = "north".into();
        raw.technical_reporter = "mARIA".into();
        let stored = ticket_repo::create(&f.pool, &raw).await.unwrap();
        assert_eq!(stored.status, TicketStatus::Requested);
        assert_eq!(stored.original_country_id, None);

        assert_eq!(refresh_statuses(&f.pool, &f.ctx).await.unwrap(), 1);
        let loaded = fetch_visible(&f.pool, &superuser(), stored.id).await.unwrap();
        assert_eq!(loaded.status, TicketStatus::Requested);
        assert_eq!(loaded.area, "NORTH");
        assert_eq!(loaded.technical_reporter, "Maria");
        assert_eq!(loaded.original_country_id, Some(f.brazil));

        assert_eq!(refresh_statuses(&f.pool, &f.ctx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_country_is_rejected() {
        let f = fixture().await;
        let err = create(&f.pool, &f.ctx, &superuser(), payload(999, "Jane Doe"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::CountryNotFound);
    }
}
