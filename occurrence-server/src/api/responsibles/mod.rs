//! Responsible-party lookup
//!
//! `GET /api/responsibles`: technicians grouped by the countries they are
//! granted, plus a flat list of every technician.

use std::collections::BTreeMap;

use axum::{Json, Router, extract::State, routing::get};
use shared::client::ResponsiblesResponse;
use shared::models::{GROUP_TECHNICIANS, display_name};

use crate::core::ServerState;
use crate::db::repository::{country_permission, user};
use crate::utils::AppResult;

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/responsibles", get(list))
}

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<ResponsiblesResponse>> {
    let rows = country_permission::group_members_by_country(&state.pool, GROUP_TECHNICIANS).await?;
    let mut by_country: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (country, _user_id, username, first, last) in rows {
        let names = by_country.entry(country).or_default();
        let name = display_name(&first, &last, &username);
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let all = user::find_by_group(&state.pool, GROUP_TECHNICIANS)
        .await?
        .iter()
        .map(|u| u.display_name())
        .collect();

    Ok(Json(ResponsiblesResponse { by_country, all }))
}
