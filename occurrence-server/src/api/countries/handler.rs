//! Country API handlers

use axum::{Json, extract::State};
use shared::client::ExternalPartnerResponse;
use shared::models::{Country, CountryCreate};

use crate::core::ServerState;
use crate::db::repository::country;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NAME_LEN, validate_required_text};

pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Country>>> {
    let countries = country::find_all(&state.pool).await?;
    Ok(Json(countries))
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CountryCreate>,
) -> AppResult<Json<Country>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    let created = country::create(&state.pool, payload).await?;
    tracing::info!(country_id = created.id, name = %created.name, "Country created");
    Ok(Json(created))
}

/// The country whose open tickets await the external partner
pub async fn external_partner(
    State(state): State<ServerState>,
) -> AppResult<Json<ExternalPartnerResponse>> {
    let country = match state.partner_country_id {
        Some(id) => country::find_by_id(&state.pool, id).await?,
        None => None,
    };
    Ok(Json(ExternalPartnerResponse { country }))
}
