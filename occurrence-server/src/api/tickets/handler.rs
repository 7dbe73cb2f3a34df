//! Ticket API handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use shared::models::{Ticket, TicketCreate, TicketListQuery, TicketPage, TicketUpdate};

use crate::core::ServerState;
use crate::tickets::query::{self, TicketListParams};
use crate::tickets::{Viewer, service};
use crate::utils::AppResult;

/// List visible tickets (filters in the query string)
pub async fn list(
    State(state): State<ServerState>,
    viewer: Viewer,
    Query(params): Query<TicketListParams>,
) -> AppResult<Json<TicketPage>> {
    let query = params.into_query()?;
    let page = query::list(&state.pool, &viewer, &query, state.config.page_size).await?;
    Ok(Json(page))
}

/// List visible tickets (filters in a JSON body)
pub async fn search(
    State(state): State<ServerState>,
    viewer: Viewer,
    Json(query): Json<TicketListQuery>,
) -> AppResult<Json<TicketPage>> {
    let page = query::list(&state.pool, &viewer, &query, state.config.page_size).await?;
    Ok(Json(page))
}

pub async fn get_by_id(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ticket = service::fetch_visible(&state.pool, &viewer, id).await?;
    Ok(Json(ticket))
}

pub async fn create(
    State(state): State<ServerState>,
    viewer: Viewer,
    Json(payload): Json<TicketCreate>,
) -> AppResult<Json<Ticket>> {
    let ctx = state.status_context();
    let ticket = service::create(&state.pool, &ctx, &viewer, payload).await?;
    Ok(Json(ticket))
}

pub async fn update(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
    Json(payload): Json<TicketUpdate>,
) -> AppResult<Json<Ticket>> {
    let ctx = state.status_context();
    let ticket = service::update(&state.pool, &ctx, &viewer, id, payload).await?;
    Ok(Json(ticket))
}

pub async fn delete(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    service::delete(&state.pool, &viewer, id).await?;
    Ok(Json(true))
}

pub async fn clear_finished(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ctx = state.status_context();
    let ticket = service::clear_finished(&state.pool, &ctx, &viewer, id).await?;
    Ok(Json(ticket))
}

pub async fn clear_deadline(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ctx = state.status_context();
    let ticket = service::clear_deadline(&state.pool, &ctx, &viewer, id).await?;
    Ok(Json(ticket))
}

pub async fn revert_country(
    State(state): State<ServerState>,
    viewer: Viewer,
    Path(id): Path<i64>,
) -> AppResult<Json<Ticket>> {
    let ctx = state.status_context();
    let ticket = service::revert_country(&state.pool, &ctx, &viewer, id).await?;
    Ok(Json(ticket))
}
