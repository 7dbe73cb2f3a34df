//! Dashboard API handlers

use axum::{
    Json,
    extract::{Query, State},
};
use shared::models::{DashboardQuery, ResponsibleCount, StatusMatrix, SummaryRow};

use crate::core::ServerState;
use crate::tickets::Viewer;
use crate::tickets::dashboard::{self, DateRange};
use crate::utils::{AppError, AppResult, ErrorCode};

pub async fn summary(
    State(state): State<ServerState>,
    viewer: Viewer,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Vec<SummaryRow>>> {
    let range = DateRange::resolve(&query, state.status_context().today)?;
    let rows = dashboard::summary(&state.pool, &viewer, range).await?;
    Ok(Json(rows))
}

pub async fn by_status(
    State(state): State<ServerState>,
    viewer: Viewer,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<Vec<ResponsibleCount>>> {
    let status = query
        .status
        .ok_or_else(|| AppError::field(ErrorCode::RequiredField, "status"))?;
    let range = DateRange::resolve(&query, state.status_context().today)?;
    let rows = dashboard::by_status(&state.pool, &viewer, status, range).await?;
    Ok(Json(rows))
}

pub async fn matrix(
    State(state): State<ServerState>,
    viewer: Viewer,
) -> AppResult<Json<StatusMatrix>> {
    let matrix = dashboard::matrix(&state.pool, &viewer).await?;
    Ok(Json(matrix))
}
