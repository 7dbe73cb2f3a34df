//! Dashboard routes
//!
//! All counts are limited to the caller's visible tickets.
//!
//! - `GET /api/dashboard/summary?period=weekly|monthly|yearly&from=&to=`
//! - `GET /api/dashboard/by-status?status=LATE&period=...`
//! - `GET /api/dashboard/matrix`

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/dashboard", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/summary", get(handler::summary))
        .route("/by-status", get(handler::by_status))
        .route("/matrix", get(handler::matrix))
}
