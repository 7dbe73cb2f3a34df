//! User administration routes (superuser only)
//!
//! - `GET|POST /api/users`
//! - `GET|POST /api/users/{id}/countries`
//! - `DELETE /api/users/{id}/countries/{country_id}`

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/users", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route(
            "/{id}/countries",
            get(handler::list_countries).post(handler::grant_country),
        )
        .route("/{id}/countries/{country_id}", delete(handler::revoke_country))
        .layer(middleware::from_fn(require_admin))
}
