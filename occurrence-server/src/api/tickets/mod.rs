//! Ticket routes
//!
//! | Path | Method | Access |
//! |------|--------|--------|
//! | /api/tickets | GET | visible set, query-string filters |
//! | /api/tickets/search | POST | visible set, JSON filters |
//! | /api/tickets | POST | permitted countries |
//! | /api/tickets/{id} | GET | visible |
//! | /api/tickets/{id} | PUT | editors and assignee |
//! | /api/tickets/{id} | DELETE | superuser |
//! | /api/tickets/{id}/clear-finished | POST | editors and assignee |
//! | /api/tickets/{id}/clear-deadline | POST | editors and assignee |
//! | /api/tickets/{id}/revert-country | POST | editors and assignee |

mod handler;

use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::auth::require_admin;
use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tickets", routes())
}

fn routes() -> Router<ServerState> {
    let routes = Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/search", post(handler::search))
        .route("/{id}", get(handler::get_by_id).put(handler::update))
        .route("/{id}/clear-finished", post(handler::clear_finished))
        .route("/{id}/clear-deadline", post(handler::clear_deadline))
        .route("/{id}/revert-country", post(handler::revert_country));

    let admin_routes = Router::new()
        .route("/{id}", delete(handler::delete))
        .layer(middleware::from_fn(require_admin));

    routes.merge(admin_routes)
}
