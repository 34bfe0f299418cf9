//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    routing::get,
    Router,
};

use crate::handlers::{
    create_event, delete_event, get_event, health, list_events, list_users, update_event,
};
use crate::server::AppState;

/// Create the API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/api/health", get(health))
        // Users
        .route("/api/users", get(list_users))
        // Events
        .route("/api/events", get(list_events).post(create_event))
        .route(
            "/api/events/{id}",
            get(get_event).put(update_event).delete(delete_event),
        )
}
