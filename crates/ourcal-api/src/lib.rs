//! ourcal-api: HTTP API for the shared calendar
//!
//! REST endpoints for users and events, built with axum. Successful event
//! writes are handed to the notification dispatcher.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{build_router, start_server, AppState};
