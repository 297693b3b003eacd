//! Admin surface: route management, counters, dashboard.
//!
//! # Endpoints
//! - `GET /targets`: current route table as a JSON object
//! - `POST /targets`: add a route from `{"path", "target"}`
//! - `DELETE /targets/{path}`: remove a route (no-op when absent)
//! - `GET /metrics`: in-memory counters as a JSON array
//! - `GET /dashboard`: HTML table of the durable counters

pub mod dashboard;
pub mod handlers;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::http::server::AppState;
use self::dashboard::get_dashboard;
use self::handlers::*;

pub fn setup_admin_router() -> Router<AppState> {
    Router::new()
        .route("/targets", get(list_targets).post(add_target))
        .route("/targets/", delete(delete_target))
        .route("/targets/{*path}", delete(delete_target))
        .route("/metrics", get(get_metrics))
        .route("/dashboard", get(get_dashboard))
}
