//! wkune-sc library - Session Coordinator
//!
//! The coordination engine (membership, items, readiness, phases, selection,
//! restart) plus the HTTP/SSE surface that exposes it.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod coordinator;
pub mod items;
pub mod membership;
pub mod phase;
pub mod readiness;
pub mod restart;
pub mod selection;
pub mod state;

pub use coordinator::{Coordinator, Policy};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
}

impl AppState {
    /// Create new application state
    pub fn new(coordinator: Arc<Coordinator>) -> Self {
        Self { coordinator }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{delete, get, post, put};

    let sessions = Router::new()
        .route("/sessions", post(api::create_session))
        .route("/sessions/:code", delete(api::delete_session))
        .route("/sessions/:code/join", post(api::join))
        .route("/sessions/:code/leave", post(api::leave))
        .route("/sessions/:code/heartbeat", post(api::heartbeat))
        .route("/sessions/:code/state", get(api::session_state))
        .route("/sessions/:code/items", post(api::add_item))
        .route("/sessions/:code/items/:index", delete(api::remove_item))
        .route("/sessions/:code/acceptance", get(api::items_for_acceptance))
        .route("/sessions/:code/accepted", put(api::set_accepted_items))
        .route("/sessions/:code/ready", post(api::set_ready))
        .route("/sessions/:code/reroll", post(api::reroll))
        .route("/sessions/:code/roll-next", post(api::roll_next))
        .route("/sessions/:code/restart-votes", post(api::vote_restart))
        .route("/sessions/:code/export", get(api::export_items))
        .route("/sessions/:code/events", get(api::event_stream));

    Router::new()
        .route("/members", post(api::new_member))
        .merge(sessions)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
