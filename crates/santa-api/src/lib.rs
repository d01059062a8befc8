pub mod auth;
pub mod error;
pub mod events;
pub mod middleware;
pub mod pairing;
pub mod participants;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use auth::{AppState, AppStateInner};

/// All routes, with auth applied to everything outside `/auth` and `/health`.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/admin/events", get(events::list_events).post(events::create_event))
        .route("/admin/events/{event_id}/participants", get(events::get_participants))
        .route("/admin/events/{event_id}/pairing/generate", post(pairing::generate))
        .route("/admin/events/{event_id}/pairing/lock", post(pairing::lock))
        .route("/admin/events/{event_id}/pairing/unlock", post(pairing::unlock))
        .route("/admin/events/{event_id}/pairing/summary", get(pairing::summary))
        .route("/events/{code}/join", post(participants::join))
        .route("/events/{code}/leave", post(participants::leave))
        .route("/events/{code}/participants", get(participants::roster))
        .route("/events/{code}/me", get(participants::get_me).put(participants::update_me))
        .layer(axum_middleware::from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> &'static str {
    "ok"
}
