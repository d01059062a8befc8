use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use santa_engine::Engine;
use santa_types::api::{Claims, GenerateResponse, LockResponse, OkResponse, SummaryResponse};

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};
use crate::middleware::caller;

/// POST /admin/events/{event_id}/pairing/generate
pub async fn generate(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&claims);
    let outcome = run_blocking(move || {
        let engine = Engine::new(&state.db, state.clock.clone());
        let mut rng = rand::rng();
        Ok(engine.generate(event_id, &caller, &mut rng)?)
    })
    .await?;

    Ok(Json(GenerateResponse {
        ok: true,
        pairs: outcome.pairs,
        singles: outcome.singles,
    }))
}

/// POST /admin/events/{event_id}/pairing/lock
pub async fn lock(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&claims);
    let outcome = run_blocking(move || {
        let engine = Engine::new(&state.db, state.clock.clone());
        Ok(engine.lock(event_id, &caller)?)
    })
    .await?;

    Ok(Json(LockResponse {
        ok: true,
        reveal_mode: outcome.reveal_mode,
    }))
}

/// POST /admin/events/{event_id}/pairing/unlock
pub async fn unlock(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&claims);
    run_blocking(move || {
        let engine = Engine::new(&state.db, state.clock.clone());
        Ok(engine.unlock(event_id, &caller)?)
    })
    .await?;

    Ok(Json(OkResponse { ok: true }))
}

/// GET /admin/events/{event_id}/pairing/summary: counts only, the organizer
/// never sees who drew whom.
pub async fn summary(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&claims);
    let summary = run_blocking(move || {
        let engine = Engine::new(&state.db, state.clock.clone());
        Ok(engine.summary(event_id, &caller)?)
    })
    .await?;

    Ok(Json(SummaryResponse {
        id: summary.event.id,
        name: summary.event.name,
        code: summary.event.code,
        status: summary.event.status,
        allow_single: summary.event.allow_single,
        participants: summary.participants,
        pairs: summary.pairs,
        singles: summary.singles,
    }))
}
