use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use tracing::warn;
use uuid::Uuid;

use santa_db::models::{EventRow, NewEvent, RosterRow, parse_timestamp};
use santa_engine::{EngineError, EventRecord};
use santa_types::api::{Claims, CreateEventRequest, EventResponse, RosterEntry, RosterResponse};
use santa_types::models::Role;

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};

/// Random 8-character URL-safe join code.
pub fn random_code() -> String {
    let bytes: [u8; 6] = rand::random();
    URL_SAFE_NO_PAD.encode(bytes)
}

fn valid_code(code: &str) -> bool {
    (3..=32).contains(&code.len())
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub(crate) fn event_response(row: &EventRow) -> Result<EventResponse, ApiError> {
    let record = EventRecord::try_from(row)?;
    Ok(EventResponse {
        id: record.id,
        code: record.code,
        name: record.name,
        event_date: record.event_date,
        budget_max: row.budget_max,
        allow_single: record.allow_single,
        reveal_mode: record.reveal_mode,
        status: record.status,
    })
}

pub(crate) fn roster_entries(rows: Vec<RosterRow>) -> Vec<RosterEntry> {
    rows.into_iter()
        .map(|row| RosterEntry {
            joined_at: parse_timestamp(&row.created_at).unwrap_or_else(|e| {
                warn!("Corrupt created_at on participant '{}': {:#}", row.alias, e);
                chrono::DateTime::default()
            }),
            alias: row.alias,
        })
        .collect()
}

fn require_admin(claims: &Claims) -> Result<(), ApiError> {
    if claims.role != Role::Admin {
        return Err(EngineError::Forbidden.into());
    }
    Ok(())
}

/// POST /admin/events: create a draft event owned by the caller.
pub async fn create_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;

    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("event name is required".into()));
    }
    let code = match req.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => {
            if !valid_code(code) {
                return Err(ApiError::BadRequest(
                    "code must be 3 to 32 letters, digits, '-' or '_'".into(),
                ));
            }
            code.to_string()
        }
        _ => random_code(),
    };
    let budget_max = req.budget_max.unwrap_or(0);
    if budget_max < 0 {
        return Err(ApiError::BadRequest("budget_max cannot be negative".into()));
    }

    let event_id = Uuid::new_v4().to_string();
    let owner_id = claims.sub.to_string();
    let row = run_blocking(move || {
        let created = state.db.create_event(&NewEvent {
            id: &event_id,
            owner_id: &owner_id,
            code: &code,
            name: &name,
            event_date: req.event_date,
            budget_max,
            allow_single: req.allow_single,
            reveal_mode: req.reveal_mode.as_str(),
        })?;
        if !created {
            return Err(ApiError::Conflict(format!("code {} is already in use", code)));
        }
        state
            .db
            .get_event(&event_id)?
            .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("event {} missing after insert", event_id)))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(event_response(&row)?)))
}

/// GET /admin/events: events owned by the caller, newest first.
pub async fn list_events(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;

    let owner_id = claims.sub.to_string();
    let rows = run_blocking(move || Ok(state.db.list_events_by_owner(&owner_id)?)).await?;
    let events = rows
        .iter()
        .map(event_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(events))
}

/// GET /admin/events/{event_id}/participants: roster for the organizer.
pub async fn get_participants(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&claims)?;

    let rows = run_blocking(move || {
        let event = state
            .db
            .get_event(&event_id.to_string())?
            .ok_or(EngineError::NotFound)?;
        if event.owner_id != claims.sub.to_string() {
            return Err(EngineError::Forbidden.into());
        }
        Ok(state.db.get_roster(&event.id)?)
    })
    .await?;

    Ok(Json(RosterResponse {
        items: roster_entries(rows),
    }))
}
