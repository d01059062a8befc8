use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use uuid::Uuid;

use santa_db::models::{JoinOutcome, LeaveOutcome};
use santa_engine::{Engine, EngineError};
use santa_types::api::{
    Claims, JoinResponse, MeResponse, MyAssignmentResponse, OkResponse, ProfileResponse, RosterResponse,
    UpdateProfileRequest,
};

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};
use crate::events::{event_response, roster_entries};

const MAX_ALIAS_LEN: usize = 64;
const MAX_WISHLIST_LEN: usize = 2000;

/// POST /events/{code}/join
pub async fn join(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let event = state.db.get_event_by_code(&code)?.ok_or(EngineError::NotFound)?;
        let outcome = state.db.join_event(
            &event.id,
            &claims.sub.to_string(),
            &Uuid::new_v4().to_string(),
            "",
            "",
        )?;
        match outcome {
            JoinOutcome::Joined | JoinOutcome::AlreadyMember => Ok(()),
            JoinOutcome::EventLocked => Err(ApiError::Conflict("event is locked, nobody can join".into())),
            JoinOutcome::InOtherEvent(other) => Err(ApiError::Conflict(format!(
                "already part of event {}, only one event at a time",
                other
            ))),
        }
    })
    .await?;

    Ok(Json(JoinResponse { ok: true, joined: true }))
}

/// POST /events/{code}/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    run_blocking(move || {
        let event = state.db.get_event_by_code(&code)?.ok_or(EngineError::NotFound)?;
        match state.db.leave_event(&event.id, &claims.sub.to_string())? {
            LeaveOutcome::Left => Ok(()),
            LeaveOutcome::NotMember => Err(ApiError::BadRequest("not a member of this event".into())),
            LeaveOutcome::EventLocked => {
                Err(ApiError::Conflict("event is locked, nobody can leave".into()))
            }
        }
    })
    .await?;

    Ok(Json(OkResponse { ok: true }))
}

/// GET /events/{code}/participants: aliases in join order.
pub async fn roster(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = run_blocking(move || {
        let event = state.db.get_event_by_code(&code)?.ok_or(EngineError::NotFound)?;
        Ok(state.db.get_roster(&event.id)?)
    })
    .await?;

    Ok(Json(RosterResponse {
        items: roster_entries(rows),
    }))
}

/// GET /events/{code}/me
pub async fn get_me(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let me = run_blocking(move || load_me(&state, &code, claims.sub)).await?;
    Ok(Json(me))
}

/// PUT /events/{code}/me: update alias and wishlist, then return the same
/// payload as GET.
pub async fn update_me(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let alias = req.alias.unwrap_or_default().trim().to_string();
    let wishlist = req.wishlist.unwrap_or_default().trim().to_string();
    if alias.chars().count() > MAX_ALIAS_LEN {
        return Err(ApiError::BadRequest(format!("alias is limited to {} characters", MAX_ALIAS_LEN)));
    }
    if wishlist.chars().count() > MAX_WISHLIST_LEN {
        return Err(ApiError::BadRequest(format!(
            "wishlist is limited to {} characters",
            MAX_WISHLIST_LEN
        )));
    }

    let me = run_blocking(move || {
        let event = state.db.get_event_by_code(&code)?.ok_or(EngineError::NotFound)?;
        let participant = state
            .db
            .get_participant(&event.id, &claims.sub.to_string())?
            .ok_or_else(|| ApiError::BadRequest("not a member of this event".into()))?;
        state.db.update_profile(&participant.id, &alias, &wishlist)?;
        load_me(&state, &code, claims.sub)
    })
    .await?;

    Ok(Json(me))
}

fn load_me(state: &AppState, code: &str, user_id: Uuid) -> Result<MeResponse, ApiError> {
    let row = state.db.get_event_by_code(code)?.ok_or(EngineError::NotFound)?;
    let event = event_response(&row)?;

    let me = state
        .db
        .get_participant(&row.id, &user_id.to_string())?
        .map(|p| -> Result<ProfileResponse, ApiError> {
            Ok(ProfileResponse {
                participant_id: p
                    .id
                    .parse()
                    .map_err(|e| anyhow::anyhow!("corrupt participant id '{}': {}", p.id, e))?,
                alias: p.alias,
                wishlist: p.wishlist,
            })
        })
        .transpose()?;

    let participants = roster_entries(state.db.get_roster(&row.id)?);

    let assignment = match me {
        Some(_) => {
            let engine = Engine::new(&state.db, state.clock.clone());
            let reveal = engine.my_assignment(event.id, user_id)?;
            let (receiver_alias, receiver_wishlist) = match reveal.receiver {
                Some(r) => (Some(r.alias), Some(r.wishlist)),
                None => (None, None),
            };
            Some(MyAssignmentResponse {
                can_reveal: reveal.can_reveal,
                receiver_alias,
                receiver_wishlist,
            })
        }
        None => None,
    };

    Ok(MeResponse {
        event,
        me,
        participants,
        assignment,
    })
}
