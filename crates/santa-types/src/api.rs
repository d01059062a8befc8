use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{EventStatus, RevealMode, Role};

// -- JWT Claims --

/// JWT claims issued at login and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Join this event right after the account is created.
    #[serde(default)]
    pub event_code: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub wishlist: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub name: String,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub budget_max: Option<i64>,
    #[serde(default)]
    pub allow_single: bool,
    #[serde(default)]
    pub reveal_mode: RevealMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub budget_max: i64,
    pub allow_single: bool,
    pub reveal_mode: RevealMode,
    pub status: EventStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub alias: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterResponse {
    pub items: Vec<RosterEntry>,
}

// -- Pairing --

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub ok: bool,
    pub pairs: usize,
    pub singles: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockResponse {
    pub ok: bool,
    pub reveal_mode: RevealMode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Organizer view of an event's assignment set. Counts only, never identities.
#[derive(Debug, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub status: EventStatus,
    pub allow_single: bool,
    pub participants: usize,
    pub pairs: usize,
    pub singles: usize,
}

// -- Participant view --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub wishlist: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub participant_id: Uuid,
    pub alias: String,
    pub wishlist: String,
}

/// Reveal result for the calling participant.
///
/// The receiver fields are only present when disclosure is allowed and the
/// caller actually has a recipient; a singleton gets `can_reveal = true`
/// with both fields absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyAssignmentResponse {
    pub can_reveal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_wishlist: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub event: EventResponse,
    pub me: Option<ProfileResponse>,
    pub participants: Vec<RosterEntry>,
    pub assignment: Option<MyAssignmentResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinResponse {
    pub ok: bool,
    pub joined: bool,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}
