//! Database row types. These map directly to SQLite rows and stay
//! independent of the API models in santa-types.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use uuid::Uuid;

use santa_engine::EventRecord;

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct EventRow {
    pub id: String,
    pub owner_id: String,
    pub code: String,
    pub name: String,
    pub event_date: String,
    pub budget_max: i64,
    pub allow_single: bool,
    pub reveal_mode: String,
    pub status: String,
    pub created_at: String,
}

pub struct NewEvent<'a> {
    pub id: &'a str,
    pub owner_id: &'a str,
    pub code: &'a str,
    pub name: &'a str,
    pub event_date: DateTime<Utc>,
    pub budget_max: i64,
    pub allow_single: bool,
    pub reveal_mode: &'a str,
}

/// A participant joined with their account, alias already resolved.
pub struct ParticipantRow {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    /// Participant alias, or the username when the alias is empty.
    pub alias: String,
    pub wishlist: String,
    pub created_at: String,
}

pub struct RosterRow {
    pub alias: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    EventLocked,
    /// The user already belongs to the event with this code.
    InOtherEvent(String),
}

/// Membership row to create alongside a join.
pub struct NewMember<'a> {
    pub event_id: &'a str,
    pub participant_id: &'a str,
    pub alias: &'a str,
    pub wishlist: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    UsernameTaken,
    /// The account was not created because the join failed.
    NotJoined(JoinOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    NotMember,
    EventLocked,
}

/// Parse a stored timestamp: RFC 3339 as written by this crate, or SQLite's
/// `datetime('now')` form, which has no offset and is UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("invalid timestamp '{}'", raw))
}

impl TryFrom<&EventRow> for EventRecord {
    type Error = anyhow::Error;

    fn try_from(row: &EventRow) -> Result<Self> {
        Ok(EventRecord {
            id: row.id.parse().with_context(|| format!("corrupt event id '{}'", row.id))?,
            owner_id: row
                .owner_id
                .parse::<Uuid>()
                .with_context(|| format!("corrupt owner id on event '{}'", row.id))?,
            code: row.code.clone(),
            name: row.name.clone(),
            status: row
                .status
                .parse()
                .map_err(|e| anyhow!("event '{}': {}", row.id, e))?,
            reveal_mode: row
                .reveal_mode
                .parse()
                .map_err(|e| anyhow!("event '{}': {}", row.id, e))?,
            event_date: parse_timestamp(&row.event_date)?,
            allow_single: row.allow_single,
        })
    }
}
