use crate::Database;
use crate::models::{
    EventRow, JoinOutcome, LeaveOutcome, NewEvent, NewMember, ParticipantRow, RegisterOutcome, RosterRow, UserRow,
};
use anyhow::Result;
use rusqlite::{Connection, Row};
use santa_types::models::Role;
use tracing::info;

const EVENT_COLUMNS: &str =
    "id, owner_id, code, name, event_date, budget_max, allow_single, reveal_mode, status, created_at";

impl Database {
    // -- Users --

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    #[cfg(test)]
    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, username, password, role, created_at FROM users WHERE id = ?1")?;
            stmt.query_row([id], map_user).optional()
        })
    }

    /// Create an admin account, or promote an existing user and reset their
    /// password. Returns `true` when a new account was created.
    pub fn upsert_admin(&self, id: &str, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE users SET password = ?1, role = 'admin' WHERE username = ?2",
                (password_hash, username),
            )?;
            if updated > 0 {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO users (id, username, password, role) VALUES (?1, ?2, ?3, 'admin')",
                (id, username, password_hash),
            )?;
            Ok(true)
        })
    }

    // -- Events --

    /// Returns `false` when the join code is already in use.
    pub fn create_event(&self, event: &NewEvent<'_>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let taken: Option<String> = conn
                .query_row("SELECT id FROM events WHERE code = ?1", [event.code], |row| row.get(0))
                .optional()?;
            if taken.is_some() {
                return Ok(false);
            }

            conn.execute(
                "INSERT INTO events (id, owner_id, code, name, event_date, budget_max, allow_single, reveal_mode, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'draft')",
                rusqlite::params![
                    event.id,
                    event.owner_id,
                    event.code,
                    event.name,
                    event.event_date.to_rfc3339(),
                    event.budget_max,
                    event.allow_single,
                    event.reveal_mode,
                ],
            )?;
            info!("Event {} created with code {}", event.id, event.code);
            Ok(true)
        })
    }

    pub fn get_event(&self, id: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, "id", id))
    }

    pub fn get_event_by_code(&self, code: &str) -> Result<Option<EventRow>> {
        self.with_conn(|conn| query_event(conn, "code", code))
    }

    pub fn list_events_by_owner(&self, owner_id: &str) -> Result<Vec<EventRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM events WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
                EVENT_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([owner_id], map_event)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Participants --

    /// Join an event. A user belongs to at most one event at a time, and a
    /// locked event accepts nobody. Joining a draft discards its assignment
    /// set, which no longer covers the roster.
    pub fn join_event(
        &self,
        event_id: &str,
        user_id: &str,
        participant_id: &str,
        alias: &str,
        wishlist: &str,
    ) -> Result<JoinOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let member = NewMember {
                event_id,
                participant_id,
                alias,
                wishlist,
            };
            let outcome = join_in(&tx, user_id, &member)?;
            if outcome == JoinOutcome::Joined {
                tx.commit()?;
            }
            Ok(outcome)
        })
    }

    /// Create a `user` account and, when `member` is given, join it to that
    /// event in the same transaction. Nothing is written unless both succeed.
    pub fn register_user(
        &self,
        id: &str,
        username: &str,
        password_hash: &str,
        member: Option<&NewMember<'_>>,
    ) -> Result<RegisterOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

            if query_user_by_username(&tx, username)?.is_some() {
                return Ok(RegisterOutcome::UsernameTaken);
            }
            tx.execute(
                "INSERT INTO users (id, username, password, role) VALUES (?1, ?2, ?3, ?4)",
                (id, username, password_hash, Role::User.as_str()),
            )?;

            if let Some(member) = member {
                let outcome = join_in(&tx, id, member)?;
                if outcome != JoinOutcome::Joined {
                    return Ok(RegisterOutcome::NotJoined(outcome));
                }
            }

            tx.commit()?;
            Ok(RegisterOutcome::Registered)
        })
    }

    pub fn leave_event(&self, event_id: &str, user_id: &str) -> Result<LeaveOutcome> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

            let status: Option<String> = tx
                .query_row("SELECT status FROM events WHERE id = ?1", [event_id], |row| row.get(0))
                .optional()?;
            if status.as_deref() == Some("locked") {
                return Ok(LeaveOutcome::EventLocked);
            }

            let removed = tx.execute(
                "DELETE FROM participants WHERE event_id = ?1 AND user_id = ?2",
                [event_id, user_id],
            )?;
            if removed == 0 {
                return Ok(LeaveOutcome::NotMember);
            }
            let discarded = tx.execute("DELETE FROM assignments WHERE event_id = ?1", [event_id])?;
            tx.commit()?;

            if discarded > 0 {
                info!("Event {}: roster changed, {} draft assignments discarded", event_id, discarded);
            }
            Ok(LeaveOutcome::Left)
        })
    }

    pub fn get_participant(&self, event_id: &str, user_id: &str) -> Result<Option<ParticipantRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.event_id, p.user_id, COALESCE(NULLIF(p.alias, ''), u.username),
                        p.wishlist, p.created_at
                 FROM participants p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.event_id = ?1 AND p.user_id = ?2",
            )?;
            stmt.query_row([event_id, user_id], |row| {
                Ok(ParticipantRow {
                    id: row.get(0)?,
                    event_id: row.get(1)?,
                    user_id: row.get(2)?,
                    alias: row.get(3)?,
                    wishlist: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .optional()
        })
    }

    pub fn update_profile(&self, participant_id: &str, alias: &str, wishlist: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE participants SET alias = ?1, wishlist = ?2 WHERE id = ?3",
                (alias, wishlist, participant_id),
            )?;
            Ok(())
        })
    }

    /// Display aliases in join order.
    pub fn get_roster(&self, event_id: &str) -> Result<Vec<RosterRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT COALESCE(NULLIF(p.alias, ''), u.username), p.created_at
                 FROM participants p
                 JOIN users u ON u.id = p.user_id
                 WHERE p.event_id = ?1
                 ORDER BY p.created_at ASC, p.rowid ASC",
            )?;
            let rows = stmt
                .query_map([event_id], |row| {
                    Ok(RosterRow {
                        alias: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        role: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn map_event(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        code: row.get(2)?,
        name: row.get(3)?,
        event_date: row.get(4)?,
        budget_max: row.get(5)?,
        allow_single: row.get(6)?,
        reveal_mode: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Membership checks and insert for `join_event` and `register_user`.
/// Writes only when the outcome is `Joined`; the caller owns the commit.
fn join_in(conn: &Connection, user_id: &str, member: &NewMember<'_>) -> Result<JoinOutcome> {
    let event_id = member.event_id;
    let status: Option<String> = conn
        .query_row("SELECT status FROM events WHERE id = ?1", [event_id], |row| row.get(0))
        .optional()?;
    if status.as_deref() != Some("draft") {
        return Ok(JoinOutcome::EventLocked);
    }

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM participants WHERE event_id = ?1 AND user_id = ?2",
            [event_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(JoinOutcome::AlreadyMember);
    }

    let other: Option<String> = conn
        .query_row(
            "SELECT e.code FROM participants p
             JOIN events e ON e.id = p.event_id
             WHERE p.user_id = ?1 AND p.event_id <> ?2
             LIMIT 1",
            [user_id, event_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(code) = other {
        return Ok(JoinOutcome::InOtherEvent(code));
    }

    conn.execute(
        "INSERT INTO participants (id, event_id, user_id, alias, wishlist) VALUES (?1, ?2, ?3, ?4, ?5)",
        (member.participant_id, event_id, user_id, member.alias, member.wishlist),
    )?;
    let discarded = conn.execute("DELETE FROM assignments WHERE event_id = ?1", [event_id])?;
    if discarded > 0 {
        info!("Event {}: roster changed, {} draft assignments discarded", event_id, discarded);
    }
    Ok(JoinOutcome::Joined)
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, role, created_at FROM users WHERE username = ?1")?;
    stmt.query_row([username], map_user).optional()
}

/// `column` is always a literal from this crate, never caller input.
pub(crate) fn query_event(conn: &Connection, column: &str, value: &str) -> Result<Option<EventRow>> {
    let sql = format!("SELECT {} FROM events WHERE {} = ?1", EVENT_COLUMNS, column);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], map_event).optional()
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn user(db: &Database, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        assert_eq!(db.register_user(&id, name, "hash", None).unwrap(), RegisterOutcome::Registered);
        id
    }

    fn event(db: &Database, owner: &str, code: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let created = db
            .create_event(&NewEvent {
                id: &id,
                owner_id: owner,
                code,
                name: "Holiday swap",
                event_date: Utc.with_ymd_and_hms(2026, 12, 20, 19, 0, 0).unwrap(),
                budget_max: 25,
                allow_single: false,
                reveal_mode: "on_lock",
            })
            .unwrap();
        assert!(created);
        id
    }

    fn join(db: &Database, event_id: &str, user_id: &str, alias: &str) -> JoinOutcome {
        db.join_event(event_id, user_id, &Uuid::new_v4().to_string(), alias, "")
            .unwrap()
    }

    #[test]
    fn usernames_and_codes_are_unique() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        assert_eq!(
            db.register_user("x", "organizer", "hash", None).unwrap(),
            RegisterOutcome::UsernameTaken
        );

        event(&db, &owner, "XMAS26");
        let again = db
            .create_event(&NewEvent {
                id: "other",
                owner_id: &owner,
                code: "XMAS26",
                name: "Duplicate",
                event_date: Utc::now(),
                budget_max: 0,
                allow_single: false,
                reveal_mode: "on_date",
            })
            .unwrap();
        assert!(!again);
    }

    #[test]
    fn upsert_admin_promotes_existing_user() {
        let db = Database::open_in_memory().unwrap();
        let id = user(&db, "carol");
        assert!(!db.upsert_admin("ignored", "carol", "new-hash").unwrap());
        let row = db.get_user_by_id(&id).unwrap().unwrap();
        assert_eq!(row.role, "admin");
        assert_eq!(row.password, "new-hash");

        assert!(db.upsert_admin(&Uuid::new_v4().to_string(), "dave", "h").unwrap());
    }

    #[test]
    fn join_rules() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        let first = event(&db, &owner, "FIRST");
        let second = event(&db, &owner, "SECOND");
        let alice = user(&db, "alice");

        assert_eq!(join(&db, &first, &alice, ""), JoinOutcome::Joined);
        assert_eq!(join(&db, &first, &alice, ""), JoinOutcome::AlreadyMember);
        assert_eq!(
            join(&db, &second, &alice, ""),
            JoinOutcome::InOtherEvent("FIRST".into())
        );

        let me = db.get_participant(&first, &alice).unwrap().unwrap();
        assert_eq!(me.alias, "alice");

        db.with_conn_mut(|conn| {
            conn.execute("UPDATE events SET status = 'locked' WHERE id = ?1", [&second])?;
            Ok(())
        })
        .unwrap();
        let bob = user(&db, "bob");
        assert_eq!(join(&db, &second, &bob, ""), JoinOutcome::EventLocked);
        assert_eq!(db.leave_event(&second, &bob).unwrap(), LeaveOutcome::EventLocked);
    }

    #[test]
    fn register_into_locked_event_leaves_no_account() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        let ev = event(&db, &owner, "SEALED");
        db.with_conn_mut(|conn| {
            conn.execute("UPDATE events SET status = 'locked' WHERE id = ?1", [&ev])?;
            Ok(())
        })
        .unwrap();

        let member = NewMember {
            event_id: &ev,
            participant_id: "p-1",
            alias: "",
            wishlist: "",
        };
        let outcome = db.register_user("u-1", "late", "hash", Some(&member)).unwrap();
        assert_eq!(outcome, RegisterOutcome::NotJoined(JoinOutcome::EventLocked));
        assert!(db.get_user_by_username("late").unwrap().is_none());
        assert!(db.get_roster(&ev).unwrap().is_empty());

        // The name is still free for a retry without the code.
        assert_eq!(
            db.register_user("u-2", "late", "hash", None).unwrap(),
            RegisterOutcome::Registered
        );
        assert_eq!(
            db.register_user("u-3", "late", "hash", None).unwrap(),
            RegisterOutcome::UsernameTaken
        );
    }

    #[test]
    fn register_with_code_joins_atomically() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        let ev = event(&db, &owner, "OPEN");

        let member = NewMember {
            event_id: &ev,
            participant_id: "p-1",
            alias: "Rudy",
            wishlist: "carrots",
        };
        assert_eq!(
            db.register_user("u-1", "rudolph", "hash", Some(&member)).unwrap(),
            RegisterOutcome::Registered
        );
        let me = db.get_participant(&ev, "u-1").unwrap().unwrap();
        assert_eq!((me.alias.as_str(), me.wishlist.as_str()), ("Rudy", "carrots"));
        assert_eq!(db.get_user_by_id("u-1").unwrap().unwrap().role, "user");
    }

    #[test]
    fn leave_and_roster_order() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        let ev = event(&db, &owner, "ROSTER");
        let ids: Vec<String> = ["ann", "ben", "cid"].iter().map(|n| user(&db, n)).collect();
        for (id, alias) in ids.iter().zip(["Annie", "", "C"]) {
            join(&db, &ev, id, alias);
        }

        let roster: Vec<String> = db.get_roster(&ev).unwrap().into_iter().map(|r| r.alias).collect();
        assert_eq!(roster, vec!["Annie", "ben", "C"]);

        assert_eq!(db.leave_event(&ev, &ids[1]).unwrap(), LeaveOutcome::Left);
        assert_eq!(db.leave_event(&ev, &ids[1]).unwrap(), LeaveOutcome::NotMember);
        assert_eq!(db.get_roster(&ev).unwrap().len(), 2);
    }

    #[test]
    fn profile_update_changes_alias() {
        let db = Database::open_in_memory().unwrap();
        let owner = user(&db, "organizer");
        let ev = event(&db, &owner, "PROFILE");
        let eve = user(&db, "eve");
        join(&db, &ev, &eve, "");

        let me = db.get_participant(&ev, &eve).unwrap().unwrap();
        db.update_profile(&me.id, "Evie", "books, socks").unwrap();
        let me = db.get_participant(&ev, &eve).unwrap().unwrap();
        assert_eq!(me.alias, "Evie");
        assert_eq!(me.wishlist, "books, socks");

        db.update_profile(&me.id, "", "books").unwrap();
        assert_eq!(db.get_participant(&ev, &eve).unwrap().unwrap().alias, "eve");
    }
}
