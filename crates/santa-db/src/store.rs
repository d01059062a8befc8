use anyhow::{Context, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};
use uuid::Uuid;

use santa_engine::store::{AssignmentCounts, AssignmentLookup, EventRecord, EventStore, EventTxn, EventView, ReceiverProfile};
use santa_engine::{EngineError, Pairing};
use santa_types::models::EventStatus;

use crate::Database;
use crate::queries::{OptionalExt, query_event};

/// Engine view over one SQLite connection, usually inside a transaction.
struct SqlEvents<'a> {
    conn: &'a Connection,
}

impl EventView for SqlEvents<'_> {
    fn event(&self, event_id: Uuid) -> anyhow::Result<Option<EventRecord>> {
        query_event(self.conn, "id", &event_id.to_string())?
            .as_ref()
            .map(|row| EventRecord::try_from(row))
            .transpose()
    }

    fn roster(&self, event_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        let mut stmt = self.conn.prepare(
            "SELECT id FROM participants WHERE event_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )?;
        let ids = stmt
            .query_map([event_id.to_string()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.iter()
            .map(|id| id.parse::<Uuid>().with_context(|| format!("corrupt participant id '{}'", id)))
            .collect()
    }

    fn assignment_counts(&self, event_id: Uuid) -> anyhow::Result<AssignmentCounts> {
        let (pairs, singles): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(receiver_id), COUNT(*) - COUNT(receiver_id)
             FROM assignments WHERE event_id = ?1",
            [event_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(AssignmentCounts {
            pairs: pairs as usize,
            singles: singles as usize,
        })
    }

    fn participant_of(&self, event_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        let id: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM participants WHERE event_id = ?1 AND user_id = ?2",
                [event_id.to_string(), user_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        id.map(|id| id.parse::<Uuid>().with_context(|| format!("corrupt participant id '{}'", id)))
            .transpose()
    }

    fn assignment_of(&self, event_id: Uuid, giver_id: Uuid) -> anyhow::Result<AssignmentLookup> {
        let row: Option<(Option<String>, Option<String>, Option<String>)> = self
            .conn
            .query_row(
                "SELECT a.receiver_id, COALESCE(NULLIF(p.alias, ''), u.username), p.wishlist
                 FROM assignments a
                 LEFT JOIN participants p ON p.id = a.receiver_id
                 LEFT JOIN users u ON u.id = p.user_id
                 WHERE a.event_id = ?1 AND a.giver_id = ?2",
                [event_id.to_string(), giver_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        Ok(match row {
            None => AssignmentLookup::Missing,
            Some((None, _, _)) => AssignmentLookup::Singleton,
            Some((Some(receiver), alias, wishlist)) => {
                let alias = alias.ok_or_else(|| anyhow!("receiver '{}' has no participant row", receiver))?;
                AssignmentLookup::Receiver(ReceiverProfile {
                    alias,
                    wishlist: wishlist.unwrap_or_default(),
                })
            }
        })
    }
}

impl EventTxn for SqlEvents<'_> {
    fn delete_assignments(&mut self, event_id: Uuid) -> anyhow::Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM assignments WHERE event_id = ?1", [event_id.to_string()])?)
    }

    fn insert_assignments(&mut self, event_id: Uuid, pairings: &[Pairing<Uuid>]) -> anyhow::Result<()> {
        let mut stmt = self
            .conn
            .prepare("INSERT INTO assignments (event_id, giver_id, receiver_id) VALUES (?1, ?2, ?3)")?;
        let event_id = event_id.to_string();
        for p in pairings {
            stmt.execute(rusqlite::params![
                event_id,
                p.giver.to_string(),
                p.receiver.map(|r| r.to_string()),
            ])?;
        }
        Ok(())
    }

    fn seal_assignments(&mut self, event_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<usize> {
        Ok(self.conn.execute(
            "UPDATE assignments SET sealed_at = ?1 WHERE event_id = ?2 AND sealed_at IS NULL",
            [at.to_rfc3339(), event_id.to_string()],
        )?)
    }

    fn set_status(&mut self, event_id: Uuid, status: EventStatus) -> anyhow::Result<()> {
        let updated = self.conn.execute(
            "UPDATE events SET status = ?1 WHERE id = ?2",
            [status.as_str().to_string(), event_id.to_string()],
        )?;
        if updated != 1 {
            return Err(anyhow!("event {} vanished during transition", event_id));
        }
        Ok(())
    }
}

impl EventStore for Database {
    fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn EventView) -> Result<T, EngineError>,
    {
        self.with_conn(|conn| {
            // One read transaction, so a concurrent transition is seen
            // entirely or not at all.
            let tx = conn.unchecked_transaction()?;
            Ok(f(&SqlEvents { conn: &tx }))
        })?
    }

    fn write<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut dyn EventTxn) -> Result<T, EngineError>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let result = f(&mut SqlEvents { conn: &tx });
            // Dropping an uncommitted transaction rolls it back.
            if result.is_ok() {
                tx.commit()?;
            }
            Ok(result)
        })?
    }
}
