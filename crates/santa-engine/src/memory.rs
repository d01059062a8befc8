//! In-memory `EventStore` for engine tests. Writes run on a copy of the state
//! that only replaces the original when the closure succeeds.

use std::sync::Mutex;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use santa_types::models::{EventStatus, RevealMode};

use crate::error::EngineError;
use crate::pairing::Pairing;
use crate::store::{
    AssignmentCounts, AssignmentLookup, EventRecord, EventStore, EventTxn, EventView, ReceiverProfile,
};

#[derive(Debug, Clone)]
pub struct MemParticipant {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub alias: String,
    pub wishlist: String,
}

#[derive(Debug, Clone)]
pub struct MemAssignment {
    pub event_id: Uuid,
    pub giver: Uuid,
    pub receiver: Option<Uuid>,
    pub sealed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct MemState {
    pub events: Vec<EventRecord>,
    pub participants: Vec<MemParticipant>,
    pub assignments: Vec<MemAssignment>,
    /// Makes `insert_assignments` fail, to exercise rollback.
    pub fail_inserts: bool,
}

#[derive(Default)]
pub struct MemStore {
    pub state: Mutex<MemState>,
}

impl MemStore {
    pub fn add_event(&self, owner_id: Uuid, reveal_mode: RevealMode, allow_single: bool, event_date: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().events.push(EventRecord {
            id,
            owner_id,
            code: id.simple().to_string()[..8].to_string(),
            name: "Office party".into(),
            status: EventStatus::Draft,
            reveal_mode,
            event_date,
            allow_single,
        });
        id
    }

    /// Adds a participant and returns (participant id, user id).
    pub fn join(&self, event_id: Uuid, alias: &str) -> (Uuid, Uuid) {
        let p = MemParticipant {
            id: Uuid::new_v4(),
            event_id,
            user_id: Uuid::new_v4(),
            alias: alias.into(),
            wishlist: format!("{alias}'s wishlist"),
        };
        let ids = (p.id, p.user_id);
        self.state.lock().unwrap().participants.push(p);
        ids
    }

    pub fn snapshot(&self) -> MemState {
        self.state.lock().unwrap().clone()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        self.state.lock().unwrap().fail_inserts = fail;
    }
}

impl EventView for MemState {
    fn event(&self, event_id: Uuid) -> anyhow::Result<Option<EventRecord>> {
        Ok(self.events.iter().find(|e| e.id == event_id).cloned())
    }

    fn roster(&self, event_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
        Ok(self
            .participants
            .iter()
            .filter(|p| p.event_id == event_id)
            .map(|p| p.id)
            .collect())
    }

    fn assignment_counts(&self, event_id: Uuid) -> anyhow::Result<AssignmentCounts> {
        let mut counts = AssignmentCounts::default();
        for a in self.assignments.iter().filter(|a| a.event_id == event_id) {
            if a.receiver.is_some() {
                counts.pairs += 1;
            } else {
                counts.singles += 1;
            }
        }
        Ok(counts)
    }

    fn participant_of(&self, event_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Uuid>> {
        Ok(self
            .participants
            .iter()
            .find(|p| p.event_id == event_id && p.user_id == user_id)
            .map(|p| p.id))
    }

    fn assignment_of(&self, event_id: Uuid, giver_id: Uuid) -> anyhow::Result<AssignmentLookup> {
        let Some(row) = self
            .assignments
            .iter()
            .find(|a| a.event_id == event_id && a.giver == giver_id)
        else {
            return Ok(AssignmentLookup::Missing);
        };
        let Some(receiver) = row.receiver else {
            return Ok(AssignmentLookup::Singleton);
        };
        let p = self
            .participants
            .iter()
            .find(|p| p.id == receiver)
            .ok_or_else(|| anyhow!("dangling receiver {receiver}"))?;
        Ok(AssignmentLookup::Receiver(ReceiverProfile {
            alias: p.alias.clone(),
            wishlist: p.wishlist.clone(),
        }))
    }
}

impl EventTxn for MemState {
    fn delete_assignments(&mut self, event_id: Uuid) -> anyhow::Result<usize> {
        let before = self.assignments.len();
        self.assignments.retain(|a| a.event_id != event_id);
        Ok(before - self.assignments.len())
    }

    fn insert_assignments(&mut self, event_id: Uuid, pairings: &[Pairing<Uuid>]) -> anyhow::Result<()> {
        if self.fail_inserts {
            return Err(anyhow!("disk I/O error"));
        }
        self.assignments.extend(pairings.iter().map(|p| MemAssignment {
            event_id,
            giver: p.giver,
            receiver: p.receiver,
            sealed_at: None,
        }));
        Ok(())
    }

    fn seal_assignments(&mut self, event_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<usize> {
        let mut sealed = 0;
        for a in self
            .assignments
            .iter_mut()
            .filter(|a| a.event_id == event_id && a.sealed_at.is_none())
        {
            a.sealed_at = Some(at);
            sealed += 1;
        }
        Ok(sealed)
    }

    fn set_status(&mut self, event_id: Uuid, status: EventStatus) -> anyhow::Result<()> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(|| anyhow!("event {event_id} vanished"))?;
        event.status = status;
        Ok(())
    }
}

impl EventStore for MemStore {
    fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn EventView) -> Result<T, EngineError>,
    {
        let state = self.state.lock().map_err(|e| anyhow!("state lock poisoned: {}", e))?;
        f(&*state)
    }

    fn write<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut dyn EventTxn) -> Result<T, EngineError>,
    {
        let mut state = self.state.lock().map_err(|e| anyhow!("state lock poisoned: {}", e))?;
        let mut working = state.clone();
        let out = f(&mut working)?;
        *state = working;
        Ok(out)
    }
}
