use chrono::{DateTime, Utc};
use uuid::Uuid;

use santa_types::models::{EventStatus, RevealMode};

use crate::error::EngineError;
use crate::pairing::Pairing;

/// The event fields the engine reads.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub code: String,
    pub name: String,
    pub status: EventStatus,
    pub reveal_mode: RevealMode,
    pub event_date: DateTime<Utc>,
    pub allow_single: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignmentCounts {
    pub pairs: usize,
    pub singles: usize,
}

impl AssignmentCounts {
    pub fn total(&self) -> usize {
        self.pairs + self.singles
    }
}

/// Public profile of a receiver, as shown to their giver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverProfile {
    pub alias: String,
    pub wishlist: String,
}

/// What the assignment table holds for one giver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentLookup {
    Missing,
    Singleton,
    Receiver(ReceiverProfile),
}

/// Read access to one consistent snapshot of the store.
pub trait EventView {
    fn event(&self, event_id: Uuid) -> anyhow::Result<Option<EventRecord>>;

    /// Participant ids in join order.
    fn roster(&self, event_id: Uuid) -> anyhow::Result<Vec<Uuid>>;

    fn assignment_counts(&self, event_id: Uuid) -> anyhow::Result<AssignmentCounts>;

    fn participant_of(&self, event_id: Uuid, user_id: Uuid) -> anyhow::Result<Option<Uuid>>;

    fn assignment_of(&self, event_id: Uuid, giver_id: Uuid) -> anyhow::Result<AssignmentLookup>;
}

/// Mutations available inside a write transaction.
pub trait EventTxn: EventView {
    fn delete_assignments(&mut self, event_id: Uuid) -> anyhow::Result<usize>;

    fn insert_assignments(&mut self, event_id: Uuid, pairings: &[Pairing<Uuid>]) -> anyhow::Result<()>;

    /// Stamps `sealed_at` on every unsealed row; returns the rows touched.
    fn seal_assignments(&mut self, event_id: Uuid, at: DateTime<Utc>) -> anyhow::Result<usize>;

    fn set_status(&mut self, event_id: Uuid, status: EventStatus) -> anyhow::Result<()>;
}

/// Persistence seam for the engine.
///
/// `write` must run `f` as one exclusive transaction: all of its mutations
/// commit when it returns `Ok`, none of them do when it returns `Err`, and no
/// other writer interleaves. `read` must hand `f` a view no writer can tear.
pub trait EventStore {
    fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn EventView) -> Result<T, EngineError>;

    fn write<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut dyn EventTxn) -> Result<T, EngineError>;
}

impl<S: EventStore + ?Sized> EventStore for &S {
    fn read<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&dyn EventView) -> Result<T, EngineError>,
    {
        (**self).read(f)
    }

    fn write<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut dyn EventTxn) -> Result<T, EngineError>,
    {
        (**self).write(f)
    }
}
