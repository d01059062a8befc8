use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use santa_types::models::{EventStatus, RevealMode, Role};

use crate::clock::Clock;
use crate::error::EngineError;
use crate::pairing::{self, generate_pairings};
use crate::reveal::{Reveal, can_reveal};
use crate::store::{AssignmentLookup, EventRecord, EventStore, EventView};

/// Identity of whoever is asking, as established by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    fn require_organizer(&self) -> Result<(), EngineError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(EngineError::Forbidden)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerateOutcome {
    pub pairs: usize,
    pub singles: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOutcome {
    pub reveal_mode: RevealMode,
    pub sealed: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub event: EventRecord,
    pub participants: usize,
    pub pairs: usize,
    pub singles: usize,
}

/// Drives the draft/locked lifecycle of an event's assignment set and
/// answers reveal requests.
pub struct Engine<S, C> {
    store: S,
    clock: C,
}

impl<S: EventStore, C: Clock> Engine<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Replace the event's assignment set with a fresh draw over the current
    /// roster. Only allowed while the event is a draft.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        event_id: Uuid,
        caller: &Caller,
        rng: &mut R,
    ) -> Result<GenerateOutcome, EngineError> {
        caller.require_organizer()?;

        let outcome = self.store.write(|tx| {
            let event = owned_event(&*tx, event_id, caller)?;
            if event.status == EventStatus::Locked {
                return Err(EngineError::AlreadyLocked);
            }

            let roster = tx.roster(event_id)?;
            let discarded = tx.delete_assignments(event_id)?;
            let pairings = generate_pairings(&roster, event.allow_single, rng)?;
            tx.insert_assignments(event_id, &pairings)?;

            let (pairs, singles) = pairing::count(&pairings);
            if discarded > 0 {
                info!("Event {}: discarded {} previous assignments", event_id, discarded);
            }
            Ok(GenerateOutcome { pairs, singles })
        })?;

        info!(
            "Event {}: generated {} pairs, {} singles",
            event_id, outcome.pairs, outcome.singles
        );
        Ok(outcome)
    }

    /// Seal the current assignment set and lock the event.
    pub fn lock(&self, event_id: Uuid, caller: &Caller) -> Result<LockOutcome, EngineError> {
        caller.require_organizer()?;
        let now = self.clock.now();

        let outcome = self.store.write(|tx| {
            let event = owned_event(&*tx, event_id, caller)?;
            if event.status == EventStatus::Locked {
                return Err(EngineError::AlreadyLocked);
            }

            let counts = tx.assignment_counts(event_id)?;
            if counts.total() == 0 {
                return Err(EngineError::NotGenerated);
            }
            let roster = tx.roster(event_id)?;
            if counts.total() != roster.len() {
                warn!(
                    "Event {}: {} assignments for {} participants, refusing to lock",
                    event_id,
                    counts.total(),
                    roster.len()
                );
                return Err(EngineError::NotGenerated);
            }

            let sealed = tx.seal_assignments(event_id, now)?;
            tx.set_status(event_id, EventStatus::Locked)?;
            Ok(LockOutcome {
                reveal_mode: event.reveal_mode,
                sealed,
            })
        })?;

        info!("Event {} locked ({} assignments sealed)", event_id, outcome.sealed);
        Ok(outcome)
    }

    /// Discard the assignment set and return the event to draft.
    pub fn unlock(&self, event_id: Uuid, caller: &Caller) -> Result<(), EngineError> {
        caller.require_organizer()?;

        let removed = self.store.write(|tx| {
            let event = owned_event(&*tx, event_id, caller)?;
            if event.status == EventStatus::Draft {
                return Err(EngineError::NotLocked);
            }

            let removed = tx.delete_assignments(event_id)?;
            tx.set_status(event_id, EventStatus::Draft)?;
            Ok(removed)
        })?;

        info!("Event {} unlocked ({} assignments discarded)", event_id, removed);
        Ok(())
    }

    /// Organizer overview: roster size and assignment counts.
    pub fn summary(&self, event_id: Uuid, caller: &Caller) -> Result<EventSummary, EngineError> {
        caller.require_organizer()?;

        self.store.read(|view| {
            let event = owned_event(view, event_id, caller)?;
            let participants = view.roster(event_id)?.len();
            let counts = view.assignment_counts(event_id)?;
            Ok(EventSummary {
                event,
                participants,
                pairs: counts.pairs,
                singles: counts.singles,
            })
        })
    }

    /// Reveal request from the participant belonging to `user_id`.
    ///
    /// Nothing about the assignment is looked up unless the reveal policy
    /// allows disclosure at this instant.
    pub fn my_assignment(&self, event_id: Uuid, user_id: Uuid) -> Result<Reveal, EngineError> {
        let now = self.clock.now();

        self.store.read(|view| {
            let event = view.event(event_id)?.ok_or(EngineError::NotFound)?;
            let giver = view
                .participant_of(event_id, user_id)?
                .ok_or(EngineError::Forbidden)?;

            if !can_reveal(event.reveal_mode, event.status, event.event_date, now) {
                return Ok(Reveal::hidden());
            }

            let receiver = match view.assignment_of(event_id, giver)? {
                AssignmentLookup::Receiver(profile) => Some(profile),
                AssignmentLookup::Singleton | AssignmentLookup::Missing => None,
            };
            Ok(Reveal {
                can_reveal: true,
                receiver,
            })
        })
    }
}

fn owned_event<V: EventView + ?Sized>(
    view: &V,
    event_id: Uuid,
    caller: &Caller,
) -> Result<EventRecord, EngineError> {
    let event = view.event(event_id)?.ok_or(EngineError::NotFound)?;
    if event.owner_id != caller.user_id {
        return Err(EngineError::Forbidden);
    }
    Ok(event)
}
