use chrono::{DateTime, Utc};

use santa_types::models::{EventStatus, RevealMode};

use crate::store::ReceiverProfile;

/// Whether a participant may learn their receiver right now.
///
/// Evaluated on every read; `now` moves independently of any write, so the
/// answer is never cached.
pub fn can_reveal(
    reveal_mode: RevealMode,
    status: EventStatus,
    event_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> bool {
    match reveal_mode {
        RevealMode::OnLock => status == EventStatus::Locked,
        RevealMode::OnDate => now >= event_date,
    }
}

/// Outcome of a participant's reveal request.
///
/// `receiver` is only ever filled when `can_reveal` holds. A singleton, or a
/// giver whose set was discarded, sees `can_reveal` with no receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reveal {
    pub can_reveal: bool,
    pub receiver: Option<ReceiverProfile>,
}

impl Reveal {
    pub fn hidden() -> Self {
        Self {
            can_reveal: false,
            receiver: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 12, 24, 18, 0, 0).unwrap()
    }

    #[test]
    fn on_date_waits_for_the_date() {
        let d = date();
        for status in [EventStatus::Draft, EventStatus::Locked] {
            assert!(!can_reveal(RevealMode::OnDate, status, d, d - Duration::seconds(1)));
            assert!(can_reveal(RevealMode::OnDate, status, d, d));
            assert!(can_reveal(RevealMode::OnDate, status, d, d + Duration::days(3)));
        }
    }

    #[test]
    fn on_lock_ignores_the_clock() {
        let d = date();
        for now in [d - Duration::days(30), d, d + Duration::days(30)] {
            assert!(can_reveal(RevealMode::OnLock, EventStatus::Locked, d, now));
            assert!(!can_reveal(RevealMode::OnLock, EventStatus::Draft, d, now));
        }
    }
}
