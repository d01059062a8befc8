use rand::Rng;
use rand::seq::SliceRandom;

use crate::error::EngineError;

/// One giver and the participant they buy for. `receiver` is `None` for the
/// singleton that absorbs an odd roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing<T> {
    pub giver: T,
    pub receiver: Option<T>,
}

impl<T> Pairing<T> {
    pub fn new(giver: T, receiver: T) -> Self {
        Self {
            giver,
            receiver: Some(receiver),
        }
    }

    pub fn singleton(giver: T) -> Self {
        Self {
            giver,
            receiver: None,
        }
    }

    pub fn is_singleton(&self) -> bool {
        self.receiver.is_none()
    }
}

/// Number of givers that end up in the cycle for a roster of `n`.
///
/// Odd rosters need `allow_single` to drop one participant as a singleton;
/// without it they are rejected rather than forced into an uneven exchange.
pub fn usable_len(n: usize, allow_single: bool) -> Result<usize, EngineError> {
    match n {
        0 => Err(EngineError::NoParticipants),
        1 if allow_single => Ok(0),
        1 => Err(EngineError::InsufficientParticipants),
        n if n % 2 == 0 => Ok(n),
        n if allow_single => Ok(n - 1),
        _ => Err(EngineError::InsufficientParticipants),
    }
}

/// Draw a fresh assignment set for `roster`.
///
/// The roster is shuffled uniformly and every giver buys for the next entry
/// of the shuffled list, wrapping around. That is a single cycle of length
/// `usable_len`, so nobody is ever their own receiver. If the roster is odd
/// and singles are allowed, the last shuffled entry becomes the singleton.
///
/// Each call gives a different mapping; callers replace the previous set
/// wholesale.
pub fn generate_pairings<T, R>(
    roster: &[T],
    allow_single: bool,
    rng: &mut R,
) -> Result<Vec<Pairing<T>>, EngineError>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let usable = usable_len(roster.len(), allow_single)?;

    let mut shuffled = roster.to_vec();
    shuffled.shuffle(rng);

    let mut pairings: Vec<Pairing<T>> = shuffled[..usable]
        .iter()
        .enumerate()
        .map(|(i, giver)| Pairing::new(giver.clone(), shuffled[(i + 1) % usable].clone()))
        .collect();

    if let Some(single) = shuffled.get(usable) {
        pairings.push(Pairing::singleton(single.clone()));
    }

    Ok(pairings)
}

/// (pairs, singles) of an assignment set.
pub fn count<T>(pairings: &[Pairing<T>]) -> (usize, usize) {
    let singles = pairings.iter().filter(|p| p.is_singleton()).count();
    (pairings.len() - singles, singles)
}
