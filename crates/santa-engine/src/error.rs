use thiserror::Error;

/// Failure of an engine operation. Every variant except `Storage` is a
/// user-facing condition.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("caller lacks authority over this event")]
    Forbidden,

    #[error("event or participant not found")]
    NotFound,

    #[error("the event has no participants")]
    NoParticipants,

    #[error("not enough participants for the singleton policy")]
    InsufficientParticipants,

    #[error("assignments have not been generated for the current roster")]
    NotGenerated,

    #[error("the event is already locked")]
    AlreadyLocked,

    #[error("the event is not locked")]
    NotLocked,

    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl EngineError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::NoParticipants => "no_participants",
            Self::InsufficientParticipants => "insufficient_participants",
            Self::NotGenerated => "not_generated",
            Self::AlreadyLocked => "already_locked",
            Self::NotLocked => "not_locked",
            Self::Storage(_) => "storage",
        }
    }
}
