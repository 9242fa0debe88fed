use thiserror::Error;

use crate::model::Position;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid horizon {0}: must cover at least one round")]
    InvalidHorizon(u8),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Squad(#[from] SquadError),
}

/// Rejections for squad edits and for operations that need a legal squad.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SquadError {
    #[error("player {0} is not in the player table")]
    UnknownPlayer(u32),

    #[error("player {0} is already in the squad")]
    Duplicate(u32),

    #[error("player {0} is not in the squad")]
    NotInSquad(u32),

    #[error("squad already holds {0} players")]
    Full(usize),

    #[error("{position} quota of {limit} already filled")]
    QuotaExceeded { position: Position, limit: usize },

    #[error("club {club_id} already has {limit} players")]
    ClubLimit { club_id: u32, limit: usize },

    #[error("squad not legal: {reason}")]
    NotLegal { reason: String },
}
