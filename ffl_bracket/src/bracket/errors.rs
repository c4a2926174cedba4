//! Bracket error types.

use std::time::Duration;
use thiserror::Error;

use super::models::{CompetitorId, MatchupId, Round, TournamentId};
use crate::db::timeouts::TimeoutError;

/// Broad classification of a [`BracketError`], used by callers to decide
/// how to react (HTTP status, retry, alerting).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation is not valid for the current bracket state
    Precondition,
    /// Operation may succeed once more scores are in
    NotReady,
    /// Caller supplied malformed data
    Data,
    NotFound,
    /// Internal consistency check failed
    Invariant,
    Storage,
}

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Field too small to run a playoff
    #[error("Invalid field size: {0} competitors, at least 2 required")]
    InvalidFieldSize(usize),

    #[error("Duplicate competitor: {0}")]
    DuplicateCompetitor(CompetitorId),

    #[error("Bracket has already been generated")]
    AlreadyGenerated,

    #[error("Bracket has not been generated")]
    NotGenerated,

    #[error("Bracket already exists for tournament {0}")]
    BracketAlreadyExists(TournamentId),

    #[error("Bracket not found for tournament {0}")]
    BracketNotFound(TournamentId),

    #[error("Competitor not found: {0}")]
    CompetitorNotFound(CompetitorId),

    /// Competitor is eliminated or has no matchup in the round
    #[error("Competitor {competitor} is not playing in {round}")]
    PlayerNotInRound { competitor: CompetitorId, round: Round },

    #[error("Matchup not found: {0}")]
    MatchupNotFound(MatchupId),

    #[error("Matchup {0} is already resolved")]
    AlreadyResolved(MatchupId),

    #[error("Matchup is not tied")]
    NotTied,

    #[error("Both scores must be reported before the matchup can be decided")]
    ScoresIncomplete,

    #[error("Cannot process {round}: {unresolved} matchup(s) still waiting for scores")]
    RoundNotReady { round: Round, unresolved: usize },

    #[error("{0} has not started")]
    RoundNotStarted(Round),

    #[error("Invalid score: {0}")]
    InvalidScore(String),

    #[error("Invalid tiebreaker configuration: {0}")]
    InvalidTiebreaker(String),

    #[error("Bracket invariant violated: {0}")]
    InvariantViolation(String),

    /// Another writer saved the bracket first
    #[error("Version conflict on tournament {tournament}: expected version {expected}")]
    VersionConflict {
        tournament: TournamentId,
        expected: u64,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BracketError {
    /// Build an [`BracketError::InvariantViolation`] and log it.
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        log::error!("Bracket invariant violated: {msg}");
        BracketError::InvariantViolation(msg)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BracketError::InvalidFieldSize(_)
            | BracketError::DuplicateCompetitor(_)
            | BracketError::AlreadyGenerated
            | BracketError::NotGenerated
            | BracketError::BracketAlreadyExists(_)
            | BracketError::PlayerNotInRound { .. }
            | BracketError::AlreadyResolved(_)
            | BracketError::NotTied
            | BracketError::RoundNotStarted(_) => ErrorKind::Precondition,
            BracketError::ScoresIncomplete | BracketError::RoundNotReady { .. } => {
                ErrorKind::NotReady
            }
            BracketError::InvalidScore(_) | BracketError::InvalidTiebreaker(_) => ErrorKind::Data,
            BracketError::BracketNotFound(_)
            | BracketError::CompetitorNotFound(_)
            | BracketError::MatchupNotFound(_) => ErrorKind::NotFound,
            BracketError::InvariantViolation(_) => ErrorKind::Invariant,
            BracketError::VersionConflict { .. }
            | BracketError::Database(_)
            | BracketError::Timeout(_)
            | BracketError::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Whether the same call may succeed later without caller changes
    pub fn is_retryable(&self) -> bool {
        match self {
            BracketError::Serialization(_) => false,
            _ => matches!(self.kind(), ErrorKind::NotReady | ErrorKind::Storage),
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Storage errors are sanitized so SQL details and document contents
    /// never reach API consumers.
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::Serialization(_) => {
                "Internal server error".to_string()
            }
            BracketError::Timeout(_) => "Storage temporarily unavailable".to_string(),
            BracketError::InvariantViolation(_) => "Internal bracket error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<TimeoutError> for BracketError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => BracketError::Timeout(duration),
            TimeoutError::Database(e) => BracketError::Database(e),
        }
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
