//! Matchup state machine.
//!
//! ```text
//! Pending -> Partial -> Scored -> Completed
//!                         |          ^
//!                         v          |
//!                        Tied -------+
//! ```
//!
//! `Completed` is terminal. A bye is created `Completed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::errors::{BracketError, BracketResult};
use super::models::{CompetitorEntry, CompetitorId, CompetitorScore, MatchupId, Points, Round, Seed};
use super::tiebreaker::{TiebreakRecord, TiebreakerResult};

/// Side of a matchup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Player1,
    Player2,
}

impl Side {
    #[must_use]
    pub const fn other(self) -> Side {
        match self {
            Side::Player1 => Side::Player2,
            Side::Player2 => Side::Player1,
        }
    }
}

/// A competitor's place in a matchup. The seed is frozen at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupSlot {
    pub competitor: CompetitorId,
    pub name: String,
    pub seed: Seed,
    pub score: Option<CompetitorScore>,
}

impl MatchupSlot {
    pub fn from_entry(entry: &CompetitorEntry) -> Self {
        Self {
            competitor: entry.id,
            name: entry.name.clone(),
            seed: entry.seed,
            score: None,
        }
    }

    /// Same competitor and seed, no score
    pub(crate) fn advance(&self) -> Self {
        Self {
            score: None,
            ..self.clone()
        }
    }

    fn total(&self) -> Option<Points> {
        self.score.as_ref().map(|score| score.total)
    }
}

/// Matchup status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchupStatus {
    /// No scores reported
    Pending,
    /// One side reported
    Partial,
    /// Both sides reported, winner not yet determined
    Scored,
    /// Equal totals, waiting for a tiebreak
    Tied,
    Completed,
}

/// Final result of a matchup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupResult {
    pub matchup_id: MatchupId,
    pub winner: CompetitorId,
    /// `None` for a bye
    pub loser: Option<CompetitorId>,
    pub margin: Points,
    pub is_upset: bool,
    pub tiebreak: Option<TiebreakRecord>,
}

/// One pairing in one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    id: MatchupId,
    player1: MatchupSlot,
    player2: Option<MatchupSlot>,
    status: MatchupStatus,
    result: Option<MatchupResult>,
    completed_at: Option<DateTime<Utc>>,
}

impl Matchup {
    pub fn new(id: MatchupId, player1: MatchupSlot, player2: MatchupSlot) -> Self {
        Self {
            id,
            player1,
            player2: Some(player2),
            status: MatchupStatus::Pending,
            result: None,
            completed_at: None,
        }
    }

    /// A completed matchup with no opponent
    pub fn bye(id: MatchupId, player1: MatchupSlot) -> Self {
        let result = MatchupResult {
            matchup_id: id,
            winner: player1.competitor,
            loser: None,
            margin: Points::ZERO,
            is_upset: false,
            tiebreak: None,
        };

        Self {
            id,
            player1,
            player2: None,
            status: MatchupStatus::Completed,
            result: Some(result),
            completed_at: Some(Utc::now()),
        }
    }

    pub fn id(&self) -> MatchupId {
        self.id
    }

    pub fn round(&self) -> Round {
        self.id.round
    }

    pub fn player1(&self) -> &MatchupSlot {
        &self.player1
    }

    pub fn player2(&self) -> Option<&MatchupSlot> {
        self.player2.as_ref()
    }

    pub fn slot(&self, side: Side) -> Option<&MatchupSlot> {
        match side {
            Side::Player1 => Some(&self.player1),
            Side::Player2 => self.player2.as_ref(),
        }
    }

    fn slot_mut(&mut self, side: Side) -> Option<&mut MatchupSlot> {
        match side {
            Side::Player1 => Some(&mut self.player1),
            Side::Player2 => self.player2.as_mut(),
        }
    }

    pub fn status(&self) -> MatchupStatus {
        self.status
    }

    pub fn result(&self) -> Option<&MatchupResult> {
        self.result.as_ref()
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchupStatus::Completed
    }

    pub fn winner(&self) -> Option<CompetitorId> {
        self.result.as_ref().map(|r| r.winner)
    }

    pub fn loser(&self) -> Option<CompetitorId> {
        self.result.as_ref().and_then(|r| r.loser)
    }

    pub fn side_of(&self, competitor: CompetitorId) -> Option<Side> {
        if self.player1.competitor == competitor {
            Some(Side::Player1)
        } else if self.player2.as_ref().map(|p| p.competitor) == Some(competitor) {
            Some(Side::Player2)
        } else {
            None
        }
    }

    pub fn has_competitor(&self, competitor: CompetitorId) -> bool {
        self.side_of(competitor).is_some()
    }

    /// Winner's slot, if the matchup is decided
    pub fn winning_slot(&self) -> Option<&MatchupSlot> {
        let winner = self.winner()?;
        self.side_of(winner).and_then(|side| self.slot(side))
    }

    /// Store a side's score.
    ///
    /// A completed matchup rejects scores, except a bye owner's own score,
    /// which only updates the bye margin. The bracket stops accepting that
    /// refresh once the next round exists.
    pub fn report_score(&mut self, side: Side, score: CompetitorScore) -> BracketResult<()> {
        score.validate()?;

        if self.status == MatchupStatus::Completed {
            if self.is_bye() && side == Side::Player1 {
                if let Some(result) = self.result.as_mut() {
                    result.margin = score.total.abs_diff(Points::ZERO);
                }
                self.player1.score = Some(score);
                return Ok(());
            }
            return Err(BracketError::AlreadyResolved(self.id));
        }

        let id = self.id;
        let slot = self.slot_mut(side).ok_or_else(|| {
            BracketError::invariant(format!("matchup {id} has no {side:?} slot"))
        })?;
        slot.score = Some(score);

        self.status = match (self.player1.score.is_some(), self.player2_has_score()) {
            (true, true) => MatchupStatus::Scored,
            (false, false) => MatchupStatus::Pending,
            _ => MatchupStatus::Partial,
        };

        Ok(())
    }

    fn player2_has_score(&self) -> bool {
        self.player2.as_ref().is_some_and(|p| p.score.is_some())
    }

    /// Decide the matchup on total score.
    ///
    /// Returns `true` when the matchup is completed, `false` when the totals
    /// are equal and a tiebreak is needed.
    pub fn determine_winner(&mut self) -> BracketResult<bool> {
        match self.status {
            MatchupStatus::Completed => return Ok(true),
            MatchupStatus::Tied => return Ok(false),
            _ => {}
        }

        let (Some(total1), Some(total2)) = (
            self.player1.total(),
            self.player2.as_ref().and_then(MatchupSlot::total),
        ) else {
            return Err(BracketError::ScoresIncomplete);
        };

        let winner = match total1.cmp(&total2) {
            Ordering::Greater => Side::Player1,
            Ordering::Less => Side::Player2,
            Ordering::Equal => {
                self.status = MatchupStatus::Tied;
                return Ok(false);
            }
        };

        self.complete(winner, total1.abs_diff(total2), None)?;
        Ok(true)
    }

    /// Complete a tied matchup with a tiebreak outcome. Margin is zero.
    pub fn apply_tiebreaker_result(&mut self, result: TiebreakerResult) -> BracketResult<()> {
        if self.status != MatchupStatus::Tied {
            return Err(BracketError::NotTied);
        }

        self.complete(result.winner, Points::ZERO, Some(result.record))
    }

    fn complete(
        &mut self,
        winner: Side,
        margin: Points,
        tiebreak: Option<TiebreakRecord>,
    ) -> BracketResult<()> {
        let (Some(winning), Some(losing)) = (self.slot(winner), self.slot(winner.other())) else {
            return Err(BracketError::invariant(format!(
                "matchup {} cannot be decided without an opponent",
                self.id
            )));
        };

        self.result = Some(MatchupResult {
            matchup_id: self.id,
            winner: winning.competitor,
            loser: Some(losing.competitor),
            margin,
            is_upset: winning.seed > losing.seed,
            tiebreak,
        });
        self.status = MatchupStatus::Completed;
        self.completed_at = Some(Utc::now());

        Ok(())
    }
}
