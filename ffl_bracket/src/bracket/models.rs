//! Bracket data models: identifiers, rounds, scores and competitor entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, Sub},
};
use uuid::Uuid;

use super::errors::{BracketError, BracketResult};
use super::matchup::MatchupResult;

/// Tournament ID type
pub type TournamentId = Uuid;

/// Competitor (league member) ID type
pub type CompetitorId = Uuid;

/// Seed rank, 1 is the best
pub type Seed = u32;

/// Fantasy points stored as hundredths of a point.
///
/// Scores like `32.5` are kept as `3250` so that equality between two
/// competitors' totals is exact.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Points(i64);

impl Points {
    pub const ZERO: Points = Points(0);

    /// Largest magnitude a reported score may have: one million points.
    pub const LIMIT: Points = Points(100_000_000);

    /// Whole fantasy points. Saturates at the `i64` hundredths range.
    #[must_use]
    pub const fn new(whole: i64) -> Self {
        Self(whole.saturating_mul(100))
    }

    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    /// Whether the score lies within `-LIMIT..=LIMIT`
    #[must_use]
    pub const fn is_within_limit(self) -> bool {
        self.0.unsigned_abs() <= Self::LIMIT.0.unsigned_abs()
    }

    #[must_use]
    pub const fn checked_add(self, rhs: Points) -> Option<Points> {
        match self.0.checked_add(rhs.0) {
            Some(sum) => Some(Points(sum)),
            None => None,
        }
    }

    /// Absolute difference between two scores, never negative
    #[must_use]
    pub fn abs_diff(self, other: Points) -> Points {
        Points(i64::try_from(self.0.abs_diff(other.0)).unwrap_or(i64::MAX))
    }
}

impl Add for Points {
    type Output = Points;

    fn add(self, rhs: Points) -> Points {
        Points(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Points {
    type Output = Points;

    fn sub(self, rhs: Points) -> Points {
        Points(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for Points {
    fn sum<I: Iterator<Item = Points>>(iter: I) -> Points {
        iter.fold(Points::ZERO, Add::add)
    }
}

impl fmt::Display for Points {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Playoff round, 1-indexed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Round(u32);

impl Round {
    pub const FIRST: Round = Round(1);

    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    #[must_use]
    pub const fn number(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Round {
        Round(self.0 + 1)
    }

    /// Zero-based position in the bracket's round list
    pub(crate) fn index(self) -> Option<usize> {
        (self.0 as usize).checked_sub(1)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}", self.0)
    }
}

/// Deterministic matchup identifier: the round plus the matchup's slot
/// within that round, in bracket order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MatchupId {
    pub round: Round,
    pub slot: u32,
}

impl MatchupId {
    #[must_use]
    pub const fn new(round: Round, slot: u32) -> Self {
        Self { round, slot }
    }
}

impl fmt::Display for MatchupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}-M{}", self.round.0, self.slot)
    }
}

/// Roster position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    Qb,
    Rb,
    Wr,
    Te,
    Flex,
    K,
    Def,
}

/// Points earned by one roster position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionScore {
    pub position: Position,
    pub points: Points,
}

impl PositionScore {
    pub fn new(position: Position, points: Points) -> Self {
        Self { position, points }
    }
}

/// Sub-scores behind a competitor's total, consulted only by tiebreak rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Starting lineup points by position
    #[serde(default)]
    pub positions: Vec<PositionScore>,
    /// Points left on the bench
    #[serde(default)]
    pub bench: Points,
    #[serde(default)]
    pub touchdowns: u32,
    #[serde(default)]
    pub turnovers: u32,
}

impl ScoreBreakdown {
    /// Breakdown carrying only a bench total
    pub fn with_bench(bench: Points) -> Self {
        Self {
            bench,
            ..Default::default()
        }
    }

    pub fn highest_position_score(&self) -> Points {
        self.ranked_positions().first().copied().unwrap_or_default()
    }

    pub fn second_highest_position_score(&self) -> Points {
        self.ranked_positions().get(1).copied().unwrap_or_default()
    }

    fn ranked_positions(&self) -> Vec<Points> {
        let mut points: Vec<Points> = self.positions.iter().map(|p| p.points).collect();
        points.sort_unstable_by(|a, b| b.cmp(a));
        points
    }
}

/// A competitor's score for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorScore {
    pub total: Points,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

impl CompetitorScore {
    pub fn new(total: Points, breakdown: ScoreBreakdown) -> Self {
        Self { total, breakdown }
    }

    /// Score without any breakdown
    pub fn total_only(total: Points) -> Self {
        Self::new(total, ScoreBreakdown::default())
    }

    /// Reject out-of-range scores and breakdowns whose starting lineup does
    /// not add up to the total.
    pub fn validate(&self) -> BracketResult<()> {
        check_limit("total", self.total)?;
        check_limit("bench", self.breakdown.bench)?;
        for position in &self.breakdown.positions {
            check_limit(&format!("{:?} score", position.position), position.points)?;
        }

        if self.breakdown.positions.is_empty() {
            return Ok(());
        }

        let lineup = self
            .breakdown
            .positions
            .iter()
            .try_fold(Points::ZERO, |sum, p| sum.checked_add(p.points))
            .ok_or_else(|| BracketError::InvalidScore("position scores overflow".to_string()))?;
        if lineup != self.total {
            return Err(BracketError::InvalidScore(format!(
                "position scores sum to {lineup}, total is {}",
                self.total
            )));
        }

        Ok(())
    }
}

pub(crate) fn check_limit(what: &str, points: Points) -> BracketResult<()> {
    if points.is_within_limit() {
        Ok(())
    } else {
        Err(BracketError::InvalidScore(format!(
            "{what} of {points} is outside +/-{}",
            Points::LIMIT
        )))
    }
}

/// Competitor as submitted for seeding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorSubmission {
    pub id: CompetitorId,
    pub name: String,
    pub regular_season_score: Points,
}

impl CompetitorSubmission {
    pub fn new(id: CompetitorId, name: impl Into<String>, regular_season_score: Points) -> Self {
        Self {
            id,
            name: name.into(),
            regular_season_score,
        }
    }
}

/// Seeded tournament participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorEntry {
    pub id: CompetitorId,
    pub name: String,
    pub seed: Seed,
    pub regular_season_score: Points,
    pub eliminated: bool,
    /// Round the competitor lost in
    pub eliminated_in: Option<Round>,
    /// Competitor who knocked them out
    pub eliminated_by: Option<CompetitorId>,
    #[serde(default)]
    pub eliminated_at: Option<DateTime<Utc>>,
}

impl CompetitorEntry {
    pub(crate) fn new(submission: &CompetitorSubmission, seed: Seed) -> Self {
        Self {
            id: submission.id,
            name: submission.name.clone(),
            seed,
            regular_season_score: submission.regular_season_score,
            eliminated: false,
            eliminated_in: None,
            eliminated_by: None,
            eliminated_at: None,
        }
    }

    /// Mark the competitor eliminated. Returns `false` if they already were.
    pub(crate) fn eliminate(&mut self, round: Round, by: CompetitorId) -> bool {
        if self.eliminated {
            return false;
        }

        self.eliminated = true;
        self.eliminated_in = Some(round);
        self.eliminated_by = Some(by);
        self.eliminated_at = Some(Utc::now());
        true
    }
}

/// Bracket lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketStatus {
    /// Competitors registered, round 1 not generated
    Seeding,
    InProgress,
    Complete,
}

/// Result of closing out a round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: Round,
    /// Losers, in bracket order
    pub eliminated: Vec<CompetitorId>,
    /// Winners, in bracket order
    pub advancing: Vec<CompetitorId>,
    pub matchup_results: Vec<MatchupResult>,
    pub tournament_complete: bool,
}

/// One line of a round's score table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    /// Equal scores share a rank (1, 1, 3, ...)
    pub rank: usize,
    /// Rank in the same table for the previous round, if they were in it
    pub previous_rank: Option<usize>,
    pub competitor: CompetitorId,
    pub name: String,
    /// Round score, or the running total for cumulative standings
    pub score: Points,
    /// Rounds won so far, byes included
    pub rounds_survived: u32,
    pub eliminated: bool,
}

impl Standing {
    /// Places gained since the previous round; negative when they dropped
    #[must_use]
    pub fn rank_change(&self) -> Option<i64> {
        self.previous_rank
            .map(|previous| previous as i64 - self.rank as i64)
    }
}
