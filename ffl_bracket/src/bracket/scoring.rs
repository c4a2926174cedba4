//! Scoring source abstraction.
//!
//! The bracket never computes fantasy points itself. A [`ScoreSource`]
//! supplies totals and breakdowns, and [`crate::bracket::BracketManager::sync_round_scores`]
//! pulls them into a round.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::errors::BracketResult;
use super::models::{CompetitorId, CompetitorScore, Round, TournamentId};

/// Provider of competitor scores
#[async_trait]
pub trait ScoreSource: Send + Sync {
    /// Score for a competitor in a round, `None` if not final yet
    async fn fetch_score(
        &self,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        round: Round,
    ) -> BracketResult<Option<CompetitorScore>>;
}

/// Scores held in memory, keyed by tournament, competitor and round
#[derive(Default)]
pub struct InMemoryScoreSource {
    scores: RwLock<HashMap<(TournamentId, CompetitorId, Round), CompetitorScore>>,
}

impl InMemoryScoreSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        round: Round,
        score: CompetitorScore,
    ) {
        self.scores
            .write()
            .await
            .insert((tournament_id, competitor_id, round), score);
    }
}

#[async_trait]
impl ScoreSource for InMemoryScoreSource {
    async fn fetch_score(
        &self,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
        round: Round,
    ) -> BracketResult<Option<CompetitorScore>> {
        Ok(self
            .scores
            .read()
            .await
            .get(&(tournament_id, competitor_id, round))
            .cloned())
    }
}
