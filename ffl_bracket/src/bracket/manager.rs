//! Bracket manager: the async service layer over a [`BracketRepository`].
//!
//! Every write loads the bracket, applies the change in memory and saves it
//! with the version it was loaded at. If another writer got there first the
//! change is replayed on a fresh copy.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::aggregate::{Bracket, DEFAULT_START_WEEK};
use super::errors::{BracketError, BracketResult};
use super::matchup::Matchup;
use super::models::{
    CompetitorId, CompetitorScore, CompetitorSubmission, MatchupId, Points, Round, RoundOutcome,
    ScoreBreakdown, TournamentId,
};
use super::scoring::ScoreSource;
use super::tiebreaker::TiebreakerPolicy;
use crate::db::BracketRepository;

/// Default number of load/apply/save attempts per write
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: u32 = 5;

/// How to find a matchup within a round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchupLookup {
    Id(MatchupId),
    Competitor(CompetitorId),
}

/// A matchup with its round context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchupDetails {
    pub tournament_id: TournamentId,
    pub round: Round,
    pub round_name: String,
    pub week: u32,
    pub matchup: Matchup,
}

/// Bracket manager
#[derive(Clone)]
pub struct BracketManager {
    repository: Arc<dyn BracketRepository>,
    default_policy: TiebreakerPolicy,
    start_week: u32,
    max_commit_attempts: u32,
}

impl BracketManager {
    pub fn new(repository: Arc<dyn BracketRepository>) -> Self {
        Self {
            repository,
            default_policy: TiebreakerPolicy::default(),
            start_week: DEFAULT_START_WEEK,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }

    /// Policy for brackets created without one
    #[must_use]
    pub fn with_default_policy(mut self, policy: TiebreakerPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    #[must_use]
    pub fn with_start_week(mut self, start_week: u32) -> Self {
        self.start_week = start_week;
        self
    }

    #[must_use]
    pub fn with_max_commit_attempts(mut self, attempts: u32) -> Self {
        self.max_commit_attempts = attempts.max(1);
        self
    }

    /// Seed a field, generate round one and store the bracket.
    pub async fn initialize_bracket(
        &self,
        tournament_id: TournamentId,
        name: impl Into<String>,
        competitors: Vec<CompetitorSubmission>,
        policy: Option<TiebreakerPolicy>,
    ) -> BracketResult<Bracket> {
        let policy = policy.unwrap_or_else(|| self.default_policy.clone());
        let mut bracket = Bracket::new(tournament_id, name, competitors, policy)?
            .with_start_week(self.start_week);
        bracket.generate()?;

        let version = self.repository.insert(&bracket).await?;
        bracket.set_version(version);

        log::info!(
            "Initialized bracket for tournament {tournament_id} with {} competitors",
            bracket.competitors().count()
        );

        Ok(bracket)
    }

    pub async fn get_bracket(&self, tournament_id: TournamentId) -> BracketResult<Bracket> {
        self.repository.load(tournament_id).await
    }

    /// Record a competitor's total and breakdown for a round.
    pub async fn record_competitor_score(
        &self,
        tournament_id: TournamentId,
        round: Round,
        competitor_id: CompetitorId,
        score: Points,
        breakdown: ScoreBreakdown,
    ) -> BracketResult<()> {
        let score = CompetitorScore::new(score, breakdown);
        score.validate()?;

        self.commit(tournament_id, |bracket| {
            bracket.record_score(competitor_id, round, score.clone())
        })
        .await
    }

    /// Close out a round. Safe to call repeatedly.
    pub async fn advance_round(
        &self,
        tournament_id: TournamentId,
        round: Round,
    ) -> BracketResult<RoundOutcome> {
        let outcome = self
            .commit(tournament_id, |bracket| bracket.process_round_results(round))
            .await?;

        log::info!(
            "Advanced {round} of tournament {tournament_id}: {} advancing, {} eliminated",
            outcome.advancing.len(),
            outcome.eliminated.len()
        );

        Ok(outcome)
    }

    pub async fn get_matchup(
        &self,
        tournament_id: TournamentId,
        round: Round,
        lookup: MatchupLookup,
    ) -> BracketResult<MatchupDetails> {
        let bracket = self.repository.load(tournament_id).await?;

        let matchup = match lookup {
            MatchupLookup::Id(id) if id.round == round => bracket
                .matchup(id)
                .ok_or(BracketError::MatchupNotFound(id))?,
            MatchupLookup::Id(id) => return Err(BracketError::MatchupNotFound(id)),
            MatchupLookup::Competitor(competitor) => {
                if bracket.competitor(competitor).is_none() {
                    return Err(BracketError::CompetitorNotFound(competitor));
                }
                bracket
                    .find_matchup_for_competitor(competitor, round)
                    .ok_or(BracketError::PlayerNotInRound { competitor, round })?
            }
        };

        Ok(MatchupDetails {
            tournament_id,
            round,
            round_name: bracket.round_name(round),
            week: bracket.week_for_round(round),
            matchup: matchup.clone(),
        })
    }

    pub async fn is_eliminated(
        &self,
        tournament_id: TournamentId,
        competitor_id: CompetitorId,
    ) -> BracketResult<bool> {
        self.repository
            .load(tournament_id)
            .await?
            .is_player_eliminated(competitor_id)
    }

    /// Pull scores for every competitor still playing in `round` and record
    /// them. Returns how many scores were recorded.
    pub async fn sync_round_scores(
        &self,
        tournament_id: TournamentId,
        round: Round,
        source: &dyn ScoreSource,
    ) -> BracketResult<usize> {
        let bracket = self.repository.load(tournament_id).await?;
        let matchups = bracket.matchups_for_round(round);
        if matchups.is_empty() {
            return Err(BracketError::RoundNotStarted(round));
        }

        let pending: Vec<CompetitorId> = matchups
            .iter()
            .filter(|m| m.is_bye() || !m.is_completed())
            .flat_map(|m| [Some(m.player1()), m.player2()])
            .flatten()
            .map(|slot| slot.competitor)
            .collect();

        let mut fetched = Vec::with_capacity(pending.len());
        for competitor in pending {
            if let Some(score) = source.fetch_score(tournament_id, competitor, round).await? {
                fetched.push((competitor, score));
            }
        }

        if fetched.is_empty() {
            return Ok(0);
        }

        let recorded = self
            .commit(tournament_id, |bracket| {
                let mut recorded = 0;
                for (competitor, score) in &fetched {
                    match bracket.record_score(*competitor, round, score.clone()) {
                        Ok(()) => recorded += 1,
                        Err(
                            err @ (BracketError::AlreadyResolved(_)
                            | BracketError::PlayerNotInRound { .. }),
                        ) => {
                            log::debug!("Skipping synced score for {competitor}: {err}");
                        }
                        Err(err) => return Err(err),
                    }
                }
                Ok(recorded)
            })
            .await?;

        log::info!("Synced {recorded} score(s) for {round} of tournament {tournament_id}");
        Ok(recorded)
    }

    pub async fn health_check(&self) -> BracketResult<()> {
        self.repository.health_check().await
    }

    /// Load, apply `op`, save with a version check, retrying on conflict.
    async fn commit<T, F>(&self, tournament_id: TournamentId, mut op: F) -> BracketResult<T>
    where
        F: FnMut(&mut Bracket) -> BracketResult<T> + Send,
        T: Send,
    {
        let mut attempt = 1;
        loop {
            let mut bracket = self.repository.load(tournament_id).await?;
            let expected = bracket.version();
            let value = op(&mut bracket)?;

            match self.repository.save(&bracket, expected).await {
                Ok(_) => return Ok(value),
                Err(BracketError::VersionConflict { .. }) if attempt < self.max_commit_attempts => {
                    log::warn!(
                        "Version conflict on tournament {tournament_id} (attempt {attempt}/{}), retrying",
                        self.max_commit_attempts
                    );
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
