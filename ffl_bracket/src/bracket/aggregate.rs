//! The bracket aggregate: competitors, rounds and their matchups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::advancement::AdvancementProcess;
use super::errors::{BracketError, BracketResult};
use super::matchup::{Matchup, MatchupStatus};
use super::models::{
    BracketStatus, CompetitorEntry, CompetitorId, CompetitorScore, CompetitorSubmission, MatchupId,
    Points, Round, RoundOutcome, Standing, TournamentId,
};
use super::seeder::BracketSeeder;
use super::tiebreaker::{TiebreakInput, TiebreakerPolicy, TiebreakerResult};

/// Week of the first playoff round unless configured otherwise
pub const DEFAULT_START_WEEK: u32 = 1;

/// A single-elimination playoff bracket.
///
/// Round `k + 1` only exists once round `k` has been processed, and it is
/// appended whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bracket {
    tournament_id: TournamentId,
    name: String,
    status: BracketStatus,
    submissions: Vec<CompetitorSubmission>,
    competitors: HashMap<CompetitorId, CompetitorEntry>,
    /// Competitor ids, seed 1 first
    seed_order: Vec<CompetitorId>,
    rounds: Vec<Vec<Matchup>>,
    policy: TiebreakerPolicy,
    total_rounds: u32,
    start_week: u32,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Bracket {
    /// Register a field. Seeds and matchups are assigned by [`Bracket::generate`].
    pub fn new(
        tournament_id: TournamentId,
        name: impl Into<String>,
        competitors: Vec<CompetitorSubmission>,
        policy: TiebreakerPolicy,
    ) -> BracketResult<Self> {
        BracketSeeder::validate(&competitors)?;

        let now = Utc::now();
        Ok(Self {
            tournament_id,
            name: name.into(),
            status: BracketStatus::Seeding,
            total_rounds: competitors.len().next_power_of_two().trailing_zeros(),
            submissions: competitors,
            competitors: HashMap::new(),
            seed_order: Vec::new(),
            rounds: Vec::new(),
            policy,
            start_week: DEFAULT_START_WEEK,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    #[must_use]
    pub fn with_start_week(mut self, start_week: u32) -> Self {
        self.start_week = start_week;
        self
    }

    /// Seed the field and create round one. Only allowed once.
    pub fn generate(&mut self) -> BracketResult<()> {
        if !self.rounds.is_empty() {
            return Err(BracketError::AlreadyGenerated);
        }

        let seeded = BracketSeeder::seed(&self.submissions)?;

        self.seed_order = seeded.entries.iter().map(|entry| entry.id).collect();
        self.competitors = seeded
            .entries
            .into_iter()
            .map(|entry| (entry.id, entry))
            .collect();
        self.total_rounds = seeded.total_rounds;
        self.rounds.push(seeded.round_one);
        self.status = BracketStatus::InProgress;
        self.touch();

        log::info!(
            "Generated bracket '{}' for tournament {} ({} rounds)",
            self.name,
            self.tournament_id,
            self.total_rounds
        );

        Ok(())
    }

    /// Record a competitor's score for a round.
    pub fn record_score(
        &mut self,
        competitor: CompetitorId,
        round: Round,
        score: CompetitorScore,
    ) -> BracketResult<()> {
        if self.rounds.is_empty() {
            return Err(BracketError::NotGenerated);
        }

        let entry = self
            .competitors
            .get(&competitor)
            .ok_or(BracketError::CompetitorNotFound(competitor))?;
        let not_in_round = BracketError::PlayerNotInRound { competitor, round };
        if entry.eliminated {
            return Err(not_in_round);
        }

        let Some(idx) = round.index().filter(|&idx| idx < self.rounds.len()) else {
            return Err(not_in_round);
        };
        let next_round_exists = idx + 1 < self.rounds.len();
        let Some((matchup, side)) = self.rounds[idx]
            .iter_mut()
            .find_map(|m| m.side_of(competitor).map(|side| (m, side)))
        else {
            return Err(not_in_round);
        };

        // A bye's margin is frozen once its round has been advanced
        if matchup.is_bye() && next_round_exists {
            return Err(BracketError::AlreadyResolved(matchup.id()));
        }

        matchup.report_score(side, score)?;
        log::debug!(
            "Recorded score for competitor {competitor} in matchup {}",
            matchup.id()
        );
        self.touch();

        Ok(())
    }

    /// Close out a round: decide scored and tied matchups, eliminate the
    /// losers and build the next round.
    ///
    /// Nothing is changed unless the whole round can be completed. Calling
    /// this again for a processed round returns the same outcome.
    pub fn process_round_results(&mut self, round: Round) -> BracketResult<RoundOutcome> {
        if self.rounds.is_empty() {
            return Err(BracketError::NotGenerated);
        }

        let idx = round
            .index()
            .filter(|&idx| idx < self.rounds.len())
            .ok_or(BracketError::RoundNotStarted(round))?;

        let mut staged = self.rounds[idx].clone();
        for matchup in &mut staged {
            if matches!(matchup.status(), MatchupStatus::Scored | MatchupStatus::Tied)
                && !matchup.determine_winner()?
            {
                let tiebreak = self.resolve_tie(matchup)?;
                matchup.apply_tiebreaker_result(tiebreak)?;
            }
        }

        let unresolved = staged.iter().filter(|m| !m.is_completed()).count();
        if unresolved > 0 {
            return Err(BracketError::RoundNotReady { round, unresolved });
        }

        let is_final = round.number() == self.total_rounds;
        let plan = AdvancementProcess::plan(round, &staged, is_final)?;

        for (loser, winner) in &plan.eliminations {
            let entry = self.competitors.get(loser).ok_or_else(|| {
                BracketError::invariant(format!("eliminated competitor {loser} is not registered"))
            })?;
            if entry.eliminated && entry.eliminated_in != Some(round) {
                return Err(BracketError::invariant(format!(
                    "competitor {loser} lost in {round} but was already eliminated earlier"
                )));
            }
            if !self.competitors.contains_key(winner) {
                return Err(BracketError::invariant(format!(
                    "winning competitor {winner} is not registered"
                )));
            }
        }

        let next_exists = match (&plan.next_round, self.rounds.get(idx + 1)) {
            (Some(planned), Some(existing)) => {
                if !same_pairings(planned, existing) {
                    return Err(BracketError::invariant(format!(
                        "existing pairings after {round} do not match its winners"
                    )));
                }
                true
            }
            (None, Some(_)) => {
                return Err(BracketError::invariant(format!(
                    "a round exists after the final ({round})"
                )));
            }
            (_, None) => false,
        };

        self.rounds[idx] = staged;
        for (loser, winner) in &plan.eliminations {
            if let Some(entry) = self.competitors.get_mut(loser)
                && entry.eliminate(round, *winner)
            {
                log::info!("Competitor {loser} eliminated in {round} by {winner}");
            }
        }
        if let Some(next) = plan.next_round
            && !next_exists
        {
            log::info!("Created {} matchup(s) for {}", next.len(), round.next());
            self.rounds.push(next);
        }
        if plan.outcome.tournament_complete && self.status != BracketStatus::Complete {
            self.status = BracketStatus::Complete;
            log::info!(
                "Tournament {} complete, champion {:?}",
                self.tournament_id,
                plan.outcome.advancing.first()
            );
        }
        self.touch();

        Ok(plan.outcome)
    }

    fn resolve_tie(&self, matchup: &Matchup) -> BracketResult<TiebreakerResult> {
        let player1 = matchup.player1();
        let (Some(player2), Some(score1), Some(score2)) = (
            matchup.player2(),
            player1.score.as_ref(),
            matchup.player2().and_then(|p| p.score.as_ref()),
        ) else {
            return Err(BracketError::ScoresIncomplete);
        };

        let regular_season = |id: CompetitorId| {
            self.competitors
                .get(&id)
                .map(|entry| entry.regular_season_score)
                .ok_or_else(|| {
                    BracketError::invariant(format!("matchup competitor {id} is not registered"))
                })
        };

        let a = TiebreakInput {
            breakdown: &score1.breakdown,
            seed: player1.seed,
            regular_season: regular_season(player1.competitor)?,
        };
        let b = TiebreakInput {
            breakdown: &score2.breakdown,
            seed: player2.seed,
            regular_season: regular_season(player2.competitor)?,
        };

        self.policy.resolve(&a, &b)
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> BracketStatus {
        self.status
    }

    pub fn policy(&self) -> &TiebreakerPolicy {
        &self.policy
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn start_week(&self) -> u32 {
        self.start_week
    }

    /// Optimistic concurrency stamp, bumped by every save
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Generated rounds, round one first
    pub fn rounds(&self) -> &[Vec<Matchup>] {
        &self.rounds
    }

    pub fn competitor(&self, id: CompetitorId) -> Option<&CompetitorEntry> {
        self.competitors.get(&id)
    }

    /// All competitors in seed order. Empty until generated.
    pub fn competitors(&self) -> impl Iterator<Item = &CompetitorEntry> {
        self.seed_order
            .iter()
            .filter_map(|id| self.competitors.get(id))
    }

    pub fn is_player_eliminated(&self, competitor: CompetitorId) -> BracketResult<bool> {
        self.competitors
            .get(&competitor)
            .map(|entry| entry.eliminated)
            .ok_or(BracketError::CompetitorNotFound(competitor))
    }

    /// Matchups of a round in bracket order, empty if the round does not exist yet
    pub fn matchups_for_round(&self, round: Round) -> &[Matchup] {
        round
            .index()
            .and_then(|idx| self.rounds.get(idx))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find_matchup_for_competitor(
        &self,
        competitor: CompetitorId,
        round: Round,
    ) -> Option<&Matchup> {
        self.matchups_for_round(round)
            .iter()
            .find(|m| m.has_competitor(competitor))
    }

    pub fn matchup(&self, id: MatchupId) -> Option<&Matchup> {
        self.matchups_for_round(id.round)
            .iter()
            .find(|m| m.id() == id)
    }

    pub fn is_complete(&self) -> bool {
        self.status == BracketStatus::Complete
    }

    pub fn champion(&self) -> Option<CompetitorId> {
        if !self.is_complete() {
            return None;
        }
        self.rounds.last()?.first()?.winner()
    }

    /// Latest generated round
    pub fn current_round(&self) -> Option<Round> {
        match self.rounds.len() {
            0 => None,
            n => Some(Round::new(n as u32)),
        }
    }

    /// Display name counted back from the final.
    pub fn round_name(&self, round: Round) -> String {
        match self.total_rounds.checked_sub(round.number()) {
            Some(0) => "Super Bowl".to_string(),
            Some(1) => "Conference Championship".to_string(),
            Some(2) => "Divisional".to_string(),
            Some(3) => "Wild Card".to_string(),
            _ => format!("Round {}", round.number()),
        }
    }

    pub fn week_for_round(&self, round: Round) -> u32 {
        self.start_week + round.number().saturating_sub(1)
    }

    /// Competitors still alive, in seed order
    pub fn active_competitors(&self) -> Vec<&CompetitorEntry> {
        self.competitors().filter(|entry| !entry.eliminated).collect()
    }

    /// Eliminated competitors, earliest exit first
    pub fn eliminated_competitors(&self) -> Vec<&CompetitorEntry> {
        let mut out: Vec<&CompetitorEntry> =
            self.competitors().filter(|entry| entry.eliminated).collect();
        out.sort_by_key(|entry| (entry.eliminated_in, entry.seed));
        out
    }

    /// Competitors eliminated in each round
    pub fn elimination_summary(&self) -> BTreeMap<Round, Vec<CompetitorId>> {
        let mut summary: BTreeMap<Round, Vec<CompetitorId>> = BTreeMap::new();
        for entry in self.eliminated_competitors() {
            if let Some(round) = entry.eliminated_in {
                summary.entry(round).or_default().push(entry.id);
            }
        }
        summary
    }

    /// Reported scores for a round, best first. Equal scores share a rank.
    pub fn round_standings(&self, round: Round) -> Vec<Standing> {
        self.standings(round, false)
    }

    /// Running totals over rounds 1 through `round`, best first.
    ///
    /// Eliminated competitors stay in the table with the points they
    /// scored before going out.
    pub fn cumulative_standings(&self, round: Round) -> Vec<Standing> {
        self.standings(round, true)
    }

    fn standings(&self, round: Round, cumulative: bool) -> Vec<Standing> {
        let previous: HashMap<CompetitorId, usize> = match round.number() {
            0 | 1 => HashMap::new(),
            n => self
                .ranked_scores(Round::new(n - 1), cumulative)
                .into_iter()
                .map(|(entry, _, rank)| (entry.id, rank))
                .collect(),
        };
        let processed = match self.status {
            BracketStatus::Complete => self.rounds.len() as u32,
            _ => self.rounds.len().saturating_sub(1) as u32,
        };

        self.ranked_scores(round, cumulative)
            .into_iter()
            .map(|(entry, score, rank)| Standing {
                rank,
                previous_rank: previous.get(&entry.id).copied(),
                competitor: entry.id,
                name: entry.name.clone(),
                score,
                rounds_survived: entry
                    .eliminated_in
                    .map_or(processed, |lost| lost.number().saturating_sub(1)),
                eliminated: entry.eliminated_in.is_some_and(|lost| {
                    if cumulative { lost <= round } else { lost == round }
                }),
            })
            .collect()
    }

    /// Competitors with at least one reported score, ranked best first
    fn ranked_scores(
        &self,
        round: Round,
        cumulative: bool,
    ) -> Vec<(&CompetitorEntry, Points, usize)> {
        let first = if cumulative { 1 } else { round.number() };
        let mut totals: HashMap<CompetitorId, Points> = HashMap::new();
        for number in first..=round.number() {
            let slots = self
                .matchups_for_round(Round::new(number))
                .iter()
                .flat_map(|m| [Some(m.player1()), m.player2()])
                .flatten();
            for slot in slots {
                if let Some(score) = &slot.score {
                    let total = totals.entry(slot.competitor).or_default();
                    *total = *total + score.total;
                }
            }
        }

        let mut scored: Vec<(&CompetitorEntry, Points)> = totals
            .into_iter()
            .filter_map(|(id, total)| self.competitors.get(&id).map(|entry| (entry, total)))
            .collect();
        scored.sort_by(|(a, a_total), (b, b_total)| b_total.cmp(a_total).then(a.seed.cmp(&b.seed)));

        let mut ranked: Vec<(&CompetitorEntry, Points, usize)> = Vec::with_capacity(scored.len());
        for (position, (entry, total)) in scored.into_iter().enumerate() {
            let rank = match ranked.last() {
                Some(&(_, previous, rank)) if previous == total => rank,
                _ => position + 1,
            };
            ranked.push((entry, total, rank));
        }
        ranked
    }
}

fn same_pairings(planned: &[Matchup], existing: &[Matchup]) -> bool {
    planned.len() == existing.len()
        && planned.iter().zip(existing).all(|(p, e)| {
            p.id() == e.id()
                && p.player1().competitor == e.player1().competitor
                && p.player2().map(|s| s.competitor) == e.player2().map(|s| s.competitor)
        })
}
