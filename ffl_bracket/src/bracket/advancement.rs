//! Round transition: collect winners and losers, build the next round.

use std::collections::HashSet;

use super::errors::{BracketError, BracketResult};
use super::matchup::{Matchup, MatchupSlot};
use super::models::{CompetitorId, MatchupId, Round, RoundOutcome};

/// Everything a round transition changes, computed without touching the
/// bracket
#[derive(Debug, Clone)]
pub struct AdvancementPlan {
    pub outcome: RoundOutcome,
    /// `(loser, winner)` pairs, in bracket order
    pub eliminations: Vec<(CompetitorId, CompetitorId)>,
    /// `None` after the final
    pub next_round: Option<Vec<Matchup>>,
}

/// Stateless advancement logic
pub struct AdvancementProcess;

impl AdvancementProcess {
    /// Plan the transition out of `round`.
    ///
    /// Every matchup must already be completed. Winners of consecutive
    /// matchups meet in the next round with their seeds carried over.
    pub fn plan(round: Round, matchups: &[Matchup], is_final: bool) -> BracketResult<AdvancementPlan> {
        let unresolved = matchups.iter().filter(|m| !m.is_completed()).count();
        if unresolved > 0 {
            return Err(BracketError::RoundNotReady { round, unresolved });
        }

        if matchups.is_empty() {
            return Err(BracketError::RoundNotStarted(round));
        }

        let mut seen = HashSet::with_capacity(matchups.len());
        let mut winners: Vec<MatchupSlot> = Vec::with_capacity(matchups.len());
        let mut eliminations = Vec::new();
        let mut matchup_results = Vec::with_capacity(matchups.len());

        for matchup in matchups {
            let (Some(result), Some(winner)) = (matchup.result(), matchup.winning_slot()) else {
                return Err(BracketError::invariant(format!(
                    "completed matchup {} has no winner",
                    matchup.id()
                )));
            };

            if !seen.insert(result.winner) {
                return Err(BracketError::invariant(format!(
                    "competitor {} won more than one matchup in {round}",
                    result.winner
                )));
            }

            if let Some(loser) = result.loser {
                eliminations.push((loser, result.winner));
            }
            winners.push(winner.advance());
            matchup_results.push(result.clone());
        }

        let next_round = if is_final {
            if matchups.len() != 1 {
                return Err(BracketError::invariant(format!(
                    "final round has {} matchups",
                    matchups.len()
                )));
            }
            None
        } else {
            if winners.len() % 2 != 0 {
                return Err(BracketError::invariant(format!(
                    "{round} produced an odd number of winners ({})",
                    winners.len()
                )));
            }

            let next = round.next();
            let pairs = winners
                .chunks_exact(2)
                .zip(1..)
                .map(|(pair, slot)| {
                    Matchup::new(MatchupId::new(next, slot), pair[0].clone(), pair[1].clone())
                })
                .collect();
            Some(pairs)
        };

        let outcome = RoundOutcome {
            round,
            eliminated: eliminations.iter().map(|(loser, _)| *loser).collect(),
            advancing: winners.iter().map(|slot| slot.competitor).collect(),
            matchup_results,
            tournament_complete: is_final,
        };

        Ok(AdvancementPlan {
            outcome,
            eliminations,
            next_round,
        })
    }
}
