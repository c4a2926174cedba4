//! Seeding and round-one pairing.

use std::collections::HashSet;

use super::errors::{BracketError, BracketResult};
use super::matchup::{Matchup, MatchupSlot};
use super::models::{
    CompetitorEntry, CompetitorSubmission, MatchupId, Round, Seed, check_limit,
};

/// Output of seeding a field
#[derive(Debug, Clone)]
pub struct SeededField {
    /// Entries in seed order (seed 1 first)
    pub entries: Vec<CompetitorEntry>,
    /// Round-one matchups in bracket slot order
    pub round_one: Vec<Matchup>,
    pub total_rounds: u32,
}

/// Stateless seeding logic
pub struct BracketSeeder;

impl BracketSeeder {
    /// Reject fields that cannot be seeded.
    pub fn validate(competitors: &[CompetitorSubmission]) -> BracketResult<()> {
        if competitors.len() < 2 {
            return Err(BracketError::InvalidFieldSize(competitors.len()));
        }

        let mut seen = HashSet::with_capacity(competitors.len());
        for competitor in competitors {
            if !seen.insert(competitor.id) {
                return Err(BracketError::DuplicateCompetitor(competitor.id));
            }
            check_limit("regular-season score", competitor.regular_season_score)?;
        }

        Ok(())
    }

    /// Assign seeds by regular-season score and build round one.
    ///
    /// Ties in regular-season score keep submission order. The field is
    /// padded to the next power of two and the top seeds receive byes for
    /// the empty slots.
    pub fn seed(competitors: &[CompetitorSubmission]) -> BracketResult<SeededField> {
        Self::validate(competitors)?;

        let mut ordered: Vec<&CompetitorSubmission> = competitors.iter().collect();
        ordered.sort_by(|a, b| b.regular_season_score.cmp(&a.regular_season_score));

        let entries: Vec<CompetitorEntry> = ordered
            .iter()
            .zip(1..)
            .map(|(submission, seed)| CompetitorEntry::new(submission, seed))
            .collect();

        let field = entries.len();
        let padded = field.next_power_of_two();
        let total_rounds = padded.trailing_zeros();
        let order = Self::slot_order(padded);

        let round_one = order
            .chunks_exact(2)
            .zip(1..)
            .map(|(pair, slot)| {
                let id = MatchupId::new(Round::FIRST, slot);
                let high = MatchupSlot::from_entry(&entries[pair[0] as usize - 1]);
                match entries.get(pair[1] as usize - 1) {
                    Some(low) => Matchup::new(id, high, MatchupSlot::from_entry(low)),
                    None => Matchup::bye(id, high),
                }
            })
            .collect();

        log::info!(
            "Seeded {field} competitors into a {padded}-slot bracket ({} byes, {total_rounds} rounds)",
            padded - field
        );

        Ok(SeededField {
            entries,
            round_one,
            total_rounds,
        })
    }

    /// Standard bracket order for a power-of-two field, e.g.
    /// `[1, 8, 4, 5, 2, 7, 3, 6]` for 8. Consecutive pairs are round-one
    /// matchups, and each pair sums to `size + 1`.
    pub fn slot_order(size: usize) -> Vec<Seed> {
        let mut order: Vec<Seed> = vec![1];
        while order.len() < size {
            let sum = (order.len() * 2 + 1) as Seed;
            order = order.iter().flat_map(|&seed| [seed, sum - seed]).collect();
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::Points;
    use uuid::Uuid;

    fn field(scores: &[i64]) -> Vec<CompetitorSubmission> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| {
                CompetitorSubmission::new(Uuid::new_v4(), format!("Team {i}"), Points::new(score))
            })
            .collect()
    }

    fn seeds(matchup: &Matchup) -> (Seed, Option<Seed>) {
        (matchup.player1().seed, matchup.player2().map(|p| p.seed))
    }

    #[test]
    fn test_slot_order() {
        assert_eq!(BracketSeeder::slot_order(2), vec![1, 2]);
        assert_eq!(BracketSeeder::slot_order(4), vec![1, 4, 2, 3]);
        assert_eq!(BracketSeeder::slot_order(8), vec![1, 8, 4, 5, 2, 7, 3, 6]);
    }

    #[test]
    fn test_too_small() {
        assert!(matches!(
            BracketSeeder::seed(&field(&[1000])),
            Err(BracketError::InvalidFieldSize(1))
        ));
        assert!(matches!(
            BracketSeeder::seed(&[]),
            Err(BracketError::InvalidFieldSize(0))
        ));
    }

    #[test]
    fn test_duplicate_competitor() {
        let mut competitors = field(&[1000, 900]);
        competitors[1].id = competitors[0].id;
        assert!(matches!(
            BracketSeeder::seed(&competitors),
            Err(BracketError::DuplicateCompetitor(_))
        ));
    }

    #[test]
    fn test_out_of_range_regular_season_score() {
        let mut competitors = field(&[1000, 900]);
        competitors[0].regular_season_score = Points::from_hundredths(i64::MAX);
        assert!(matches!(
            BracketSeeder::seed(&competitors),
            Err(BracketError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_four_competitors() {
        let competitors = field(&[1200, 1500, 1100, 1400]);
        let seeded = BracketSeeder::seed(&competitors).unwrap();

        assert_eq!(seeded.total_rounds, 2);
        assert_eq!(seeded.entries[0].id, competitors[1].id);
        assert_eq!(seeded.entries[3].id, competitors[2].id);

        let pairs: Vec<_> = seeded.round_one.iter().map(seeds).collect();
        assert_eq!(pairs, vec![(1, Some(4)), (2, Some(3))]);
    }

    #[test]
    fn test_tied_scores_keep_submission_order() {
        let competitors = field(&[1000, 1000, 1000]);
        let seeded = BracketSeeder::seed(&competitors).unwrap();

        let ids: Vec<_> = seeded.entries.iter().map(|e| e.id).collect();
        let submitted: Vec<_> = competitors.iter().map(|c| c.id).collect();
        assert_eq!(ids, submitted);
    }

    #[test]
    fn test_byes_go_to_top_seeds() {
        let seeded = BracketSeeder::seed(&field(&[900, 800, 700, 600, 500, 400])).unwrap();

        assert_eq!(seeded.total_rounds, 3);
        let pairs: Vec<_> = seeded.round_one.iter().map(seeds).collect();
        assert_eq!(
            pairs,
            vec![(1, None), (4, Some(5)), (2, None), (3, Some(6))]
        );
        assert!(seeded.round_one[0].is_bye());
        assert!(seeded.round_one[0].is_completed());
        assert!(!seeded.round_one[1].is_completed());
    }

    #[test]
    fn test_matchup_ids() {
        let seeded = BracketSeeder::seed(&field(&[5, 4, 3, 2, 1])).unwrap();
        let ids: Vec<String> = seeded.round_one.iter().map(|m| m.id().to_string()).collect();
        assert_eq!(ids, vec!["R1-M1", "R1-M2", "R1-M3", "R1-M4"]);
    }
}
