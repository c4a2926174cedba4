//! Tiebreak rules and the ordered policy that applies them.
//!
//! Each rule is a small unit struct implementing [`TiebreakRuleFn`]. The
//! [`TiebreakRule`] enum dispatches over them with `enum_dispatch`, and a
//! [`TiebreakerPolicy`] walks its rules in order until one is decisive.
//! Seed comparison is always the last rule, so every policy produces a
//! winner for two competitors with distinct seeds.

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};

use super::errors::{BracketError, BracketResult};
use super::matchup::Side;
use super::models::{Points, ScoreBreakdown, Seed};

/// One competitor's side of a tie
#[derive(Debug, Clone, Copy)]
pub struct TiebreakInput<'a> {
    pub breakdown: &'a ScoreBreakdown,
    pub seed: Seed,
    pub regular_season: Points,
}

/// Outcome of a single rule comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    /// `Greater` means the first competitor wins
    pub ordering: Ordering,
    pub a_value: String,
    pub b_value: String,
}

impl RuleVerdict {
    fn higher_wins<T: Ord + fmt::Display>(a: T, b: T) -> Self {
        Self {
            ordering: a.cmp(&b),
            a_value: a.to_string(),
            b_value: b.to_string(),
        }
    }

    fn lower_wins<T: Ord + fmt::Display>(a: T, b: T) -> Self {
        Self {
            ordering: b.cmp(&a),
            a_value: a.to_string(),
            b_value: b.to_string(),
        }
    }
}

/// A pure comparison between two tied competitors
#[enum_dispatch]
pub trait TiebreakRuleFn {
    /// Stable rule name, used in configuration and tiebreak records
    fn name(&self) -> &'static str;

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict;
}

/// More points left on the bench wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchPoints;

impl TiebreakRuleFn for BenchPoints {
    fn name(&self) -> &'static str {
        "bench"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::higher_wins(a.breakdown.bench, b.breakdown.bench)
    }
}

/// Higher regular-season score wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularSeasonPoints;

impl TiebreakRuleFn for RegularSeasonPoints {
    fn name(&self) -> &'static str {
        "regular_season"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::higher_wins(a.regular_season, b.regular_season)
    }
}

/// Best single roster position wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighestPosition;

impl TiebreakRuleFn for HighestPosition {
    fn name(&self) -> &'static str {
        "highest_position"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::higher_wins(
            a.breakdown.highest_position_score(),
            b.breakdown.highest_position_score(),
        )
    }
}

/// Second-best roster position wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondHighestPosition;

impl TiebreakRuleFn for SecondHighestPosition {
    fn name(&self) -> &'static str {
        "second_highest_position"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::higher_wins(
            a.breakdown.second_highest_position_score(),
            b.breakdown.second_highest_position_score(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MostTouchdowns;

impl TiebreakRuleFn for MostTouchdowns {
    fn name(&self) -> &'static str {
        "most_touchdowns"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::higher_wins(a.breakdown.touchdowns, b.breakdown.touchdowns)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FewerTurnovers;

impl TiebreakRuleFn for FewerTurnovers {
    fn name(&self) -> &'static str {
        "fewer_turnovers"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::lower_wins(a.breakdown.turnovers, b.breakdown.turnovers)
    }
}

/// Numerically lower seed wins. Always the last rule of a policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedFallback;

impl TiebreakRuleFn for SeedFallback {
    fn name(&self) -> &'static str {
        "seed"
    }

    fn compare(&self, a: &TiebreakInput<'_>, b: &TiebreakInput<'_>) -> RuleVerdict {
        RuleVerdict::lower_wins(a.seed, b.seed)
    }
}

/// Any tiebreak rule
#[enum_dispatch(TiebreakRuleFn)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TiebreakRule {
    BenchPoints,
    RegularSeasonPoints,
    HighestPosition,
    SecondHighestPosition,
    MostTouchdowns,
    FewerTurnovers,
    SeedFallback,
}

impl TiebreakRule {
    /// Every available rule, in declaration order
    pub fn all() -> [TiebreakRule; 7] {
        [
            BenchPoints.into(),
            RegularSeasonPoints.into(),
            HighestPosition.into(),
            SecondHighestPosition.into(),
            MostTouchdowns.into(),
            FewerTurnovers.into(),
            SeedFallback.into(),
        ]
    }
}

impl FromStr for TiebreakRule {
    type Err = BracketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all()
            .into_iter()
            .find(|rule| rule.name() == wanted)
            .ok_or_else(|| BracketError::InvalidTiebreaker(format!("unknown rule '{s}'")))
    }
}

impl TryFrom<String> for TiebreakRule {
    type Error = BracketError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TiebreakRule> for String {
    fn from(rule: TiebreakRule) -> Self {
        rule.name().to_string()
    }
}

impl fmt::Display for TiebreakRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which rule broke a tie and the values it compared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiebreakRecord {
    pub rule: String,
    pub winner_value: String,
    pub loser_value: String,
}

/// Resolved tie
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiebreakerResult {
    /// `Player1` is the first input passed to [`TiebreakerPolicy::resolve`]
    pub winner: Side,
    pub record: TiebreakRecord,
}

/// Ordered, immutable list of tiebreak rules ending in [`SeedFallback`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<TiebreakRule>", into = "Vec<TiebreakRule>")]
pub struct TiebreakerPolicy {
    rules: Vec<TiebreakRule>,
}

impl TiebreakerPolicy {
    /// Build a policy from an ordered rule list.
    ///
    /// The seed rule is appended when missing. Duplicate rules, or a seed
    /// rule anywhere but last, are rejected.
    pub fn new(rules: Vec<TiebreakRule>) -> BracketResult<Self> {
        let mut checked: Vec<TiebreakRule> = Vec::with_capacity(rules.len() + 1);
        for rule in rules {
            if checked.contains(&rule) {
                return Err(BracketError::InvalidTiebreaker(format!(
                    "rule '{rule}' listed twice"
                )));
            }
            checked.push(rule);
        }

        let seed = TiebreakRule::from(SeedFallback);
        match checked.iter().position(|rule| *rule == seed) {
            None => checked.push(seed),
            Some(idx) if idx + 1 == checked.len() => {}
            Some(_) => {
                return Err(BracketError::InvalidTiebreaker(
                    "the seed rule must be last".to_string(),
                ));
            }
        }

        Ok(Self { rules: checked })
    }

    /// Parse a comma-separated list such as `"bench,regular_season"`.
    pub fn from_names(names: &str) -> BracketResult<Self> {
        let rules = names
            .split(',')
            .filter(|name| !name.trim().is_empty())
            .map(str::parse)
            .collect::<BracketResult<Vec<TiebreakRule>>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[TiebreakRule] {
        &self.rules
    }

    /// Rule names in order, comma separated
    pub fn describe(&self) -> String {
        self.rules
            .iter()
            .map(TiebreakRuleFn::name)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decide a tie between `a` and `b`.
    ///
    /// Returns the first decisive rule's verdict. Two competitors that
    /// still compare equal after the seed rule share a seed, which the
    /// seeder never produces.
    pub fn resolve(
        &self,
        a: &TiebreakInput<'_>,
        b: &TiebreakInput<'_>,
    ) -> BracketResult<TiebreakerResult> {
        for rule in &self.rules {
            let verdict = rule.compare(a, b);
            let (winner, winner_value, loser_value) = match verdict.ordering {
                Ordering::Equal => continue,
                Ordering::Greater => (Side::Player1, verdict.a_value, verdict.b_value),
                Ordering::Less => (Side::Player2, verdict.b_value, verdict.a_value),
            };

            log::debug!(
                "Tie resolved by '{}' ({winner_value} vs {loser_value})",
                rule.name()
            );

            return Ok(TiebreakerResult {
                winner,
                record: TiebreakRecord {
                    rule: rule.name().to_string(),
                    winner_value,
                    loser_value,
                },
            });
        }

        Err(BracketError::invariant(format!(
            "tie between two competitors sharing seed {}",
            a.seed
        )))
    }
}

impl Default for TiebreakerPolicy {
    /// bench, regular_season, seed
    fn default() -> Self {
        Self {
            rules: vec![
                BenchPoints.into(),
                RegularSeasonPoints.into(),
                SeedFallback.into(),
            ],
        }
    }
}

impl TryFrom<Vec<TiebreakRule>> for TiebreakerPolicy {
    type Error = BracketError;

    fn try_from(rules: Vec<TiebreakRule>) -> Result<Self, Self::Error> {
        Self::new(rules)
    }
}

impl From<TiebreakerPolicy> for Vec<TiebreakRule> {
    fn from(policy: TiebreakerPolicy) -> Self {
        policy.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::{Position, PositionScore};

    fn input(breakdown: &ScoreBreakdown, seed: Seed, regular: i64) -> TiebreakInput<'_> {
        TiebreakInput {
            breakdown,
            seed,
            regular_season: Points::new(regular),
        }
    }

    #[test]
    fn test_default_order() {
        let policy = TiebreakerPolicy::default();
        assert_eq!(policy.describe(), "bench,regular_season,seed");
    }

    #[test]
    fn test_bench_decides() {
        let a = ScoreBreakdown::with_bench(Points::new(10));
        let b = ScoreBreakdown::with_bench(Points::new(25));

        let result = TiebreakerPolicy::default()
            .resolve(&input(&a, 1, 1500), &input(&b, 4, 1200))
            .unwrap();

        assert_eq!(result.winner, Side::Player2);
        assert_eq!(result.record.rule, "bench");
        assert_eq!(result.record.winner_value, "25.00");
        assert_eq!(result.record.loser_value, "10.00");
    }

    #[test]
    fn test_falls_through_to_regular_season() {
        let a = ScoreBreakdown::with_bench(Points::new(10));
        let b = ScoreBreakdown::with_bench(Points::new(10));

        let result = TiebreakerPolicy::default()
            .resolve(&input(&a, 3, 1500), &input(&b, 2, 1200))
            .unwrap();

        assert_eq!(result.winner, Side::Player1);
        assert_eq!(result.record.rule, "regular_season");
    }

    #[test]
    fn test_seed_fallback() {
        let a = ScoreBreakdown::default();
        let b = ScoreBreakdown::default();

        let result = TiebreakerPolicy::default()
            .resolve(&input(&a, 5, 1200), &input(&b, 4, 1200))
            .unwrap();

        assert_eq!(result.winner, Side::Player2);
        assert_eq!(result.record.rule, "seed");
        assert_eq!(result.record.winner_value, "4");
    }

    #[test]
    fn test_equal_seeds_is_invariant_violation() {
        let a = ScoreBreakdown::default();
        let result = TiebreakerPolicy::default().resolve(&input(&a, 2, 1200), &input(&a, 2, 1200));
        assert!(matches!(result, Err(BracketError::InvariantViolation(_))));
    }

    #[test]
    fn test_position_rules() {
        let a = ScoreBreakdown {
            positions: vec![
                PositionScore::new(Position::Qb, Points::new(30)),
                PositionScore::new(Position::Wr, Points::new(10)),
            ],
            ..Default::default()
        };
        let b = ScoreBreakdown {
            positions: vec![
                PositionScore::new(Position::Qb, Points::new(30)),
                PositionScore::new(Position::Rb, Points::new(12)),
            ],
            ..Default::default()
        };

        let policy = TiebreakerPolicy::from_names("highest_position,second_highest_position").unwrap();
        let result = policy.resolve(&input(&a, 1, 0), &input(&b, 2, 0)).unwrap();

        assert_eq!(result.winner, Side::Player2);
        assert_eq!(result.record.rule, "second_highest_position");
    }

    #[test]
    fn test_fewer_turnovers_wins() {
        let a = ScoreBreakdown {
            turnovers: 3,
            ..Default::default()
        };
        let b = ScoreBreakdown {
            turnovers: 1,
            ..Default::default()
        };

        let policy = TiebreakerPolicy::from_names("fewer_turnovers").unwrap();
        let result = policy.resolve(&input(&a, 1, 0), &input(&b, 2, 0)).unwrap();

        assert_eq!(result.winner, Side::Player2);
        assert_eq!(result.record.rule, "fewer_turnovers");
    }

    #[test]
    fn test_policy_validation() {
        assert!(matches!(
            TiebreakerPolicy::from_names("bench,bench"),
            Err(BracketError::InvalidTiebreaker(_))
        ));
        assert!(matches!(
            TiebreakerPolicy::from_names("seed,bench"),
            Err(BracketError::InvalidTiebreaker(_))
        ));
        assert!(matches!(
            TiebreakerPolicy::from_names("coin_flip"),
            Err(BracketError::InvalidTiebreaker(_))
        ));

        let policy = TiebreakerPolicy::from_names("most_touchdowns, bench").unwrap();
        assert_eq!(policy.describe(), "most_touchdowns,bench,seed");

        let policy = TiebreakerPolicy::from_names("").unwrap();
        assert_eq!(policy.describe(), "seed");
    }

    #[test]
    fn test_policy_serde() {
        let policy = TiebreakerPolicy::from_names("bench,fewer_turnovers").unwrap();
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"["bench","fewer_turnovers","seed"]"#);

        let parsed: TiebreakerPolicy = serde_json::from_str(r#"["regular_season"]"#).unwrap();
        assert_eq!(parsed.describe(), "regular_season,seed");

        assert!(serde_json::from_str::<TiebreakerPolicy>(r#"["nope"]"#).is_err());
    }
}
