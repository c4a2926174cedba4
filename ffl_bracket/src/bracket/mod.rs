//! Single-elimination playoff brackets.
//!
//! This module provides:
//! - Seeding by regular-season score, with byes for fields that are not a power of two
//! - Per-matchup score tracking and winner determination
//! - Configurable tiebreak rules for exact score ties
//! - Round advancement and elimination tracking
//! - [`BracketManager`], an async service layer over a [`crate::db::BracketRepository`]
//!
//! ## Example
//!
//! ```no_run
//! use ffl_bracket::bracket::{BracketManager, CompetitorSubmission, Points, Round, ScoreBreakdown};
//! use ffl_bracket::db::InMemoryBracketRepository;
//! use std::sync::Arc;
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = BracketManager::new(Arc::new(InMemoryBracketRepository::new()));
//!
//!     let alice = CompetitorSubmission::new(Uuid::new_v4(), "Alice", Points::new(1500));
//!     let bob = CompetitorSubmission::new(Uuid::new_v4(), "Bob", Points::new(1400));
//!     let tournament_id = Uuid::new_v4();
//!
//!     manager
//!         .initialize_bracket(tournament_id, "Championship", vec![alice.clone(), bob.clone()], None)
//!         .await?;
//!
//!     for (competitor, points) in [(alice.id, 142), (bob.id, 118)] {
//!         manager
//!             .record_competitor_score(
//!                 tournament_id,
//!                 Round::FIRST,
//!                 competitor,
//!                 Points::new(points),
//!                 ScoreBreakdown::default(),
//!             )
//!             .await?;
//!     }
//!
//!     let outcome = manager.advance_round(tournament_id, Round::FIRST).await?;
//!     assert!(outcome.tournament_complete);
//!
//!     Ok(())
//! }
//! ```

pub mod advancement;
pub mod aggregate;
pub mod errors;
pub mod manager;
pub mod matchup;
pub mod models;
pub mod scoring;
pub mod seeder;
pub mod tiebreaker;

pub use advancement::{AdvancementPlan, AdvancementProcess};
pub use aggregate::{Bracket, DEFAULT_START_WEEK};
pub use errors::{BracketError, BracketResult, ErrorKind};
pub use manager::{BracketManager, DEFAULT_MAX_COMMIT_ATTEMPTS, MatchupDetails, MatchupLookup};
pub use matchup::{Matchup, MatchupResult, MatchupSlot, MatchupStatus, Side};
pub use models::{
    BracketStatus, CompetitorEntry, CompetitorId, CompetitorScore, CompetitorSubmission, MatchupId,
    Points, Position, PositionScore, Round, RoundOutcome, ScoreBreakdown, Seed, Standing,
    TournamentId,
};
pub use scoring::{InMemoryScoreSource, ScoreSource};
pub use seeder::{BracketSeeder, SeededField};
pub use tiebreaker::{
    TiebreakInput, TiebreakRecord, TiebreakRule, TiebreakRuleFn, TiebreakerPolicy,
    TiebreakerResult,
};
