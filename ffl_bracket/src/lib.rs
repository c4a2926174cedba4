//! # FFL Bracket
//!
//! A single-elimination playoff engine for fantasy football leagues.
//!
//! Competitors are seeded by regular-season score into a bracket padded to a
//! power of two, with byes for the top seeds. Each round, competitors'
//! scores are recorded against their matchups. Once every matchup in a round
//! is decided, the losers are eliminated and the winners are paired into the
//! next round, until the final produces a champion.
//!
//! ## Core Modules
//!
//! - [`bracket`]: Seeding, matchups, tiebreaks, advancement and the [`BracketManager`]
//! - [`db`]: Bracket persistence (in-memory and PostgreSQL)
//!
//! ## Ties
//!
//! Exactly equal scores are settled by an ordered [`TiebreakerPolicy`]
//! (bench points, then regular-season score, then seed by default). Each
//! rule is a small type dispatched through `enum_dispatch`.
//!
//! ## Example
//!
//! ```
//! use ffl_bracket::{Bracket, CompetitorSubmission, Points, TiebreakerPolicy};
//! use uuid::Uuid;
//!
//! let field = vec![
//!     CompetitorSubmission::new(Uuid::new_v4(), "Alice", Points::new(1500)),
//!     CompetitorSubmission::new(Uuid::new_v4(), "Bob", Points::new(1400)),
//!     CompetitorSubmission::new(Uuid::new_v4(), "Carol", Points::new(1300)),
//! ];
//!
//! let mut bracket = Bracket::new(Uuid::new_v4(), "Playoffs", field, TiebreakerPolicy::default())?;
//! bracket.generate()?;
//! assert_eq!(bracket.total_rounds(), 2);
//! # Ok::<(), ffl_bracket::BracketError>(())
//! ```

/// Bracket domain: seeding, matchups, tiebreaks, advancement.
pub mod bracket;
pub use bracket::{
    Bracket, BracketError, BracketManager, BracketResult, CompetitorId, CompetitorScore,
    CompetitorSubmission, Matchup, MatchupId, Points, Round, RoundOutcome, ScoreBreakdown,
    TiebreakerPolicy, TournamentId,
};

/// Bracket persistence.
pub mod db;
