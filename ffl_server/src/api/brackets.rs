//! Bracket endpoints.
//!
//! Thin JSON wrappers over [`BracketManager`](ffl_bracket::bracket::BracketManager).
//! Every failure is returned as an [`ErrorResponse`](super::error::ErrorResponse).

use super::{AppState, error::ApiError, request_id::RequestId};
use crate::{logging, metrics};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use ffl_bracket::bracket::{
    Bracket, BracketError, BracketResult, BracketStatus, CompetitorEntry, CompetitorId,
    CompetitorSubmission, Matchup, MatchupDetails, MatchupId, MatchupLookup, Points, Round,
    RoundOutcome, ScoreBreakdown, Standing, TiebreakRule, TiebreakerPolicy, TournamentId,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

type ApiResult<T> = Result<T, ApiError>;

/// Create bracket request
#[derive(Debug, Serialize, Deserialize)]
pub struct InitializeBracketRequest {
    /// Generated when omitted
    #[serde(default)]
    pub tournament_id: Option<TournamentId>,
    pub name: String,
    pub competitors: Vec<CompetitorSubmission>,
    /// Rule names in order, e.g. `["bench", "most_touchdowns"]`.
    /// The server default applies when omitted.
    #[serde(default)]
    pub tiebreaker: Option<Vec<String>>,
}

/// Score report for one competitor in one round
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordScoreRequest {
    pub competitor_id: CompetitorId,
    pub score: Points,
    #[serde(default)]
    pub breakdown: ScoreBreakdown,
}

/// One round of a bracket
#[derive(Debug, Serialize, Deserialize)]
pub struct RoundView {
    pub round: Round,
    pub name: String,
    pub week: u32,
    pub matchups: Vec<Matchup>,
}

/// Full bracket as returned by the API
#[derive(Debug, Serialize, Deserialize)]
pub struct BracketView {
    pub tournament_id: TournamentId,
    pub name: String,
    pub status: BracketStatus,
    pub version: u64,
    pub total_rounds: u32,
    pub current_round: Option<Round>,
    pub start_week: u32,
    pub champion: Option<CompetitorId>,
    /// Tiebreak rule names, comma separated
    pub tiebreaker: String,
    /// Competitors in seed order
    pub competitors: Vec<CompetitorEntry>,
    pub rounds: Vec<RoundView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoundView {
    fn new(bracket: &Bracket, round: Round) -> Self {
        Self {
            round,
            name: bracket.round_name(round),
            week: bracket.week_for_round(round),
            matchups: bracket.matchups_for_round(round).to_vec(),
        }
    }
}

impl From<&Bracket> for BracketView {
    fn from(bracket: &Bracket) -> Self {
        let rounds = (1..=bracket.rounds().len() as u32)
            .map(|number| RoundView::new(bracket, Round::new(number)))
            .collect();

        Self {
            tournament_id: bracket.tournament_id(),
            name: bracket.name().to_string(),
            status: bracket.status(),
            version: bracket.version(),
            total_rounds: bracket.total_rounds(),
            current_round: bracket.current_round(),
            start_week: bracket.start_week(),
            champion: bracket.champion(),
            tiebreaker: bracket.policy().describe(),
            competitors: bracket.competitors().cloned().collect(),
            rounds,
            created_at: bracket.created_at(),
            updated_at: bracket.updated_at(),
        }
    }
}

/// Elimination check response
#[derive(Debug, Serialize, Deserialize)]
pub struct EliminationResponse {
    pub tournament_id: TournamentId,
    pub competitor_id: CompetitorId,
    pub eliminated: bool,
}

/// Log a failed operation and wrap the error for the response
fn failed(
    operation: &'static str,
    tournament_id: TournamentId,
) -> impl FnOnce(BracketError) -> ApiError {
    move |err| {
        logging::log_bracket_error(operation, tournament_id, &err);
        metrics::bracket_errors_total(operation, err.kind());
        ApiError(err)
    }
}

fn parse_policy(names: &[String]) -> BracketResult<TiebreakerPolicy> {
    let rules = names
        .iter()
        .map(|name| name.parse())
        .collect::<BracketResult<Vec<TiebreakRule>>>()?;
    TiebreakerPolicy::new(rules)
}

/// Seed a field and generate round one.
///
/// # Endpoint
///
/// `POST /api/v1/brackets`
///
/// # Request Body
///
/// ```json
/// {
///   "name": "2026 Playoffs",
///   "competitors": [
///     { "id": "6f1c...", "name": "Gridiron Gurus", "regular_season_score": 184250 }
///   ],
///   "tiebreaker": ["bench", "regular_season"]
/// }
/// ```
///
/// # Responses
///
/// - `201 Created`: the new bracket
/// - `409 Conflict`: fewer than two competitors, duplicate IDs or the tournament already has a bracket
/// - `422 Unprocessable Entity`: unknown or misordered tiebreak rules
pub async fn initialize_bracket(
    State(state): State<AppState>,
    Json(request): Json<InitializeBracketRequest>,
) -> ApiResult<(StatusCode, Json<BracketView>)> {
    let tournament_id = request.tournament_id.unwrap_or_else(Uuid::new_v4);
    let fail = || failed("initialize_bracket", tournament_id);

    let policy = request
        .tiebreaker
        .as_deref()
        .map(parse_policy)
        .transpose()
        .map_err(fail())?;

    let bracket = state
        .bracket_manager
        .initialize_bracket(tournament_id, request.name, request.competitors, policy)
        .await
        .map_err(fail())?;

    metrics::brackets_created_total(bracket.competitors().count());
    logging::log_bracket_event(
        "bracket_initialized",
        tournament_id,
        &format!(
            "{} competitors over {} rounds, tiebreak {}",
            bracket.competitors().count(),
            bracket.total_rounds(),
            bracket.policy().describe()
        ),
    );

    Ok((StatusCode::CREATED, Json(BracketView::from(&bracket))))
}

/// Get a bracket with every generated round.
///
/// `GET /api/v1/brackets/{tournament_id}`
pub async fn get_bracket(
    State(state): State<AppState>,
    Path(tournament_id): Path<TournamentId>,
) -> ApiResult<Json<BracketView>> {
    let bracket = state
        .bracket_manager
        .get_bracket(tournament_id)
        .await
        .map_err(failed("get_bracket", tournament_id))?;

    Ok(Json(BracketView::from(&bracket)))
}

/// List the matchups of one round in bracket order.
///
/// `GET /api/v1/brackets/{tournament_id}/rounds/{round}/matchups`
///
/// Returns `409 Conflict` for a round that has not been generated yet.
pub async fn list_round_matchups(
    State(state): State<AppState>,
    Path((tournament_id, round)): Path<(TournamentId, u32)>,
) -> ApiResult<Json<RoundView>> {
    let fail = || failed("list_round_matchups", tournament_id);
    let round = Round::new(round);

    let bracket = state
        .bracket_manager
        .get_bracket(tournament_id)
        .await
        .map_err(fail())?;

    if bracket.matchups_for_round(round).is_empty() {
        return Err(fail()(BracketError::RoundNotStarted(round)));
    }

    Ok(Json(RoundView::new(&bracket, round)))
}

/// Get one matchup by its slot within the round (1-based).
///
/// `GET /api/v1/brackets/{tournament_id}/rounds/{round}/matchups/{slot}`
pub async fn get_matchup(
    State(state): State<AppState>,
    Path((tournament_id, round, slot)): Path<(TournamentId, u32, u32)>,
) -> ApiResult<Json<MatchupDetails>> {
    let round = Round::new(round);
    let details = state
        .bracket_manager
        .get_matchup(
            tournament_id,
            round,
            MatchupLookup::Id(MatchupId::new(round, slot)),
        )
        .await
        .map_err(failed("get_matchup", tournament_id))?;

    Ok(Json(details))
}

/// Get the matchup a competitor plays in a round.
///
/// `GET /api/v1/brackets/{tournament_id}/rounds/{round}/competitors/{competitor_id}/matchup`
pub async fn get_competitor_matchup(
    State(state): State<AppState>,
    Path((tournament_id, round, competitor_id)): Path<(TournamentId, u32, CompetitorId)>,
) -> ApiResult<Json<MatchupDetails>> {
    let details = state
        .bracket_manager
        .get_matchup(
            tournament_id,
            Round::new(round),
            MatchupLookup::Competitor(competitor_id),
        )
        .await
        .map_err(failed("get_competitor_matchup", tournament_id))?;

    Ok(Json(details))
}

/// Standings query parameters
#[derive(Debug, Default, Deserialize)]
pub struct StandingsQuery {
    /// Rank by running totals through the round instead of the round alone
    #[serde(default)]
    pub cumulative: bool,
}

/// Round score table, highest score first.
///
/// `GET /api/v1/brackets/{tournament_id}/rounds/{round}/standings[?cumulative=true]`
pub async fn get_round_standings(
    State(state): State<AppState>,
    Path((tournament_id, round)): Path<(TournamentId, u32)>,
    Query(query): Query<StandingsQuery>,
) -> ApiResult<Json<Vec<Standing>>> {
    let fail = || failed("get_round_standings", tournament_id);
    let round = Round::new(round);

    let bracket = state
        .bracket_manager
        .get_bracket(tournament_id)
        .await
        .map_err(fail())?;

    if bracket.matchups_for_round(round).is_empty() {
        return Err(fail()(BracketError::RoundNotStarted(round)));
    }

    let standings = if query.cumulative {
        bracket.cumulative_standings(round)
    } else {
        bracket.round_standings(round)
    };
    Ok(Json(standings))
}

/// Record a competitor's score for a round.
///
/// # Endpoint
///
/// `POST /api/v1/brackets/{tournament_id}/rounds/{round}/scores`
///
/// # Request Body
///
/// ```json
/// {
///   "competitor_id": "6f1c...",
///   "score": 13245,
///   "breakdown": { "bench": 1420, "touchdowns": 4, "turnovers": 1 }
/// }
/// ```
///
/// # Responses
///
/// - `200 OK`: the competitor's matchup after the score was applied
/// - `404 Not Found`: unknown bracket or competitor
/// - `409 Conflict`: competitor is eliminated, has no matchup this round, or the matchup is decided
/// - `422 Unprocessable Entity`: breakdown does not add up to the score
pub async fn record_score(
    State(state): State<AppState>,
    Path((tournament_id, round)): Path<(TournamentId, u32)>,
    Json(request): Json<RecordScoreRequest>,
) -> ApiResult<Json<MatchupDetails>> {
    let fail = || failed("record_score", tournament_id);
    let round = Round::new(round);

    state
        .bracket_manager
        .record_competitor_score(
            tournament_id,
            round,
            request.competitor_id,
            request.score,
            request.breakdown,
        )
        .await
        .map_err(fail())?;

    metrics::scores_recorded_total();
    tracing::debug!(
        tournament_id = %tournament_id,
        round = round.number(),
        competitor_id = %request.competitor_id,
        score = %request.score,
        "Score recorded"
    );

    let details = state
        .bracket_manager
        .get_matchup(
            tournament_id,
            round,
            MatchupLookup::Competitor(request.competitor_id),
        )
        .await
        .map_err(fail())?;

    Ok(Json(details))
}

/// Close out a round: resolve ties, eliminate losers and pair the winners.
///
/// # Endpoint
///
/// `POST /api/v1/brackets/{tournament_id}/rounds/{round}/advance`
///
/// Repeating the call for a round that is already closed returns the same
/// outcome without changing the bracket.
///
/// # Responses
///
/// - `200 OK`: the round outcome
/// - `409 Conflict`: scores are still missing (`retryable: true`) or the round has not started
pub async fn advance_round(
    State(state): State<AppState>,
    request_id: RequestId,
    Path((tournament_id, round)): Path<(TournamentId, u32)>,
) -> ApiResult<Json<RoundOutcome>> {
    let round = Round::new(round);
    let started = Instant::now();

    let outcome = state
        .bracket_manager
        .advance_round(tournament_id, round)
        .await
        .map_err(failed("advance_round", tournament_id))?;

    logging::log_performance(
        "advance_round",
        started.elapsed().as_millis() as u64,
        Some(&format!("{round}, request {}", request_id.as_str())),
    );
    logging::log_round_advanced(tournament_id, &outcome);
    metrics::round_advanced(&outcome);

    Ok(Json(outcome))
}

/// Whether a competitor has been knocked out.
///
/// `GET /api/v1/brackets/{tournament_id}/competitors/{competitor_id}/eliminated`
pub async fn is_eliminated(
    State(state): State<AppState>,
    Path((tournament_id, competitor_id)): Path<(TournamentId, CompetitorId)>,
) -> ApiResult<Json<EliminationResponse>> {
    let eliminated = state
        .bracket_manager
        .is_eliminated(tournament_id, competitor_id)
        .await
        .map_err(failed("is_eliminated", tournament_id))?;

    Ok(Json(EliminationResponse {
        tournament_id,
        competitor_id,
        eliminated,
    }))
}
