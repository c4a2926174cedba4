//! Integration tests for the bracket HTTP API.
//!
//! Every test runs against the in-memory store, so no database is needed.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use ffl_bracket::bracket::BracketManager;
use ffl_bracket::db::InMemoryBracketRepository;
use ffl_server::api::{AppState, create_router, request_id::REQUEST_ID_HEADER};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;

fn create_test_server() -> Router {
    let manager = BracketManager::new(Arc::new(InMemoryBracketRepository::new()))
        .with_start_week(15)
        .with_max_commit_attempts(16);
    create_router(AppState::new(manager))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Four competitors; seed N has id `ids[N - 1]`
fn four_competitors() -> (Vec<Uuid>, Value) {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let competitors = json!([
        { "id": ids[2], "name": "Third", "regular_season_score": 130_000 },
        { "id": ids[0], "name": "First", "regular_season_score": 150_000 },
        { "id": ids[3], "name": "Fourth", "regular_season_score": 120_000 },
        { "id": ids[1], "name": "Second", "regular_season_score": 140_000 },
    ]);
    (ids, competitors)
}

async fn create_bracket(app: &Router) -> (Uuid, Vec<Uuid>) {
    let tournament = Uuid::new_v4();
    let (ids, competitors) = four_competitors();
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/brackets",
        Some(json!({
            "tournament_id": tournament,
            "name": "Championship League",
            "competitors": competitors,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    (tournament, ids)
}

async fn report(app: &Router, tournament: Uuid, round: u32, score: Value) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/api/v1/brackets/{tournament}/rounds/{round}/scores"),
        Some(score),
    )
    .await
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_server();

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_server();

    let request = Request::builder()
        .uri("/health")
        .header(REQUEST_ID_HEADER, "trace-42")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "trace-42");

    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let generated = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(Uuid::parse_str(generated).is_ok());
}

// ============================================================================
// Bracket Creation Tests
// ============================================================================

#[tokio::test]
async fn test_create_bracket_seeds_field() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    let (status, body) = send(&app, "GET", &format!("/api/v1/brackets/{tournament}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in_progress");
    assert_eq!(body["total_rounds"], 2);
    assert_eq!(body["current_round"], 1);
    assert_eq!(body["tiebreaker"], "bench,regular_season,seed");
    assert_eq!(body["version"], 1);

    let seeds: Vec<(String, u64)> = body["competitors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["id"].as_str().unwrap().to_string(), c["seed"].as_u64().unwrap()))
        .collect();
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(seeds[i], (id.to_string(), i as u64 + 1));
    }

    let round_one = &body["rounds"][0];
    assert_eq!(round_one["name"], "Conference Championship");
    assert_eq!(round_one["week"], 15);
    let matchups = round_one["matchups"].as_array().unwrap();
    assert_eq!(matchups.len(), 2);
    assert_eq!(matchups[0]["player1"]["seed"], 1);
    assert_eq!(matchups[0]["player2"]["seed"], 4);
    assert_eq!(matchups[1]["player1"]["seed"], 2);
    assert_eq!(matchups[1]["player2"]["seed"], 3);
}

#[tokio::test]
async fn test_create_bracket_with_custom_tiebreaker() {
    let app = create_test_server();
    let (_, competitors) = four_competitors();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/brackets",
        Some(json!({
            "name": "Custom",
            "competitors": competitors,
            "tiebreaker": ["most_touchdowns", "bench"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["tiebreaker"], "most_touchdowns,bench,seed");
    assert!(Uuid::parse_str(body["tournament_id"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_create_bracket_rejects_bad_input() {
    let app = create_test_server();
    let (_, competitors) = four_competitors();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/brackets",
        Some(json!({
            "name": "Coin Flip League",
            "competitors": competitors,
            "tiebreaker": ["coin_flip"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retryable"], false);

    let (status, _) = send(
        &app,
        "POST",
        "/api/v1/brackets",
        Some(json!({
            "name": "Solo",
            "competitors": [{ "id": Uuid::new_v4(), "name": "Alone", "regular_season_score": 0 }],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_bracket_twice_conflicts() {
    let app = create_test_server();
    let (tournament, _) = create_bracket(&app).await;
    let (_, competitors) = four_competitors();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/brackets",
        Some(json!({
            "tournament_id": tournament,
            "name": "Again",
            "competitors": competitors,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains(&tournament.to_string()));
}

// ============================================================================
// Round Play Tests
// ============================================================================

#[tokio::test]
async fn test_full_round_with_tiebreak() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    for (competitor, score, bench) in [
        (ids[0], 15_000, 0),
        (ids[3], 12_000, 0),
        (ids[1], 10_000, 800),
        (ids[2], 10_000, 1_400),
    ] {
        let (status, body) = report(
            &app,
            tournament,
            1,
            json!({ "competitor_id": competitor, "score": score, "breakdown": { "bench": bench } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["week"], 15);
    }

    let advance = format!("/api/v1/brackets/{tournament}/rounds/1/advance");
    let (status, outcome) = send(&app, "POST", &advance, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["tournament_complete"], false);
    assert_eq!(outcome["advancing"], json!([ids[0], ids[2]]));
    assert_eq!(outcome["eliminated"], json!([ids[3], ids[1]]));

    let results = outcome["matchup_results"].as_array().unwrap();
    assert_eq!(results[0]["margin"], 3_000);
    assert_eq!(results[1]["winner"], json!(ids[2]));
    assert_eq!(results[1]["margin"], 0);
    assert_eq!(results[1]["is_upset"], true);
    assert_eq!(results[1]["tiebreak"]["rule"], "bench");

    // Advancing again changes nothing
    let (status, again) = send(&app, "POST", &advance, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again, outcome);

    let (status, round_two) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/2/matchups"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(round_two["name"], "Super Bowl");
    assert_eq!(round_two["week"], 16);
    let matchups = round_two["matchups"].as_array().unwrap();
    assert_eq!(matchups.len(), 1);
    assert_eq!(matchups[0]["player1"]["seed"], 1);
    assert_eq!(matchups[0]["player2"]["seed"], 3);
    assert_eq!(matchups[0]["status"], "pending");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/competitors/{}/eliminated", ids[1]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["eliminated"], true);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/competitors/{}/eliminated", ids[2]),
        None,
    )
    .await;
    assert_eq!(body["eliminated"], false);

    // Losers can no longer report
    let (status, _) = report(
        &app,
        tournament,
        2,
        json!({ "competitor_id": ids[1], "score": 9_000 }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_play_to_champion() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    for (competitor, score) in [(ids[0], 9_000), (ids[3], 9_500), (ids[1], 11_000), (ids[2], 7_000)] {
        report(&app, tournament, 1, json!({ "competitor_id": competitor, "score": score })).await;
    }
    send(&app, "POST", &format!("/api/v1/brackets/{tournament}/rounds/1/advance"), None).await;

    for (competitor, score) in [(ids[3], 10_025), (ids[1], 10_050)] {
        let (status, _) =
            report(&app, tournament, 2, json!({ "competitor_id": competitor, "score": score }))
                .await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, outcome) = send(
        &app,
        "POST",
        &format!("/api/v1/brackets/{tournament}/rounds/2/advance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["tournament_complete"], true);

    let (_, bracket) = send(&app, "GET", &format!("/api/v1/brackets/{tournament}"), None).await;
    assert_eq!(bracket["status"], "complete");
    assert_eq!(bracket["champion"], json!(ids[1]));
    assert_eq!(bracket["current_round"], 2);

    let (status, standings) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/2/standings"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(standings[0]["competitor"], json!(ids[1]));
    assert_eq!(standings[0]["rank"], 1);
    assert_eq!(standings[1]["rank"], 2);

    let (status, cumulative) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/2/standings?cumulative=true"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<_> = cumulative
        .as_array()
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["competitor"].clone(),
                row["score"].as_i64().unwrap(),
                row["previous_rank"].as_u64().unwrap(),
                row["rounds_survived"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (json!(ids[1]), 21_050, 1, 2),
            (json!(ids[3]), 19_525, 2, 1),
            (json!(ids[0]), 9_000, 3, 0),
            (json!(ids[2]), 7_000, 4, 0),
        ]
    );
}

#[tokio::test]
async fn test_advance_before_scores_is_retryable() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;
    report(&app, tournament, 1, json!({ "competitor_id": ids[0], "score": 10_000 })).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/brackets/{tournament}/rounds/1/advance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["retryable"], true);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/v1/brackets/{tournament}/rounds/2/advance"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_inconsistent_breakdown_is_rejected() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    let (status, body) = report(
        &app,
        tournament,
        1,
        json!({
            "competitor_id": ids[0],
            "score": 10_000,
            "breakdown": { "positions": [{ "position": "QB", "points": 2_000 }] },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retryable"], false);

    let (_, matchup) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/1/matchups/1"),
        None,
    )
    .await;
    assert_eq!(matchup["matchup"]["status"], "pending");
}

#[tokio::test]
async fn test_overflowing_breakdown_is_rejected() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    let (status, body) = report(
        &app,
        tournament,
        1,
        json!({
            "competitor_id": ids[0],
            "score": i64::MIN,
            "breakdown": { "positions": [
                { "position": "QB", "points": i64::MAX },
                { "position": "RB", "points": 1 },
            ] },
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["retryable"], false);
}

// ============================================================================
// Lookup Tests
// ============================================================================

#[tokio::test]
async fn test_matchup_lookups() {
    let app = create_test_server();
    let (tournament, ids) = create_bracket(&app).await;

    let (status, by_slot) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/1/matchups/2"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_slot["round_name"], "Conference Championship");

    let (status, by_competitor) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/1/competitors/{}/matchup", ids[2]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_competitor, by_slot);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/1/matchups/9"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!(
            "/api/v1/brackets/{tournament}/rounds/1/competitors/{}/matchup",
            Uuid::new_v4()
        ),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{tournament}/rounds/2/matchups"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_bracket_returns_not_found() {
    let app = create_test_server();
    let missing = Uuid::new_v4();

    let (status, body) = send(&app, "GET", &format!("/api/v1/brackets/{missing}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["retryable"], false);
    assert!(body["error"].as_str().unwrap().contains(&missing.to_string()));

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/v1/brackets/{missing}/competitors/{}/eliminated", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
