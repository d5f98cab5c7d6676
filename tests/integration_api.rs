//! API Integration Tests
//!
//! End-to-end tests over the full router against a real database. Run with
//! `cargo test -- --ignored` and DATABASE_URL pointing at a migrated
//! PostgreSQL instance.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

mod common;

const ALICE_TOKEN: &str = "test_token_alice";
const BOB_TOKEN: &str = "test_token_bob";
const CAROL_TOKEN: &str = "test_token_carol";

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("X-Session-Token", token);

    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn create_group(app: &Router, token: &str, max_members: Option<i32>) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/api/groups",
        token,
        Some(json!({
            "name": "Test Makers",
            "description": "A group for tests",
            "location": "Test Hall",
            "city": "Lisbon",
            "country": "PT",
            "groupType": "makerspace",
            "maxMembers": max_members,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "group creation failed: {}", body);
    body["group"]["id"].as_str().unwrap().parse().unwrap()
}

async fn create_idea(app: &Router, token: &str) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/api/ideas",
        token,
        Some(json!({
            "title": "Self-healing polymer",
            "description": "Microcapsule-based repair",
            "fieldCategory": "polymers",
            "fundingGoal": 1000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "idea creation failed: {}", body);
    body["idea"]["id"].as_str().unwrap().parse().unwrap()
}

// =========================================================================
// Auth
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_missing_session_token_rejected() {
    let pool = common::setup_test_db().await;
    let app = common::build_app(pool);

    let request = Request::builder()
        .method("GET")
        .uri("/api/groups")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_health_requires_no_auth() {
    let pool = common::setup_test_db().await;
    let app = common::build_app(pool);

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =========================================================================
// Group membership
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_group_join_flow_counter_matches_ledger() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    common::seed_user(&pool, "carol", CAROL_TOKEN).await;
    let app = common::build_app(pool.clone());

    // Creator counts as member 1 of 2
    let group_id = create_group(&app, ALICE_TOKEN, Some(2)).await;

    let (status, body) =
        send(&app, "POST", &format!("/api/groups/{}/join", group_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"]["currentMembers"], 2);

    // Full: third member bounces
    let (status, body) =
        send(&app, "POST", &format!("/api/groups/{}/join", group_id), CAROL_TOKEN, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "capacity_exceeded");

    // Counter equals the ledger row count
    let ledger_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(ledger_count, 2);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_concurrent_joins_never_exceed_capacity() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    common::seed_user(&pool, "carol", CAROL_TOKEN).await;
    let app = common::build_app(pool.clone());

    // One seat left: creator holds 1 of 2
    let group_id = create_group(&app, ALICE_TOKEN, Some(2)).await;

    let uri = format!("/api/groups/{}/join", group_id);
    let (bob, carol) = tokio::join!(
        send(&app, "POST", &uri, BOB_TOKEN, None),
        send(&app, "POST", &uri, CAROL_TOKEN, None),
    );

    // The row lock serializes the two joins: exactly one wins
    let successes = [bob.0, carol.0]
        .iter()
        .filter(|s| **s == StatusCode::OK)
        .count();
    assert_eq!(successes, 1, "bob: {:?}, carol: {:?}", bob, carol);

    let current: i32 =
        sqlx::query_scalar("SELECT current_members FROM community_groups WHERE id = $1")
            .bind(group_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(current, 2);

    let ledger_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM group_members WHERE group_id = $1")
            .bind(group_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(ledger_count, 2);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_missing_required_field_returns_400_json() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool);

    // Body lacks most required fields: shape failure, not business logic
    let (status, body) = send(
        &app,
        "POST",
        "/api/groups",
        ALICE_TOKEN,
        Some(json!({"name": "Only a name"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "invalid_request");
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_duplicate_join_does_not_double_count() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool);

    let group_id = create_group(&app, ALICE_TOKEN, None).await;

    let (status, _) =
        send(&app, "POST", &format!("/api/groups/{}/join", group_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        send(&app, "POST", &format!("/api/groups/{}/join", group_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "already_member");

    let (_, body) = send(&app, "GET", &format!("/api/groups/{}", group_id), BOB_TOKEN, None).await;
    assert_eq!(body["group"]["currentMembers"], 2);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_leave_semantics() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool);

    let group_id = create_group(&app, ALICE_TOKEN, None).await;

    // Leaving without being a member
    let (status, body) =
        send(&app, "POST", &format!("/api/groups/{}/leave", group_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "not_a_member");

    // The creator cannot leave their own group
    let (status, body) =
        send(&app, "POST", &format!("/api/groups/{}/leave", group_id), ALICE_TOKEN, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "forbidden");

    // Join then leave round-trips the counter
    send(&app, "POST", &format!("/api/groups/{}/join", group_id), BOB_TOKEN, None).await;
    let (status, _) =
        send(&app, "POST", &format!("/api/groups/{}/leave", group_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", &format!("/api/groups/{}", group_id), ALICE_TOKEN, None).await;
    assert_eq!(body["group"]["currentMembers"], 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_group_update_requires_admin_role() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool);

    let group_id = create_group(&app, ALICE_TOKEN, None).await;
    send(&app, "POST", &format!("/api/groups/{}/join", group_id), BOB_TOKEN, None).await;

    // Plain member: forbidden
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/groups/{}", group_id),
        BOB_TOKEN,
        Some(json!({"name": "Hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Creator (admin): allowed
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/groups/{}", group_id),
        ALICE_TOKEN,
        Some(json!({"name": "Renamed Makers"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["group"]["name"], "Renamed Makers");

    // Missing group: 404 before any role check
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/api/groups/{}", Uuid::new_v4()),
        BOB_TOKEN,
        Some(json!({"name": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =========================================================================
// Workshops
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_workshop_registration_capacity() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    common::seed_user(&pool, "carol", CAROL_TOKEN).await;
    let app = common::build_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/workshops",
        ALICE_TOKEN,
        Some(json!({
            "title": "Resin casting",
            "description": "Hands-on",
            "location": "Lab 2",
            "startDate": "2026-10-01T18:00:00Z",
            "maxAttendees": 1,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    // Creating a workshop does not register the creator
    assert_eq!(body["workshop"]["currentAttendees"], 0);
    let workshop_id = body["workshop"]["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/workshops/{}/register", workshop_id),
        BOB_TOKEN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workshop"]["currentAttendees"], 1);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/workshops/{}/register", workshop_id),
        CAROL_TOKEN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "capacity_exceeded");

    // Unregister frees the slot
    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/workshops/{}/unregister", workshop_id),
        BOB_TOKEN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/workshops/{}/register", workshop_id),
        CAROL_TOKEN,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// =========================================================================
// Votes
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_vote_upsert_moves_counter_by_delta() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool.clone());

    let idea_id = create_idea(&app, ALICE_TOKEN).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", idea_id),
        BOB_TOKEN,
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["voteCount"], 1);

    // Identical revote is a no-op
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", idea_id),
        BOB_TOKEN,
        Some(json!({"value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["voteCount"], 1);

    // Flip to -1 moves the counter by the delta, not by the new value
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", idea_id),
        BOB_TOKEN,
        Some(json!({"value": -1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["voteCount"], -1);

    // One vote row per (idea, user)
    let vote_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE idea_id = $1")
        .bind(idea_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(vote_rows, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_vote_value_outside_range_rejected() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool);

    let idea_id = create_idea(&app, ALICE_TOKEN).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", idea_id),
        ALICE_TOKEN,
        Some(json!({"value": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "validation_error");
}

// =========================================================================
// Contributions
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_contributions_accumulate() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool);

    let idea_id = create_idea(&app, ALICE_TOKEN).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/contribute", idea_id),
        ALICE_TOKEN,
        Some(json!({"amount": 40})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["fundingRaised"], 40);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/contribute", idea_id),
        BOB_TOKEN,
        Some(json!({"amount": 70, "message": "Good luck!"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["idea"]["fundingRaised"], 110);
    assert_eq!(body["contribution"]["amount"], 70);

    let (_, body) = send(
        &app,
        "GET",
        &format!("/api/ideas/{}/contributions", idea_id),
        ALICE_TOKEN,
        None,
    )
    .await;
    let contributions = body["contributions"].as_array().unwrap();
    assert_eq!(contributions.len(), 2);
    // Newest first
    assert_eq!(contributions[0]["amount"], 70);
    assert_eq!(contributions[1]["amount"], 40);
}

// =========================================================================
// NFTs
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_nft_monetization_tips_persist_through_create_and_patch() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool);

    let (status, body) = send(
        &app,
        "POST",
        "/api/nfts",
        ALICE_TOKEN,
        Some(json!({
            "title": "Pixel Fox",
            "description": "A fox in 32x32",
            "monetizationTips": "Sell prints",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["nft"]["monetizationTips"], "Sell prints");
    // No prompt and no image URL: bare placeholder
    assert_eq!(body["nft"]["imageUrl"], "/nft-example.png");
    let nft_id = body["nft"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/nfts/{}", nft_id),
        ALICE_TOKEN,
        Some(json!({"monetizationTips": "License it"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nft"]["monetizationTips"], "License it");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_contribution_idempotency_replay() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool.clone());

    let idea_id = create_idea(&app, ALICE_TOKEN).await;
    let key = Uuid::new_v4();

    let send_with_key = |payload: Value| {
        let app = app.clone();
        let uri = format!("/api/ideas/{}/contribute", idea_id);
        async move {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("X-Session-Token", ALICE_TOKEN)
                .header("Idempotency-Key", key.to_string())
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap();
            let response = app.oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let json: Value = serde_json::from_slice(&bytes).unwrap();
            (status, json)
        }
    };

    let (status, first) = send_with_key(json!({"amount": 40})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["idea"]["fundingRaised"], 40);

    // Same key, same payload: replayed, no second ledger row
    let (status, replay) = send_with_key(json!({"amount": 40})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["idea"]["fundingRaised"], 40);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contributions WHERE idea_id = $1")
        .bind(idea_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);

    // Same key, different payload: conflict
    let (status, body) = send_with_key(json!({"amount": 99})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_code"], "idempotency_conflict");
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_contribution_requires_positive_amount() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool);

    let idea_id = create_idea(&app, ALICE_TOKEN).await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/ideas/{}/contribute", idea_id),
        ALICE_TOKEN,
        Some(json!({"amount": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], "validation_error");
}

// =========================================================================
// Ideas listing and ownership
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_ideas_ordered_by_votes() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool);

    let first = create_idea(&app, ALICE_TOKEN).await;
    let second = create_idea(&app, ALICE_TOKEN).await;

    send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", second),
        BOB_TOKEN,
        Some(json!({"value": 1})),
    )
    .await;

    let (_, body) = send(&app, "GET", "/api/ideas", ALICE_TOKEN, None).await;
    let ideas = body["ideas"].as_array().unwrap();
    assert_eq!(ideas[0]["id"].as_str().unwrap(), second.to_string());
    assert_eq!(ideas[1]["id"].as_str().unwrap(), first.to_string());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_idea_delete_owner_only_and_cascades() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    common::seed_user(&pool, "bob", BOB_TOKEN).await;
    let app = common::build_app(pool.clone());

    let idea_id = create_idea(&app, ALICE_TOKEN).await;
    send(
        &app,
        "POST",
        &format!("/api/ideas/{}/vote", idea_id),
        BOB_TOKEN,
        Some(json!({"value": 1})),
    )
    .await;

    let (status, _) =
        send(&app, "DELETE", &format!("/api/ideas/{}", idea_id), BOB_TOKEN, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) =
        send(&app, "DELETE", &format!("/api/ideas/{}", idea_id), ALICE_TOKEN, None).await;
    assert_eq!(status, StatusCode::OK);

    let votes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE idea_id = $1")
        .bind(idea_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(votes, 0);
}

// =========================================================================
// Maintenance jobs
// =========================================================================

#[tokio::test]
#[ignore = "requires a PostgreSQL database"]
async fn test_reconciliation_repairs_manual_drift() {
    let pool = common::setup_test_db().await;
    common::seed_user(&pool, "alice", ALICE_TOKEN).await;
    let app = common::build_app(pool.clone());

    let group_id = create_group(&app, ALICE_TOKEN, None).await;

    // Introduce drift the way a bad manual UPDATE would
    sqlx::query("UPDATE community_groups SET current_members = 99 WHERE id = $1")
        .bind(group_id)
        .execute(&pool)
        .await
        .unwrap();

    let corrected = innohub::jobs::reconcile_group_members(&pool).await.unwrap();
    assert_eq!(corrected, 1);

    let current: i32 =
        sqlx::query_scalar("SELECT current_members FROM community_groups WHERE id = $1")
            .bind(group_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(current, 1);
}
