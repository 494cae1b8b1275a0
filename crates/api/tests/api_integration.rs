//! API integration tests.
//!
//! Drive the full router, auth middleware included, against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    middleware,
    response::Response,
};
use chrono::{Duration, Utc};
use pickup_api::{AppState, middleware::auth_middleware, router as api_router};
use pickup_common::Config;
use pickup_core::{FriendService, GameService, MessagingService, UserService};
use pickup_db::entities::game::{self, GameStatus, GameVisibility, SkillLevel, SportId};
use pickup_db::entities::user;
use pickup_db::repositories::{
    FriendRepository, GameRepository, MessagingRepository, UserRepository,
};
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
use serde_json::Value;
use tower::ServiceExt;

const TOKEN: &str = "0123456789abcdef0123456789abcdef";

fn create_test_config() -> Config {
    serde_json::from_value(serde_json::json!({
        "database": { "url": "postgres://localhost/test" }
    }))
    .unwrap()
}

fn create_test_user(id: &str) -> user::Model {
    user::Model {
        id: id.to_string(),
        name: "Alice".to_string(),
        name_lower: "alice".to_string(),
        email: "alice@campus.edu".to_string(),
        is_verified_student: true,
        password_hash: None,
        token: Some(TOKEN.to_string()),
        favorite_sports: serde_json::json!(["soccer"]),
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_game(id: &str, max_players: i32, players_count: i32) -> game::Model {
    game::Model {
        id: id.to_string(),
        sport: SportId::Soccer,
        custom_sport_name: None,
        location: "North Field".to_string(),
        time: (Utc::now() + Duration::days(1)).into(),
        max_players,
        players_count,
        host_id: "host".to_string(),
        host_name: "Host".to_string(),
        skill_level: SkillLevel::Any,
        description: String::new(),
        status: GameStatus::Upcoming,
        visibility: Some(GameVisibility::Public),
        invite_code: None,
        created_at: Utc::now().into(),
        updated_at: None,
    }
}

fn create_test_router(db: MockDatabase) -> Router {
    let conn = Arc::new(db.into_connection());
    let config = create_test_config();

    let user_repo = UserRepository::new(Arc::clone(&conn));
    let game_repo = GameRepository::new(Arc::clone(&conn));
    let friend_repo = FriendRepository::new(Arc::clone(&conn));
    let messaging_repo = MessagingRepository::new(Arc::clone(&conn));

    let state = AppState {
        user_service: UserService::new(user_repo.clone(), game_repo.clone(), &config),
        game_service: GameService::new(game_repo, user_repo.clone(), &config),
        friend_service: FriendService::new(friend_repo.clone(), user_repo.clone()),
        messaging_service: MessagingService::new(
            messaging_repo,
            friend_repo,
            user_repo,
            config.social.require_friendship_for_messages,
        ),
    };

    api_router()
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"));

    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/nonexistent/endpoint")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_games_require_authentication() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/games")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_unknown_token_is_unauthorized() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()]),
    );

    let response = app.oneshot(authed("GET", "/games/mine", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_with_invalid_json_returns_error() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("invalid json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(
        response.status() == StatusCode::BAD_REQUEST
            || response.status() == StatusCode::UNPROCESSABLE_ENTITY
    );
}

#[tokio::test]
async fn test_register_short_password_is_validation_error() {
    let app = create_test_router(MockDatabase::new(DatabaseBackend::Postgres));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/register")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"name":"Alice","email":"alice@campus.edu","password":"123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_my_games_empty_envelope() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]])
            .append_query_results([Vec::<game::Model>::new()]),
    );

    let response = app.oneshot(authed("GET", "/games/mine", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body, serde_json::json!({ "data": [] }));
}

#[tokio::test]
async fn test_create_game_in_the_past() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]]),
    );

    let past = (Utc::now() - Duration::hours(2)).to_rfc3339();
    let response = app
        .oneshot(authed(
            "POST",
            "/games",
            Some(serde_json::json!({
                "sport": "soccer",
                "location": "North Field",
                "time": past,
                "maxPlayers": 10
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TIME");
}

#[tokio::test]
async fn test_create_game_missing_fields() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]]),
    );

    let response = app
        .oneshot(authed(
            "POST",
            "/games",
            Some(serde_json::json!({ "sport": "soccer" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_join_full_game_is_conflict() {
    let full = create_test_game("g1", 2, 2);
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]])
            .append_query_results([[full.clone()]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([[full]]),
    );

    let response = app
        .oneshot(authed("POST", "/games/g1/join", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "GAME_FULL");
}

#[tokio::test]
async fn test_delete_by_non_host_is_forbidden() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]])
            .append_query_results([[create_test_game("g1", 10, 1)]]),
    );

    let response = app
        .oneshot(authed("DELETE", "/games/g1", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_game_is_not_found() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]])
            .append_query_results([Vec::<game::Model>::new()]),
    );

    let response = app
        .oneshot(authed("GET", "/games/nope", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_short_search_returns_empty() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]]),
    );

    let response = app
        .oneshot(authed("GET", "/social/search?q=a", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_friend_request_to_self() {
    let app = create_test_router(
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("alice")]]),
    );

    let response = app
        .oneshot(authed(
            "POST",
            "/social/friend-requests",
            Some(serde_json::json!({ "toId": "alice" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
