//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `pickup_test`)
//!   `TEST_DB_PASSWORD` (default: `pickup_test`)
//!   `TEST_DB_NAME` (default: `pickup_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use pickup_common::AppError;
use pickup_db::entities::friend::{self, FriendStatus, pair_key};
use pickup_db::entities::game::{GameStatus, GameVisibility, SkillLevel, SportId};
use pickup_db::entities::{game, game_chat_message, game_player, user};
use pickup_db::repositories::{FriendRepository, GameRepository, JoinOutcome, UserRepository};
use pickup_db::test_utils::TestDatabase;
use sea_orm::Set;

async fn insert_user(repo: &UserRepository, id: &str) -> user::Model {
    repo.create(user::ActiveModel {
        id: Set(id.to_string()),
        name: Set(id.to_string()),
        name_lower: Set(id.to_lowercase()),
        email: Set(format!("{id}@campus.edu")),
        is_verified_student: Set(true),
        password_hash: Set(None),
        token: Set(None),
        favorite_sports: Set(serde_json::json!([])),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    })
    .await
    .expect("insert user")
}

fn new_game(id: &str, host_id: &str, max_players: i32) -> game::ActiveModel {
    game::ActiveModel {
        id: Set(id.to_string()),
        sport: Set(SportId::Soccer),
        custom_sport_name: Set(None),
        location: Set("North Field".to_string()),
        time: Set((Utc::now() + Duration::days(2)).into()),
        max_players: Set(max_players),
        players_count: Set(1),
        host_id: Set(host_id.to_string()),
        host_name: Set(host_id.to_string()),
        skill_level: Set(SkillLevel::Any),
        description: Set(String::new()),
        status: Set(GameStatus::Upcoming),
        visibility: Set(Some(GameVisibility::Public)),
        invite_code: Set(None),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

fn slot(game_id: &str, user_id: &str) -> game_player::ActiveModel {
    game_player::ActiveModel {
        id: Set(format!("{game_id}-{user_id}")),
        game_id: Set(game_id.to_string()),
        user_id: Set(user_id.to_string()),
        name: Set(user_id.to_string()),
        joined_at: Set(Utc::now().into()),
    }
}

fn join_notice(game_id: &str, user_id: &str) -> game_chat_message::ActiveModel {
    game_chat_message::ActiveModel {
        id: Set(format!("{game_id}-{user_id}-joined")),
        game_id: Set(game_id.to_string()),
        user_id: Set("system".to_string()),
        user_name: Set("Pickup".to_string()),
        text: Set(format!("{user_id} joined the game!")),
        created_at: Set(Utc::now().into()),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_join_respects_capacity_and_uniqueness() {
    let db = TestDatabase::create_unique().await.expect("create database");
    let conn = db.pool().await.expect("open pool");
    let users = UserRepository::new(Arc::clone(&conn));
    let games = GameRepository::new(Arc::clone(&conn));

    for id in ["host", "alice", "bob"] {
        insert_user(&users, id).await;
    }
    games.create(new_game("g1", "host", 2), slot("g1", "host")).await.unwrap();

    let again = games.join("g1", slot("g1", "host"), join_notice("g1", "host")).await.unwrap();
    assert_eq!(again, JoinOutcome::AlreadyJoined);

    let alice = games.join("g1", slot("g1", "alice"), join_notice("g1", "alice")).await.unwrap();
    assert_eq!(alice, JoinOutcome::Joined);

    let bob = games.join("g1", slot("g1", "bob"), join_notice("g1", "bob")).await.unwrap();
    assert_eq!(bob, JoinOutcome::Full);

    let game = games.get_by_id("g1").await.unwrap();
    assert_eq!(game.players_count, 2);
    assert_eq!(games.find_players("g1").await.unwrap().len(), 2);
    // Only alice's join produced an announcement
    assert_eq!(games.find_chat("g1", None).await.unwrap().len(), 1);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_delete_cascades_roster_and_chat() {
    let db = TestDatabase::create_unique().await.expect("create database");
    let conn = db.pool().await.expect("open pool");
    let users = UserRepository::new(Arc::clone(&conn));
    let games = GameRepository::new(Arc::clone(&conn));

    insert_user(&users, "host").await;
    insert_user(&users, "alice").await;
    games.create(new_game("g1", "host", 5), slot("g1", "host")).await.unwrap();
    games.join("g1", slot("g1", "alice"), join_notice("g1", "alice")).await.unwrap();

    assert!(games.delete("g1").await.unwrap());
    assert!(games.find_players("g1").await.unwrap().is_empty());
    assert!(games.find_chat("g1", None).await.unwrap().is_empty());

    let late = games.join("g1", slot("g1", "bob"), join_notice("g1", "bob")).await.unwrap();
    assert_eq!(late, JoinOutcome::GameMissing);

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_friend_pair_key_blocks_reverse_request() {
    let db = TestDatabase::create_unique().await.expect("create database");
    let conn = db.pool().await.expect("open pool");
    let users = UserRepository::new(Arc::clone(&conn));
    let friends = FriendRepository::new(Arc::clone(&conn));

    insert_user(&users, "alice").await;
    insert_user(&users, "bob").await;

    let request = |id: &str, from: &str, to: &str| friend::ActiveModel {
        id: Set(id.to_string()),
        from_id: Set(from.to_string()),
        to_id: Set(to.to_string()),
        pair_key: Set(pair_key(from, to)),
        status: Set(FriendStatus::Pending),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    };

    friends.create(request("f1", "alice", "bob")).await.unwrap();
    let reverse = friends.create(request("f2", "bob", "alice")).await;
    assert!(matches!(reverse, Err(AppError::AlreadyExists(_))));

    assert!(friends.accept("f1").await.unwrap());
    assert!(!friends.accept("f1").await.unwrap());
    assert!(friends.are_friends("bob", "alice").await.unwrap());

    db.drop_database().await.unwrap();
}
