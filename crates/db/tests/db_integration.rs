//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `athlo_test`)
//!   `TEST_DB_PASSWORD` (default: `athlo_test`)
//!   `TEST_DB_NAME` (default: `athlo_test`)

#![allow(clippy::unwrap_used)]

use athlo_common::IdGenerator;
use athlo_db::entities::{follow, like, profile};
use athlo_db::repositories::{CounterStore, FollowRepository, LikeRepository, ProfileRepository};
use athlo_db::test_utils::{TestDatabase, TestDbConfig};
use chrono::Utc;
use sea_orm::{Set, TransactionTrait};
use std::sync::Arc;

fn new_profile(id_gen: &IdGenerator, username: &str) -> profile::ActiveModel {
    profile::ActiveModel {
        id: Set(id_gen.generate()),
        username: Set(username.to_string()),
        username_lower: Set(username.to_lowercase()),
        password_hash: Set("$argon2id$test".to_string()),
        token: Set(Some(id_gen.generate_token())),
        full_name: Set(None),
        bio: Set(None),
        location: Set(None),
        sport: Set(profile::SportCategory::Running),
        profile_image_url: Set(None),
        cover_image_url: Set(None),
        is_verified: Set(false),
        followers_count: Set(0),
        following_count: Set(0),
        posts_count: Set(0),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_migrations_apply() {
    let db = TestDatabase::new().await.unwrap();
    athlo_db::migrate(db.connection()).await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_follow_cycle_restores_counters() {
    let db = TestDatabase::new().await.unwrap();
    athlo_db::migrate(db.connection()).await.unwrap();
    db.cleanup().await.unwrap();

    let conn = Arc::new(db.conn);
    let id_gen = IdGenerator::new();
    let profiles = ProfileRepository::new(Arc::clone(&conn));
    let follows = FollowRepository::new(Arc::clone(&conn));

    let a = profiles.create(new_profile(&id_gen, "alice")).await.unwrap();
    let b = profiles.create(new_profile(&id_gen, "bob")).await.unwrap();

    // Follow inside a transaction, counters included.
    let txn = conn.begin().await.unwrap();
    FollowRepository::insert_in(
        &txn,
        follow::ActiveModel {
            id: Set(id_gen.generate()),
            follower_id: Set(a.id.clone()),
            followee_id: Set(b.id.clone()),
            created_at: Set(Utc::now().into()),
        },
    )
    .await
    .unwrap();
    CounterStore::increment_profile_following(&txn, &a.id).await.unwrap();
    CounterStore::increment_profile_followers(&txn, &b.id).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(profiles.get_by_id(&a.id).await.unwrap().following_count, 1);
    assert_eq!(profiles.get_by_id(&b.id).await.unwrap().followers_count, 1);

    // Unfollow.
    let txn = conn.begin().await.unwrap();
    let removed = FollowRepository::delete_pair_in(&txn, &a.id, &b.id).await.unwrap();
    assert!(removed);
    CounterStore::decrement_profile_following(&txn, &a.id).await.unwrap();
    CounterStore::decrement_profile_followers(&txn, &b.id).await.unwrap();
    txn.commit().await.unwrap();

    assert_eq!(profiles.get_by_id(&a.id).await.unwrap().following_count, 0);
    assert_eq!(profiles.get_by_id(&b.id).await.unwrap().followers_count, 0);
    assert!(!follows.is_following(&a.id, &b.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_like_rolls_back_counter() {
    let db = TestDatabase::new().await.unwrap();
    athlo_db::migrate(db.connection()).await.unwrap();
    db.cleanup().await.unwrap();

    let conn = Arc::new(db.conn);
    let id_gen = IdGenerator::new();
    let profiles = ProfileRepository::new(Arc::clone(&conn));
    let likes = LikeRepository::new(Arc::clone(&conn));

    let owner = profiles.create(new_profile(&id_gen, "owner")).await.unwrap();
    let fan = profiles.create(new_profile(&id_gen, "fan")).await.unwrap();

    let post = {
        use athlo_db::entities::post;
        use athlo_db::repositories::PostRepository;

        let txn = conn.begin().await.unwrap();
        let post = PostRepository::insert_in(
            &txn,
            post::ActiveModel {
                id: Set(id_gen.generate()),
                profile_id: Set(owner.id.clone()),
                caption: Set(None),
                media_urls: Set(serde_json::json!(["/media/x/a.jpg"])),
                media_type: Set(post::MediaType::Image),
                likes_count: Set(0),
                comments_count: Set(0),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            },
        )
        .await
        .unwrap();
        CounterStore::increment_profile_posts(&txn, &owner.id).await.unwrap();
        txn.commit().await.unwrap();
        post
    };

    let like_model = |id_gen: &IdGenerator| like::ActiveModel {
        id: Set(id_gen.generate()),
        profile_id: Set(fan.id.clone()),
        post_id: Set(post.id.clone()),
        created_at: Set(Utc::now().into()),
    };

    // First like commits.
    let txn = conn.begin().await.unwrap();
    LikeRepository::insert_in(&txn, like_model(&id_gen)).await.unwrap();
    CounterStore::increment_post_likes(&txn, &post.id).await.unwrap();
    txn.commit().await.unwrap();

    // Second like hits the unique index; the whole transaction (counter
    // update included) rolls back, so the net effect stays +1.
    let txn = conn.begin().await.unwrap();
    CounterStore::increment_post_likes(&txn, &post.id).await.unwrap();
    let dup = LikeRepository::insert_in(&txn, like_model(&id_gen)).await;
    assert!(dup.is_err());
    txn.rollback().await.unwrap();

    use athlo_db::repositories::PostRepository;
    let posts = PostRepository::new(Arc::clone(&conn));
    assert_eq!(posts.get_by_id(&post.id).await.unwrap().likes_count, 1);
    assert_eq!(likes.count_by_post(&post.id).await.unwrap(), 1);
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_database_url_format() {
    let config = TestDbConfig {
        host: "testhost".to_string(),
        port: 5432,
        username: "testuser".to_string(),
        password: "testpass".to_string(),
        database: "testdb".to_string(),
    };

    let url = config.database_url();
    assert!(url.starts_with("postgres://"));
    assert!(url.contains("testhost"));
    assert!(url.contains("5432"));
    assert!(url.contains("testuser"));
    assert!(url.contains("testdb"));
}
