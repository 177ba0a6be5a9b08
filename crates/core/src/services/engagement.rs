//! Engagement service: the like/unlike toggle on posts.
//!
//! Both directions run the relationship write and the counter update on one
//! transaction (see `CounterStore`), so a committed like row is never
//! observable next to a stale `likes_count`.

use std::sync::Arc;

use crate::services::event_publisher::EventPublisherService;
use athlo_common::{AppError, AppResult, IdGenerator};
use athlo_db::{
    entities::like,
    repositories::{CounterStore, LikeRepository, PostRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Serialize;

/// Authoritative engagement state of one (profile, post) pair after a toggle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub liked: bool,
    pub likes_count: i32,
}

/// Engagement service for business logic.
#[derive(Clone)]
pub struct EngagementService {
    db: Arc<DatabaseConnection>,
    like_repo: LikeRepository,
    post_repo: PostRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl EngagementService {
    /// Create a new engagement service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        like_repo: LikeRepository,
        post_repo: PostRepository,
    ) -> Self {
        Self {
            db,
            like_repo,
            post_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Like a post.
    ///
    /// Idempotent: a duplicate like (including one racing another request
    /// from the same profile) is a no-op. The unique (profile, post) index
    /// rejects the second insert and rolls back its counter update, so N
    /// concurrent likes net exactly +1.
    pub async fn like(&self, profile_id: &str, post_id: &str) -> AppResult<EngagementState> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let model = like::ActiveModel {
            id: Set(self.id_gen.generate()),
            profile_id: Set(profile_id.to_string()),
            post_id: Set(post_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match LikeRepository::insert_in(&txn, model).await {
            Ok(_) => {
                CounterStore::increment_post_likes(&txn, post_id).await?;
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if let Some(ref event_publisher) = self.event_publisher
                    && let Err(e) = event_publisher
                        .publish_like_added(post_id, profile_id, &post.profile_id)
                        .await
                {
                    tracing::warn!(error = %e, "Failed to publish like added event");
                }
            }
            // Already liked: roll back and report the existing state.
            Err(AppError::Conflict(_)) => {
                txn.rollback()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                tracing::debug!(profile_id, post_id, "Duplicate like ignored");
            }
            Err(e) => return Err(e),
        }

        let fresh = self.post_repo.get_by_id(post_id).await?;
        Ok(EngagementState {
            liked: true,
            likes_count: fresh.likes_count,
        })
    }

    /// Remove a like from a post.
    ///
    /// Idempotent: unliking a post that is not liked is a no-op, and the
    /// counter is only decremented when a row was actually removed.
    pub async fn unlike(&self, profile_id: &str, post_id: &str) -> AppResult<EngagementState> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = LikeRepository::delete_pair_in(&txn, profile_id, post_id).await?;
        if removed {
            CounterStore::decrement_post_likes(&txn, post_id).await?;
        }
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if removed
            && let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_like_removed(post_id, profile_id, &post.profile_id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish like removed event");
        }

        let fresh = self.post_repo.get_by_id(post_id).await?;
        Ok(EngagementState {
            liked: false,
            likes_count: fresh.likes_count,
        })
    }

    /// Check if a profile has liked a post.
    pub async fn has_liked(&self, profile_id: &str, post_id: &str) -> AppResult<bool> {
        self.like_repo.has_liked(profile_id, post_id).await
    }

    /// Get likes on a post (paginated).
    pub async fn likes_for_post(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<like::Model>> {
        self.like_repo.find_by_post(post_id, limit, until_id).await
    }

    /// Of the given posts, return the IDs the profile has liked.
    pub async fn liked_post_ids(
        &self,
        profile_id: &str,
        post_ids: &[String],
    ) -> AppResult<Vec<String>> {
        self.like_repo.liked_post_ids(profile_id, post_ids).await
    }
}
