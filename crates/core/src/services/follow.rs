//! Follow service.

use std::sync::Arc;

use crate::services::event_publisher::EventPublisherService;
use athlo_common::{AppError, AppResult, IdGenerator};
use athlo_db::{
    entities::follow,
    repositories::{CounterStore, FollowRepository, ProfileRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// Follow service for business logic.
#[derive(Clone)]
pub struct FollowService {
    db: Arc<DatabaseConnection>,
    follow_repo: FollowRepository,
    profile_repo: ProfileRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        follow_repo: FollowRepository,
        profile_repo: ProfileRepository,
    ) -> Self {
        Self {
            db,
            follow_repo,
            profile_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Follow a profile.
    ///
    /// Both counters move on the same transaction as the edge insert.
    /// Idempotent: following an already-followed profile is a no-op.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        // Can't follow yourself
        if follower_id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        // Both profiles must exist
        self.profile_repo.get_by_id(follower_id).await?;
        self.profile_repo.get_by_id(followee_id).await?;

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        match FollowRepository::insert_in(&txn, model).await {
            Ok(_) => {
                CounterStore::increment_profile_following(&txn, follower_id).await?;
                CounterStore::increment_profile_followers(&txn, followee_id).await?;
                txn.commit()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;

                if let Some(ref event_publisher) = self.event_publisher
                    && let Err(e) = event_publisher
                        .publish_followed(follower_id, followee_id)
                        .await
                {
                    tracing::warn!(error = %e, "Failed to publish followed event");
                }
            }
            // Already following: roll back, counters stay put.
            Err(AppError::Conflict(_)) => {
                txn.rollback()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                tracing::debug!(follower_id, followee_id, "Duplicate follow ignored");
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Unfollow a profile.
    ///
    /// Idempotent: counters only move when an edge was actually removed.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = FollowRepository::delete_pair_in(&txn, follower_id, followee_id).await?;
        if removed {
            CounterStore::decrement_profile_following(&txn, follower_id).await?;
            CounterStore::decrement_profile_followers(&txn, followee_id).await?;
        }
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if removed
            && let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_unfollowed(follower_id, followee_id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish unfollowed event");
        }

        Ok(())
    }

    /// Get followers of a profile.
    pub async fn get_followers(
        &self,
        profile_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow::Model>> {
        self.follow_repo
            .find_followers(profile_id, limit, until_id)
            .await
    }

    /// Get profiles that a profile is following.
    pub async fn get_following(
        &self,
        profile_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<follow::Model>> {
        self.follow_repo
            .find_following(profile_id, limit, until_id)
            .await
    }

    /// Check if a profile is following another.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        self.follow_repo
            .is_following(follower_id, followee_id)
            .await
    }

    /// Get every profile ID the given profile follows.
    pub async fn followee_ids(&self, profile_id: &str) -> AppResult<Vec<String>> {
        self.follow_repo.followee_ids(profile_id).await
    }
}
