//! Event publisher service.
//!
//! Provides an abstraction for publishing real-time events.
//! The actual implementation lives in the API layer (SSE broadcast).

use async_trait::async_trait;
use athlo_common::AppResult;
use std::sync::Arc;

/// Event types for real-time updates.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A new post was created.
    PostCreated { id: String, profile_id: String },
    /// A post was deleted.
    PostDeleted { id: String, profile_id: String },
    /// A like was added to a post.
    LikeAdded {
        post_id: String,
        profile_id: String,
        post_owner_id: String,
    },
    /// A like was removed from a post.
    LikeRemoved {
        post_id: String,
        profile_id: String,
        post_owner_id: String,
    },
    /// A comment was added to a post.
    CommentAdded {
        comment_id: String,
        post_id: String,
        profile_id: String,
        post_owner_id: String,
    },
    /// A profile followed another profile.
    Followed {
        follower_id: String,
        followee_id: String,
    },
    /// A profile unfollowed another profile.
    Unfollowed {
        follower_id: String,
        followee_id: String,
    },
    /// A new notification was created.
    Notification {
        id: String,
        recipient_id: String,
        kind: String,
    },
}

/// Trait for publishing real-time events.
///
/// This allows the core services to publish events
/// without directly depending on the streaming implementation.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a post created event.
    async fn publish_post_created(&self, id: &str, profile_id: &str) -> AppResult<()>;

    /// Publish a post deleted event.
    async fn publish_post_deleted(&self, id: &str, profile_id: &str) -> AppResult<()>;

    /// Publish a like added event.
    async fn publish_like_added(
        &self,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()>;

    /// Publish a like removed event.
    async fn publish_like_removed(
        &self,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()>;

    /// Publish a comment added event.
    async fn publish_comment_added(
        &self,
        comment_id: &str,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()>;

    /// Publish a followed event.
    async fn publish_followed(&self, follower_id: &str, followee_id: &str) -> AppResult<()>;

    /// Publish an unfollowed event.
    async fn publish_unfollowed(&self, follower_id: &str, followee_id: &str) -> AppResult<()>;

    /// Publish a notification event.
    async fn publish_notification(
        &self,
        id: &str,
        recipient_id: &str,
        kind: &str,
    ) -> AppResult<()>;
}

/// A no-op implementation of `EventPublisher` for testing or when real-time
/// events are disabled.
#[derive(Clone, Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish_post_created(&self, _id: &str, _profile_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_post_deleted(&self, _id: &str, _profile_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_like_added(
        &self,
        _post_id: &str,
        _profile_id: &str,
        _post_owner_id: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_like_removed(
        &self,
        _post_id: &str,
        _profile_id: &str,
        _post_owner_id: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_comment_added(
        &self,
        _comment_id: &str,
        _post_id: &str,
        _profile_id: &str,
        _post_owner_id: &str,
    ) -> AppResult<()> {
        Ok(())
    }

    async fn publish_followed(&self, _follower_id: &str, _followee_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_unfollowed(&self, _follower_id: &str, _followee_id: &str) -> AppResult<()> {
        Ok(())
    }

    async fn publish_notification(
        &self,
        _id: &str,
        _recipient_id: &str,
        _kind: &str,
    ) -> AppResult<()> {
        Ok(())
    }
}

/// Wrapper for boxed `EventPublisher` trait object.
pub type EventPublisherService = Arc<dyn EventPublisher>;
