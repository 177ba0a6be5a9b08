//! Post service.

use std::sync::Arc;

use crate::services::event_publisher::EventPublisherService;
use crate::services::notification::NotificationService;
use crate::services::tag::{TagService, normalize_tag_set};
use athlo_common::{AppError, AppResult, IdGenerator};
use athlo_db::{
    entities::post::{self, MediaType},
    repositories::{
        CommentRepository, CounterStore, LikeRepository, PostRepository, ProfileRepository,
        TagRepository,
    },
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// Maximum caption length.
pub const MAX_CAPTION_LENGTH: usize = 2_000;

/// Maximum media URLs per post.
pub const MAX_MEDIA_PER_POST: usize = 5;

static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9_]{1,32})").expect("valid mention regex"));

/// Input for creating a post.
pub struct CreatePostInput {
    pub caption: Option<String>,
    pub media_urls: Vec<String>,
    pub media_type: MediaType,
    pub tags: Vec<String>,
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    db: Arc<DatabaseConnection>,
    post_repo: PostRepository,
    profile_repo: ProfileRepository,
    tag_service: TagService,
    notification_service: Option<NotificationService>,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        post_repo: PostRepository,
        profile_repo: ProfileRepository,
    ) -> Self {
        let tag_service = TagService::new(TagRepository::new(Arc::clone(&db)));
        Self {
            db,
            post_repo,
            profile_repo,
            tag_service,
            notification_service: None,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the notification service (mention notifications).
    pub fn set_notification_service(&mut self, notification_service: NotificationService) {
        self.notification_service = Some(notification_service);
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Create a post.
    ///
    /// The post row, its tag links (find-or-create per tag) and the owner's
    /// posts count all commit in one transaction; a failure anywhere leaves
    /// no partial post behind. Media must already be uploaded (the upload
    /// batch either fully succeeds or fully compensates before this runs).
    pub async fn create(&self, author_id: &str, input: CreatePostInput) -> AppResult<post::Model> {
        if input.media_urls.is_empty() {
            return Err(AppError::Validation(
                "A post needs at least one media file".to_string(),
            ));
        }
        if input.media_urls.len() > MAX_MEDIA_PER_POST {
            return Err(AppError::Validation(format!(
                "At most {MAX_MEDIA_PER_POST} media files per post"
            )));
        }
        if let Some(ref caption) = input.caption
            && caption.chars().count() > MAX_CAPTION_LENGTH
        {
            return Err(AppError::Validation(format!(
                "Caption exceeds {MAX_CAPTION_LENGTH} characters"
            )));
        }

        let author = self.profile_repo.get_by_id(author_id).await?;
        let tags = normalize_tag_set(&input.tags)?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            profile_id: Set(author.id.clone()),
            caption: Set(input.caption.clone()),
            media_urls: Set(serde_json::json!(input.media_urls)),
            media_type: Set(input.media_type),
            likes_count: Set(0),
            comments_count: Set(0),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = PostRepository::insert_in(&txn, model).await?;
        self.tag_service
            .attach_to_post_in(&txn, &created.id, &tags)
            .await?;
        CounterStore::increment_profile_posts(&txn, &author.id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.notify_mentions(&author, &created).await;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_post_created(&created.id, &author.id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish post created event");
        }

        Ok(created)
    }

    /// Delete a post. Only the owner may delete.
    ///
    /// Dependent likes, comments and tag links go in the same transaction
    /// as the post row and the owner's posts count; a partial cascade never
    /// commits. Returns the media URLs so the caller can clean up storage.
    pub async fn delete(&self, actor_id: &str, post_id: &str) -> AppResult<Vec<String>> {
        let post = self.post_repo.get_by_id(post_id).await?;

        // Ownership is enforced here from the authenticated identity, not
        // from any client-supplied filter.
        if post.profile_id != actor_id {
            return Err(AppError::Forbidden("Not your post".to_string()));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.tag_service
            .detach_all_from_post_in(&txn, post_id)
            .await?;
        LikeRepository::delete_by_post_in(&txn, post_id).await?;
        CommentRepository::delete_by_post_in(&txn, post_id).await?;
        PostRepository::delete_in(&txn, post_id).await?;
        CounterStore::decrement_profile_posts(&txn, actor_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_post_deleted(post_id, actor_id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish post deleted event");
        }

        Ok(post.media_url_list())
    }

    /// Get a post by ID.
    pub async fn get(&self, id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Get the global feed: recent posts from everyone.
    pub async fn feed(&self, limit: u64, until_id: Option<&str>) -> AppResult<Vec<post::Model>> {
        self.post_repo.find_recent(limit, until_id).await
    }

    /// Get the home feed: posts from followed profiles and the viewer.
    pub async fn home_feed(
        &self,
        viewer_id: &str,
        followee_ids: Vec<String>,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        let mut author_ids = followee_ids;
        if !author_ids.iter().any(|id| id == viewer_id) {
            author_ids.push(viewer_id.to_string());
        }
        self.post_repo
            .find_by_profiles(&author_ids, limit, until_id)
            .await
    }

    /// Get posts by a profile.
    pub async fn posts_by_profile(
        &self,
        profile_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo
            .find_by_profile(profile_id, limit, until_id)
            .await
    }

    /// Get posts linked to a tag ID.
    pub async fn posts_by_tag(
        &self,
        tag_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<post::Model>> {
        self.post_repo.find_by_tag(tag_id, limit, until_id).await
    }

    /// Scan a fresh post's caption for `@username` mentions and notify the
    /// mentioned profiles. Failures here never fail the post creation.
    async fn notify_mentions(
        &self,
        author: &athlo_db::entities::profile::Model,
        post: &post::Model,
    ) {
        let Some(ref notification_service) = self.notification_service else {
            return;
        };
        let Some(ref caption) = post.caption else {
            return;
        };

        for capture in MENTION_RE.captures_iter(caption) {
            let Some(username) = capture.get(1).map(|m| m.as_str()) else {
                continue;
            };

            match self.profile_repo.find_by_username(username).await {
                Ok(Some(mentioned)) => {
                    if let Err(e) = notification_service
                        .notify_mention(&mentioned.id, &author.id, &author.username, &post.id)
                        .await
                    {
                        tracing::warn!(error = %e, username, "Failed to create mention notification");
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, username, "Mention lookup failed");
                }
            }
        }
    }
}

/// Extract the usernames mentioned in a caption.
#[must_use]
pub fn mentioned_usernames(caption: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(caption)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service_with(db: sea_orm::DatabaseConnection) -> PostService {
        let db = Arc::new(db);
        PostService::new(
            Arc::clone(&db),
            PostRepository::new(Arc::clone(&db)),
            ProfileRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_create_requires_media() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service
            .create(
                "p1",
                CreatePostInput {
                    caption: None,
                    media_urls: vec![],
                    media_type: MediaType::Image,
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_too_many_media() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let urls: Vec<String> = (0..=MAX_MEDIA_PER_POST)
            .map(|i| format!("/media/p1/{i}.jpg"))
            .collect();

        let result = service
            .create(
                "p1",
                CreatePostInput {
                    caption: None,
                    media_urls: urls,
                    media_type: MediaType::Image,
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_long_caption() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service
            .create(
                "p1",
                CreatePostInput {
                    caption: Some("x".repeat(MAX_CAPTION_LENGTH + 1)),
                    media_urls: vec!["/media/p1/a.jpg".to_string()],
                    media_type: MediaType::Image,
                    tags: vec![],
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_foreign_post_is_forbidden() {
        let post = post::Model {
            id: "post1".to_string(),
            profile_id: "someone_else".to_string(),
            caption: None,
            media_urls: serde_json::json!(["/media/x/a.jpg"]),
            media_type: MediaType::Image,
            likes_count: 0,
            comments_count: 0,
            created_at: chrono::Utc::now().into(),
            updated_at: None,
        };

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post]])
                .into_connection(),
        );

        let result = service.delete("p1", "post1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_mentioned_usernames() {
        let caption = "Big win with @coach_kim and @Sam! cc @ghost";
        assert_eq!(
            mentioned_usernames(caption),
            vec![
                "coach_kim".to_string(),
                "Sam".to_string(),
                "ghost".to_string()
            ]
        );
    }

    #[test]
    fn test_mentioned_usernames_none() {
        assert!(mentioned_usernames("no mentions here").is_empty());
    }
}
