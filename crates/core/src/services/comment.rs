//! Comment service.

use std::sync::Arc;

use crate::services::event_publisher::EventPublisherService;
use athlo_common::{AppError, AppResult, IdGenerator};
use athlo_db::{
    entities::comment,
    repositories::{CommentRepository, CounterStore, PostRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};

/// Maximum comment length.
pub const MAX_COMMENT_LENGTH: usize = 1_000;

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    db: Arc<DatabaseConnection>,
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        comment_repo: CommentRepository,
        post_repo: PostRepository,
    ) -> Self {
        Self {
            db,
            comment_repo,
            post_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Add a comment to a post.
    ///
    /// The comment row and the post's comments count commit together.
    pub async fn add(
        &self,
        profile_id: &str,
        post_id: &str,
        body: &str,
    ) -> AppResult<comment::Model> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("Comment is empty".to_string()));
        }
        if body.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::Validation(format!(
                "Comment exceeds {MAX_COMMENT_LENGTH} characters"
            )));
        }

        let post = self.post_repo.get_by_id(post_id).await?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            profile_id: Set(profile_id.to_string()),
            post_id: Set(post_id.to_string()),
            body: Set(body.to_string()),
            created_at: Set(chrono::Utc::now().into()),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let created = CommentRepository::insert_in(&txn, model).await?;
        CounterStore::increment_post_comments(&txn, post_id).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_comment_added(&created.id, post_id, profile_id, &post.profile_id)
                .await
        {
            tracing::warn!(error = %e, "Failed to publish comment added event");
        }

        Ok(created)
    }

    /// Delete a comment. The comment author or the post owner may delete.
    pub async fn delete(&self, actor_id: &str, comment_id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;
        let post = self.post_repo.get_by_id(&comment.post_id).await?;

        if comment.profile_id != actor_id && post.profile_id != actor_id {
            return Err(AppError::Forbidden("Not your comment".to_string()));
        }

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let removed = CommentRepository::delete_in(&txn, comment_id).await?;
        if removed {
            CounterStore::decrement_post_comments(&txn, &comment.post_id).await?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    /// Get a comment by ID.
    pub async fn get(&self, id: &str) -> AppResult<comment::Model> {
        self.comment_repo.get_by_id(id).await
    }

    /// List comments on a post, oldest first.
    pub async fn list(
        &self,
        post_id: &str,
        limit: u64,
        since_id: Option<&str>,
    ) -> AppResult<Vec<comment::Model>> {
        // Fail on unknown posts rather than returning an empty page.
        self.post_repo.get_by_id(post_id).await?;
        self.comment_repo.find_by_post(post_id, limit, since_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use athlo_db::entities::post;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use serde_json::json;

    fn create_test_post(id: &str, profile_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            profile_id: profile_id.to_string(),
            caption: None,
            media_urls: json!(["/media/x/a.jpg"]),
            media_type: post::MediaType::Image,
            likes_count: 0,
            comments_count: 1,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_comment(id: &str, profile_id: &str, post_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            profile_id: profile_id.to_string(),
            post_id: post_id.to_string(),
            body: "Nice run".to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service_with(db: sea_orm::DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            Arc::clone(&db),
            CommentRepository::new(Arc::clone(&db)),
            PostRepository::new(db),
        )
    }

    #[tokio::test]
    async fn test_add_rejects_empty_body() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service.add("p1", "post1", "   ").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_rejects_long_body() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let body = "x".repeat(MAX_COMMENT_LENGTH + 1);
        let result = service.add("p1", "post1", &body).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_add_post_not_found() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let result = service.add("p1", "missing", "hello").await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_by_unrelated_profile_is_forbidden() {
        let comment = create_test_comment("c1", "author", "post1");
        let post = create_test_post("post1", "owner");

        let comment_results = [[comment]];
        let post_results = [[post]];

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results(comment_results)
                .append_query_results(post_results)
                .into_connection(),
        );

        let result = service.delete("bystander", "c1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
