//! Notification service.

use crate::services::event_publisher::EventPublisherService;
use athlo_common::{AppError, AppResult, IdGenerator};
use athlo_db::{
    entities::notification::{self, NotificationKind},
    repositories::NotificationRepository,
};
use sea_orm::Set;

/// Notification service for business logic.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    event_publisher: Option<EventPublisherService>,
    id_gen: IdGenerator,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(notification_repo: NotificationRepository) -> Self {
        Self {
            notification_repo,
            event_publisher: None,
            id_gen: IdGenerator::new(),
        }
    }

    /// Set the event publisher.
    pub fn set_event_publisher(&mut self, event_publisher: EventPublisherService) {
        self.event_publisher = Some(event_publisher);
    }

    /// Create a like notification for a post owner.
    pub async fn notify_like(
        &self,
        recipient_id: &str,
        sender_id: &str,
        sender_username: &str,
        post_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        // Don't notify yourself
        if recipient_id == sender_id {
            return Ok(None);
        }

        self.create(
            recipient_id,
            Some(sender_id),
            NotificationKind::Like,
            Some(post_id),
            None,
            format!("{sender_username} liked your post"),
        )
        .await
        .map(Some)
    }

    /// Create a comment notification for a post owner.
    pub async fn notify_comment(
        &self,
        recipient_id: &str,
        sender_id: &str,
        sender_username: &str,
        post_id: &str,
        comment_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        if recipient_id == sender_id {
            return Ok(None);
        }

        self.create(
            recipient_id,
            Some(sender_id),
            NotificationKind::Comment,
            Some(post_id),
            Some(comment_id),
            format!("{sender_username} commented on your post"),
        )
        .await
        .map(Some)
    }

    /// Create a follow notification.
    pub async fn notify_follow(
        &self,
        recipient_id: &str,
        sender_id: &str,
        sender_username: &str,
    ) -> AppResult<Option<notification::Model>> {
        if recipient_id == sender_id {
            return Ok(None);
        }

        self.create(
            recipient_id,
            Some(sender_id),
            NotificationKind::Follow,
            None,
            None,
            format!("{sender_username} started following you"),
        )
        .await
        .map(Some)
    }

    /// Create a mention notification for an `@username` in a caption.
    pub async fn notify_mention(
        &self,
        recipient_id: &str,
        sender_id: &str,
        sender_username: &str,
        post_id: &str,
    ) -> AppResult<Option<notification::Model>> {
        if recipient_id == sender_id {
            return Ok(None);
        }

        self.create(
            recipient_id,
            Some(sender_id),
            NotificationKind::Mention,
            Some(post_id),
            None,
            format!("{sender_username} mentioned you in a post"),
        )
        .await
        .map(Some)
    }

    /// Create an achievement notification (system-sent, no sender).
    pub async fn notify_achievement(
        &self,
        recipient_id: &str,
        body: &str,
    ) -> AppResult<notification::Model> {
        self.create(
            recipient_id,
            None,
            NotificationKind::Achievement,
            None,
            None,
            body.to_string(),
        )
        .await
    }

    async fn create(
        &self,
        recipient_id: &str,
        sender_id: Option<&str>,
        kind: NotificationKind,
        post_id: Option<&str>,
        comment_id: Option<&str>,
        body: String,
    ) -> AppResult<notification::Model> {
        let model = notification::ActiveModel {
            id: Set(self.id_gen.generate()),
            recipient_id: Set(recipient_id.to_string()),
            sender_id: Set(sender_id.map(ToString::to_string)),
            kind: Set(kind),
            post_id: Set(post_id.map(ToString::to_string)),
            comment_id: Set(comment_id.map(ToString::to_string)),
            body: Set(body),
            is_read: Set(false),
            created_at: Set(chrono::Utc::now().into()),
        };

        let created = self.notification_repo.create(model).await?;

        if let Some(ref event_publisher) = self.event_publisher
            && let Err(e) = event_publisher
                .publish_notification(
                    &created.id,
                    recipient_id,
                    kind_label(created.kind),
                )
                .await
        {
            tracing::warn!(error = %e, "Failed to publish notification event");
        }

        Ok(created)
    }

    /// Get notifications for a recipient, newest first.
    pub async fn list(
        &self,
        recipient_id: &str,
        limit: u64,
        until_id: Option<&str>,
        unread_only: bool,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(recipient_id, limit, until_id, unread_only)
            .await
    }

    /// Mark a single notification as read.
    ///
    /// Acknowledgement is an explicit client action; nothing is marked read
    /// as a side effect of listing.
    pub async fn mark_read(&self, recipient_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self.notification_repo.get_by_id(notification_id).await?;
        if notification.recipient_id != recipient_id {
            return Err(AppError::Forbidden("Not your notification".to_string()));
        }
        self.notification_repo.mark_as_read(notification_id).await
    }

    /// Mark all notifications as read. Returns the number updated.
    pub async fn mark_all_read(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.mark_all_as_read(recipient_id).await
    }

    /// Count unread notifications.
    pub async fn count_unread(&self, recipient_id: &str) -> AppResult<u64> {
        self.notification_repo.count_unread(recipient_id).await
    }

    /// Delete a notification.
    pub async fn delete(&self, recipient_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self.notification_repo.get_by_id(notification_id).await?;
        if notification.recipient_id != recipient_id {
            return Err(AppError::Forbidden("Not your notification".to_string()));
        }
        self.notification_repo.delete(notification_id).await
    }
}

const fn kind_label(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Like => "like",
        NotificationKind::Comment => "comment",
        NotificationKind::Follow => "follow",
        NotificationKind::Mention => "mention",
        NotificationKind::Achievement => "achievement",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_notification(id: &str, recipient_id: &str) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient_id.to_string(),
            sender_id: Some("sender".to_string()),
            kind: NotificationKind::Follow,
            post_id: None,
            comment_id: None,
            body: "sender started following you".to_string(),
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_notify_like_self_is_noop() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = NotificationService::new(NotificationRepository::new(db));

        let result = service.notify_like("p1", "p1", "me", "post1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mark_read_foreign_notification_is_forbidden() {
        let foreign = create_test_notification("n1", "someone_else");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[foreign]])
                .into_connection(),
        );
        let service = NotificationService::new(NotificationRepository::new(db));

        let result = service.mark_read("p1", "n1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_delete_foreign_notification_is_forbidden() {
        let foreign = create_test_notification("n1", "someone_else");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[foreign]])
                .into_connection(),
        );
        let service = NotificationService::new(NotificationRepository::new(db));

        let result = service.delete("p1", "n1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(kind_label(NotificationKind::Like), "like");
        assert_eq!(kind_label(NotificationKind::Achievement), "achievement");
    }
}
