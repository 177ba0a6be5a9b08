//! Server-Sent Events (SSE) for real-time updates.
//!
//! Provides SSE streams for the feed and per-profile notifications, plus
//! the [`SseEventPublisher`] bridge that turns core service events into
//! broadcasts. Events are re-fetch triggers for consumers, not payloads of
//! truth: delivery is at-least-once and unordered relative to the
//! triggering write's response.

#![allow(missing_docs)]

use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use athlo_common::AppResult;
use athlo_core::EventPublisher;
use axum::{
    Router,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
};
use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::{extractors::AuthProfile, middleware::AppState};

/// SSE event types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SseEvent {
    /// New post on the feed.
    Post { id: String, profile_id: String },
    /// Post deleted.
    PostDeleted { id: String },
    /// Like added or removed on a post.
    Like {
        post_id: String,
        profile_id: String,
        added: bool,
    },
    /// New comment on a post.
    Comment {
        comment_id: String,
        post_id: String,
        profile_id: String,
    },
    /// New follower.
    Followed { profile_id: String },
    /// Follower left.
    Unfollowed { profile_id: String },
    /// New notification.
    Notification {
        id: String,
        #[serde(rename = "notificationKind")]
        kind: String,
    },
    /// Connection established.
    Connected,
}

/// SSE broadcast channels for the feed and per-profile streams.
#[derive(Clone)]
pub struct SseBroadcaster {
    /// Feed events (posts, likes, comments).
    pub feed: broadcast::Sender<SseEvent>,
    /// Profile-specific events (keyed by profile ID).
    profile_channels: std::sync::Arc<
        tokio::sync::RwLock<std::collections::HashMap<String, broadcast::Sender<SseEvent>>>,
    >,
}

impl SseBroadcaster {
    /// Create a new SSE broadcaster.
    #[must_use]
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(1000);

        Self {
            feed,
            profile_channels: std::sync::Arc::new(tokio::sync::RwLock::new(
                std::collections::HashMap::new(),
            )),
        }
    }

    /// Get or create a profile-specific channel.
    pub async fn profile_channel(&self, profile_id: &str) -> broadcast::Sender<SseEvent> {
        let mut channels = self.profile_channels.write().await;

        if let Some(sender) = channels.get(profile_id)
            && sender.receiver_count() > 0
        {
            return sender.clone();
        }

        let (sender, _) = broadcast::channel(100);
        channels.insert(profile_id.to_string(), sender.clone());
        sender
    }

    /// Broadcast an event to the feed.
    pub fn broadcast_feed(&self, event: SseEvent) {
        let _ = self.feed.send(event);
    }

    /// Broadcast an event to a specific profile.
    pub async fn broadcast_to_profile(&self, profile_id: &str, event: SseEvent) {
        let channels = self.profile_channels.read().await;
        if let Some(sender) = channels.get(profile_id) {
            let _ = sender.send(event);
        }
    }

    /// Clean up profile channels without receivers.
    pub async fn cleanup(&self) {
        let mut channels = self.profile_channels.write().await;
        channels.retain(|_, sender| sender.receiver_count() > 0);
    }
}

impl Default for SseBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Bridges core service events onto the SSE broadcaster.
#[derive(Clone)]
pub struct SseEventPublisher {
    broadcaster: SseBroadcaster,
}

impl SseEventPublisher {
    /// Create a new publisher over a broadcaster.
    #[must_use]
    pub const fn new(broadcaster: SseBroadcaster) -> Self {
        Self { broadcaster }
    }
}

#[async_trait]
impl EventPublisher for SseEventPublisher {
    async fn publish_post_created(&self, id: &str, profile_id: &str) -> AppResult<()> {
        self.broadcaster.broadcast_feed(SseEvent::Post {
            id: id.to_string(),
            profile_id: profile_id.to_string(),
        });
        Ok(())
    }

    async fn publish_post_deleted(&self, id: &str, _profile_id: &str) -> AppResult<()> {
        self.broadcaster
            .broadcast_feed(SseEvent::PostDeleted { id: id.to_string() });
        Ok(())
    }

    async fn publish_like_added(
        &self,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()> {
        let event = SseEvent::Like {
            post_id: post_id.to_string(),
            profile_id: profile_id.to_string(),
            added: true,
        };
        self.broadcaster.broadcast_feed(event.clone());
        self.broadcaster
            .broadcast_to_profile(post_owner_id, event)
            .await;
        Ok(())
    }

    async fn publish_like_removed(
        &self,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()> {
        let event = SseEvent::Like {
            post_id: post_id.to_string(),
            profile_id: profile_id.to_string(),
            added: false,
        };
        self.broadcaster.broadcast_feed(event.clone());
        self.broadcaster
            .broadcast_to_profile(post_owner_id, event)
            .await;
        Ok(())
    }

    async fn publish_comment_added(
        &self,
        comment_id: &str,
        post_id: &str,
        profile_id: &str,
        post_owner_id: &str,
    ) -> AppResult<()> {
        let event = SseEvent::Comment {
            comment_id: comment_id.to_string(),
            post_id: post_id.to_string(),
            profile_id: profile_id.to_string(),
        };
        self.broadcaster.broadcast_feed(event.clone());
        self.broadcaster
            .broadcast_to_profile(post_owner_id, event)
            .await;
        Ok(())
    }

    async fn publish_followed(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        self.broadcaster
            .broadcast_to_profile(
                followee_id,
                SseEvent::Followed {
                    profile_id: follower_id.to_string(),
                },
            )
            .await;
        Ok(())
    }

    async fn publish_unfollowed(&self, follower_id: &str, followee_id: &str) -> AppResult<()> {
        self.broadcaster
            .broadcast_to_profile(
                followee_id,
                SseEvent::Unfollowed {
                    profile_id: follower_id.to_string(),
                },
            )
            .await;
        Ok(())
    }

    async fn publish_notification(
        &self,
        id: &str,
        recipient_id: &str,
        kind: &str,
    ) -> AppResult<()> {
        self.broadcaster
            .broadcast_to_profile(
                recipient_id,
                SseEvent::Notification {
                    id: id.to_string(),
                    kind: kind.to_string(),
                },
            )
            .await;
        Ok(())
    }
}

/// Feed SSE stream.
async fn feed_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_broadcaster.feed.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        result.ok().map(|event| {
            Ok(Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("error")))
        })
    });

    // Add initial connected event
    let initial = stream::once(async {
        Ok(Event::default()
            .json_data(&SseEvent::Connected)
            .unwrap_or_else(|_| Event::default().data("connected")))
    });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Profile-specific SSE stream (notifications, follows, own-post likes).
async fn profile_stream(
    AuthProfile(profile): AuthProfile,
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let sender = state.sse_broadcaster.profile_channel(&profile.id).await;
    let rx = sender.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| {
        result.ok().map(|event| {
            Ok(Event::default()
                .json_data(&event)
                .unwrap_or_else(|_| Event::default().data("error")))
        })
    });

    let initial = stream::once(async {
        Ok(Event::default()
            .json_data(&SseEvent::Connected)
            .unwrap_or_else(|_| Event::default().data("connected")))
    });

    Sse::new(initial.chain(stream)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("ping"),
    )
}

/// Create SSE router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/feed", get(feed_stream))
        .route("/user", get(profile_stream))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_broadcaster_new() {
        let broadcaster = SseBroadcaster::new();
        assert_eq!(broadcaster.feed.receiver_count(), 0);
    }

    #[tokio::test]
    async fn test_sse_broadcaster_broadcast_feed() {
        let broadcaster = SseBroadcaster::new();
        let mut rx = broadcaster.feed.subscribe();

        broadcaster.broadcast_feed(SseEvent::Connected);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SseEvent::Connected));
    }

    #[tokio::test]
    async fn test_sse_broadcaster_profile_channel_reused() {
        let broadcaster = SseBroadcaster::new();

        let sender1 = broadcaster.profile_channel("p1").await;
        let _rx = sender1.subscribe();
        let sender2 = broadcaster.profile_channel("p1").await;

        // Same underlying channel: the receiver on sender1 is visible
        // through sender2.
        assert_eq!(sender2.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_publisher_routes_notification_to_recipient() {
        let broadcaster = SseBroadcaster::new();
        let sender = broadcaster.profile_channel("p1").await;
        let mut rx = sender.subscribe();

        let publisher = SseEventPublisher::new(broadcaster);
        publisher
            .publish_notification("n1", "p1", "like")
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, SseEvent::Notification { .. }));
    }

    #[test]
    fn test_sse_event_serialization() {
        let event = SseEvent::Post {
            id: "123".to_string(),
            profile_id: "p1".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"post\""));
        assert!(json.contains("\"id\":\"123\""));
    }

    #[test]
    fn test_notification_event_serialization() {
        let event = SseEvent::Notification {
            id: "n1".to_string(),
            kind: "follow".to_string(),
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"notification\""));
        assert!(json.contains("\"notificationKind\":\"follow\""));
    }
}
