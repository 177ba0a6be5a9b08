//! Business logic services.

#![allow(missing_docs)]

pub mod comment;
pub mod engagement;
pub mod event_publisher;
pub mod follow;
pub mod media;
pub mod notification;
pub mod post;
pub mod profile;
pub mod tag;

pub use comment::CommentService;
pub use engagement::{EngagementService, EngagementState};
pub use event_publisher::{EventPublisher, EventPublisherService, NoOpEventPublisher, StreamEvent};
pub use follow::FollowService;
pub use media::{MediaFile, MediaService, MediaUpload};
pub use notification::NotificationService;
pub use post::{CreatePostInput, PostService};
pub use profile::{ProfileService, RegisterProfileInput, UpdateProfileInput};
pub use tag::{TagService, normalize_tag, normalize_tag_set};
