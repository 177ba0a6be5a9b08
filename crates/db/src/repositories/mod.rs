//! Database repositories.

mod comment;
mod counters;
mod follow;
mod like;
mod notification;
mod post;
mod profile;
mod tag;

pub use comment::CommentRepository;
pub use counters::CounterStore;
pub use follow::FollowRepository;
pub use like::LikeRepository;
pub use notification::NotificationRepository;
pub use post::PostRepository;
pub use profile::ProfileRepository;
pub use tag::TagRepository;
