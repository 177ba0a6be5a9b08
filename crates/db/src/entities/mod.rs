//! Database entities.

pub mod comment;
pub mod follow;
pub mod like;
pub mod notification;
pub mod post;
pub mod post_tag;
pub mod profile;
pub mod tag;

pub use comment::Entity as Comment;
pub use follow::Entity as Follow;
pub use like::Entity as Like;
pub use notification::Entity as Notification;
pub use post::Entity as Post;
pub use post_tag::Entity as PostTag;
pub use profile::Entity as Profile;
pub use tag::Entity as Tag;
