//! Tag service.

use athlo_common::{AppError, AppResult};
use athlo_db::{
    entities::tag,
    repositories::{CounterStore, TagRepository},
};
use sea_orm::ConnectionTrait;

/// Maximum number of tags on one post.
pub const MAX_TAGS_PER_POST: usize = 10;

/// Maximum length of a normalized tag name.
pub const MAX_TAG_LENGTH: usize = 30;

/// Normalize a single tag name: trim and case-fold.
///
/// Returns an error for empty or over-long names.
pub fn normalize_tag(raw: &str) -> AppResult<String> {
    let normalized = raw.trim().to_lowercase();

    if normalized.is_empty() {
        return Err(AppError::Validation("Tag name is empty".to_string()));
    }
    if normalized.chars().count() > MAX_TAG_LENGTH {
        return Err(AppError::Validation(format!(
            "Tag name exceeds {MAX_TAG_LENGTH} characters"
        )));
    }

    Ok(normalized)
}

/// Normalize a tag set: per-name normalization, order-preserving dedup,
/// and the per-post cap.
pub fn normalize_tag_set(raw: &[String]) -> AppResult<Vec<String>> {
    let mut seen = Vec::new();
    for name in raw {
        let normalized = normalize_tag(name)?;
        if !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }

    if seen.len() > MAX_TAGS_PER_POST {
        return Err(AppError::Validation(format!(
            "At most {MAX_TAGS_PER_POST} tags per post"
        )));
    }

    Ok(seen)
}

/// Tag service for business logic.
#[derive(Clone)]
pub struct TagService {
    tag_repo: TagRepository,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub const fn new(tag_repo: TagRepository) -> Self {
        Self { tag_repo }
    }

    /// Attach a normalized tag set to a post, on the given connection.
    ///
    /// Each tag is find-or-created with an upsert (race-safe under
    /// concurrent first use of the same name) and linked once; the tag's
    /// post counter moves only when a new link was created. Runs inside the
    /// caller's post transaction so a partial failure rolls everything back.
    pub async fn attach_to_post_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        post_id: &str,
        names: &[String],
    ) -> AppResult<Vec<tag::Model>> {
        let mut tags = Vec::with_capacity(names.len());

        for name in names {
            let tag = self.tag_repo.get_or_create_in(conn, name).await?;
            let linked = self.tag_repo.link_post_in(conn, post_id, &tag.id).await?;
            if linked {
                CounterStore::increment_tag_posts(conn, &tag.id).await?;
            }
            tags.push(tag);
        }

        Ok(tags)
    }

    /// Remove all tag links from a post, on the given connection, and move
    /// the affected tag counters (post-delete cascade).
    pub async fn detach_all_from_post_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        post_id: &str,
    ) -> AppResult<()> {
        let tag_ids = TagRepository::tag_ids_for_post_in(conn, post_id).await?;
        TagRepository::delete_links_for_post_in(conn, post_id).await?;
        for tag_id in &tag_ids {
            CounterStore::decrement_tag_posts(conn, tag_id).await?;
        }
        Ok(())
    }

    /// Get a tag by normalized name.
    pub async fn get_by_name(&self, name: &str) -> AppResult<tag::Model> {
        let normalized = normalize_tag(name)?;
        self.tag_repo
            .find_by_name(&normalized)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tag not found: {normalized}")))
    }

    /// Get the tags linked to a post.
    pub async fn tags_for_post(&self, post_id: &str) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_by_post(post_id).await
    }

    /// Search tags by prefix.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<tag::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.tag_repo.search(query, limit).await
    }

    /// Get popular tags by post count.
    pub async fn popular(&self, limit: u64) -> AppResult<Vec<tag::Model>> {
        self.tag_repo.find_popular(limit).await
    }
}
