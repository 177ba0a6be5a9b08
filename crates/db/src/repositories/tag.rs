//! Tag repository.

use std::sync::Arc;

use crate::entities::{PostTag, Tag, post_tag, tag};
use athlo_common::{AppError, AppResult, IdGenerator};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

/// Tag repository for database operations.
#[derive(Clone)]
pub struct TagRepository {
    db: Arc<DatabaseConnection>,
    id_gen: IdGenerator,
}

impl TagRepository {
    /// Create a new tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            db,
            id_gen: IdGenerator::new(),
        }
    }

    /// Find a tag by normalized name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<tag::Model>> {
        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get or create a tag by normalized name, on the given connection.
    ///
    /// Uses `INSERT ... ON CONFLICT (name) DO NOTHING` followed by a
    /// re-select, so concurrent first use of the same name cannot produce a
    /// duplicate-key failure the way a read-then-insert would.
    pub async fn get_or_create_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: &str,
    ) -> AppResult<tag::Model> {
        let model = tag::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(name.to_string()),
            posts_count: Set(0),
            created_at: Set(Utc::now().into()),
        };

        Tag::insert(model)
            .on_conflict(OnConflict::column(tag::Column::Name).do_nothing().to_owned())
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Tag::find()
            .filter(tag::Column::Name.eq(name))
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Database(format!("Tag vanished after upsert: {name}")))
    }

    /// Link a post to a tag on the given connection. Idempotent: an existing
    /// link is left untouched. Returns whether a new link was created.
    pub async fn link_post_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        post_id: &str,
        tag_id: &str,
    ) -> AppResult<bool> {
        let model = post_tag::ActiveModel {
            post_id: Set(post_id.to_string()),
            tag_id: Set(tag_id.to_string()),
            created_at: Set(Utc::now().into()),
        };

        let rows = PostTag::insert(model)
            .on_conflict(
                OnConflict::columns([post_tag::Column::PostId, post_tag::Column::TagId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows > 0)
    }

    /// Get the tag IDs linked to a post, on the given connection.
    pub async fn tag_ids_for_post_in<C: ConnectionTrait>(
        conn: &C,
        post_id: &str,
    ) -> AppResult<Vec<String>> {
        let links = PostTag::find()
            .filter(post_tag::Column::PostId.eq(post_id))
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(links.into_iter().map(|l| l.tag_id).collect())
    }

    /// Delete all of a post's tag links on the given connection (post
    /// cascade). Returns the number of links removed.
    pub async fn delete_links_for_post_in<C: ConnectionTrait>(
        conn: &C,
        post_id: &str,
    ) -> AppResult<u64> {
        let result = PostTag::delete_many()
            .filter(post_tag::Column::PostId.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Get the tags linked to a post.
    pub async fn find_by_post(&self, post_id: &str) -> AppResult<Vec<tag::Model>> {
        let tag_ids = Self::tag_ids_for_post_in(self.db.as_ref(), post_id).await?;
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        Tag::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .order_by_asc(tag::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search tags by prefix.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<tag::Model>> {
        let query_lower = query.to_lowercase();
        let pattern = format!("{query_lower}%");

        Tag::find()
            .filter(tag::Column::Name.like(&pattern))
            .order_by_desc(tag::Column::PostsCount)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get popular tags (by post count).
    pub async fn find_popular(&self, limit: u64) -> AppResult<Vec<tag::Model>> {
        Tag::find()
            .order_by_desc(tag::Column::PostsCount)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_tag(id: &str, name: &str, posts_count: i32) -> tag::Model {
        tag::Model {
            id: id.to_string(),
            name: name.to_string(),
            posts_count,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let tag = create_test_tag("t1", "basketball", 10);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[tag.clone()]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.find_by_name("basketball").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().name, "basketball");
    }

    #[tokio::test]
    async fn test_find_popular() {
        let t1 = create_test_tag("t1", "basketball", 100);
        let t2 = create_test_tag("t2", "training", 50);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[t1, t2]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.find_popular(10).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].name, "basketball");
    }

    #[tokio::test]
    async fn test_search() {
        let t1 = create_test_tag("t1", "basketball", 50);
        let t2 = create_test_tag("t2", "baseball", 30);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[t1, t2]])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.search("ba", 10).await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_post_empty() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_tag::Model>::new()])
                .into_connection(),
        );

        let repo = TagRepository::new(db);
        let result = repo.find_by_post("post1").await.unwrap();

        assert!(result.is_empty());
    }
}
