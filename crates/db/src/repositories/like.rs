//! Like repository.

use std::sync::Arc;

use crate::entities::{Like, like};
use athlo_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

/// Like repository for database operations.
#[derive(Clone)]
pub struct LikeRepository {
    db: Arc<DatabaseConnection>,
}

impl LikeRepository {
    /// Create a new like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a like by profile and post.
    pub async fn find_by_pair(
        &self,
        profile_id: &str,
        post_id: &str,
    ) -> AppResult<Option<like::Model>> {
        Like::find()
            .filter(like::Column::ProfileId.eq(profile_id))
            .filter(like::Column::PostId.eq(post_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Check if a profile has liked a post.
    pub async fn has_liked(&self, profile_id: &str, post_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(profile_id, post_id).await?.is_some())
    }

    /// Insert a like on the given connection.
    ///
    /// The unique (profile_id, post_id) index is the concurrency control:
    /// a duplicate insert surfaces as [`AppError::Conflict`] and rolls back
    /// the caller's transaction, counter update included.
    pub async fn insert_in<C: ConnectionTrait>(
        conn: &C,
        model: like::ActiveModel,
    ) -> AppResult<like::Model> {
        model.insert(conn).await.map_err(|e| {
            if matches!(
                e.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                AppError::Conflict("Already liked".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Delete a like by pair on the given connection. Returns whether a row
    /// was actually removed.
    pub async fn delete_pair_in<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
        post_id: &str,
    ) -> AppResult<bool> {
        let result = Like::delete_many()
            .filter(like::Column::ProfileId.eq(profile_id))
            .filter(like::Column::PostId.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Delete all likes on a post on the given connection (post cascade).
    pub async fn delete_by_post_in<C: ConnectionTrait>(conn: &C, post_id: &str) -> AppResult<u64> {
        let result = Like::delete_many()
            .filter(like::Column::PostId.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Get likes on a post (paginated).
    pub async fn find_by_post(
        &self,
        post_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<like::Model>> {
        let mut query = Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .order_by_desc(like::Column::Id);

        if let Some(id) = until_id {
            query = query.filter(like::Column::Id.lt(id));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Of the given posts, return the IDs the profile has liked.
    pub async fn liked_post_ids(
        &self,
        profile_id: &str,
        post_ids: &[String],
    ) -> AppResult<Vec<String>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let likes = Like::find()
            .filter(like::Column::ProfileId.eq(profile_id))
            .filter(like::Column::PostId.is_in(post_ids.iter().map(String::as_str)))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(likes.into_iter().map(|l| l.post_id).collect())
    }

    /// Count likes on a post.
    pub async fn count_by_post(&self, post_id: &str) -> AppResult<u64> {
        Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
