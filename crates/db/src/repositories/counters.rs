//! Centralized counter reconciliation.
//!
//! Every denormalized counter column (profile follower/following/post
//! counts, post like/comment counts, tag post counts) is mutated through
//! this store and nowhere else. All mutations are single atomic UPDATE
//! statements, generic over [`ConnectionTrait`] so they execute on the same
//! transaction as the relationship or content row they account for: a
//! committed row and a stale counter can never be observed together.
//!
//! Decrements clamp at zero with `GREATEST(c - 1, 0)`.

use crate::entities::{
    Comment, Follow, Like, Post, Profile, Tag, comment, follow, like, post, profile, tag,
};
use athlo_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, sea_query::Expr,
};

/// The sole mutator of denormalized counter columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterStore;

impl CounterStore {
    /// Increment a profile's followers count.
    pub async fn increment_profile_followers<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::FollowersCount,
                Expr::col(profile::Column::FollowersCount).add(1),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a profile's followers count.
    pub async fn decrement_profile_followers<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::FollowersCount,
                Expr::cust("GREATEST(followers_count - 1, 0)"),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment a profile's following count.
    pub async fn increment_profile_following<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::FollowingCount,
                Expr::col(profile::Column::FollowingCount).add(1),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a profile's following count.
    pub async fn decrement_profile_following<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::FollowingCount,
                Expr::cust("GREATEST(following_count - 1, 0)"),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment a profile's posts count.
    pub async fn increment_profile_posts<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::PostsCount,
                Expr::col(profile::Column::PostsCount).add(1),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a profile's posts count.
    pub async fn decrement_profile_posts<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        Profile::update_many()
            .col_expr(
                profile::Column::PostsCount,
                Expr::cust("GREATEST(posts_count - 1, 0)"),
            )
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment a post's likes count.
    pub async fn increment_post_likes<C: ConnectionTrait>(conn: &C, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikesCount,
                Expr::col(post::Column::LikesCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a post's likes count.
    pub async fn decrement_post_likes<C: ConnectionTrait>(conn: &C, post_id: &str) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::LikesCount,
                Expr::cust("GREATEST(likes_count - 1, 0)"),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment a post's comments count.
    pub async fn increment_post_comments<C: ConnectionTrait>(
        conn: &C,
        post_id: &str,
    ) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::CommentsCount,
                Expr::col(post::Column::CommentsCount).add(1),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a post's comments count.
    pub async fn decrement_post_comments<C: ConnectionTrait>(
        conn: &C,
        post_id: &str,
    ) -> AppResult<()> {
        Post::update_many()
            .col_expr(
                post::Column::CommentsCount,
                Expr::cust("GREATEST(comments_count - 1, 0)"),
            )
            .filter(post::Column::Id.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Increment a tag's posts count.
    pub async fn increment_tag_posts<C: ConnectionTrait>(conn: &C, tag_id: &str) -> AppResult<()> {
        Tag::update_many()
            .col_expr(
                tag::Column::PostsCount,
                Expr::col(tag::Column::PostsCount).add(1),
            )
            .filter(tag::Column::Id.eq(tag_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Decrement a tag's posts count.
    pub async fn decrement_tag_posts<C: ConnectionTrait>(conn: &C, tag_id: &str) -> AppResult<()> {
        Tag::update_many()
            .col_expr(
                tag::Column::PostsCount,
                Expr::cust("GREATEST(posts_count - 1, 0)"),
            )
            .filter(tag::Column::Id.eq(tag_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite a post's engagement counters with the true aggregates.
    ///
    /// Drift repair: counts the backing rows and writes the result, for use
    /// when a counter is suspected stale.
    pub async fn recount_post_engagement<C: ConnectionTrait>(
        conn: &C,
        post_id: &str,
    ) -> AppResult<()> {
        let likes = Like::find()
            .filter(like::Column::PostId.eq(post_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let comments = Comment::find()
            .filter(comment::Column::PostId.eq(post_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Post::update_many()
            .col_expr(post::Column::LikesCount, Expr::value(likes as i32))
            .col_expr(post::Column::CommentsCount, Expr::value(comments as i32))
            .filter(post::Column::Id.eq(post_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Overwrite a profile's graph counters with the true aggregates.
    pub async fn recount_profile_graph<C: ConnectionTrait>(
        conn: &C,
        profile_id: &str,
    ) -> AppResult<()> {
        let followers = Follow::find()
            .filter(follow::Column::FolloweeId.eq(profile_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let following = Follow::find()
            .filter(follow::Column::FollowerId.eq(profile_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        let posts = Post::find()
            .filter(post::Column::ProfileId.eq(profile_id))
            .count(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Profile::update_many()
            .col_expr(profile::Column::FollowersCount, Expr::value(followers as i32))
            .col_expr(profile::Column::FollowingCount, Expr::value(following as i32))
            .col_expr(profile::Column::PostsCount, Expr::value(posts as i32))
            .filter(profile::Column::Id.eq(profile_id))
            .exec(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction};

    #[tokio::test]
    async fn test_increment_post_likes_is_single_update() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        CounterStore::increment_post_likes(&db, "post1")
            .await
            .unwrap();

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 1);
        assert!(matches!(log[0], Transaction { .. }));
    }

    #[tokio::test]
    async fn test_decrement_clamps_at_zero_via_greatest() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        CounterStore::decrement_post_likes(&db, "post1")
            .await
            .unwrap();

        let log = db.into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("GREATEST(likes_count - 1, 0)"));
    }

    #[tokio::test]
    async fn test_recount_post_engagement_writes_aggregates() {
        // Two count queries, then one update.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(3)], [count_row(7)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        CounterStore::recount_post_engagement(&db, "post1")
            .await
            .unwrap();

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 3);
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, sea_orm::Value> {
        let mut map = std::collections::BTreeMap::new();
        map.insert("num_items", sea_orm::Value::BigInt(Some(n)));
        map
    }
}
