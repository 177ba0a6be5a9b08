//! Profile repository.

use std::sync::Arc;

use crate::entities::{Profile, profile};
use athlo_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Profile repository for database operations.
#[derive(Clone)]
pub struct ProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a profile by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<profile::Model>> {
        Profile::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a profile by ID, failing if it does not exist.
    pub async fn get_by_id(&self, id: &str) -> AppResult<profile::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(id.to_string()))
    }

    /// Find a profile by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<profile::Model>> {
        Profile::find()
            .filter(profile::Column::UsernameLower.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a profile by its access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<profile::Model>> {
        Profile::find()
            .filter(profile::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new profile.
    pub async fn create(&self, model: profile::ActiveModel) -> AppResult<profile::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if matches!(
                e.sql_err(),
                Some(sea_orm::SqlErr::UniqueConstraintViolation(_))
            ) {
                AppError::Conflict("Username is already taken".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Update a profile.
    pub async fn update(&self, model: profile::ActiveModel) -> AppResult<profile::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search profiles by username or full name substring.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<profile::Model>> {
        let query_lower = query.to_lowercase();

        Profile::find()
            .filter(
                Condition::any()
                    .add(profile::Column::UsernameLower.contains(&query_lower))
                    .add(profile::Column::FullName.contains(query)),
            )
            .order_by_desc(profile::Column::FollowersCount)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the leaderboard: profiles ordered by follower count.
    pub async fn find_leaderboard(
        &self,
        limit: u64,
        sport: Option<profile::SportCategory>,
    ) -> AppResult<Vec<profile::Model>> {
        let mut query = Profile::find().order_by_desc(profile::Column::FollowersCount);

        if let Some(sport) = sport {
            query = query.filter(profile::Column::Sport.eq(sport));
        }

        query
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_profile(id: &str, username: &str, followers: i32) -> profile::Model {
        profile::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            password_hash: "$argon2id$test".to_string(),
            token: Some(format!("token_{id}")),
            full_name: Some("Test Athlete".to_string()),
            bio: None,
            location: None,
            sport: profile::SportCategory::Running,
            profile_image_url: None,
            cover_image_url: None,
            is_verified: false,
            followers_count: followers,
            following_count: 0,
            posts_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let profile = create_test_profile("p1", "runner", 3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[profile.clone()]])
                .into_connection(),
        );

        let repo = ProfileRepository::new(db);
        let result = repo.find_by_id("p1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().username, "runner");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<profile::Model>::new()])
                .into_connection(),
        );

        let repo = ProfileRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::ProfileNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_username_case_insensitive() {
        let profile = create_test_profile("p1", "Runner", 3);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[profile.clone()]])
                .into_connection(),
        );

        let repo = ProfileRepository::new(db);
        let result = repo.find_by_username("RUNNER").await.unwrap();

        assert!(result.is_some());
    }

    #[tokio::test]
    async fn test_find_leaderboard_ordering() {
        let first = create_test_profile("p1", "star", 100);
        let second = create_test_profile("p2", "rookie", 5);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[first, second]])
                .into_connection(),
        );

        let repo = ProfileRepository::new(db);
        let result = repo.find_leaderboard(50, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].username, "star");
    }
}
