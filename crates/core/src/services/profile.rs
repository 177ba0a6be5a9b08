//! Profile service.

use std::sync::Arc;

use athlo_common::{AppError, AppResult, IdGenerator, hash_password, verify_password};
use athlo_db::{
    entities::profile::{self, SportCategory},
    repositories::{CounterStore, ProfileRepository},
};
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use validator::Validate;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]{1,32}$").expect("valid username regex"));

/// Input for registering a new profile.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterProfileInput {
    #[validate(length(min = 1, max = 32))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    pub sport: SportCategory,

    #[validate(length(max = 256))]
    pub full_name: Option<String>,
}

/// Input for updating a profile.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(length(max = 256))]
    pub full_name: Option<String>,

    #[validate(length(max = 2048))]
    pub bio: Option<String>,

    #[validate(length(max = 256))]
    pub location: Option<String>,

    pub sport: Option<SportCategory>,

    pub profile_image_url: Option<String>,

    pub cover_image_url: Option<String>,
}

/// Profile service for business logic.
#[derive(Clone)]
pub struct ProfileService {
    db: Arc<DatabaseConnection>,
    profile_repo: ProfileRepository,
    id_gen: IdGenerator,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, profile_repo: ProfileRepository) -> Self {
        Self {
            db,
            profile_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new profile.
    pub async fn register(&self, input: RegisterProfileInput) -> AppResult<profile::Model> {
        input.validate()?;

        if !USERNAME_RE.is_match(&input.username) {
            return Err(AppError::Validation(
                "Username may only contain letters, digits and underscores".to_string(),
            ));
        }

        // Check if username is taken
        if self
            .profile_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username is already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;
        let token = self.id_gen.generate_token();

        let model = profile::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            password_hash: Set(password_hash),
            token: Set(Some(token)),
            full_name: Set(input.full_name),
            sport: Set(input.sport),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        };

        self.profile_repo.create(model).await
    }

    /// Authenticate with username and password, returning the profile.
    ///
    /// The same error is returned for an unknown username and a wrong
    /// password so login probes cannot distinguish the two.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<profile::Model> {
        let profile = self
            .profile_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &profile.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(profile)
    }

    /// Authenticate a profile by its access token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<profile::Model> {
        self.profile_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Rotate a profile's access token, invalidating the old one.
    pub async fn regenerate_token(&self, profile_id: &str) -> AppResult<String> {
        let profile = self.profile_repo.get_by_id(profile_id).await?;
        let token = self.id_gen.generate_token();

        let mut active: profile::ActiveModel = profile.into();
        active.token = Set(Some(token.clone()));
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.profile_repo.update(active).await?;

        Ok(token)
    }

    /// Clear a profile's access token (sign out everywhere).
    pub async fn clear_token(&self, profile_id: &str) -> AppResult<()> {
        let profile = self.profile_repo.get_by_id(profile_id).await?;

        let mut active: profile::ActiveModel = profile.into();
        active.token = Set(None);
        active.updated_at = Set(Some(chrono::Utc::now().into()));
        self.profile_repo.update(active).await?;

        Ok(())
    }

    /// Get a profile by ID.
    pub async fn get(&self, id: &str) -> AppResult<profile::Model> {
        self.profile_repo.get_by_id(id).await
    }

    /// Get a profile by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> AppResult<profile::Model> {
        self.profile_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::ProfileNotFound(username.to_string()))
    }

    /// Update a profile. Only the owner may update.
    pub async fn update(
        &self,
        profile_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<profile::Model> {
        input.validate()?;

        let profile = self.profile_repo.get_by_id(profile_id).await?;
        let mut active: profile::ActiveModel = profile.into();

        if let Some(full_name) = input.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(bio) = input.bio {
            active.bio = Set(Some(bio));
        }
        if let Some(location) = input.location {
            active.location = Set(Some(location));
        }
        if let Some(sport) = input.sport {
            active.sport = Set(sport);
        }
        if let Some(url) = input.profile_image_url {
            active.profile_image_url = Set(Some(url));
        }
        if let Some(url) = input.cover_image_url {
            active.cover_image_url = Set(Some(url));
        }
        active.updated_at = Set(Some(chrono::Utc::now().into()));

        self.profile_repo.update(active).await
    }

    /// Search profiles by username or full name substring.
    pub async fn search(&self, query: &str, limit: u64) -> AppResult<Vec<profile::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.profile_repo.search(query, limit).await
    }

    /// Get the leaderboard: top profiles by follower count.
    pub async fn leaderboard(
        &self,
        limit: u64,
        sport: Option<SportCategory>,
    ) -> AppResult<Vec<profile::Model>> {
        self.profile_repo.find_leaderboard(limit, sport).await
    }

    /// Recount a profile's graph counters from the backing rows.
    ///
    /// Drift repair for the denormalized counters; the overwrite runs in its
    /// own transaction so the counts are taken from one snapshot.
    pub async fn reconcile_counters(&self, profile_id: &str) -> AppResult<profile::Model> {
        // Ensure the profile exists before recounting.
        self.profile_repo.get_by_id(profile_id).await?;

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        CounterStore::recount_profile_graph(&txn, profile_id).await?;
        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        self.profile_repo.get_by_id(profile_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_profile(id: &str, username: &str) -> profile::Model {
        profile::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            password_hash: hash_password("hunter2hunter2").unwrap(),
            token: Some("token1".to_string()),
            full_name: None,
            bio: None,
            location: None,
            sport: SportCategory::Basketball,
            profile_image_url: None,
            cover_image_url: None,
            is_verified: false,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn service_with(db: sea_orm::DatabaseConnection) -> ProfileService {
        let db = Arc::new(db);
        ProfileService::new(Arc::clone(&db), ProfileRepository::new(db))
    }

    #[tokio::test]
    async fn test_register_rejects_bad_username() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service
            .register(RegisterProfileInput {
                username: "not valid!".to_string(),
                password: "longenoughpw".to_string(),
                sport: SportCategory::Running,
                full_name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service
            .register(RegisterProfileInput {
                username: "runner".to_string(),
                password: "short".to_string(),
                sport: SportCategory::Running,
                full_name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_taken_username() {
        let existing = create_test_profile("p1", "runner");

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service
            .register(RegisterProfileInput {
                username: "Runner".to_string(),
                password: "longenoughpw".to_string(),
                sport: SportCategory::Running,
                full_name: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let existing = create_test_profile("p1", "runner");

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let result = service.login("runner", "wrong password").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_unauthorized() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<profile::Model>::new()])
                .into_connection(),
        );

        let result = service.login("ghost", "whatever pass").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_login_success() {
        let existing = create_test_profile("p1", "runner");

        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[existing]])
                .into_connection(),
        );

        let profile = service.login("runner", "hunter2hunter2").await.unwrap();
        assert_eq!(profile.id, "p1");
    }

    #[tokio::test]
    async fn test_search_empty_query_returns_nothing() {
        let service = service_with(
            MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
        );

        let result = service.search("   ", 20).await.unwrap();
        assert!(result.is_empty());
    }
}
