//! Profile entity (an athlete's public identity).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sport categories an athlete can register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum SportCategory {
    #[sea_orm(string_value = "basketball")]
    Basketball,
    #[sea_orm(string_value = "soccer")]
    Soccer,
    #[sea_orm(string_value = "tennis")]
    Tennis,
    #[sea_orm(string_value = "running")]
    Running,
    #[sea_orm(string_value = "swimming")]
    Swimming,
    #[sea_orm(string_value = "cycling")]
    Cycling,
    #[sea_orm(string_value = "volleyball")]
    Volleyball,
    #[sea_orm(string_value = "baseball")]
    Baseball,
    #[sea_orm(string_value = "football")]
    Football,
    #[sea_orm(string_value = "hockey")]
    Hockey,
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profile")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(unique)]
    pub username: String,

    /// Case-folded username for unique lookups
    #[sea_orm(unique)]
    pub username_lower: String,

    /// Argon2 password hash
    pub password_hash: String,

    /// Access token for session auth
    #[sea_orm(unique, nullable)]
    pub token: Option<String>,

    /// Display name
    #[sea_orm(nullable)]
    pub full_name: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub bio: Option<String>,

    #[sea_orm(nullable)]
    pub location: Option<String>,

    /// Primary sport
    pub sport: SportCategory,

    #[sea_orm(nullable)]
    pub profile_image_url: Option<String>,

    #[sea_orm(nullable)]
    pub cover_image_url: Option<String>,

    #[sea_orm(default_value = false)]
    pub is_verified: bool,

    /// Followers count (denormalized)
    #[sea_orm(default_value = 0)]
    pub followers_count: i32,

    /// Following count (denormalized)
    #[sea_orm(default_value = 0)]
    pub following_count: i32,

    /// Posts count (denormalized)
    #[sea_orm(default_value = 0)]
    pub posts_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
