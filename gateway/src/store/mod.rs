//! Persistence collaborator.
//!
//! The gateway never talks to the database directly: controllers and field resolvers go through
//! the [`Store`] trait, keyed by entity. [`postgres::PgStore`] is the production implementation.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use displaydoc::Display;
use serde::Serialize;
use thiserror::Error;

pub mod postgres;

pub use postgres::PgStore;

/// A store shared by every request.
pub type SharedStore = Arc<dyn Store>;

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Salted password digest, see [`crate::auth::password`].
    #[serde(skip)]
    pub password: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post, owned by at most one [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i32,
    pub title: String,
    pub content: Option<String>,
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Equality filter on users. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub id: Option<i32>,
    pub username: Option<String>,
    pub email: Option<String>,
}

impl UserFilter {
    pub fn by_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Default::default()
        }
    }
}

/// Equality filter on posts. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub id: Option<i32>,
    pub user_id: Option<i32>,
}

impl PostFilter {
    pub fn by_id(id: i32) -> Self {
        Self {
            id: Some(id),
            ..Default::default()
        }
    }

    pub fn by_user(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Changes to apply to a user. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub content: Option<String>,
    pub user_id: Option<i32>,
}

/// Changes to apply to a post. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Store errors.
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// could not connect to the store: {0}
    Connection(#[source] sqlx::Error),

    /// could not migrate the store: {0}
    Migration(#[from] sqlx::migrate::MigrateError),

    /// {entity} already exists: {reason}
    Conflict { entity: &'static str, reason: String },

    /// store query failed: {0}
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        let unique_violation = error
            .as_database_error()
            .is_some_and(|database_error| database_error.is_unique_violation());
        if unique_violation {
            StoreError::Conflict {
                entity: "record",
                reason: error.to_string(),
            }
        } else {
            StoreError::Query(error)
        }
    }
}

/// Entity-keyed access to the relational store.
///
/// Every lookup is a fresh query: implementations must not cache results across calls, so
/// that relational fields always observe the current state of the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Confirms the store is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_all_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError>;

    async fn find_one_user(&self, filter: UserFilter) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Returns `None` when no user has this id.
    async fn update_user(&self, id: i32, changes: UserChanges)
    -> Result<Option<User>, StoreError>;

    /// Returns the deleted user, or `None` when no user has this id.
    async fn delete_user(&self, id: i32) -> Result<Option<User>, StoreError>;

    /// Posts matching `filter`, in store order.
    async fn find_all_posts(&self, filter: PostFilter) -> Result<Vec<Post>, StoreError>;

    async fn find_one_post(&self, filter: PostFilter) -> Result<Option<Post>, StoreError>;

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;

    /// Returns `None` when no post has this id.
    async fn update_post(&self, id: i32, changes: PostChanges)
    -> Result<Option<Post>, StoreError>;

    /// Returns the deleted post, or `None` when no post has this id.
    async fn delete_post(&self, id: i32) -> Result<Option<Post>, StoreError>;
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::TimeZone;

    use super::*;

    pub(crate) fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    pub(crate) fn user(id: i32, username: &str) -> User {
        User {
            id,
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: String::new(),
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }

    pub(crate) fn post(id: i32, user_id: Option<i32>) -> Post {
        Post {
            id,
            title: format!("post {id}"),
            content: None,
            user_id,
            created_at: timestamp(),
            updated_at: timestamp(),
        }
    }
}
