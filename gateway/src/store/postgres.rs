//! [`Store`] backed by a PostgreSQL connection pool.

use async_trait::async_trait;
use sqlx::Pool;
use sqlx::Postgres;
use sqlx::QueryBuilder;
use sqlx::postgres::PgPoolOptions;

use super::NewPost;
use super::NewUser;
use super::Post;
use super::PostChanges;
use super::PostFilter;
use super::Store;
use super::StoreError;
use super::User;
use super::UserChanges;
use super::UserFilter;
use crate::configuration::Database;

const USER_COLUMNS: &str = "id, username, email, password, created_at, updated_at";
const POST_COLUMNS: &str = "id, title, content, user_id, created_at, updated_at";

pub struct PgStore {
    client: Pool<Postgres>,
}

impl PgStore {
    /// Open the connection pool and confirm the database answers.
    pub async fn connect(database: &Database) -> Result<Self, StoreError> {
        let client = PgPoolOptions::new()
            .max_connections(database.max_connections)
            .connect(&database.url)
            .await
            .map_err(StoreError::Connection)?;
        Ok(Self { client })
    }

    /// Apply the migrations bundled with the gateway.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!().run(&self.client).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.client)
            .await
            .map_err(StoreError::Connection)?;
        Ok(())
    }

    async fn find_all_users(&self, filter: UserFilter) -> Result<Vec<User>, StoreError> {
        let mut query = select_users(filter);
        query.push(" ORDER BY id");
        Ok(query.build_query_as().fetch_all(&self.client).await?)
    }

    async fn find_one_user(&self, filter: UserFilter) -> Result<Option<User>, StoreError> {
        let mut query = select_users(filter);
        query.push(" ORDER BY id LIMIT 1");
        Ok(query.build_query_as().fetch_optional(&self.client).await?)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.username)
        .bind(user.email)
        .bind(user.password)
        .fetch_one(&self.client)
        .await
        .map_err(|error| conflict_on("user", error))?;
        Ok(created)
    }

    async fn update_user(
        &self,
        id: i32,
        changes: UserChanges,
    ) -> Result<Option<User>, StoreError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET username = COALESCE($2, username), email = COALESCE($3, email), \
             updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.username)
        .bind(changes.email)
        .fetch_optional(&self.client)
        .await
        .map_err(|error| conflict_on("user", error))?;
        Ok(updated)
    }

    async fn delete_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(sqlx::query_as::<_, User>(&format!(
            "DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.client)
        .await?)
    }

    async fn find_all_posts(&self, filter: PostFilter) -> Result<Vec<Post>, StoreError> {
        let mut query = select_posts(filter);
        query.push(" ORDER BY id");
        Ok(query.build_query_as().fetch_all(&self.client).await?)
    }

    async fn find_one_post(&self, filter: PostFilter) -> Result<Option<Post>, StoreError> {
        let mut query = select_posts(filter);
        query.push(" ORDER BY id LIMIT 1");
        Ok(query.build_query_as().fetch_optional(&self.client).await?)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        Ok(sqlx::query_as::<_, Post>(&format!(
            "INSERT INTO posts (title, content, user_id) VALUES ($1, $2, $3) RETURNING {POST_COLUMNS}"
        ))
        .bind(post.title)
        .bind(post.content)
        .bind(post.user_id)
        .fetch_one(&self.client)
        .await?)
    }

    async fn update_post(
        &self,
        id: i32,
        changes: PostChanges,
    ) -> Result<Option<Post>, StoreError> {
        Ok(sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET title = COALESCE($2, title), content = COALESCE($3, content), \
             updated_at = NOW() WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.content)
        .fetch_optional(&self.client)
        .await?)
    }

    async fn delete_post(&self, id: i32) -> Result<Option<Post>, StoreError> {
        Ok(sqlx::query_as::<_, Post>(&format!(
            "DELETE FROM posts WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.client)
        .await?)
    }
}

fn select_users(filter: UserFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
    if let Some(id) = filter.id {
        query.push(" AND id = ").push_bind(id);
    }
    if let Some(username) = filter.username {
        query.push(" AND username = ").push_bind(username);
    }
    if let Some(email) = filter.email {
        query.push(" AND email = ").push_bind(email);
    }
    query
}

fn select_posts(filter: PostFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));
    if let Some(id) = filter.id {
        query.push(" AND id = ").push_bind(id);
    }
    if let Some(user_id) = filter.user_id {
        query.push(" AND user_id = ").push_bind(user_id);
    }
    query
}

fn conflict_on(entity: &'static str, error: sqlx::Error) -> StoreError {
    match StoreError::from(error) {
        StoreError::Conflict { reason, .. } => StoreError::Conflict { entity, reason },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn unfiltered_selects_match_everything() {
        let query = select_users(UserFilter::default());
        assert_eq!(
            query.sql(),
            "SELECT id, username, email, password, created_at, updated_at FROM users WHERE TRUE"
        );
    }

    #[test]
    fn filters_become_bound_parameters() {
        let query = select_users(UserFilter {
            id: Some(1),
            username: None,
            email: Some("alice@example.com".to_string()),
        });
        assert!(query.sql().ends_with("WHERE TRUE AND id = $1 AND email = $2"));

        let query = select_posts(PostFilter::by_user(7));
        assert!(query.sql().ends_with("WHERE TRUE AND user_id = $1"));
    }

    #[test]
    fn usernames_and_emails_are_unique() {
        let migration =
            include_str!("../../migrations/20240101000000_create_users_and_posts.sql");
        assert!(migration.contains("username TEXT NOT NULL UNIQUE"));
        assert!(migration.contains("email TEXT NOT NULL UNIQUE"));
    }

    fn unique(prefix: &str) -> String {
        format!("{prefix}-{:016x}", rand::random::<u64>())
    }

    /// Runs against the database at `GATEWAY_TEST_DATABASE_URL`.
    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "needs a PostgreSQL database"]
    async fn it_round_trips_users_and_posts() -> Result<(), StoreError> {
        let database = Database {
            url: std::env::var("GATEWAY_TEST_DATABASE_URL")
                .unwrap_or_else(|_| "postgres://127.0.0.1/gateway".to_string()),
            ..Default::default()
        };
        let store = PgStore::connect(&database).await?;
        store.migrate().await?;
        store.ping().await?;

        let username = unique("alice");
        let email = format!("{username}@example.com");
        let alice = store
            .create_user(NewUser {
                username: username.clone(),
                email: email.clone(),
                password: "salt$digest".to_string(),
            })
            .await?;
        assert_eq!(
            store.find_one_user(UserFilter::by_email(&email)).await?,
            Some(alice.clone())
        );

        let same_username = store
            .create_user(NewUser {
                username: username.clone(),
                email: format!("other-{email}"),
                password: "salt$digest".to_string(),
            })
            .await;
        assert!(matches!(
            same_username,
            Err(StoreError::Conflict { entity: "user", .. })
        ));
        let same_email = store
            .create_user(NewUser {
                username: unique("bob"),
                email: email.clone(),
                password: "salt$digest".to_string(),
            })
            .await;
        assert!(matches!(
            same_email,
            Err(StoreError::Conflict { entity: "user", .. })
        ));

        let mut created = Vec::new();
        for title in ["first", "second"] {
            let post = store
                .create_post(NewPost {
                    title: title.to_string(),
                    content: None,
                    user_id: Some(alice.id),
                })
                .await?;
            created.push(post.id);
        }
        let posts = store.find_all_posts(PostFilter::by_user(alice.id)).await?;
        assert_eq!(posts.iter().map(|post| post.id).collect::<Vec<_>>(), created);

        let updated = store
            .update_post(
                created[0],
                PostChanges {
                    title: None,
                    content: Some("hello".to_string()),
                },
            )
            .await?
            .unwrap();
        assert_eq!(updated.title, "first");
        assert_eq!(updated.content.as_deref(), Some("hello"));

        assert_eq!(store.delete_user(alice.id).await?.map(|user| user.id), Some(alice.id));
        let orphan = store
            .find_one_post(PostFilter::by_id(created[1]))
            .await?
            .unwrap();
        assert_eq!(orphan.user_id, None);
        for id in created {
            store.delete_post(id).await?;
        }
        assert!(store.find_one_post(PostFilter::by_id(orphan.id)).await?.is_none());
        Ok(())
    }
}
