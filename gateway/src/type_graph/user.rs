use apollo_compiler::resolvers::AsyncResolvedValue;

use super::post::PostResolver;
use crate::store::PostFilter;
use crate::store::SharedStore;
use crate::store::User;

/// `User`: attribute projections, plus `posts` looked up in the store on each selection.
pub(crate) struct UserResolver {
    user: User,
    store: SharedStore,
}

impl UserResolver {
    pub(crate) fn new(user: User, store: &SharedStore) -> Self {
        Self {
            user,
            store: SharedStore::clone(store),
        }
    }

    pub(crate) fn value<'a>(
        user: Option<User>,
        store: &SharedStore,
    ) -> AsyncResolvedValue<'a> {
        AsyncResolvedValue::nullable_object(user.map(|user| Self::new(user, store)))
    }

    pub(crate) fn list<'a>(users: Vec<User>, store: &SharedStore) -> AsyncResolvedValue<'a> {
        let users: Vec<_> = users
            .into_iter()
            .map(|user| AsyncResolvedValue::object(Self::new(user, store)))
            .collect();
        AsyncResolvedValue::list(users)
    }
}

impl_resolver! {
    for UserResolver:

    __typename = "User";

    async fn id(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.user.id))
    }

    async fn username(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.user.username.as_str()))
    }

    async fn email(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.user.email.as_str()))
    }

    async fn posts(&self_) {
        let posts = self_
            .store
            .find_all_posts(PostFilter::by_user(self_.user.id))
            .await?;
        Ok(PostResolver::list(posts, &self_.store))
    }

    async fn createdAt(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.user.created_at.to_rfc3339()))
    }

    async fn updatedAt(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.user.updated_at.to_rfc3339()))
    }
}
