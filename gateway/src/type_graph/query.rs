use apollo_compiler::resolvers::AsyncResolvedValue;

use super::post::PostResolver;
use super::resolver::FieldArguments;
use super::user::UserResolver;
use crate::store::PostFilter;
use crate::store::SharedStore;
use crate::store::UserFilter;

/// The `Query` root.
pub(crate) struct QueryResolver {
    pub(crate) store: SharedStore,
}

impl_resolver! {
    for QueryResolver:

    __typename = "Query";

    async fn user(&self_, info) {
        let filter = UserFilter {
            id: info.int_argument("id")?,
            username: info.string_argument("username")?,
            email: info.string_argument("email")?,
        };
        let user = self_.store.find_one_user(filter).await?;
        Ok(UserResolver::value(user, &self_.store))
    }

    async fn users(&self_) {
        let users = self_.store.find_all_users(UserFilter::default()).await?;
        Ok(UserResolver::list(users, &self_.store))
    }

    async fn post(&self_, info) {
        let filter = PostFilter::by_id(info.required_int_argument("id")?);
        let post = self_.store.find_one_post(filter).await?;
        Ok(PostResolver::value(post, &self_.store))
    }

    async fn posts(&self_, info) {
        let filter = PostFilter {
            id: None,
            user_id: info.int_argument("userId")?,
        };
        let posts = self_.store.find_all_posts(filter).await?;
        Ok(PostResolver::list(posts, &self_.store))
    }
}
