use apollo_compiler::resolvers::AsyncResolvedValue;

use super::post::PostResolver;
use super::resolver::FieldArguments;
use super::user::UserResolver;
use crate::store::NewPost;
use crate::store::PostChanges;
use crate::store::SharedStore;
use crate::store::UserChanges;

/// The `Mutation` root. Its fields run one after the other, in document order.
pub(crate) struct MutationResolver {
    pub(crate) store: SharedStore,
}

impl_resolver! {
    for MutationResolver:

    __typename = "Mutation";

    async fn updateUser(&self_, info) {
        let changes = UserChanges {
            username: info.string_argument("username")?,
            email: info.string_argument("email")?,
        };
        let user = self_
            .store
            .update_user(info.required_int_argument("id")?, changes)
            .await?;
        Ok(UserResolver::value(user, &self_.store))
    }

    async fn deleteUser(&self_, info) {
        let user = self_
            .store
            .delete_user(info.required_int_argument("id")?)
            .await?;
        Ok(UserResolver::value(user, &self_.store))
    }

    async fn createPost(&self_, info) {
        let post = NewPost {
            title: info.required_string_argument("title")?,
            content: info.string_argument("content")?,
            user_id: info.int_argument("userId")?,
        };
        let post = self_.store.create_post(post).await?;
        Ok(PostResolver::value(Some(post), &self_.store))
    }

    async fn updatePost(&self_, info) {
        let changes = PostChanges {
            title: info.string_argument("title")?,
            content: info.string_argument("content")?,
        };
        let post = self_
            .store
            .update_post(info.required_int_argument("id")?, changes)
            .await?;
        Ok(PostResolver::value(post, &self_.store))
    }

    async fn deletePost(&self_, info) {
        let post = self_
            .store
            .delete_post(info.required_int_argument("id")?)
            .await?;
        Ok(PostResolver::value(post, &self_.store))
    }
}
