use apollo_compiler::resolvers::AsyncResolvedValue;

use super::user::UserResolver;
use crate::store::Post;
use crate::store::SharedStore;
use crate::store::UserFilter;

/// `Post`: attribute projections, plus its author looked up in the store on each selection.
pub(crate) struct PostResolver {
    post: Post,
    store: SharedStore,
}

impl PostResolver {
    pub(crate) fn new(post: Post, store: &SharedStore) -> Self {
        Self {
            post,
            store: SharedStore::clone(store),
        }
    }

    pub(crate) fn value<'a>(
        post: Option<Post>,
        store: &SharedStore,
    ) -> AsyncResolvedValue<'a> {
        AsyncResolvedValue::nullable_object(post.map(|post| Self::new(post, store)))
    }

    pub(crate) fn list<'a>(posts: Vec<Post>, store: &SharedStore) -> AsyncResolvedValue<'a> {
        let posts: Vec<_> = posts
            .into_iter()
            .map(|post| AsyncResolvedValue::object(Self::new(post, store)))
            .collect();
        AsyncResolvedValue::list(posts)
    }
}

impl_resolver! {
    for PostResolver:

    __typename = "Post";

    async fn id(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.id))
    }

    async fn title(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.title.as_str()))
    }

    async fn content(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.content.as_deref()))
    }

    async fn UserId(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.user_id))
    }

    async fn user(&self_) {
        let Some(user_id) = self_.post.user_id else {
            return Ok(AsyncResolvedValue::null());
        };
        let user = self_.store.find_one_user(UserFilter::by_id(user_id)).await?;
        Ok(UserResolver::value(user, &self_.store))
    }

    async fn createdAt(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.created_at.to_rfc3339()))
    }

    async fn updatedAt(&self_) {
        Ok(AsyncResolvedValue::leaf(self_.post.updated_at.to_rfc3339()))
    }
}
