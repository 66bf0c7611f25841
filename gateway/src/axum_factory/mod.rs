//! The HTTP surface: an axum [`Router`](axum::Router) serving the REST controllers, the GraphQL
//! mount point and the health check, built by [`make_axum_router`].
mod axum_http_server_factory;
mod handlers;
mod static_page;

pub use axum_http_server_factory::make_axum_router;
pub(crate) use axum_http_server_factory::serve;

use crate::Configuration;
use crate::Environment;
use crate::TypeGraph;
use crate::auth::JwtAuth;
use crate::error::GatewayError;
use crate::store::SharedStore;

/// What every handler shares: the store, the token signer and the type graph.
#[derive(Clone)]
pub struct AppState {
    pub(crate) store: SharedStore,
    pub(crate) auth: JwtAuth,
    pub(crate) type_graph: TypeGraph,
}

impl AppState {
    pub fn new(
        configuration: &Configuration,
        environment: &Environment,
        store: SharedStore,
    ) -> Result<Self, GatewayError> {
        let secret = configuration.secret(environment)?;
        let auth = JwtAuth::new(&secret, configuration.auth.token_ttl);
        let type_graph = TypeGraph::new(
            SharedStore::clone(&store),
            configuration.introspection(environment),
        )?;
        Ok(Self {
            store,
            auth,
            type_graph,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
impl AppState {
    pub(crate) fn test_auth() -> JwtAuth {
        JwtAuth::new("test secret", std::time::Duration::from_secs(60 * 60))
    }

    pub(crate) fn for_tests(store: SharedStore) -> Self {
        Self {
            store: SharedStore::clone(&store),
            auth: Self::test_auth(),
            type_graph: TypeGraph::new(store, true).unwrap(),
        }
    }
}
