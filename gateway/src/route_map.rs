//! A static `{method, path} -> handler` table for the REST surface.
//!
//! Routes are declared as `"METHOD /path"` keys. The table is checked when built: a malformed key
//! or a key declared twice is an error, not a silently shadowed route. Requests matching no
//! declared `{method, path}` get a 404 `{"msg": "Not Found"}` response.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use axum::Json;
use axum::Router;
use axum::handler::Handler;
use axum::response::IntoResponse;
use axum::routing::MethodFilter;
use axum::routing::MethodRouter;
use axum::routing::on;
use displaydoc::Display;
use http::Method;
use http::StatusCode;
use thiserror::Error;

/// The route table could not be built.
#[derive(Debug, Error, Display, PartialEq, Eq)]
#[non_exhaustive]
pub enum RouteMapError {
    /// route '{0}' must look like 'METHOD /path'
    InvalidKey(String),

    /// route '{0}' uses an unsupported method
    UnsupportedMethod(String),

    /// route '{0}' is declared more than once
    Duplicate(String),
}

/// The key of a route: a method and an exact path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteKey {
    path: String,
    method: String,
}

impl RouteKey {
    pub fn method(&self) -> Method {
        Method::from_bytes(self.method.as_bytes()).unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn method_filter(&self) -> Result<MethodFilter, RouteMapError> {
        MethodFilter::try_from(self.method())
            .map_err(|_| RouteMapError::UnsupportedMethod(self.to_string()))
    }
}

impl FromStr for RouteKey {
    type Err = RouteMapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some(method), Some(path), None) if path.starts_with('/') => {
                let method = method.to_ascii_uppercase();
                Method::from_bytes(method.as_bytes())
                    .map_err(|_| RouteMapError::InvalidKey(s.to_string()))?;
                Ok(Self {
                    path: path.to_string(),
                    method,
                })
            }
            _ => Err(RouteMapError::InvalidKey(s.to_string())),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Declared routes, turned into an axum [`Router`] with [`RouteMap::into_router`].
pub struct RouteMap<S = ()> {
    routes: BTreeMap<RouteKey, MethodRouter<S>>,
}

impl<S> Default for RouteMap<S> {
    fn default() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }
}

impl<S> fmt::Debug for RouteMap<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

impl<S> RouteMap<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `handler` for the `"METHOD /path"` in `key`.
    pub fn route<H, T>(mut self, key: &str, handler: H) -> Result<Self, RouteMapError>
    where
        H: Handler<T, S>,
        T: 'static,
    {
        let key: RouteKey = key.parse()?;
        if self.routes.contains_key(&key) {
            return Err(RouteMapError::Duplicate(key.to_string()));
        }
        let method_router = on(key.method_filter()?, handler);
        self.routes.insert(key, method_router);
        Ok(self)
    }

    /// The declared routes, sorted by path then method.
    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.routes.keys()
    }

    /// A router serving exactly the declared routes.
    pub fn into_router(self) -> Router<S> {
        let mut by_path: BTreeMap<String, MethodRouter<S>> = BTreeMap::new();
        for (key, method_router) in self.routes {
            let merged = match by_path.remove(&key.path) {
                Some(existing) => existing.merge(method_router),
                None => method_router,
            };
            by_path.insert(key.path, merged);
        }
        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                // A known path with an unmapped method is not found either
                router.route(&path, method_router.fallback(not_found))
            })
            .fallback(not_found)
    }
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "msg": "Not Found" })),
    )
}
