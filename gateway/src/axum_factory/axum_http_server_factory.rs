//! Axum http server factory. Axum provides routing capability on top of Hyper HTTP.
use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::response::Response;
use axum::routing::MethodRouter;
use axum::routing::get;
use futures::FutureExt;
use futures::future;
use http::HeaderName;
use http::HeaderValue;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::AppState;
use super::handlers;
use super::static_page::graphiql_page_content;
use crate::Configuration;
use crate::Environment;
use crate::auth::AuthGate;
use crate::auth::require_authorization;
use crate::configuration::ConfigurationError;
use crate::controllers;
use crate::error::GatewayError;
use crate::route_map::not_found;

/// Builds the whole request pipeline.
///
/// Every request is traced, then goes through CORS and gets the security headers on its
/// response. REST requests are dispatched below the REST prefix by the route map. The GraphQL
/// mount point serves GET and POST, behind the auth gate in production.
pub fn make_axum_router(
    configuration: &Configuration,
    environment: &Environment,
    state: AppState,
) -> Result<Router, GatewayError> {
    let cors = configuration.cors.clone().into_layer().map_err(|error| {
        ConfigurationError::InvalidConfiguration {
            message: "invalid cors configuration",
            error,
        }
    })?;
    let security_headers = Arc::new(configuration.security_headers.headers().map_err(
        |error| ConfigurationError::InvalidConfiguration {
            message: "invalid security headers configuration",
            error,
        },
    )?);
    let rest = controllers::public_routes()?;
    for key in rest.keys() {
        tracing::debug!(route = %key, prefix = %configuration.rest.prefix, "mounting REST route");
    }

    let router = Router::new()
        .route(
            &configuration.server.health_check_path,
            get(handlers::health),
        )
        .route(
            &configuration.graphql.path,
            graphql_router(environment, &state),
        )
        .nest(
            configuration.rest.prefix.trim_end_matches('/'),
            rest.into_router(),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::map_response(move |response: Response| {
            let security_headers = Arc::clone(&security_headers);
            async move { with_security_headers(&security_headers, response) }
        }))
        .layer(cors)
        .layer(TraceLayer::new_for_http());
    Ok(router)
}

fn graphql_router(environment: &Environment, state: &AppState) -> MethodRouter<AppState> {
    let graphql = get(handlers::handle_get)
        .post(handlers::handle_post)
        .fallback(handlers::method_not_allowed);
    let graphql = if environment.is_production() {
        let gate: Arc<dyn AuthGate> = Arc::new(state.auth.clone());
        graphql.layer(middleware::from_fn_with_state(gate, require_authorization))
    } else {
        graphql
    };
    // Outermost, so requests are decoded before the auth gate sees them.
    let static_page = environment.is_not_production().then(graphiql_page_content);
    graphql.layer(middleware::from_fn_with_state(
        static_page,
        handlers::decode_graphql_request,
    ))
}

fn with_security_headers(
    security_headers: &[(HeaderName, HeaderValue)],
    mut response: Response,
) -> Response {
    let headers = response.headers_mut();
    for (name, value) in security_headers {
        headers.entry(name).or_insert_with(|| value.clone());
    }
    response
}

/// Serves `router` on `listener` until Ctrl-C or SIGTERM, then drains in-flight requests.
pub(crate) async fn serve(listener: TcpListener, router: Router) -> Result<(), GatewayError> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(GatewayError::Serve)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(%error, "failed to install the Ctrl-C signal handler");
            future::pending::<()>().await;
        }
    }
    .boxed();

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "failed to install the SIGTERM signal handler");
                future::pending::<()>().await;
            }
        }
    }
    .boxed();

    #[cfg(not(unix))]
    let terminate = future::pending::<()>().boxed();

    future::select(ctrl_c, terminate).await;
    tracing::info!("shutting down");
}
