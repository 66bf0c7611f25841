use axum::Extension;
use axum::Json;
use axum::body::Body;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use http::HeaderValue;
use http::Method;
use http::StatusCode;
use http::header::ALLOW;
use http::header::CONTENT_TYPE;
use http::request::Parts;

use super::AppState;
use super::static_page::html_content_type;
use super::static_page::prefers_html;
use crate::graphql;

const APPLICATION_GRAPHQL: &str = "application/graphql";

/// Largest GraphQL request body read into memory.
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

/// Decodes the GraphQL request carried by a GET query string or a POST body, ahead of the auth
/// gate and the handlers. The decoded [`graphql::Request`] travels in the request extensions.
///
/// With a `static_page`, GET requests preferring `text/html` get that page instead.
pub(super) async fn decode_graphql_request(
    State(static_page): State<Option<Bytes>>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let decoded = match parts.method {
        Method::GET => {
            if let Some(page) = static_page.filter(|_| prefers_html(&parts.headers)) {
                return (html_content_type(), page).into_response();
            }
            decode_query_string(&parts)
        }
        Method::POST => decode_body(&parts, body).await,
        _ => return next.run(Request::from_parts(parts, body)).await,
    };
    match decoded {
        Ok(graphql_request) => {
            parts.extensions.insert(graphql_request);
            next.run(Request::from_parts(parts, Body::empty())).await
        }
        Err(response) => response,
    }
}

fn decode_query_string(parts: &Parts) -> Result<graphql::Request, Response> {
    graphql::Request::from_urlencoded_query(parts.uri.query().unwrap_or_default()).map_err(
        |error| {
            tracing::debug!(%error, "could not decode a GraphQL request from the query string");
            invalid_request(
                StatusCode::BAD_REQUEST,
                format!("failed to decode a valid GraphQL request from path: {error}"),
            )
        },
    )
}

async fn decode_body(parts: &Parts, body: Body) -> Result<graphql::Request, Response> {
    let body = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|error| {
            invalid_request(
                StatusCode::BAD_REQUEST,
                format!("failed to read the request body: {error}"),
            )
        })?;
    let essence = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<mime::Mime>().ok())
        .map(|mime| mime.essence_str().to_string());

    let request = match essence.as_deref() {
        _ if body.is_empty() => Ok(graphql::Request::default()),
        None => graphql::Request::from_json_bytes(&body),
        Some(essence) if essence == mime::APPLICATION_JSON.essence_str() => {
            graphql::Request::from_json_bytes(&body)
        }
        Some(essence) if essence == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
            graphql::Request::from_urlencoded_query(&String::from_utf8_lossy(&body))
        }
        Some(APPLICATION_GRAPHQL) => Ok(graphql::Request::from_document(&body)),
        Some(other) => {
            return Err(invalid_request(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "unsupported content-type '{other}', use application/json, application/x-www-form-urlencoded or {APPLICATION_GRAPHQL}"
                ),
            ));
        }
    };
    request.map_err(|error| {
        tracing::debug!(%error, "could not decode a GraphQL request from the body");
        invalid_request(
            StatusCode::BAD_REQUEST,
            format!("failed to deserialize the request body into JSON: {error}"),
        )
    })
}

pub(super) async fn handle_get(
    State(state): State<AppState>,
    Extension(request): Extension<graphql::Request>,
) -> Response {
    execute(&state, request, Method::GET).await
}

pub(super) async fn handle_post(
    State(state): State<AppState>,
    Extension(request): Extension<graphql::Request>,
) -> Response {
    execute(&state, request, Method::POST).await
}

/// Any method other than GET and POST on the GraphQL mount point.
pub(super) async fn method_not_allowed() -> Response {
    let mut response = invalid_request(
        StatusCode::METHOD_NOT_ALLOWED,
        "GraphQL only supports GET and POST requests.".to_string(),
    );
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, POST"));
    response
}

pub(super) async fn health(State(state): State<AppState>) -> Response {
    match state.store.ping().await {
        Ok(()) => Json(serde_json::json!({ "status": "UP" })).into_response(),
        Err(error) => {
            tracing::warn!(%error, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "DOWN" })),
            )
                .into_response()
        }
    }
}

async fn execute(state: &AppState, request: graphql::Request, method: Method) -> Response {
    let (status, response) = state.type_graph.execute(&request, &method).await;
    (status, Json(response)).into_response()
}

fn invalid_request(status: StatusCode, message: String) -> Response {
    let response = graphql::Response::from_errors(vec![
        graphql::Error::builder()
            .message(message)
            .extension_code(graphql::ERROR_CODE_BAD_REQUEST)
            .build(),
    ]);
    (status, Json(response)).into_response()
}
