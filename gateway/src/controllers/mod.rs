//! REST controllers, mounted below the REST prefix through the [`RouteMap`].

mod user;

use axum::Json;
use axum::extract::FromRequest;
use axum::extract::Request;
use axum::response::IntoResponse;
use axum::response::Response;
use bytes::Bytes;
use displaydoc::Display;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::axum_factory::AppState;
use crate::route_map::RouteMap;
use crate::route_map::RouteMapError;

/// The public REST routes.
pub(crate) fn public_routes() -> Result<RouteMap<AppState>, RouteMapError> {
    RouteMap::new()
        .route("POST /user", user::register)?
        .route("POST /register", user::register)?
        .route("POST /login", user::login)?
        .route("POST /validate", user::validate)
}

/// A failed REST request, answered with a `{"msg": ...}` body.
#[derive(Debug, Error, Display)]
pub(crate) enum ControllerError {
    /// Bad Request: {0}
    BadRequest(String),

    /// Unauthorized
    Unauthorized,

    /// Conflict: {0}
    Conflict(String),

    /// Internal server error
    Internal,
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let status = match self {
            ControllerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ControllerError::Unauthorized => StatusCode::UNAUTHORIZED,
            ControllerError::Conflict(_) => StatusCode::CONFLICT,
            ControllerError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "msg": self.to_string() }))).into_response()
    }
}

/// A request body, either JSON or `application/x-www-form-urlencoded`. An empty body reads as
/// an empty object.
pub(crate) struct Payload<T>(pub(crate) T);

impl<T, S> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ControllerError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = request
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<mime::Mime>().ok())
            .is_some_and(|mime| {
                mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str()
            });
        let body = Bytes::from_request(request, state)
            .await
            .map_err(|rejection| ControllerError::BadRequest(rejection.body_text()))?;
        let payload = if is_form {
            serde_urlencoded::from_bytes(&body)
                .map_err(|error| ControllerError::BadRequest(error.to_string()))?
        } else if body.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_slice(b"{}")
                .map_err(|error| ControllerError::BadRequest(error.to_string()))?
        } else {
            serde_json::from_slice(&body)
                .map_err(|error| ControllerError::BadRequest(error.to_string()))?
        };
        Ok(Payload(payload))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Credentials {
        email: Option<String>,
        password: Option<String>,
    }

    async fn payload(
        content_type: Option<&str>,
        body: &'static str,
    ) -> Result<Credentials, ControllerError> {
        let mut request = http::Request::post("/login");
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        Payload::<Credentials>::from_request(request.body(Body::from(body)).unwrap(), &())
            .await
            .map(|Payload(credentials)| credentials)
    }

    #[test]
    fn it_declares_the_public_routes() {
        let routes = public_routes().unwrap();
        let keys: Vec<String> = routes.keys().map(ToString::to_string).collect();
        insta::assert_snapshot!(keys.join("\n"), @r"
        POST /login
        POST /register
        POST /user
        POST /validate
        ");
    }

    #[tokio::test]
    async fn it_reads_json_and_forms() {
        let expected = Credentials {
            email: Some("alice@example.com".to_string()),
            password: Some("hunter2".to_string()),
        };
        assert_eq!(
            payload(
                Some("application/json"),
                r#"{"email": "alice@example.com", "password": "hunter2"}"#
            )
            .await
            .unwrap(),
            expected
        );
        assert_eq!(
            payload(
                Some("application/x-www-form-urlencoded; charset=utf-8"),
                "email=alice%40example.com&password=hunter2"
            )
            .await
            .unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn empty_bodies_are_empty_objects() {
        assert_eq!(payload(None, "").await.unwrap(), Credentials::default());
    }

    #[tokio::test]
    async fn malformed_bodies_are_bad_requests() {
        let error = payload(Some("application/json"), "{").await.unwrap_err();
        assert!(matches!(error, ControllerError::BadRequest(_)));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
