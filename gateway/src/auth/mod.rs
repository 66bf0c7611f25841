//! Bearer token authentication.
//!
//! The REST controllers issue tokens with [`JwtAuth::issue`]. In production, every request to the
//! GraphQL endpoint goes through [`require_authorization`] before reaching the GraphQL handler.

pub mod password;

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::Request;
use axum::extract::State;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use displaydoc::Display;
use http::HeaderMap;
use http::StatusCode;
use http::header::AUTHORIZATION;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::get_current_timestamp;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

const BEARER: &str = "Bearer";

/// Authentication error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum AuthError {
    /// No Authorization was found
    MissingAuthorization,

    /// Format for Authorization: Bearer [token]
    MalformedAuthorization,

    /// Invalid Token!
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// could not sign token: {0}
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl AuthError {
    pub(crate) fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthorization
            | AuthError::MalformedAuthorization
            | AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            AuthError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(serde_json::json!({ "msg": self.to_string() }))).into_response()
    }
}

/// The claims carried by the tokens the gateway issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the authenticated user.
    pub id: i32,
    pub iat: u64,
    pub exp: u64,
}

/// Decides whether a request may proceed.
pub trait AuthGate: Send + Sync + 'static {
    fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError>;
}

/// HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtAuth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl JwtAuth {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    /// Signs a token for `user_id`, expiring after the configured TTL.
    pub fn issue(&self, user_id: i32) -> Result<String, AuthError> {
        let iat = get_current_timestamp();
        let claims = Claims {
            id: user_id,
            iat,
            exp: iat + self.ttl.as_secs(),
        };
        encode(&Header::default(), &claims, &self.encoding_key).map_err(AuthError::Signing)
    }

    /// Checks the signature and expiry of a token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(AuthError::InvalidToken)
    }
}

impl AuthGate for JwtAuth {
    fn authorize(&self, headers: &HeaderMap) -> Result<Claims, AuthError> {
        let token = bearer_token(headers)?;
        self.verify(token)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthorization)?
        .to_str()
        .map_err(|_| AuthError::MalformedAuthorization)?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER), Some(token), None) => Ok(token),
        _ => Err(AuthError::MalformedAuthorization),
    }
}

/// Middleware rejecting requests the gate does not authorize with a 401 `{"msg": ...}` body.
pub(crate) async fn require_authorization(
    State(gate): State<Arc<dyn AuthGate>>,
    request: Request,
    next: Next,
) -> Response {
    match gate.authorize(request.headers()) {
        Ok(claims) => {
            tracing::debug!(user_id = claims.id, "request authorized");
            next.run(request).await
        }
        Err(error) => {
            tracing::debug!(%error, "request rejected by the auth gate");
            error.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use http::HeaderValue;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    fn auth() -> JwtAuth {
        JwtAuth::new("secret", Duration::from_secs(3 * 60 * 60))
    }

    fn headers(authorization: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(authorization).unwrap());
        headers
    }

    #[test]
    fn issued_tokens_verify() {
        let auth = auth();
        let token = auth.issue(7).unwrap();
        let claims = auth.verify(&token).unwrap();
        assert_eq!(claims.id, 7);
        assert_eq!(claims.exp - claims.iat, 3 * 60 * 60);
    }

    #[test]
    fn tokens_from_another_secret_are_rejected() {
        let token = JwtAuth::new("other", Duration::from_secs(60))
            .issue(7)
            .unwrap();
        assert!(matches!(
            auth().verify(&token),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let auth = auth();
        let now = get_current_timestamp();
        let claims = Claims {
            id: 7,
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(&Header::default(), &claims, &auth.encoding_key).unwrap();
        assert!(matches!(auth.verify(&token), Err(AuthError::InvalidToken(_))));
    }

    #[test]
    fn the_gate_reads_bearer_headers() {
        let auth = auth();
        let token = auth.issue(3).unwrap();
        assert_eq!(
            auth.authorize(&headers(&format!("Bearer {token}"))).unwrap().id,
            3
        );
        assert!(matches!(
            auth.authorize(&HeaderMap::new()),
            Err(AuthError::MissingAuthorization)
        ));
        for malformed in [token.as_str(), "Basic abc", "Bearer a b", "bearer abc"] {
            assert!(matches!(
                auth.authorize(&headers(malformed)),
                Err(AuthError::MalformedAuthorization)
            ));
        }
        assert!(matches!(
            auth.authorize(&headers("Bearer not-a-token")),
            Err(AuthError::InvalidToken(_))
        ));
    }

    async fn call(router: Router, authorization: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut request = http::Request::get("/graphql");
        if let Some(authorization) = authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        let response = router
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, body.to_vec())
    }

    fn gated_router() -> Router {
        let gate: Arc<dyn AuthGate> = Arc::new(auth());
        Router::new()
            .route("/graphql", get(|| async { "reached" }))
            .layer(axum::middleware::from_fn_with_state(
                gate,
                require_authorization,
            ))
    }

    #[tokio::test]
    async fn the_middleware_answers_401_with_a_message() {
        let (status, body) = call(gated_router(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            json!({ "msg": "No Authorization was found" })
        );

        let (status, body) = call(gated_router(), Some("Token abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            json!({ "msg": "Format for Authorization: Bearer [token]" })
        );

        let (status, body) = call(gated_router(), Some("Bearer abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).unwrap(),
            json!({ "msg": "Invalid Token!" })
        );
    }

    #[tokio::test]
    async fn the_middleware_lets_valid_tokens_through() {
        let token = auth().issue(1).unwrap();
        let (status, body) = call(gated_router(), Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"reached");
    }
}
