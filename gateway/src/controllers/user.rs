use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::response::Response;
use http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ControllerError;
use super::Payload;
use crate::auth::AuthError;
use crate::auth::password;
use crate::axum_factory::AppState;
use crate::store::NewUser;
use crate::store::StoreError;
use crate::store::User;
use crate::store::UserFilter;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct Registration {
    username: Option<String>,
    email: Option<String>,
    password: Option<String>,
    password2: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct Credentials {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct TokenCheck {
    token: Option<String>,
}

/// A signed-in user.
#[derive(Debug, Serialize)]
pub(super) struct Session {
    token: String,
    user: User,
}

impl From<StoreError> for ControllerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict { entity, .. } => {
                ControllerError::Conflict(format!("{entity} already exists"))
            }
            error => {
                tracing::error!(%error, "store request failed");
                ControllerError::Internal
            }
        }
    }
}

impl From<AuthError> for ControllerError {
    fn from(error: AuthError) -> Self {
        tracing::error!(%error, "could not issue a token");
        ControllerError::Internal
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ControllerError> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ControllerError::BadRequest(format!("missing {field}")))
}

pub(super) async fn register(
    State(state): State<AppState>,
    Payload(registration): Payload<Registration>,
) -> Result<Json<Session>, ControllerError> {
    if registration.password != registration.password2 {
        return Err(ControllerError::BadRequest(
            "Passwords don't match".to_string(),
        ));
    }
    let new_user = NewUser {
        username: required("username", registration.username)?,
        email: required("email", registration.email)?,
        password: password::hash(&required("password", registration.password)?),
    };
    let user = state.store.create_user(new_user).await?;
    tracing::debug!(user_id = user.id, "registered user");
    let token = state.auth.issue(user.id)?;
    Ok(Json(Session { token, user }))
}

pub(super) async fn login(
    State(state): State<AppState>,
    Payload(credentials): Payload<Credentials>,
) -> Result<Json<Session>, ControllerError> {
    let (Some(email), Some(candidate)) = (credentials.email, credentials.password) else {
        return Err(ControllerError::BadRequest(
            "Email or password is wrong".to_string(),
        ));
    };
    let user = state
        .store
        .find_one_user(UserFilter::by_email(email))
        .await?
        .filter(|user| password::verify(&candidate, &user.password))
        .ok_or(ControllerError::Unauthorized)?;
    let token = state.auth.issue(user.id)?;
    Ok(Json(Session { token, user }))
}

pub(super) async fn validate(
    State(state): State<AppState>,
    Payload(check): Payload<TokenCheck>,
) -> Response {
    let verified = check
        .token
        .ok_or(())
        .and_then(|token| state.auth.verify(&token).map_err(|_| ()));
    match verified {
        Ok(_) => Json(serde_json::json!({ "isvalid": true })).into_response(),
        Err(()) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "isvalid": false, "err": "Invalid Token!" })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use http::Method;
    use http::header::CONTENT_TYPE;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::store::MockStore;
    use crate::store::fixtures;

    use super::*;

    fn router(store: MockStore) -> Router {
        let state = AppState::for_tests(Arc::new(store));
        super::super::public_routes()
            .unwrap()
            .into_router()
            .with_state(state)
    }

    async fn post(router: Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                http::Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn register_creates_a_user_and_signs_a_token() {
        let mut store = MockStore::new();
        store
            .expect_create_user()
            .withf(|new_user| {
                new_user.username == "alice"
                    && new_user.email == "alice@example.com"
                    && password::verify("hunter2", &new_user.password)
            })
            .times(2)
            .returning(|_| Ok(fixtures::user(1, "alice")));
        let router = router(store);

        for uri in ["/register", "/user"] {
            let (status, body) = post(
                router.clone(),
                uri,
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "hunter2",
                    "password2": "hunter2",
                }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["user"]["username"], "alice");
            assert!(body["user"].get("password").is_none());
            let token = body["token"].as_str().unwrap();
            assert_eq!(AppState::test_auth().verify(token).unwrap().id, 1);
        }
    }

    #[tokio::test]
    async fn register_requires_matching_passwords() {
        let mut store = MockStore::new();
        store.expect_create_user().never();

        let (status, body) = post(
            router(store),
            "/register",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "hunter2",
                "password2": "hunter3",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "msg": "Bad Request: Passwords don't match" }));
    }

    #[tokio::test]
    async fn register_reports_taken_emails() {
        let mut store = MockStore::new();
        store.expect_create_user().returning(|_| {
            Err(StoreError::Conflict {
                entity: "user",
                reason: "duplicate key".to_string(),
            })
        });

        let (status, body) = post(
            router(store),
            "/register",
            json!({
                "username": "alice",
                "email": "alice@example.com",
                "password": "hunter2",
                "password2": "hunter2",
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body, json!({ "msg": "Conflict: user already exists" }));
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let mut store = MockStore::new();
        store
            .expect_find_one_user()
            .withf(|filter| filter.email.as_deref() == Some("alice@example.com"))
            .returning(|_| {
                let mut user = fixtures::user(1, "alice");
                user.password = password::hash("hunter2");
                Ok(Some(user))
            });
        let router = router(store);

        let (status, body) = post(
            router.clone(),
            "/login",
            json!({ "email": "alice@example.com", "password": "hunter2" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["id"], 1);
        assert!(body["token"].is_string());

        let (status, body) = post(
            router,
            "/login",
            json!({ "email": "alice@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "msg": "Unauthorized" }));
    }

    #[tokio::test]
    async fn login_rejects_unknown_users_and_missing_fields() {
        let mut store = MockStore::new();
        store.expect_find_one_user().times(1).returning(|_| Ok(None));
        let router = router(store);

        let (status, _) = post(
            router.clone(),
            "/login",
            json!({ "email": "bob@example.com", "password": "hunter2" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = post(router, "/login", json!({ "email": "bob@example.com" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "msg": "Bad Request: Email or password is wrong" })
        );
    }

    #[tokio::test]
    async fn validate_answers_with_the_token_state() {
        let router = router(MockStore::new());
        let token = AppState::test_auth().issue(7).unwrap();

        let (status, body) = post(router.clone(), "/validate", json!({ "token": token })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "isvalid": true }));

        for body in [json!({ "token": "not-a-jwt" }), json!({})] {
            let (status, body) = post(router.clone(), "/validate", body).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body, json!({ "isvalid": false, "err": "Invalid Token!" }));
        }
    }
}
