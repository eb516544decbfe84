use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use std::{sync::Arc, time::SystemTime};
use unibee_portal::{
    AppState, InMemoryRepository, MockIdentityProvider, MockStorageService, PortalError,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    models::{Role, User},
};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(user_id: Uuid, exp: u64) -> String {
    let claims = Claims {
        sub: user_id,
        iat: now() as usize,
        exp: exp as usize,
    };
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn test_user(role: Role, is_verified: bool) -> User {
    User {
        id: TEST_USER_ID,
        email: "u2204112@student.cuet.ac.bd".to_string(),
        role,
        department_id: "04".to_string(),
        batch: Some("22".to_string()),
        is_verified,
        created_at: Utc::now(),
    }
}

fn create_app_state(env: Env, users: Vec<User>) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };

    AppState::new(
        Arc::new(InMemoryRepository::with_users(users)),
        Arc::new(MockIdentityProvider::new(TEST_JWT_SECRET)),
        Arc::new(MockStorageService::new()),
        config,
    )
    .unwrap()
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Cr, false)]);
    let token = create_token(TEST_USER_ID, now() + 3600);
    let mut parts = with_bearer(&token);

    let auth_user = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap();

    assert_eq!(auth_user.session.id, TEST_USER_ID);
    assert_eq!(auth_user.session.role, Role::Cr);
    assert!(auth_user.session.is_pending_cr());
    assert_eq!(auth_user.access_token.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn test_auth_accepts_backend_tokens_with_extra_claims() {
    // Tokens from the identity service carry aud/email/role claims as well.
    #[derive(Serialize)]
    struct BackendClaims<'a> {
        sub: Uuid,
        exp: u64,
        iat: u64,
        aud: &'a str,
        role: &'a str,
        email: &'a str,
    }

    let claims = BackendClaims {
        sub: TEST_USER_ID,
        exp: now() + 3600,
        iat: now(),
        aud: "authenticated",
        role: "authenticated",
        email: "u2204112@student.cuet.ac.bd",
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap();

    let app_state = create_app_state(Env::Production, vec![test_user(Role::Student, true)]);
    let mut parts = with_bearer(&token);

    let auth_user = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap();
    // The profile row decides the role, not the token.
    assert_eq!(auth_user.session.role, Role::Student);
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Student, true)]);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Student, true)]);
    // Well past the default leeway.
    let token = create_token(TEST_USER_ID, now() - 3600);
    let mut parts = with_bearer(&token);

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap_err();

    assert!(matches!(err, PortalError::Unauthorized(ref m) if m.contains("expired")));
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Student, true)]);
    let claims = Claims {
        sub: TEST_USER_ID,
        iat: now() as usize,
        exp: (now() + 3600) as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"some-other-secret"),
    )
    .unwrap();
    let mut parts = with_bearer(&token);

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_failure_when_profile_is_gone() {
    // e.g. a CR whose signup was rejected after the token was issued.
    let app_state = create_app_state(Env::Production, vec![]);
    let token = create_token(TEST_USER_ID, now() + 3600);
    let mut parts = with_bearer(&token);

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let app_state = create_app_state(Env::Local, vec![test_user(Role::Admin, true)]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let auth_user = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap();

    assert_eq!(auth_user.session.id, TEST_USER_ID);
    assert_eq!(auth_user.session.role, Role::Admin);
    assert_eq!(auth_user.access_token, None);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Admin, true)]);

    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&TEST_USER_ID.to_string()).unwrap(),
    );

    let err = <AuthUser as FromRequestParts<AppState>>::from_request_parts(&mut parts, &app_state).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_optional_extractor_falls_back_to_anonymous() {
    let app_state = create_app_state(Env::Production, vec![test_user(Role::Student, true)]);

    let mut anonymous = get_request_parts(Method::GET, "/".parse().unwrap());
    let resolved =
        <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut anonymous, &app_state)
            .await
            .unwrap();
    assert!(resolved.is_none());

    let mut garbage = with_bearer("not-a-jwt");
    let resolved =
        <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut garbage, &app_state)
            .await
            .unwrap();
    assert!(resolved.is_none());

    let mut valid = with_bearer(&create_token(TEST_USER_ID, now() + 3600));
    let resolved =
        <AuthUser as OptionalFromRequestParts<AppState>>::from_request_parts(&mut valid, &app_state)
            .await
            .unwrap();
    assert_eq!(resolved.map(|a| a.session.id), Some(TEST_USER_ID));
}
