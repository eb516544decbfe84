use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use reqwest::StatusCode;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    auth::Claims,
    error::{PortalError, PortalResult},
};

/// IdentityGrant
///
/// What the identity service hands back after signup or login. `access_token` is
/// absent when the account must confirm its email before a session is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityGrant {
    pub user_id: Uuid,
    pub access_token: Option<String>,
}

/// IdentityProvider
///
/// Credentials and sessions live in the managed identity service; the portal only
/// mirrors the profile row.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> PortalResult<IdentityGrant>;
    async fn sign_in(&self, email: &str, password: &str) -> PortalResult<IdentityGrant>;
    async fn sign_out(&self, access_token: &str) -> PortalResult<()>;
}

pub type IdentityState = Arc<dyn IdentityProvider>;

// --- Supabase (GoTrue) ---

const SIGNUP_FAILED_MESSAGE: &str = "Signup failed. Please try again.";
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid login credentials";

/// SupabaseIdentity
///
/// Talks to the backend's `/auth/v1` REST endpoints with the public (anon) key.
#[derive(Clone)]
pub struct SupabaseIdentity {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
}

#[derive(Deserialize)]
struct GoTrueUser {
    id: Uuid,
}

// Signup returns either a full session or, with email confirmation on, the bare user.
#[derive(Deserialize)]
struct GoTrueResponse {
    access_token: Option<String>,
    user: Option<GoTrueUser>,
    id: Option<Uuid>,
}

#[derive(Deserialize, Default)]
struct GoTrueError {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl GoTrueError {
    fn into_message(self) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .unwrap_or_default()
    }
}

impl SupabaseIdentity {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    async fn post_credentials(&self, path: &str, email: &str, password: &str) -> PortalResult<reqwest::Response> {
        let url = format!("{}/auth/v1/{}", self.base_url, path);
        self.client
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("identity request to {} failed: {:?}", path, e);
                PortalError::from(e)
            })
    }

    /// Turns a GoTrue reply into a grant. Client rejections carry the service's message,
    /// or `fallback` when the body is not JSON or names no message.
    async fn read_grant(
        response: reqwest::Response,
        on_client_error: fn(String) -> PortalError,
        fallback: &str,
    ) -> PortalResult<IdentityGrant> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GoTrueError>()
                .await
                .unwrap_or_default()
                .into_message();
            tracing::warn!(%status, "identity service rejected request: {}", message);
            return Err(if status.is_client_error() {
                if message.trim().is_empty() {
                    on_client_error(fallback.to_string())
                } else {
                    on_client_error(message)
                }
            } else {
                PortalError::Backend(message)
            });
        }

        let body = response.json::<GoTrueResponse>().await?;
        let user_id = body
            .user
            .map(|u| u.id)
            .or(body.id)
            .ok_or_else(|| PortalError::backend("Identity service returned no user id"))?;
        Ok(IdentityGrant {
            user_id,
            access_token: body.access_token,
        })
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_up(&self, email: &str, password: &str) -> PortalResult<IdentityGrant> {
        let response = self.post_credentials("signup", email, password).await?;
        Self::read_grant(response, PortalError::Validation, SIGNUP_FAILED_MESSAGE).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortalResult<IdentityGrant> {
        let response = self
            .post_credentials("token?grant_type=password", email, password)
            .await?;
        Self::read_grant(response, PortalError::Unauthorized, INVALID_CREDENTIALS_MESSAGE).await
    }

    async fn sign_out(&self, access_token: &str) -> PortalResult<()> {
        let response = self
            .client
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        match response.status() {
            // An already-expired session is as good as signed out.
            s if s.is_success() || s == StatusCode::UNAUTHORIZED => Ok(()),
            s => {
                tracing::error!(status = %s, "logout failed");
                Err(PortalError::backend(format!("Logout failed with status {s}")))
            }
        }
    }
}

// --- Mock ---

struct MockAccount {
    id: Uuid,
    password: String,
}

/// MockIdentityProvider
///
/// In-process identity service for tests. Issues real HS256 tokens signed with the
/// configured secret, so the `AuthUser` extractor accepts them.
pub struct MockIdentityProvider {
    jwt_secret: String,
    accounts: Mutex<HashMap<String, MockAccount>>,
    /// When true, signup succeeds without a session (email confirmation pending).
    pub require_confirmation: bool,
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            jwt_secret: jwt_secret.to_string(),
            accounts: Mutex::new(HashMap::new()),
            require_confirmation: false,
            should_fail: false,
        }
    }

    pub fn new_failing(jwt_secret: &str) -> Self {
        Self {
            should_fail: true,
            ..Self::new(jwt_secret)
        }
    }

    /// Signup succeeds without issuing a session.
    pub fn with_confirmation_required(mut self) -> Self {
        self.require_confirmation = true;
        self
    }

    /// Registers an account directly, e.g. an admin provisioned outside signup.
    pub fn with_account(self, email: &str, password: &str, id: Uuid) -> Self {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                email.to_string(),
                MockAccount {
                    id,
                    password: password.to_string(),
                },
            );
        }
        self
    }

    pub fn issue_token(&self, user_id: Uuid) -> PortalResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(1)).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| PortalError::backend(e.to_string()))
    }

    fn check_available(&self) -> PortalResult<()> {
        if self.should_fail {
            return Err(PortalError::backend("Mock Identity Error: Simulation requested"));
        }
        Ok(())
    }

    fn accounts(&self) -> PortalResult<std::sync::MutexGuard<'_, HashMap<String, MockAccount>>> {
        self.accounts
            .lock()
            .map_err(|_| PortalError::backend("Mock identity store poisoned"))
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> PortalResult<IdentityGrant> {
        self.check_available()?;
        let id = {
            let mut accounts = self.accounts()?;
            if accounts.contains_key(email) {
                return Err(PortalError::validation("User already registered"));
            }
            let id = Uuid::new_v4();
            accounts.insert(
                email.to_string(),
                MockAccount {
                    id,
                    password: password.to_string(),
                },
            );
            id
        };

        let access_token = if self.require_confirmation {
            None
        } else {
            Some(self.issue_token(id)?)
        };
        Ok(IdentityGrant {
            user_id: id,
            access_token,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> PortalResult<IdentityGrant> {
        self.check_available()?;
        let id = {
            let accounts = self.accounts()?;
            match accounts.get(email) {
                Some(account) if account.password == password => account.id,
                _ => return Err(PortalError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string())),
            }
        };
        Ok(IdentityGrant {
            user_id: id,
            access_token: Some(self.issue_token(id)?),
        })
    }

    async fn sign_out(&self, _access_token: &str) -> PortalResult<()> {
        self.check_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_signs_up_then_in() {
        let identity = MockIdentityProvider::new("secret");
        let grant = identity.sign_up("doe@cuet.ac.bd", "secret123").await.unwrap();
        assert!(grant.access_token.is_some());

        let again = identity.sign_in("doe@cuet.ac.bd", "secret123").await.unwrap();
        assert_eq!(again.user_id, grant.user_id);

        let wrong = identity.sign_in("doe@cuet.ac.bd", "nope").await.unwrap_err();
        assert!(matches!(wrong, PortalError::Unauthorized(_)));
        assert!(identity.sign_up("doe@cuet.ac.bd", "secret123").await.is_err());
    }

    #[tokio::test]
    async fn confirmation_mode_withholds_the_token() {
        let identity = MockIdentityProvider::new("secret").with_confirmation_required();
        let grant = identity.sign_up("u2204112@student.cuet.ac.bd", "secret123").await.unwrap();
        assert_eq!(grant.access_token, None);
    }

    #[test]
    fn gotrue_error_prefers_the_description() {
        let err = GoTrueError {
            error_description: Some("Invalid login credentials".into()),
            msg: Some("other".into()),
            message: None,
        };
        assert_eq!(err.into_message(), "Invalid login credentials");
        assert_eq!(GoTrueError::default().into_message(), "");
    }

    fn reply(status: u16, body: &'static str) -> reqwest::Response {
        reqwest::Response::from(
            axum::http::Response::builder()
                .status(status)
                .body(body)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn unreadable_rejections_fall_back_to_a_message() {
        let err = SupabaseIdentity::read_grant(
            reply(400, "<html>Bad Request</html>"),
            PortalError::Unauthorized,
            INVALID_CREDENTIALS_MESSAGE,
        )
        .await
        .unwrap_err();
        assert_eq!(err, PortalError::Unauthorized(INVALID_CREDENTIALS_MESSAGE.to_string()));

        let err = SupabaseIdentity::read_grant(reply(422, "{}"), PortalError::Validation, SIGNUP_FAILED_MESSAGE)
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), SIGNUP_FAILED_MESSAGE);

        let err = SupabaseIdentity::read_grant(
            reply(400, r#"{"msg":"User already registered"}"#),
            PortalError::Validation,
            SIGNUP_FAILED_MESSAGE,
        )
        .await
        .unwrap_err();
        assert_eq!(err.user_message(), "User already registered");
    }
}
