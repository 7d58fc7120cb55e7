/// Identity provider client (GoTrue-compatible REST auth).
///
/// Sign-up, password sign-in and current-user resolution. Sessions are held by
/// the caller; this client is stateless apart from the project API key.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::user::{AuthSession, AuthUser, UserId};

/// Provider error code for an email that is already registered.
pub const USER_ALREADY_EXISTS: &str = "user_already_exists";
/// Provider message for a wrong email/password pair.
pub const INVALID_LOGIN_CREDENTIALS: &str = "Invalid login credentials";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    #[error("identity provider rejected the request (status {status}): {message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("identity transport error: {0}")]
    Transport(String),

    #[error("identity provider returned no session")]
    NoSession,
}

impl From<reqwest::Error> for IdentityError {
    fn from(e: reqwest::Error) -> Self {
        IdentityError::Transport(e.to_string())
    }
}

impl IdentityError {
    pub fn code(&self) -> Option<&str> {
        match self {
            IdentityError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            IdentityError::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError>;

    /// Resolves the user that owns `access_token`.
    async fn current_user(&self, access_token: &str) -> Result<AuthUser, IdentityError>;
}

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    user: Option<UserDto>,
}

#[derive(Debug, Deserialize)]
struct UserDto {
    id: Uuid,
    email: Option<String>,
}

impl From<UserDto> for AuthUser {
    fn from(dto: UserDto) -> Self {
        AuthUser {
            id: UserId(dto.id),
            email: dto.email,
        }
    }
}

/// Both the legacy (`error`/`error_description`) and current (`error_code`/`msg`) shapes.
#[derive(Debug, Default, Deserialize)]
struct ErrorDto {
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
}

#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{path}", self.base_url)
    }

    async fn post_credentials(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, IdentityError> {
        let response = self
            .client
            .post(self.url(path))
            .header("apikey", &self.api_key)
            .json(&Credentials { email, password })
            .send()
            .await?;

        let token: TokenResponse = read_json(response).await?;
        match (token.access_token, token.user) {
            (Some(access_token), Some(user)) => Ok(AuthSession {
                user: user.into(),
                access_token,
            }),
            _ => Err(IdentityError::NoSession),
        }
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.post_credentials("/signup", email, password).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, IdentityError> {
        self.post_credentials("/token?grant_type=password", email, password)
            .await
    }

    async fn current_user(&self, access_token: &str) -> Result<AuthUser, IdentityError> {
        let response = self
            .client
            .get(self.url("/user"))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let user: UserDto = read_json(response).await?;
        debug!("Resolved current user {}", user.id);
        Ok(user.into())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let dto: ErrorDto = serde_json::from_slice(&body).unwrap_or_default();
        let message = dto
            .msg
            .or(dto.error_description)
            .or(dto.message)
            .unwrap_or_else(|| format!("Request failed with status {status}"));
        warn!("Identity provider returned {}: {}", status, message);
        return Err(IdentityError::Rejected {
            status: status.as_u16(),
            code: dto.error_code.or(dto.error),
            message,
        });
    }

    serde_json::from_slice(&body)
        .map_err(|e| IdentityError::Transport(format!("invalid identity response: {e}")))
}
