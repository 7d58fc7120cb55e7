//! Account service: sign-up / sign-in semantics and the instance's single session.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::identity::{IdentityProvider, INVALID_LOGIN_CREDENTIALS, USER_ALREADY_EXISTS};
use crate::models::user::{AuthSession, AuthUser, UserId};
use crate::storage::{RecordStore, StoreError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccountError {
    #[error("email and password fields are required")]
    MissingCredentials,

    #[error("password must be at least 8 characters long")]
    PasswordTooShort,

    #[error("This email is already in use")]
    EmailInUse,

    #[error("Email or password is incorrect")]
    InvalidCredentials,

    #[error("An error has occurred while creating your account")]
    AccountCreationFailed,

    #[error("Something has gone wrong while trying to log you in")]
    SignInFailed,
}

pub struct AccountService {
    identity: Arc<dyn IdentityProvider>,
    records: Arc<dyn RecordStore>,
    session: RwLock<Option<AuthSession>>,
}

impl AccountService {
    pub fn new(identity: Arc<dyn IdentityProvider>, records: Arc<dyn RecordStore>) -> Self {
        Self {
            identity,
            records,
            session: RwLock::new(None),
        }
    }

    /// Creates the account, then the matching `users` row, and signs the user in.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AccountError> {
        require_credentials(email, password)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::PasswordTooShort);
        }

        let session = self
            .identity
            .sign_up(email, password)
            .await
            .map_err(|e| {
                if e.code() == Some(USER_ALREADY_EXISTS) {
                    AccountError::EmailInUse
                } else {
                    warn!("Sign-up failed: {e}");
                    AccountError::AccountCreationFailed
                }
            })?;

        let user = self
            .identity
            .current_user(&session.access_token)
            .await
            .map_err(|e| {
                warn!("Could not resolve newly created user: {e}");
                AccountError::AccountCreationFailed
            })?;

        match self.records.insert_user(user.id).await {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => return Err(AccountError::EmailInUse),
            Err(e) => {
                warn!("Could not insert users row for {}: {e}", user.id);
                return Err(AccountError::AccountCreationFailed);
            }
        }

        info!("Created account {}", user.id);
        *self.session.write().await = Some(AuthSession {
            user: user.clone(),
            access_token: session.access_token,
        });
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AccountError> {
        require_credentials(email, password)?;

        let session = self
            .identity
            .sign_in(email, password)
            .await
            .map_err(|e| {
                if e.message() == Some(INVALID_LOGIN_CREDENTIALS) {
                    AccountError::InvalidCredentials
                } else {
                    warn!("Sign-in failed: {e}");
                    AccountError::SignInFailed
                }
            })?;

        info!("Signed in {}", session.user.id);
        let user = session.user.clone();
        *self.session.write().await = Some(session);
        Ok(user)
    }

    pub async fn sign_out(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!("Signed out {}", session.user.id);
        }
    }

    pub async fn current_user(&self) -> Option<AuthUser> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn current_user_id(&self) -> Option<UserId> {
        self.session.read().await.as_ref().map(|s| s.user.id)
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), AccountError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AccountError::MissingCredentials);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{IdentityError, MockIdentityProvider};
    use crate::storage::MockRecordStore;

    fn user() -> AuthUser {
        AuthUser {
            id: UserId::random(),
            email: Some("a@example.com".to_string()),
        }
    }

    fn session_for(user: &AuthUser) -> AuthSession {
        AuthSession {
            user: user.clone(),
            access_token: "token-123".to_string(),
        }
    }

    fn service(identity: MockIdentityProvider, records: MockRecordStore) -> AccountService {
        AccountService::new(Arc::new(identity), Arc::new(records))
    }

    #[tokio::test]
    async fn test_missing_credentials_never_reach_provider() {
        let accounts = service(MockIdentityProvider::new(), MockRecordStore::new());

        assert_eq!(
            accounts.sign_up("", "password1").await.unwrap_err(),
            AccountError::MissingCredentials
        );
        assert_eq!(
            accounts.sign_in("a@example.com", "").await.unwrap_err(),
            AccountError::MissingCredentials
        );
    }

    #[tokio::test]
    async fn test_short_password_rejected_before_provider() {
        let accounts = service(MockIdentityProvider::new(), MockRecordStore::new());

        let err = accounts.sign_up("a@example.com", "short").await.unwrap_err();
        assert_eq!(err, AccountError::PasswordTooShort);
        assert_eq!(err.to_string(), "password must be at least 8 characters long");
    }

    #[tokio::test]
    async fn test_sign_up_creates_user_row_and_session() {
        let user = user();
        let user_id = user.id;
        let session = session_for(&user);

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .times(1)
            .return_once(move |_, _| Ok(session));
        let resolved = user.clone();
        identity
            .expect_current_user()
            .withf(|token| token == "token-123")
            .times(1)
            .return_once(move |_| Ok(resolved));

        let mut records = MockRecordStore::new();
        records
            .expect_insert_user()
            .withf(move |id| *id == user_id)
            .times(1)
            .return_once(|_| Ok(()));

        let accounts = service(identity, records);
        let created = accounts.sign_up("a@example.com", "password1").await.unwrap();

        assert_eq!(created, user);
        assert_eq!(accounts.current_user_id().await, Some(user_id));
    }

    #[tokio::test]
    async fn test_sign_up_existing_email_is_email_in_use() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_sign_up().times(1).return_once(|_, _| {
            Err(IdentityError::Rejected {
                status: 422,
                code: Some(USER_ALREADY_EXISTS.to_string()),
                message: "User already registered".to_string(),
            })
        });

        let accounts = service(identity, MockRecordStore::new());
        let err = accounts.sign_up("a@example.com", "password1").await.unwrap_err();

        assert_eq!(err, AccountError::EmailInUse);
        assert!(accounts.current_user().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_user_row_is_email_in_use() {
        let user = user();
        let session = session_for(&user);

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .return_once(move |_, _| Ok(session));
        identity
            .expect_current_user()
            .return_once(move |_| Ok(user));

        let mut records = MockRecordStore::new();
        records
            .expect_insert_user()
            .return_once(|_| Err(StoreError::Duplicate("users_pkey".to_string())));

        let accounts = service(identity, records);
        assert_eq!(
            accounts.sign_up("a@example.com", "password1").await.unwrap_err(),
            AccountError::EmailInUse
        );
    }

    #[tokio::test]
    async fn test_sign_up_unresolved_user_fails() {
        let session = session_for(&user());

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_up()
            .return_once(move |_, _| Ok(session));
        identity
            .expect_current_user()
            .return_once(|_| Err(IdentityError::Transport("reset".to_string())));

        let mut records = MockRecordStore::new();
        records.expect_insert_user().times(0);

        let accounts = service(identity, records);
        assert_eq!(
            accounts.sign_up("a@example.com", "password1").await.unwrap_err(),
            AccountError::AccountCreationFailed
        );
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password_is_invalid_credentials() {
        let mut identity = MockIdentityProvider::new();
        identity.expect_sign_in().times(1).return_once(|_, _| {
            Err(IdentityError::Rejected {
                status: 400,
                code: Some("invalid_credentials".to_string()),
                message: INVALID_LOGIN_CREDENTIALS.to_string(),
            })
        });

        let accounts = service(identity, MockRecordStore::new());
        let err = accounts.sign_in("a@example.com", "password1").await.unwrap_err();
        assert_eq!(err.to_string(), "Email or password is incorrect");
    }

    #[tokio::test]
    async fn test_sign_in_other_failure_is_generic() {
        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in()
            .return_once(|_, _| Err(IdentityError::Transport("dns".to_string())));

        let accounts = service(identity, MockRecordStore::new());
        assert_eq!(
            accounts.sign_in("a@example.com", "password1").await.unwrap_err(),
            AccountError::SignInFailed
        );
    }

    #[tokio::test]
    async fn test_sign_in_then_sign_out() {
        let user = user();
        let session = session_for(&user);

        let mut identity = MockIdentityProvider::new();
        identity
            .expect_sign_in()
            .return_once(move |_, _| Ok(session));

        let accounts = service(identity, MockRecordStore::new());
        let signed_in = accounts.sign_in("a@example.com", "password1").await.unwrap();
        assert_eq!(accounts.current_user().await, Some(signed_in));

        accounts.sign_out().await;
        assert!(accounts.current_user().await.is_none());
    }
}
