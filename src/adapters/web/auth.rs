//! Session authentication backend for axum-login.
//!
//! Users live in the account store. The session is bound to the stored
//! password hash, so changing the password invalidates every other session.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_login::{AuthUser, AuthnBackend};
use std::fmt;

use crate::domain::account::Account;
use crate::domain::error::JournalError;
use crate::domain::trade::UserId;
use crate::services::AccountService;

use super::WebError;

pub type AuthSession = axum_login::AuthSession<Backend>;

/// The authenticated user as kept in the session.
#[derive(Clone)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pw_hash_bytes: Vec<u8>,
}

impl fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl From<&Account> for SessionUser {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            pw_hash_bytes: account.password_hash.as_bytes().to_vec(),
        }
    }
}

impl AuthUser for SessionUser {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        &self.pw_hash_bytes
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Clone)]
pub struct Backend {
    accounts: AccountService,
}

impl Backend {
    pub fn new(accounts: AccountService) -> Self {
        Self { accounts }
    }
}

impl AuthnBackend for Backend {
    type User = SessionUser;
    type Credentials = Credentials;
    type Error = JournalError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        let account = self
            .accounts
            .verify_credentials(&creds.email, &creds.password)?;
        Ok(account.as_ref().map(SessionUser::from))
    }

    async fn get_user(
        &self,
        user_id: &axum_login::UserId<Self>,
    ) -> Result<Option<Self::User>, Self::Error> {
        let account = self.accounts.find(*user_id)?;
        Ok(account.as_ref().map(SessionUser::from))
    }
}

/// Extractor for routes that require a logged-in user.
pub struct CurrentUser(pub SessionUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state)
            .await
            .map_err(|(_, reason)| WebError::internal(reason))?;
        session
            .user
            .map(CurrentUser)
            .ok_or_else(|| WebError::unauthorized("Not authorized, please log in"))
    }
}
