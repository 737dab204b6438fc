//! Account service: registration, credential checks and profile changes.

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use std::sync::Arc;

use crate::domain::account::{
    Account, DELETE_CONFIRMATION, DeleteAccount, NewAccount, PasswordChange,
    ProfileUpdate, Registration, validate_password,
};
use crate::domain::error::JournalError;
use crate::domain::trade::UserId;
use crate::ports::account_store::AccountStore;

use super::Clock;

pub const INVALID_CREDENTIALS: &str = "Invalid email or password";

pub fn hash_password(password: &str) -> Result<String, JournalError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| JournalError::PasswordHash {
            reason: e.to_string(),
        })
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore + Send + Sync>,
    clock: Clock,
}

impl AccountService {
    pub fn new(store: Arc<dyn AccountStore + Send + Sync>) -> Self {
        Self {
            store,
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn register(&self, registration: Registration) -> Result<Account, JournalError> {
        let valid = registration.validate()?;

        if self.store.find_by_email(&valid.email)?.is_some() {
            return Err(JournalError::conflict("email", "Email already registered"));
        }
        if self.store.find_by_username(&valid.username)?.is_some() {
            return Err(JournalError::conflict("username", "Username already taken"));
        }

        let new_account = NewAccount {
            email: valid.email,
            username: valid.username,
            password_hash: hash_password(&valid.password)?,
            profile: valid.profile,
        };
        let account = self.store.insert_account(&new_account, self.now())?;
        tracing::info!(user = account.id, username = %account.username, "account registered");
        Ok(account)
    }

    /// `Ok(None)` for an unknown email or a wrong password.
    pub fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Account>, JournalError> {
        let Some(account) = self.store.find_by_email(&email.trim().to_lowercase())? else {
            return Ok(None);
        };
        if verify_password(&account.password_hash, password) {
            Ok(Some(account))
        } else {
            Ok(None)
        }
    }

    pub fn find(&self, id: UserId) -> Result<Option<Account>, JournalError> {
        self.store.find_account(id)
    }

    pub fn require(&self, id: UserId) -> Result<Account, JournalError> {
        self.store
            .find_account(id)?
            .ok_or(JournalError::NotFound { resource: "User" })
    }

    pub fn find_by_email(&self, email: &str) -> Result<Account, JournalError> {
        self.store
            .find_by_email(&email.trim().to_lowercase())?
            .ok_or(JournalError::NotFound { resource: "User" })
    }

    pub fn update_profile(
        &self,
        id: UserId,
        update: ProfileUpdate,
    ) -> Result<Account, JournalError> {
        let current = self.require(id)?;
        let profile = update.apply(&current.profile)?;
        let account = self
            .store
            .update_profile(id, &profile, self.now())?
            .ok_or(JournalError::NotFound { resource: "User" })?;
        tracing::info!(user = id, "profile updated");
        Ok(account)
    }

    pub fn change_password(
        &self,
        id: UserId,
        change: PasswordChange,
    ) -> Result<Account, JournalError> {
        let current_password = change.current_password.unwrap_or_default();
        if current_password.is_empty() {
            return Err(JournalError::validation(
                "currentPassword",
                "Current password is required",
            ));
        }
        let new_password = change.new_password.unwrap_or_default();
        validate_password("newPassword", &new_password)?;

        let account = self.require(id)?;
        if !verify_password(&account.password_hash, &current_password) {
            return Err(JournalError::authentication("Current password is incorrect"));
        }

        let hash = hash_password(&new_password)?;
        if !self.store.update_password(id, &hash, self.now())? {
            return Err(JournalError::NotFound { resource: "User" });
        }
        tracing::info!(user = id, "password changed");
        self.require(id)
    }

    /// Deletes the account and cascades to every trade it owns.
    pub fn delete_account(&self, id: UserId, request: DeleteAccount) -> Result<(), JournalError> {
        if request.confirm.as_deref() != Some(DELETE_CONFIRMATION) {
            return Err(JournalError::validation(
                "confirm",
                format!("Type {DELETE_CONFIRMATION} to confirm account deletion"),
            ));
        }
        if !self.store.delete_account(id)? {
            return Err(JournalError::NotFound { resource: "User" });
        }
        tracing::info!(user = id, "account deleted");
        Ok(())
    }
}
