//! Account persistence port.

use chrono::{DateTime, Utc};

use crate::domain::account::{Account, NewAccount, Profile};
use crate::domain::error::JournalError;
use crate::domain::trade::UserId;

pub trait AccountStore {
    /// Fails with `Conflict` when the email or username is taken.
    fn insert_account(
        &self,
        account: &NewAccount,
        now: DateTime<Utc>,
    ) -> Result<Account, JournalError>;

    fn find_account(&self, id: UserId) -> Result<Option<Account>, JournalError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, JournalError>;

    fn find_by_username(&self, username: &str) -> Result<Option<Account>, JournalError>;

    fn update_profile(
        &self,
        id: UserId,
        profile: &Profile,
        now: DateTime<Utc>,
    ) -> Result<Option<Account>, JournalError>;

    fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, JournalError>;

    /// Remove the account together with all of its trades.
    fn delete_account(&self, id: UserId) -> Result<bool, JournalError>;
}
