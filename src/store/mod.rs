use thiserror::Error;

use crate::{
    account::{Account, AccountId, NewAccount},
    currency::Currency,
    user::{NewUser, User, UserId},
};

pub mod in_memory_store;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backing store is unavailable: {0}")]
    Unavailable(String),
    #[error("Account {0} was never saved")]
    MissingRecord(AccountId),
}

/// Persistence contract the transaction engine depends on.
///
/// Implementations only store and return records. Serializing concurrent
/// read-modify-write sequences is the engine's job.
pub trait AccountStore: Send + Sync {
    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    fn find_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError>;

    /// First save of an account, assigns its id.
    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Persists a mutation of an account that was already inserted.
    fn save_account(&self, account: Account) -> Result<Account, StoreError>;

    fn exists_account_for_user_and_currency(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<bool, StoreError>;
}

pub trait UserStore: AccountStore {
    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError>;

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
}
