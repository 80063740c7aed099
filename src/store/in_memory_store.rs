use std::{
    collections::{HashMap, HashSet},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    account::{Account, AccountId, NewAccount},
    currency::Currency,
    user::{NewUser, User, UserId, email_key},
};

use super::{AccountStore, StoreError, UserStore};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    emails: HashSet<String>,
    accounts: HashMap<AccountId, Account>,
    last_user_id: UserId,
    last_account_id: AccountId,
}

/// Process-local store. Ids are handed out sequentially starting at 1.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

impl AccountStore for InMemoryStore {
    fn find_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&user_id).cloned())
    }

    fn find_account(&self, account_id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&account_id).cloned())
    }

    fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        tables.last_account_id += 1;
        let account = account.into_account(tables.last_account_id);
        tables.accounts.insert(account.id(), account.clone());
        Ok(account)
    }

    fn save_account(&self, account: Account) -> Result<Account, StoreError> {
        let mut tables = self.write()?;
        let Some(slot) = tables.accounts.get_mut(&account.id()) else {
            return Err(StoreError::MissingRecord(account.id()));
        };
        *slot = account.clone();
        Ok(account)
    }

    fn exists_account_for_user_and_currency(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .accounts
            .values()
            .any(|acc| acc.is_owned_by(user_id) && acc.currency() == currency))
    }
}

impl UserStore for InMemoryStore {
    fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.emails.contains(&email_key(email)))
    }

    fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.write()?;
        tables.last_user_id += 1;
        let user = user.into_user(tables.last_user_id);
        tables.emails.insert(email_key(&user.email));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}
