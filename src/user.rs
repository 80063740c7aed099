use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::{
    store::{StoreError, UserStore},
    sync::KeyedLocks,
};

pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub address: String,
}

impl NewUser {
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            name: self.name,
            email: self.email,
            address: self.address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub address: String,
}

/// Registration result. Address is stored but not echoed back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Email already exists")]
    DuplicateEmail,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

/// Emails are unique regardless of case and surrounding whitespace.
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct UserService<S> {
    store: Arc<S>,
    email_locks: KeyedLocks<String>,
}

impl<S> UserService<S>
where
    S: UserStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            email_locks: KeyedLocks::default(),
        }
    }

    pub fn register(&self, new_user: NewUser) -> Result<UserView, UserError> {
        self.email_locks
            .with_lock(email_key(&new_user.email), || -> Result<UserView, UserError> {
                if self.store.exists_by_email(&new_user.email)? {
                    return Err(UserError::DuplicateEmail);
                }
                let user = self.store.insert_user(new_user)?;
                tracing::info!(user_id = user.id, "user registered");
                Ok(UserView::from(&user))
            })
    }
}
