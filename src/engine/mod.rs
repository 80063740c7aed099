use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    account::{
        Account, AccountError, AccountId, AccountView, NewAccount, TransactionPolicyError,
    },
    command::{TransactionAction, TransactionCommand},
    currency::{ConversionError, Currency},
    store::{AccountStore, StoreError},
    sync::KeyedLocks,
    user::UserId,
};

/// Every variant is reported to callers as "not found"; they stay separate so
/// logs and tests can tell a missing account from somebody else's account.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("User {0} not found")]
    UserMissing(UserId),
    #[error("Account {0} not found")]
    AccountMissing(AccountId),
    #[error("Account {account_id} is not linked to user {user_id}")]
    NotLinked {
        account_id: AccountId,
        user_id: UserId,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    NotFound(#[from] LookupError),
    #[error("User {user_id} already has an account in {currency}")]
    DuplicateAccount { user_id: UserId, currency: Currency },
    #[error(transparent)]
    InvalidTransaction(#[from] TransactionPolicyError),
    #[error(transparent)]
    InvalidConversion(#[from] ConversionError),
    #[error("Insufficient funds")]
    InsufficientFunds,
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
}

impl From<AccountError> for EngineError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Policy(err) => Self::InvalidTransaction(err),
            AccountError::Conversion(err) => Self::InvalidConversion(err),
            AccountError::InsufficientFunds => Self::InsufficientFunds,
        }
    }
}

impl EngineError {
    /// Stable name of the failure kind, for transports to map onto their own
    /// status codes.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NotFound",
            EngineError::DuplicateAccount { .. } => "DuplicateAccount",
            EngineError::InvalidTransaction(_) => "InvalidTransaction",
            EngineError::InvalidConversion(_) => "InvalidConversion",
            EngineError::InsufficientFunds => "InsufficientFunds",
            EngineError::StoreUnavailable(_) => "StoreUnavailable",
        }
    }

    /// Whether the caller sent something wrong, as opposed to the
    /// infrastructure failing.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, EngineError::StoreUnavailable(_))
    }
}

/// Operations exposed to the transport layer.
pub trait TransactionEngine {
    fn create_account(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<AccountView, EngineError>;

    fn deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<AccountView, EngineError>;

    fn withdraw(
        &self,
        user_id: UserId,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<AccountView, EngineError>;

    fn get_balance(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<AccountView, EngineError>;
}

pub struct AccountEngine<S> {
    store: Arc<S>,
    account_locks: KeyedLocks<AccountId>,
    user_locks: KeyedLocks<UserId>,
}

impl<S> AccountEngine<S>
where
    S: AccountStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            account_locks: KeyedLocks::default(),
            user_locks: KeyedLocks::default(),
        }
    }

    /// Fetches the account by id alone, then checks it belongs to `user_id`.
    fn verified_account(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<Account, EngineError> {
        let account = self
            .store
            .find_account(account_id)?
            .ok_or(LookupError::AccountMissing(account_id))?;
        if !account.is_owned_by(user_id) {
            return Err(LookupError::NotLinked {
                account_id,
                user_id,
            }
            .into());
        }
        Ok(account)
    }

    fn transact(
        &self,
        user_id: UserId,
        account_id: AccountId,
        command: TransactionCommand,
    ) -> Result<AccountView, EngineError> {
        self.account_locks
            .with_lock(account_id, || -> Result<AccountView, EngineError> {
                let mut account = self.verified_account(user_id, account_id)?;
                let event = account.handle_transaction(&command)?;
                account.apply(&event);
                let saved = self.store.save_account(account)?;
                tracing::debug!(
                    account_id,
                    action = %command.action,
                    amount = %command.amount,
                    currency = %command.currency,
                    credited = %event.amount(),
                    balance = %saved.balance(),
                    "transaction applied"
                );
                Ok(saved.view())
            })
    }
}

impl<S> TransactionEngine for AccountEngine<S>
where
    S: AccountStore,
{
    fn create_account(
        &self,
        user_id: UserId,
        currency: Currency,
    ) -> Result<AccountView, EngineError> {
        self.user_locks
            .with_lock(user_id, || -> Result<AccountView, EngineError> {
                if self.store.find_user(user_id)?.is_none() {
                    return Err(LookupError::UserMissing(user_id).into());
                }
                if self
                    .store
                    .exists_account_for_user_and_currency(user_id, currency)?
                {
                    return Err(EngineError::DuplicateAccount { user_id, currency });
                }
                let account = self.store.insert_account(NewAccount {
                    owner: user_id,
                    currency,
                })?;
                tracing::info!(user_id, account_id = account.id(), %currency, "account opened");
                Ok(account.view())
            })
    }

    fn deposit(
        &self,
        user_id: UserId,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<AccountView, EngineError> {
        self.transact(
            user_id,
            account_id,
            TransactionCommand {
                action: TransactionAction::Deposit,
                currency,
                amount,
            },
        )
    }

    fn withdraw(
        &self,
        user_id: UserId,
        account_id: AccountId,
        currency: Currency,
        amount: Decimal,
    ) -> Result<AccountView, EngineError> {
        self.transact(
            user_id,
            account_id,
            TransactionCommand {
                action: TransactionAction::Withdraw,
                currency,
                amount,
            },
        )
    }

    fn get_balance(
        &self,
        user_id: UserId,
        account_id: AccountId,
    ) -> Result<AccountView, EngineError> {
        Ok(self.verified_account(user_id, account_id)?.view())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::{
        store::{UserStore, in_memory_store::InMemoryStore},
        user::{NewUser, User},
    };

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn engine_with_user() -> (AccountEngine<InMemoryStore>, UserId) {
        let store = Arc::new(InMemoryStore::default());
        let user = store
            .insert_user(NewUser {
                name: "Teodor".into(),
                email: "teo@dev.bg".into(),
                address: "Sofia".into(),
            })
            .unwrap();
        (AccountEngine::new(store), user.id)
    }

    #[test]
    fn create_account_once_per_currency() {
        let (engine, user) = engine_with_user();

        for currency in [Currency::Euro, Currency::Leva] {
            let view = engine.create_account(user, currency).unwrap();
            assert_eq!(view.currency, currency);
            assert_eq!(view.balance, Decimal::ZERO);

            let err = engine.create_account(user, currency).unwrap_err();
            assert!(matches!(
                err,
                EngineError::DuplicateAccount { user_id, currency: c }
                    if user_id == user && c == currency
            ));
            assert_eq!(err.code(), "DuplicateAccount");
        }
    }

    #[test]
    fn create_account_for_missing_user() {
        let (engine, user) = engine_with_user();
        let err = engine.create_account(user + 1, Currency::Euro).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound(LookupError::UserMissing(id)) if id == user + 1
        ));
        assert_eq!(err.code(), "NotFound");
    }

    #[test]
    fn deposit_in_own_currency_is_exact() {
        let (engine, user) = engine_with_user();
        let acc = engine.create_account(user, Currency::Euro).unwrap();

        let mut expected = Decimal::ZERO;
        for amount in ["5.00", "123.45", "5000.00", "17.01"] {
            expected += dec(amount);
            let view = engine
                .deposit(user, acc.id, Currency::Euro, dec(amount))
                .unwrap();
            assert_eq!(view.balance, expected);
        }
    }

    #[test]
    fn deposit_thresholds() {
        let (engine, user) = engine_with_user();
        let acc = engine.create_account(user, Currency::Euro).unwrap();

        let err = engine
            .deposit(user, acc.id, Currency::Euro, dec("4.99"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransaction(TransactionPolicyError::BelowMinimum {
                action: TransactionAction::Deposit
            })
        ));
        assert_eq!(err.to_string(), "Minimum deposit is 5 EUR");

        let err = engine
            .deposit(user, acc.id, Currency::Euro, dec("5000.01"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransaction(TransactionPolicyError::AboveDepositLimit)
        ));

        let view = engine
            .deposit(user, acc.id, Currency::Euro, dec("5000.00"))
            .unwrap();
        assert_eq!(view.balance, dec("5000.00"));
    }

    #[test]
    fn cross_currency_deposits() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();
        let leva = engine.create_account(user, Currency::Leva).unwrap();

        let view = engine
            .deposit(user, euro.id, Currency::Leva, dec("10.01"))
            .unwrap();
        assert_eq!(view.balance, dec("5.01"));

        let view = engine
            .deposit(user, leva.id, Currency::Euro, dec("12.50"))
            .unwrap();
        assert_eq!(view.balance, dec("25.00"));
    }

    #[test]
    fn leva_round_trip_stays_within_a_cent() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();
        engine
            .deposit(user, euro.id, Currency::Euro, dec("100.00"))
            .unwrap();

        for leva in ["10.01", "10.03", "33.33", "20.00"] {
            let before = engine.get_balance(user, euro.id).unwrap().balance;
            let credited = engine
                .deposit(user, euro.id, Currency::Leva, dec(leva))
                .unwrap()
                .balance
                - before;
            let after = engine
                .withdraw(user, euro.id, Currency::Euro, credited)
                .unwrap()
                .balance;
            assert!((after - before).abs() <= dec("0.01"));
            assert!(after >= Decimal::ZERO);
        }
    }

    #[test]
    fn withdraw_checks_funds_after_conversion() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();
        engine
            .deposit(user, euro.id, Currency::Euro, dec("20.00"))
            .unwrap();

        // 40.02 LEVA is 20.01 EURO
        let err = engine
            .withdraw(user, euro.id, Currency::Leva, dec("40.02"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientFunds));
        assert_eq!(
            engine.get_balance(user, euro.id).unwrap().balance,
            dec("20.00")
        );

        let view = engine
            .withdraw(user, euro.id, Currency::Leva, dec("40.00"))
            .unwrap();
        assert_eq!(view.balance, Decimal::ZERO);
    }

    #[test]
    fn withdraw_has_minimum_but_no_ceiling() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();
        for _ in 0..3 {
            engine
                .deposit(user, euro.id, Currency::Euro, dec("5000.00"))
                .unwrap();
        }

        let err = engine
            .withdraw(user, euro.id, Currency::Euro, dec("4.99"))
            .unwrap_err();
        assert_eq!(err.to_string(), "Minimum withdrawal is 5 EUR");

        let view = engine
            .withdraw(user, euro.id, Currency::Euro, dec("12000.00"))
            .unwrap();
        assert_eq!(view.balance, dec("3000.00"));
    }

    #[test]
    fn accounts_are_checked_against_owner() {
        let (engine, owner) = engine_with_user();
        let acc = engine.create_account(owner, Currency::Leva).unwrap();
        let stranger = owner + 1;

        let err = engine.get_balance(stranger, acc.id).unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound(LookupError::NotLinked { account_id, user_id })
                if account_id == acc.id && user_id == stranger
        ));

        let err = engine
            .deposit(stranger, acc.id, Currency::Leva, dec("50.00"))
            .unwrap_err();
        assert_eq!(err.code(), "NotFound");

        let err = engine
            .withdraw(owner, acc.id + 100, Currency::Leva, dec("50.00"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::NotFound(LookupError::AccountMissing(_))
        ));

        // lookups run before any policy check
        let err = engine
            .deposit(stranger, acc.id, Currency::Leva, dec("1.00"))
            .unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }

    #[test]
    fn sub_cent_amounts_are_rejected() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();

        let err = engine
            .deposit(user, euro.id, Currency::Euro, dec("10.005"))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidTransaction(TransactionPolicyError::TooPrecise)
        ));
        assert_eq!(engine.get_balance(user, euro.id).unwrap().balance, Decimal::ZERO);

        // what the view shows can always be withdrawn in full
        let shown = engine
            .deposit(user, euro.id, Currency::Euro, dec("10.500"))
            .unwrap()
            .balance;
        assert_eq!(shown.to_string(), "10.50");
        let err = engine
            .withdraw(user, euro.id, Currency::Euro, dec("10.499"))
            .unwrap_err();
        assert_eq!(err.code(), "InvalidTransaction");
        let view = engine
            .withdraw(user, euro.id, Currency::Euro, shown)
            .unwrap();
        assert_eq!(view.balance.to_string(), "0.00");
    }

    #[test]
    fn lookups_of_unknown_ids_leave_no_locks_behind() {
        let (engine, user) = engine_with_user();
        let euro = engine.create_account(user, Currency::Euro).unwrap();
        engine
            .deposit(user, euro.id, Currency::Euro, dec("10.00"))
            .unwrap();

        for id in 1_000..2_000 {
            assert!(engine.create_account(id, Currency::Leva).is_err());
            assert!(
                engine
                    .deposit(user, id, Currency::Euro, dec("10.00"))
                    .is_err()
            );
            assert!(
                engine
                    .withdraw(user, id, Currency::Euro, dec("10.00"))
                    .is_err()
            );
            assert!(engine.get_balance(user, id).is_err());
        }

        assert_eq!(engine.account_locks.len(), 0);
        assert_eq!(engine.user_locks.len(), 0);
    }

    struct UnavailableStore;

    impl AccountStore for UnavailableStore {
        fn find_user(&self, _: UserId) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn find_account(&self, _: AccountId) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn insert_account(&self, _: NewAccount) -> Result<Account, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn save_account(&self, _: Account) -> Result<Account, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn exists_account_for_user_and_currency(
            &self,
            _: UserId,
            _: Currency,
        ) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn store_failures_propagate() {
        let engine = AccountEngine::new(Arc::new(UnavailableStore));

        let err = engine.create_account(1, Currency::Euro).unwrap_err();
        assert_eq!(err.code(), "StoreUnavailable");
        assert!(!err.is_client_error());

        let err = engine
            .deposit(1, 1, Currency::Euro, dec("10.00"))
            .unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
        assert_eq!(
            err.to_string(),
            "Store unavailable: Backing store is unavailable: connection refused"
        );
    }
}
