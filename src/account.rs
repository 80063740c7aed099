use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::{
    command::{TransactionAction, TransactionCommand},
    currency::{ConversionError, Currency, MONEY_SCALE},
    user::UserId,
};

pub type AccountId = u64;

/// 5.00, compared against the amount as received, before conversion.
pub const MINIMUM_AMOUNT: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// 5000.00, same basis as [`MINIMUM_AMOUNT`]. Withdrawals have no ceiling.
pub const MAXIMUM_DEPOSIT: Decimal = Decimal::from_parts(500_000, 0, 0, false, 2);

#[derive(Debug, PartialEq, Eq)]
pub enum AccountEventKind {
    Deposited,
    Withdrawn,
}

/// Balance change already expressed in the account's own currency.
#[derive(Debug)]
pub struct AccountEvent {
    amount: Decimal,
    kind: AccountEventKind,
}

impl AccountEvent {
    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionPolicyError {
    #[error("Minimum {action} is 5 EUR")]
    BelowMinimum { action: TransactionAction },
    #[error("More than 5k must be deposited via bank channel")]
    AboveDepositLimit,
    #[error("Amount must have at most 2 decimal places")]
    TooPrecise,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error(transparent)]
    Policy(#[from] TransactionPolicyError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Insufficient funds")]
    InsufficientFunds,
}

/// Checks the fixed transaction thresholds, in order: minimum first, then the
/// deposit ceiling. Amounts finer than a cent never reach a balance.
pub fn check_policy(
    action: TransactionAction,
    amount: Decimal,
) -> Result<(), TransactionPolicyError> {
    if amount < MINIMUM_AMOUNT {
        return Err(TransactionPolicyError::BelowMinimum { action });
    }
    if action == TransactionAction::Deposit && amount > MAXIMUM_DEPOSIT {
        return Err(TransactionPolicyError::AboveDepositLimit);
    }
    if amount.normalize().scale() > MONEY_SCALE {
        return Err(TransactionPolicyError::TooPrecise);
    }
    Ok(())
}

/// Account that has not been saved yet and so has no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewAccount {
    pub owner: UserId,
    pub currency: Currency,
}

impl NewAccount {
    /// Materializes the record under the id chosen by the store, with a zero
    /// balance.
    pub fn into_account(self, id: AccountId) -> Account {
        Account {
            id,
            owner: self.owner,
            currency: self.currency,
            balance: Decimal::new(0, MONEY_SCALE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    owner: UserId,
    currency: Currency,
    balance: Decimal,
}

/// Public shape of an account: what callers get back from every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub currency: Currency,
    pub balance: Decimal,
}

impl fmt::Display for AccountView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {}", self.id, self.balance, self.currency)
    }
}

impl Account {
    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner == user_id
    }

    /// Shows the balance with exactly two digits. [`check_policy`] keeps
    /// balances to whole cents, so this only ever pads.
    pub fn view(&self) -> AccountView {
        let mut balance = self.balance.normalize();
        balance.rescale(MONEY_SCALE);
        AccountView {
            id: self.id,
            currency: self.currency,
            balance,
        }
    }

    pub fn apply(&mut self, event: &AccountEvent) {
        match event.kind {
            AccountEventKind::Deposited => {
                self.balance += event.amount;
            }
            AccountEventKind::Withdrawn => {
                self.balance -= event.amount;
            }
        }
    }

    pub fn handle_transaction(
        &self,
        command: &TransactionCommand,
    ) -> Result<AccountEvent, AccountError> {
        check_policy(command.action, command.amount)?;
        let amount = command.currency.convert(command.amount, self.currency)?;

        match command.action {
            TransactionAction::Deposit => Ok(AccountEvent {
                amount,
                kind: AccountEventKind::Deposited,
            }),
            TransactionAction::Withdraw => {
                if amount <= self.balance {
                    Ok(AccountEvent {
                        amount,
                        kind: AccountEventKind::Withdrawn,
                    })
                } else {
                    Err(AccountError::InsufficientFunds)
                }
            }
        }
    }
}
