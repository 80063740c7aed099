use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{
    currency::{Currency, MONEY_SCALE},
    user::NewUser,
};

/// Smallest amount accepted at the boundary, 0.01.
pub const MINIMUM_REQUEST_AMOUNT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionAction {
    Deposit,
    Withdraw,
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionAction::Deposit => f.write_str("deposit"),
            TransactionAction::Withdraw => f.write_str("withdrawal"),
        }
    }
}

/// Validated deposit or withdrawal, amount still in the currency it was sent in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionCommand {
    pub action: TransactionAction,
    pub currency: Currency,
    pub amount: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Currency is required")]
    CurrencyRequired,
    #[error("Amount is required for {action}")]
    AmountRequired { action: TransactionAction },
    #[error("Amount must be at least 0.01 for {action}")]
    AmountTooSmall { action: TransactionAction },
    #[error("Amount must have at most 2 decimal places for {action}")]
    AmountTooPrecise { action: TransactionAction },
    #[error("{field} must not be blank")]
    BlankField { field: &'static str },
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
}

pub fn parse_currency(currency: Option<Currency>) -> Result<Currency, RequestError> {
    currency.ok_or(RequestError::CurrencyRequired)
}

impl TransactionCommand {
    pub fn parse(
        action: TransactionAction,
        currency: Option<Currency>,
        amount: Option<Decimal>,
    ) -> Result<Self, RequestError> {
        let currency = parse_currency(currency)?;
        let Some(amount) = amount else {
            return Err(RequestError::AmountRequired { action });
        };
        if amount < MINIMUM_REQUEST_AMOUNT {
            return Err(RequestError::AmountTooSmall { action });
        }
        if amount.normalize().scale() > MONEY_SCALE {
            return Err(RequestError::AmountTooPrecise { action });
        }
        Ok(Self {
            action,
            currency,
            amount,
        })
    }
}

fn required(field: &'static str, value: Option<String>) -> Result<String, RequestError> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RequestError::BlankField { field }),
    }
}

fn is_email(candidate: &str) -> bool {
    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !candidate.chars().any(char::is_whitespace)
}

pub fn parse_registration(
    name: Option<String>,
    email: Option<String>,
    address: Option<String>,
) -> Result<NewUser, RequestError> {
    let name = required("name", name)?;
    let email = required("email", email)?;
    let address = required("address", address)?;
    if !is_email(&email) {
        return Err(RequestError::InvalidEmail(email));
    }
    Ok(NewUser {
        name,
        email,
        address,
    })
}
