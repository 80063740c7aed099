//! This module could be a separate crate on its own, to drive [`crate::engine`] from
//! operation scripts, but it is also what the integration tests run against.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use anyhow::Result;
use thiserror::Error;

use crate::{
    command::{
        RequestError, TransactionAction, TransactionCommand, parse_currency, parse_registration,
    },
    engine::{AccountEngine, EngineError, TransactionEngine},
    store::{UserStore, in_memory_store::InMemoryStore},
    user::{UserError, UserService},
};
use csv_parser::{CsvOperationParser, Operation, OperationRow};
use csv_printer::{OutcomeRow, print_outcomes};
pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Malformed row: {0}")]
    Malformed(#[from] csv::Error),
    #[error("Column `{column}` is required for {op:?}")]
    MissingColumn {
        column: &'static str,
        op: Operation,
    },
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl OperationError {
    pub fn code(&self) -> &'static str {
        match self {
            OperationError::Malformed(_) => "MalformedRow",
            OperationError::MissingColumn { .. } | OperationError::Request(_) => "InvalidRequest",
            OperationError::User(UserError::DuplicateEmail) => "DuplicateEmail",
            OperationError::User(UserError::StoreUnavailable(_)) => "StoreUnavailable",
            OperationError::Engine(err) => err.code(),
        }
    }

    pub fn is_client_error(&self) -> bool {
        match self {
            OperationError::User(UserError::StoreUnavailable(_)) => false,
            OperationError::Engine(err) => err.is_client_error(),
            _ => true,
        }
    }
}

fn require<T>(column: &'static str, op: Operation, value: Option<T>) -> Result<T, OperationError> {
    value.ok_or(OperationError::MissingColumn { column, op })
}

/// Validates one script row and dispatches it to the user service or the
/// transaction engine.
pub fn execute<S, E>(
    users: &UserService<S>,
    engine: &E,
    row: OperationRow,
) -> Result<OutcomeRow, OperationError>
where
    S: UserStore,
    E: TransactionEngine,
{
    let op = row.op;
    match op {
        Operation::Register => {
            let new_user = parse_registration(row.name, row.email, row.address)?;
            Ok(OutcomeRow::user(users.register(new_user)?))
        }
        Operation::Open => {
            let user = require("user", op, row.user)?;
            let currency = parse_currency(row.currency)?;
            Ok(OutcomeRow::account(
                op,
                engine.create_account(user, currency)?,
            ))
        }
        Operation::Deposit | Operation::Withdraw => {
            let user = require("user", op, row.user)?;
            let account = require("account", op, row.account)?;
            let action = if op == Operation::Deposit {
                TransactionAction::Deposit
            } else {
                TransactionAction::Withdraw
            };
            let command = TransactionCommand::parse(action, row.currency, row.amount)?;
            let view = match command.action {
                TransactionAction::Deposit => {
                    engine.deposit(user, account, command.currency, command.amount)?
                }
                TransactionAction::Withdraw => {
                    engine.withdraw(user, account, command.currency, command.amount)?
                }
            };
            Ok(OutcomeRow::account(op, view))
        }
        Operation::Balance => {
            let user = require("user", op, row.user)?;
            let account = require("account", op, row.account)?;
            Ok(OutcomeRow::account(op, engine.get_balance(user, account)?))
        }
    }
}

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    pub error_printer: Box<dyn FnMut(u64, OperationError)>,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(mut self) -> Result<()> {
        let parser = CsvOperationParser::new(self.input);

        let store = Arc::new(InMemoryStore::default());
        let users = UserService::new(Arc::clone(&store));
        let engine = AccountEngine::new(store);

        let mut outcomes = Vec::new();
        for (line, row) in parser {
            let outcome = row
                .map_err(OperationError::from)
                .and_then(|row| execute(&users, &engine, row));
            match outcome {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => (self.error_printer)(line, err),
            }
        }

        print_outcomes(self.output, outcomes.into_iter())
    }
}
