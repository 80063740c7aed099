use std::io::Write;

use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{account::AccountView, currency::Currency, user::UserView};

use super::csv_parser::Operation;

/// Result line of a successful operation. Account operations fill
/// `currency` and `balance`, registrations fill `name` and `email`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OutcomeRow {
    pub op: Operation,
    pub id: u64,
    pub currency: Option<Currency>,
    pub balance: Option<Decimal>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl OutcomeRow {
    pub fn account(op: Operation, view: AccountView) -> Self {
        Self {
            op,
            id: view.id,
            currency: Some(view.currency),
            balance: Some(view.balance),
            name: None,
            email: None,
        }
    }

    pub fn user(view: UserView) -> Self {
        Self {
            op: Operation::Register,
            id: view.id,
            currency: None,
            balance: None,
            name: Some(view.name),
            email: Some(view.email),
        }
    }
}

pub fn print_outcomes<W>(
    output: &mut W,
    outcomes: impl Iterator<Item = OutcomeRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for outcome in outcomes {
        if let Err(err) = writer.serialize(outcome) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}
