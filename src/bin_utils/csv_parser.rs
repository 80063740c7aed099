use std::io::Read;

use csv::{DeserializeRecordsIntoIter, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{account::AccountId, currency::Currency, user::UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Register,
    Open,
    Deposit,
    Withdraw,
    Balance,
}

/// One line of an operation script. Which columns matter depends on `op`.
#[derive(Debug, Deserialize)]
pub struct OperationRow {
    pub op: Operation,
    pub user: Option<UserId>,
    pub account: Option<AccountId>,
    pub currency: Option<Currency>,
    pub amount: Option<Decimal>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Parses an operation script in CSV format, yielding each row with the line
/// it started on.
pub struct CsvOperationParser<R> {
    iter: DeserializeRecordsIntoIter<R, OperationRow>,
}

impl<R> CsvOperationParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);

        Self {
            iter: reader.into_deserialize(),
        }
    }
}

impl<R> Iterator for CsvOperationParser<R>
where
    R: Read,
{
    type Item = (u64, Result<OperationRow, csv::Error>);

    fn next(&mut self) -> Option<Self::Item> {
        let curr_line = self.iter.reader().position().line();
        self.iter.next().map(|row| (curr_line, row))
    }
}
