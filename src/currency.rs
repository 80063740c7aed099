use std::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How many LEVA one EURO is worth.
pub const LEVA_PER_EURO: Decimal = Decimal::TWO;

/// Fractional digits kept after a conversion.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Euro,
    Leva,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Euro => f.write_str("EURO"),
            Currency::Leva => f.write_str("LEVA"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Invalid currency conversion of {amount} from {from} to {to}")]
    OutOfRange {
        amount: Decimal,
        from: Currency,
        to: Currency,
    },
}

impl Currency {
    /// Converts `amount` expressed in `self` into `target`.
    ///
    /// LEVA to EURO halves the amount and rounds half-up to [`MONEY_SCALE`]
    /// digits. EURO to LEVA doubles it, which never needs rounding for
    /// two-digit inputs.
    pub fn convert(self, amount: Decimal, target: Currency) -> Result<Decimal, ConversionError> {
        let converted = match (self, target) {
            (Currency::Euro, Currency::Euro) | (Currency::Leva, Currency::Leva) => Some(amount),
            (Currency::Leva, Currency::Euro) => amount.checked_div(LEVA_PER_EURO).map(|euro| {
                euro.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
            }),
            (Currency::Euro, Currency::Leva) => amount.checked_mul(LEVA_PER_EURO),
        };
        converted.ok_or(ConversionError::OutOfRange {
            amount,
            from: self,
            to: target,
        })
    }
}
