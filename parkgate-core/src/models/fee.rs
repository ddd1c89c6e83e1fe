//! Fee display rules.
//!
//! A fee of `None` ("not yet computed") and a fee of zero (subscription
//! holders) must never render the same way.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::vehicle::VehicleStatus;

/// Currency unit shown next to amounts.
pub const CURRENCY: &str = "TMT";

/// Label for exited vehicles that paid nothing.
pub const SUBSCRIPTION_LABEL: &str = "Monthly Subscription";

/// Label for sessions whose fee the backend has not computed yet.
pub const NOT_COMPUTED_LABEL: &str = "Payment not calculated yet, car may still be inside";

/// How a fee should be presented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceDisplay {
    /// Exited with a zero fee.
    Subscription,
    /// Fee unknown.
    NotComputed,
    /// A concrete amount.
    Amount {
        /// Fee value.
        amount: f64,
        /// Currency unit.
        currency: String,
    },
}

/// Decides how to present `fee` for a session in `status`.
pub fn price_display(fee: Option<f64>, status: VehicleStatus) -> PriceDisplay {
    match fee {
        Some(amount) if status == VehicleStatus::Exited && amount == 0.0 => {
            PriceDisplay::Subscription
        }
        None => PriceDisplay::NotComputed,
        Some(amount) => PriceDisplay::Amount {
            amount,
            currency: CURRENCY.to_string(),
        },
    }
}

/// Formats an amount without trailing zeros, at most two decimals.
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{amount:.2}");
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl fmt::Display for PriceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subscription => f.write_str(SUBSCRIPTION_LABEL),
            Self::NotComputed => f.write_str(NOT_COMPUTED_LABEL),
            Self::Amount { amount, currency } => {
                write!(f, "{} {}", format_amount(*amount), currency)
            }
        }
    }
}
