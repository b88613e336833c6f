//! Monetary amounts stored as integer units plus fractional nanos, and their display formatting.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The number of nanos in one whole currency unit.
pub const NANOS_PER_UNIT: u32 = 1_000_000_000;

/// The currency used when a transaction has no usable currency code.
pub const DEFAULT_CURRENCY_CODE: &str = "USD";

/// An unsigned amount of money.
///
/// Whether money came in or went out is recorded by the transaction's
/// [Direction](crate::Direction), never by the sign of the amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// The ISO 4217 currency code, e.g. "NZD".
    pub currency_code: String,
    /// The whole currency units.
    pub units: u64,
    /// The fractional part of the amount in nanos, `0..1_000_000_000`.
    pub nanos: u32,
}

impl Amount {
    /// Create an amount, rejecting a fractional part of one unit or more.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] if `nanos` is not less than [NANOS_PER_UNIT].
    pub fn new(currency_code: &str, units: u64, nanos: u32) -> Result<Self, Error> {
        if nanos >= NANOS_PER_UNIT {
            return Err(Error::InvalidAmount(nanos));
        }

        Ok(Self {
            currency_code: currency_code.to_owned(),
            units,
            nanos,
        })
    }

    /// The amount in display scale, e.g. 12 units and 500,000,000 nanos is `12.5`.
    pub fn to_display(&self) -> f64 {
        self.units as f64 + self.nanos as f64 / NANOS_PER_UNIT as f64
    }

    /// The amount expressed as a whole number of nanos.
    pub fn total_nanos(&self) -> i128 {
        self.units as i128 * NANOS_PER_UNIT as i128 + self.nanos as i128
    }
}

/// Convert a sum of nanos to display scale.
pub(crate) fn nanos_to_display(nanos: i128) -> f64 {
    let units = nanos / NANOS_PER_UNIT as i128;
    let remainder = nanos % NANOS_PER_UNIT as i128;

    units as f64 + remainder as f64 / NANOS_PER_UNIT as f64
}

/// Format `amount` as currency with two decimal places, e.g. "-$1,234.50".
///
/// `currency_code` must be three uppercase ASCII letters, otherwise USD is used.
pub fn format_currency(amount: f64, currency_code: Option<&str>) -> String {
    static FMT: OnceLock<Formatter> = OnceLock::new();

    let formatter = FMT.get_or_init(|| {
        Formatter::currency("$")
            .expect("\"$\" is a valid currency prefix")
            .precision(Precision::Decimals(2))
    });

    let symbol = currency_symbol(currency_code);
    let sign = if amount < 0.0 { "-" } else { "" };

    // numfmt renders zero as "0" and drops trailing zeros, so the digits are
    // normalised before the symbol is attached.
    let digits = if amount == 0.0 {
        "0.00".to_owned()
    } else {
        let formatted = formatter.fmt_string(amount.abs());
        pad_decimals(formatted.trim_start_matches('$'))
    };

    format!("{sign}{symbol}{digits}")
}

fn pad_decimals(digits: &str) -> String {
    match digits.find('.') {
        None => format!("{digits}.00"),
        Some(point) if digits.len() - point == 2 => format!("{digits}0"),
        Some(_) => digits.to_owned(),
    }
}

fn currency_symbol(currency_code: Option<&str>) -> String {
    let code = currency_code
        .filter(|code| code.len() == 3 && code.bytes().all(|byte| byte.is_ascii_uppercase()))
        .unwrap_or(DEFAULT_CURRENCY_CODE);

    match code {
        "USD" => "$".to_owned(),
        "EUR" => "€".to_owned(),
        "GBP" => "£".to_owned(),
        "JPY" => "¥".to_owned(),
        "NZD" => "NZ$".to_owned(),
        "AUD" => "A$".to_owned(),
        "CAD" => "C$".to_owned(),
        other => format!("{other} "),
    }
}
