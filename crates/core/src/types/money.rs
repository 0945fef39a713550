//! Monetary amounts in integer minor units.
//!
//! The Store API reports every amount as an integer string of minor units
//! (`"11100"`) next to the currency code and its minor-unit exponent
//! (`2` for USD). Amounts stay integers everywhere; conversion to a decimal
//! happens only when rendering, using exact `Decimal` arithmetic.
//!
//! Rendering follows the en-US currency style: known currencies get their
//! symbol (`$111.00`, `€111.00`, `CA$111.00`), anything else is prefixed with
//! its ISO code and a non-breaking space (`AED 111.00`).

use std::borrow::Cow;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when interpreting a minor-unit amount.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount is not an integer.
    #[error("invalid minor-unit amount: {0:?}")]
    InvalidAmount(String),
    /// The exponent is outside what `Decimal` can represent.
    #[error("unsupported currency minor unit: {0}")]
    UnsupportedMinorUnit(u32),
}

/// A currency as reported alongside Store API amounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// ISO 4217 code, e.g. `USD`.
    pub code: String,
    /// Number of minor-unit digits, e.g. `2` for cents.
    pub minor_unit: u32,
}

impl Currency {
    #[must_use]
    pub fn new(code: impl Into<String>, minor_unit: u32) -> Self {
        Self {
            code: code.into(),
            minor_unit,
        }
    }

    /// US dollars, the store's default currency.
    #[must_use]
    pub fn usd() -> Self {
        Self::new("USD", 2)
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::usd()
    }
}

/// An amount in minor units of a currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    pub minor_units: i64,
    pub currency: Currency,
}

impl Money {
    #[must_use]
    pub const fn new(minor_units: i64, currency: Currency) -> Self {
        Self {
            minor_units,
            currency,
        }
    }

    /// Zero in the given currency.
    #[must_use]
    pub const fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Parse a Store API amount string such as `"11100"`.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidAmount`] if the string is not an integer.
    pub fn parse(minor_units: &str, currency: Currency) -> Result<Self, MoneyError> {
        Ok(Self::new(minor_units.into_minor_units()?, currency))
    }

    /// The amount in major units (`11100` cents → `111.00`).
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::UnsupportedMinorUnit`] for exponents above 28.
    pub fn to_decimal(&self) -> Result<Decimal, MoneyError> {
        Decimal::try_new(self.minor_units, self.currency.minor_unit)
            .map_err(|_| MoneyError::UnsupportedMinorUnit(self.currency.minor_unit))
    }

    /// Render for display, e.g. `$111.00`.
    #[must_use]
    pub fn format(&self) -> String {
        format_money(self.minor_units, self.currency.minor_unit, &self.currency.code)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// Anything that can be read as an integer minor-unit amount.
///
/// Implemented for integers and for the integer strings the Store API sends.
pub trait IntoMinorUnits {
    /// # Errors
    ///
    /// Returns [`MoneyError::InvalidAmount`] if the value is not an integer.
    fn into_minor_units(self) -> Result<i64, MoneyError>;
}

impl IntoMinorUnits for i64 {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        Ok(self)
    }
}

impl IntoMinorUnits for i32 {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        Ok(i64::from(self))
    }
}

impl IntoMinorUnits for u32 {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        Ok(i64::from(self))
    }
}

impl IntoMinorUnits for &str {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        self.trim()
            .parse::<i64>()
            .map_err(|_| MoneyError::InvalidAmount(self.to_string()))
    }
}

impl IntoMinorUnits for &String {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        self.as_str().into_minor_units()
    }
}

impl IntoMinorUnits for String {
    fn into_minor_units(self) -> Result<i64, MoneyError> {
        self.as_str().into_minor_units()
    }
}

/// Format a minor-unit amount for display.
///
/// Divides `minor_units` by `10^minor_unit` and renders it in en-US currency
/// style for `currency_code`. Unparseable amounts are rendered verbatim after
/// the currency prefix so a bad value is visible rather than silently zero.
///
/// ```
/// use rooh_core::format_money;
///
/// assert_eq!(format_money("11100", 2, "USD"), "$111.00");
/// assert_eq!(format_money(0, 2, "USD"), "$0.00");
/// assert_eq!(format_money("11100", 2, "EUR"), "€111.00");
/// assert_eq!(format_money(123_456_789, 2, "USD"), "$1,234,567.89");
/// ```
#[must_use]
pub fn format_money(amount: impl IntoMinorUnits, minor_unit: u32, currency_code: &str) -> String {
    let prefix = currency_prefix(currency_code);
    match amount
        .into_minor_units()
        .and_then(|minor| render(minor, minor_unit, &prefix))
    {
        Ok(rendered) => rendered,
        Err(MoneyError::InvalidAmount(raw)) => format!("{prefix}{raw}"),
        Err(MoneyError::UnsupportedMinorUnit(_)) => format!("{prefix}?"),
    }
}

fn render(minor_units: i64, minor_unit: u32, prefix: &str) -> Result<String, MoneyError> {
    let value = Decimal::try_new(minor_units, minor_unit)
        .map_err(|_| MoneyError::UnsupportedMinorUnit(minor_unit))?;

    let digits = format!("{:.prec$}", value.abs(), prec = minor_unit as usize);
    let (integer, fraction) = match digits.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (digits.as_str(), None),
    };

    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };

    let mut out = format!("{sign}{prefix}{}", group_thousands(integer));
    if let Some(fraction) = fraction {
        out.push('.');
        out.push_str(fraction);
    }
    Ok(out)
}

/// Insert `,` every three digits from the right.
fn group_thousands(integer: &str) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Display prefix for a currency code.
fn currency_prefix(code: &str) -> Cow<'static, str> {
    let symbol = match code.to_ascii_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        "CAD" => "CA$",
        "AUD" => "A$",
        "NZD" => "NZ$",
        "HKD" => "HK$",
        "MXN" => "MX$",
        "CNY" => "CN¥",
        "KRW" => "₩",
        "ILS" => "₪",
        "BRL" => "R$",
        "PHP" => "₱",
        "VND" => "₫",
        other => return Cow::Owned(format!("{other}\u{a0}")),
    };
    Cow::Borrowed(symbol)
}
