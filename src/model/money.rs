//! Monetary amounts, held as whole cents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// An amount of money in cents.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "MoneyRepr", into = "String")]
pub struct Money(i64);

impl Money {
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }
}

impl FromStr for Money {
    type Err = ValidationError;

    /// Accepts `12`, `12.5`, `12.50`, `$1,234.50` and a leading `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::Money(s.to_string());

        let trimmed = s.trim();
        let (negative, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let rest = rest.strip_prefix('$').unwrap_or(rest);
        let (negative, rest) = match rest.strip_prefix('-') {
            Some(rest) if !negative => (true, rest),
            Some(_) => return Err(invalid()),
            None => (negative, rest),
        };
        let digits: String = rest.chars().filter(|c| *c != ',').collect();

        let (whole, frac) = digits.split_once('.').unwrap_or((&digits, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid());
        }
        if !whole.chars().all(|c| c.is_ascii_digit())
            || !frac.chars().all(|c| c.is_ascii_digit())
            || frac.len() > 2
        {
            return Err(invalid());
        }

        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let frac: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => frac.parse().map_err(|_| invalid())?,
        };

        let cents = whole
            .checked_mul(100)
            .and_then(|c| c.checked_add(frac))
            .ok_or_else(invalid)?;
        Ok(Self(if negative { -cents } else { cents }))
    }
}

impl fmt::Display for Money {
    /// Renders as `12.50`, without a currency sign.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl From<Money> for String {
    fn from(money: Money) -> Self {
        money.to_string()
    }
}

/// Wire shape accepted from event sources: a bare number or a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum MoneyRepr {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl TryFrom<MoneyRepr> for Money {
    type Error = ValidationError;

    fn try_from(repr: MoneyRepr) -> Result<Self, Self::Error> {
        match repr {
            MoneyRepr::Integer(n) => n
                .checked_mul(100)
                .map(Self)
                .ok_or_else(|| ValidationError::Money(n.to_string())),
            // Display is the shortest round-trip form, so sub-cent digits survive
            // and are rejected by the two-decimal rule.
            MoneyRepr::Float(n) => n.to_string().parse(),
            MoneyRepr::Text(s) => s.parse(),
        }
    }
}
