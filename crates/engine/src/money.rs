use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Signed money amount represented as **whole Rwandan francs**.
///
/// The franc has no minor unit in circulation, so every monetary value in
/// the engine (share values, balances, fines, fees) is an integer number of
/// RWF.
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_500);
/// assert_eq!(amount.francs(), 12500);
/// assert_eq!(amount.to_string(), "12,500 RWF");
/// ```
///
/// Parsing from user input (accepts `,`, `_` or spaces as thousands
/// separators and an optional `RWF` suffix; rejects decimals):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("12,500".parse::<Money>().unwrap().francs(), 12500);
/// assert_eq!("500 RWF".parse::<Money>().unwrap().francs(), 500);
/// assert!("12.5".parse::<Money>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from whole francs.
    #[must_use]
    pub const fn new(francs: i64) -> Self {
        Self(francs)
    }

    /// Returns the raw value in francs.
    #[must_use]
    pub const fn francs(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Money) -> Option<Money> {
        self.0.checked_add(rhs.0).map(Money)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Money) -> Option<Money> {
        self.0.checked_sub(rhs.0).map(Money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (idx, ch) in digits.chars().enumerate() {
            if idx > 0 && (digits.len() - idx) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}{grouped} RWF")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = EngineError;

    /// Parses a user-provided amount.
    ///
    /// Validation rules:
    /// - optional leading `+`/`-`, optional trailing `RWF` (any case)
    /// - `,`, `_` and spaces are accepted as thousands separators
    /// - rejects decimals and empty/invalid strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || EngineError::InvalidAmount("empty amount".to_string());
        let invalid = || EngineError::InvalidAmount("invalid amount".to_string());
        let overflow = || EngineError::InvalidAmount("amount too large".to_string());

        let mut trimmed = s.trim();
        let split = trimmed.len().saturating_sub(3);
        if trimmed.is_char_boundary(split) && trimmed[split..].eq_ignore_ascii_case("rwf") {
            trimmed = trimmed[..split].trim_end();
        }
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (sign, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (-1i64, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (1i64, stripped)
        } else {
            (1i64, trimmed)
        };

        let digits: String = rest
            .chars()
            .filter(|c| !matches!(c, ',' | '_' | ' '))
            .collect();
        if digits.is_empty() {
            return Err(empty());
        }
        if digits.contains('.') {
            return Err(EngineError::InvalidAmount(
                "RWF amounts have no decimals".to_string(),
            ));
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let francs: i64 = digits.parse().map_err(|_| overflow())?;
        Ok(Money(sign * francs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Money::new(0).to_string(), "0 RWF");
        assert_eq!(Money::new(500).to_string(), "500 RWF");
        assert_eq!(Money::new(1000).to_string(), "1,000 RWF");
        assert_eq!(Money::new(57_500).to_string(), "57,500 RWF");
        assert_eq!(Money::new(1_234_567).to_string(), "1,234,567 RWF");
        assert_eq!(Money::new(-2500).to_string(), "-2,500 RWF");
    }

    #[test]
    fn parse_accepts_separators_and_suffix() {
        assert_eq!("10".parse::<Money>().unwrap().francs(), 10);
        assert_eq!("12,500".parse::<Money>().unwrap().francs(), 12_500);
        assert_eq!("1 000 000".parse::<Money>().unwrap().francs(), 1_000_000);
        assert_eq!("-300 rwf".parse::<Money>().unwrap().francs(), -300);
        assert_eq!("+2_000RWF".parse::<Money>().unwrap().francs(), 2000);
    }

    #[test]
    fn parse_rejects_decimals_and_garbage() {
        assert!("12.5".parse::<Money>().is_err());
        assert!("".parse::<Money>().is_err());
        assert!("RWF".parse::<Money>().is_err());
        assert!("12a".parse::<Money>().is_err());
    }

    #[test]
    fn sum_adds_amounts() {
        let total: Money = [Money::new(100), Money::new(250), -Money::new(50)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::new(300));
    }
}
