use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 3-4 character currency code. Validated on construction rather than
/// drawn from a closed enum — the protocol only constrains the shape of
/// the code, not which currencies an account may hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        let upper = code.to_uppercase();
        if upper.len() < 3
            || upper.len() > 4
            || !upper.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(AppError::InvalidArgument(format!(
                "currency code must be 3-4 ASCII letters, got '{code}'"
            )));
        }
        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Currency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for Currency {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

/// A monetary amount in integer minor units (e.g. cents). No floating
/// point anywhere on the wire or in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn validate_positive(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(AppError::InvalidArgument(format!(
                "amount must be positive, got {}",
                self.amount
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_three_and_four_letter_codes() {
        assert!(Currency::new("USD").is_ok());
        assert!(Currency::new("bhd1").is_err());
        assert!(Currency::new("XDRX").is_ok());
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(Currency::new("US").is_err());
        assert!(Currency::new("TOOLONG").is_err());
        assert!(Currency::new("U5D").is_err());
    }

    #[test]
    fn normalizes_case() {
        let c = Currency::new("usd").unwrap();
        assert_eq!(c.as_str(), "USD");
    }

    #[test]
    fn money_requires_positive_amount() {
        let m = Money::new(0, Currency::new("USD").unwrap());
        assert!(m.validate_positive().is_err());
    }
}
