use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional decimal digits carried by an [`Amount`].
pub const DECIMALS: u32 = 8;
const SCALE: u64 = 10u64.pow(DECIMALS);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("empty amount")]
    Empty,
    #[error("malformed amount: {0}")]
    Malformed(String),
    #[error("too many fractional digits (max {DECIMALS}): {0}")]
    Precision(String),
    #[error("amount out of range: {0}")]
    Overflow(String),
}

/// Non-negative fixed-point coin amount.
///
/// Stored as minor units so that `coins_in == coins_out` is an exact
/// comparison. On the wire it travels as a decimal string such as `"2.5"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_units(units: u64) -> Self {
        Amount(units)
    }

    /// Whole coins, e.g. `Amount::coins(10)` is `"10"`.
    pub fn coins(coins: u64) -> Self {
        Amount(coins.saturating_mul(SCALE))
    }

    pub fn units(self) -> u64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Sums amounts, returning `None` on overflow.
    pub fn checked_sum<I: IntoIterator<Item = Amount>>(iter: I) -> Option<Amount> {
        iter.into_iter()
            .try_fold(Amount::ZERO, |acc, next| acc.checked_add(next))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Amount::saturating_add)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE;
        let frac = self.0 % SCALE;
        if frac == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", frac, width = DECIMALS as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(AmountError::Malformed(s.to_string()));
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::Precision(s.to_string()));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| AmountError::Overflow(s.to_string()))?
        };
        let frac_units: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = DECIMALS as usize);
            padded
                .parse()
                .map_err(|_| AmountError::Malformed(s.to_string()))?
        };

        whole
            .checked_mul(SCALE)
            .and_then(|units| units.checked_add(frac_units))
            .map(Amount)
            .ok_or_else(|| AmountError::Overflow(s.to_string()))
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_prints_decimals() {
        let a: Amount = "2.5".parse().unwrap();
        assert_eq!(a.units(), 250_000_000);
        assert_eq!(a.to_string(), "2.5");
        assert_eq!(Amount::coins(10).to_string(), "10");
        assert_eq!(".25".parse::<Amount>().unwrap().to_string(), "0.25");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!("".parse::<Amount>(), Err(AmountError::Empty));
        assert!(matches!("-1".parse::<Amount>(), Err(AmountError::Malformed(_))));
        assert!(matches!("1.000000001".parse::<Amount>(), Err(AmountError::Precision(_))));
        assert!(matches!("99999999999999999999".parse::<Amount>(), Err(AmountError::Overflow(_))));
    }

    #[test]
    fn sums_exactly() {
        let parts: Vec<Amount> = ["0.1", "0.2"].iter().map(|s| s.parse().unwrap()).collect();
        assert_eq!(Amount::checked_sum(parts), Some("0.3".parse().unwrap()));
        assert_eq!(Amount::checked_sum([Amount::from_units(u64::MAX), Amount::from_units(1)]), None);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&Amount::coins(3)).unwrap();
        assert_eq!(json, "\"3\"");
        let back: Amount = serde_json::from_str("\"1.5\"").unwrap();
        assert_eq!(back, "1.5".parse().unwrap());
    }
}
