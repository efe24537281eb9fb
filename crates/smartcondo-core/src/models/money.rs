use std::fmt;
use std::ops::Add;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// A monetary amount stored as integer cents.
///
/// The backend serializes decimals as strings (`"150.00"`) but some
/// endpoints send plain numbers, so both are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Parse a decimal string such as `"1234.5"` or `"-20.00"`.
    /// Digits past the second decimal place are rounded half away from zero.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().replace(',', "");
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.as_str()),
        };
        if digits.is_empty() {
            return None;
        }

        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut frac_digits = frac.chars().filter_map(|c| c.to_digit(10)).map(i64::from);
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().is_some_and(|d| d >= 5);

        let cents = whole
            .checked_mul(100)?
            .checked_add(tenths * 10 + hundredths + i64::from(round_up))?;
        Some(Money(if negative { -cents } else { cents }))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = (abs / 100).to_string();

        // Thousands separators
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        f.pad(&format!("{}${}.{:02}", sign, grouped, abs % 100))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        serializer.serialize_str(&format!("{}{}.{:02}", sign, abs / 100, abs % 100))
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAmount {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match RawAmount::deserialize(deserializer)? {
            RawAmount::Int(units) => units
                .checked_mul(100)
                .map(Money)
                .ok_or_else(|| de::Error::custom("amount out of range")),
            RawAmount::Float(value) => Ok(Money((value * 100.0).round() as i64)),
            RawAmount::Text(text) => Money::parse(&text)
                .ok_or_else(|| de::Error::custom(format!("invalid amount: {}", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Money::parse("150.00"), Some(Money(15000)));
        assert_eq!(Money::parse("150"), Some(Money(15000)));
        assert_eq!(Money::parse("0.5"), Some(Money(50)));
        assert_eq!(Money::parse("-20.10"), Some(Money(-2010)));
        assert_eq!(Money::parse("1,250.75"), Some(Money(125075)));
        assert_eq!(Money::parse("10.005"), Some(Money(1001)));
        assert_eq!(Money::parse(".25"), Some(Money(25)));
        assert_eq!(Money::parse(""), None);
        assert_eq!(Money::parse("abc"), None);
        assert_eq!(Money::parse("1.2.3"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money(0).to_string(), "$0.00");
        assert_eq!(Money(15000).to_string(), "$150.00");
        assert_eq!(Money(123456789).to_string(), "$1,234,567.89");
        assert_eq!(Money(-2010).to_string(), "-$20.10");
        assert_eq!(format!("{:>8}", Money(150)), "   $1.50");
    }

    #[test]
    fn test_deserialize_string_and_number() {
        let amounts: Vec<Money> = serde_json::from_str(r#"["99.90", 12, 3.5]"#).expect("amounts");
        assert_eq!(amounts, vec![Money(9990), Money(1200), Money(350)]);
        assert!(serde_json::from_str::<Money>(r#""twelve""#).is_err());
    }

    #[test]
    fn test_serialize_as_decimal_string() {
        assert_eq!(serde_json::to_string(&Money(-5)).expect("serialize"), r#""-0.05""#);
        assert_eq!(serde_json::to_string(&Money(15000)).expect("serialize"), r#""150.00""#);
    }

    #[test]
    fn test_sum() {
        let total: Money = [Money(100), Money(250), Money(-50)].into_iter().sum();
        assert_eq!(total, Money(300));
    }
}
