use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Money amount represented as **whole rupiah**.
///
/// Rupiah has no minor unit in practice, so every amount in the engine
/// (loan balances, pledge targets, contract prices) is an integer count of
/// rupiah.
///
/// # Examples
///
/// ```rust
/// use engine::Rupiah;
///
/// let amount = Rupiah::new(3_550_000);
/// assert_eq!(amount.value(), 3_550_000);
/// assert_eq!(amount.to_string(), "Rp 3.550.000");
/// ```
///
/// Parsing from user input (accepts `.` or `_` as group separators and an
/// optional `Rp` prefix):
///
/// ```rust
/// use engine::Rupiah;
///
/// assert_eq!("50000".parse::<Rupiah>().unwrap().value(), 50_000);
/// assert_eq!("Rp 2.000.000".parse::<Rupiah>().unwrap().value(), 2_000_000);
/// assert!("-5".parse::<Rupiah>().is_err());
/// ```
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Rupiah(i64);

impl Rupiah {
    pub const ZERO: Rupiah = Rupiah(0);

    /// Creates a new amount from whole rupiah.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw value in rupiah.
    #[must_use]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Rupiah) -> Option<Rupiah> {
        self.0.checked_add(rhs.0).map(Rupiah)
    }

    /// Subtraction floored at zero.
    #[must_use]
    pub fn floored_sub(self, rhs: Rupiah) -> Rupiah {
        Rupiah(self.0.saturating_sub(rhs.0).max(0))
    }
}

impl fmt::Display for Rupiah {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }
        write!(f, "{sign}Rp {grouped}")
    }
}

impl FromStr for Rupiah {
    type Err = EngineError;

    /// Parses a whole-rupiah string.
    ///
    /// Validation rules:
    /// - optional `Rp` prefix
    /// - `.` and `_` separate thousands: the leading group has 1 to 3
    ///   digits, every following group exactly 3
    /// - rejects signs, decimals and empty strings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EngineError::InvalidAmount(format!("invalid amount: {s:?}"));

        let trimmed = s.trim();
        let trimmed = trimmed
            .strip_prefix("Rp")
            .or_else(|| trimmed.strip_prefix("rp"))
            .unwrap_or(trimmed)
            .trim();
        if trimmed.is_empty() {
            return Err(EngineError::InvalidAmount("empty amount".to_string()));
        }

        let groups: Vec<&str> = trimmed.split(['.', '_']).collect();
        let grouped = groups.len() > 1;
        for (i, group) in groups.iter().enumerate() {
            let width_ok = match (grouped, i) {
                (false, _) => !group.is_empty(),
                (true, 0) => (1..=3).contains(&group.len()),
                (true, _) => group.len() == 3,
            };
            if !width_ok || !group.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        let digits = groups.concat();

        let value: i64 = digits
            .parse()
            .map_err(|_| EngineError::InvalidAmount("amount too large".to_string()))?;
        Ok(Rupiah(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_groups_thousands() {
        assert_eq!(Rupiah::new(0).to_string(), "Rp 0");
        assert_eq!(Rupiah::new(999).to_string(), "Rp 999");
        assert_eq!(Rupiah::new(50_000).to_string(), "Rp 50.000");
        assert_eq!(Rupiah::new(10_000_000).to_string(), "Rp 10.000.000");
        assert_eq!(Rupiah::new(-1_500).to_string(), "-Rp 1.500");
    }

    #[test]
    fn parse_accepts_separators_and_prefix() {
        assert_eq!("1000".parse::<Rupiah>().unwrap().value(), 1_000);
        assert_eq!("1.000.000".parse::<Rupiah>().unwrap().value(), 1_000_000);
        assert_eq!("500_000".parse::<Rupiah>().unwrap().value(), 500_000);
        assert_eq!(" Rp 75.000 ".parse::<Rupiah>().unwrap().value(), 75_000);
        assert_eq!("12.500".parse::<Rupiah>().unwrap().value(), 12_500);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Rupiah>().is_err());
        assert!("Rp".parse::<Rupiah>().is_err());
        assert!("-10".parse::<Rupiah>().is_err());
        assert!("12,5".parse::<Rupiah>().is_err());
        assert!("12.5".parse::<Rupiah>().is_err());
        assert!("1.0000".parse::<Rupiah>().is_err());
        assert!("1000.000.00".parse::<Rupiah>().is_err());
        assert!("1..000".parse::<Rupiah>().is_err());
        assert!("abc".parse::<Rupiah>().is_err());
    }

    #[test]
    fn floored_sub_never_goes_negative() {
        assert_eq!(
            Rupiah::new(500_000).floored_sub(Rupiah::new(1_000_000)),
            Rupiah::ZERO
        );
        assert_eq!(
            Rupiah::new(2_500_000).floored_sub(Rupiah::new(500_000)),
            Rupiah::new(2_000_000)
        );
    }
}
