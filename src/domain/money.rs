use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// A monetary value with 2 decimal places precision.
///
/// Wrapper around `rust_decimal::Decimal` to keep financial arithmetic
/// type-safe and out of floating point.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Applies a fractional rate and rounds to cents.
    pub fn percent_of(&self, rate: Decimal) -> Self {
        Self((self.0 * rate).round_dp(2))
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic() {
        let a = Money::new(dec!(10.00));
        let b = Money::new(dec!(2.50));
        assert_eq!(a + b, Money::new(dec!(12.50)));
        assert_eq!(a - b, Money::new(dec!(7.50)));
    }

    #[test]
    fn test_percent_of_rounds_to_cents() {
        let gross = Money::new(dec!(33.33));
        assert_eq!(gross.percent_of(dec!(0.15)), Money::new(dec!(5.00)));
    }

    #[test]
    fn test_sum() {
        let total: Money = [dec!(5.00), dec!(7.50)].into_iter().map(Money::new).sum();
        assert_eq!(total, Money::new(dec!(12.50)));
    }
}
