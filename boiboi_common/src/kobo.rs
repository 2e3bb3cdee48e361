use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const NAIRA_CURRENCY_CODE: &str = "NGN";

const KOBO_PER_NAIRA: i64 = 100;
const BPS_DENOMINATOR: i128 = 10_000;

//--------------------------------------        Kobo         ---------------------------------------------------------
/// A monetary amount in kobo, the minor unit of the naira. All balances, prices and fees are held in this type so
/// that fee splits are exact.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Kobo(i64);

op!(binary Kobo, Add, add);
op!(binary Kobo, Sub, sub);
op!(inplace Kobo, AddAssign, add_assign);
op!(inplace Kobo, SubAssign, sub_assign);
op!(unary Kobo, Neg, neg);

impl Mul<i64> for Kobo {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Kobo {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in kobo: {0}")]
pub struct KoboConversionError(String);

impl From<i64> for Kobo {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Kobo {
    type Error = KoboConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(KoboConversionError(format!("Value {value} is too large to convert to Kobo")))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Kobo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let naira = abs / KOBO_PER_NAIRA as u64;
        let kobo = abs % KOBO_PER_NAIRA as u64;
        write!(f, "{sign}₦{naira}.{kobo:02}")
    }
}

impl Kobo {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub const fn from_naira(naira: i64) -> Self {
        Self(naira * KOBO_PER_NAIRA)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Returns `bps / 10_000` of this amount, rounding half away from zero.
    pub fn percent_bps(&self, bps: u32) -> Self {
        let product = i128::from(self.0) * i128::from(bps);
        let half = BPS_DENOMINATOR / 2;
        let rounded = if product >= 0 { (product + half) / BPS_DENOMINATOR } else { (product - half) / BPS_DENOMINATOR };
        #[allow(clippy::cast_possible_truncation)]
        Self(rounded as i64)
    }
}
