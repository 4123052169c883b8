//! Exact decimal prices.
//!
//! Catalog prices are stored as `NUMERIC(10,2)`. The [`Price`] newtype keeps
//! the same constraints in Rust: never negative, at most two decimal places,
//! and small enough to fit the column.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative")]
    Negative,
    #[error("price may have at most 2 decimal places")]
    TooPrecise,
    #[error("price must be less than {max}")]
    TooLarge { max: Decimal },
    #[error("price is not a valid decimal number")]
    Unparseable,
}

/// A non-negative amount with at most two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Exclusive upper bound imposed by `NUMERIC(10,2)`.
    pub const MAX_EXCLUSIVE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Validate a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative, has more than two decimal
    /// places, or does not fit `NUMERIC(10,2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        if amount >= Self::MAX_EXCLUSIVE {
            return Err(PriceError::TooLarge {
                max: Self::MAX_EXCLUSIVE,
            });
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Parse a user-entered amount such as `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Unparseable`] for non-numeric input, otherwise the
    /// same errors as [`Price::new`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount: Decimal = s.trim().parse().map_err(|_| PriceError::Unparseable)?;
        Self::new(amount)
    }

    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Price multiplied by a line quantity.
    #[must_use]
    pub fn line_total(&self, quantity: u32) -> Decimal {
        self.0 * Decimal::from(quantity)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
