//! Star pricing in TON
//!
//! All amounts are fixed-point decimals with TON's native precision of 9
//! fractional digits. Every intermediate value is truncated toward zero, the
//! same rule the payment links use when converting to nanotons, so the amount
//! shown to the user and the amount pre-filled in the wallet always agree.

pub mod source;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fractional digits of a TON amount (1 TON = 10^9 nanotons)
pub const TON_DECIMALS: u32 = 9;

/// Nanotons in one TON
pub const NANOTONS_PER_TON: u64 = 1_000_000_000;

/// Smallest order the bot accepts
pub const MIN_STARS: u32 = 50;

/// Largest order the bot accepts
pub const MAX_STARS: u32 = 1_000_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("amount must not be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("amount does not fit into nanotons: {0}")]
    Overflow(Decimal),

    #[error("price per star must be positive, got {0}")]
    NonPositiveRate(Decimal),

    #[error("fee multiplier must be at least 1, got {0}")]
    InvalidFeeMultiplier(Decimal),

    #[error("quantity must be positive")]
    ZeroQuantity,

    #[error("invalid TON amount {0:?}: {1}")]
    Parse(String, String),
}

/// Rejections of a user-entered star quantity
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    #[error("not a number")]
    NotANumber,

    #[error("quantity must be between {min} and {max}")]
    OutOfRange { min: u32, max: u32 },
}

/// Truncates a decimal to TON precision
pub fn truncate_ton(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(TON_DECIMALS, RoundingStrategy::ToZero)
}

/// A non-negative TON amount with at most 9 fractional digits.
///
/// Stored as whole nanotons, so conversion to the on-chain integer is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TonAmount(u64);

impl TonAmount {
    pub const ZERO: TonAmount = TonAmount(0);

    /// Builds an amount, truncating anything past the 9th fractional digit.
    pub fn new(value: Decimal) -> Result<Self, PricingError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PricingError::NegativeAmount(value));
        }
        let nanotons = truncate_ton(value)
            .checked_mul(Decimal::from(NANOTONS_PER_TON))
            .and_then(|n| n.trunc().to_u64())
            .ok_or(PricingError::Overflow(value))?;
        Ok(Self(nanotons))
    }

    pub fn from_nanotons(nanotons: u64) -> Self {
        Self(nanotons)
    }

    /// Exact integer nanotons
    pub fn to_nanotons(self) -> u64 {
        self.0
    }

    /// The amount as a decimal with scale 9
    pub fn as_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), TON_DECIMALS)
    }

    /// Fixed 9-digit form used for persistence, e.g. `0.322550000`
    pub fn to_fixed_string(self) -> String {
        self.as_decimal().to_string()
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

/// Trimmed decimal form: no trailing zeros, no exponent, never `-0`.
///
/// `0.322550000` prints as `0.32255`, zero prints as `0`.
impl fmt::Display for TonAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal().normalize())
    }
}

impl FromStr for TonAmount {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|e| PricingError::Parse(s.to_string(), e.to_string()))?;
        Self::new(value)
    }
}

/// Result of pricing an order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quote {
    pub quantity: u32,
    /// Source price of one star
    pub per_unit: TonAmount,
    /// `rate × quantity`, before the fee
    pub subtotal: TonAmount,
    /// `subtotal × fee_multiplier`, the amount the user pays
    pub total: TonAmount,
}

/// Prices `quantity` stars at `rate` TON per star with a fee markup.
///
/// Bounds on the quantity are the caller's concern (see [`validate_quantity`]).
/// `total = trunc9(trunc9(rate × quantity) × fee_multiplier)`. The rate itself
/// is not truncated before multiplying. A quote that comes out at zero
/// nanotons is rejected.
///
/// # Example
///
/// ```
/// use rust_decimal::Decimal;
/// use starcore::pricing::quote;
/// use std::str::FromStr;
///
/// let q = quote(50, Decimal::from_str("0.006451").unwrap(), Decimal::from_str("1.05").unwrap()).unwrap();
/// assert_eq!(q.subtotal.to_string(), "0.32255");
/// assert_eq!(q.total.to_string(), "0.3386775");
/// ```
pub fn quote(quantity: u32, rate: Decimal, fee_multiplier: Decimal) -> Result<Quote, PricingError> {
    if quantity == 0 {
        return Err(PricingError::ZeroQuantity);
    }
    if rate <= Decimal::ZERO {
        return Err(PricingError::NonPositiveRate(rate));
    }
    if fee_multiplier < Decimal::ONE {
        return Err(PricingError::InvalidFeeMultiplier(fee_multiplier));
    }

    // The untruncated rate goes into the subtotal; per_unit is for display and storage.
    let per_unit = TonAmount::new(rate)?;

    let subtotal_raw = rate
        .checked_mul(Decimal::from(quantity))
        .ok_or(PricingError::Overflow(rate))?;
    let subtotal = TonAmount::new(subtotal_raw)?;
    if subtotal.is_zero() {
        return Err(PricingError::NonPositiveRate(rate));
    }

    let total_raw = subtotal
        .as_decimal()
        .checked_mul(fee_multiplier)
        .ok_or(PricingError::Overflow(subtotal_raw))?;
    let total = TonAmount::new(total_raw)?;

    Ok(Quote {
        quantity,
        per_unit,
        subtotal,
        total,
    })
}

/// Checks that a quantity is within the orderable range
pub fn validate_quantity(quantity: u64) -> Result<u32, QuantityError> {
    let out_of_range = QuantityError::OutOfRange {
        min: MIN_STARS,
        max: MAX_STARS,
    };
    let quantity = u32::try_from(quantity).map_err(|_| out_of_range)?;
    if (MIN_STARS..=MAX_STARS).contains(&quantity) {
        Ok(quantity)
    } else {
        Err(out_of_range)
    }
}

/// Parses a chat message as a star quantity.
///
/// Only plain ASCII digits are accepted. Digit strings too large for any
/// integer type are reported as out of range, not as garbage.
pub fn parse_quantity(text: &str) -> Result<u32, QuantityError> {
    let text = text.trim();
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(QuantityError::NotANumber);
    }
    match text.parse::<u64>() {
        Ok(quantity) => validate_quantity(quantity),
        Err(_) => Err(QuantityError::OutOfRange {
            min: MIN_STARS,
            max: MAX_STARS,
        }),
    }
}
