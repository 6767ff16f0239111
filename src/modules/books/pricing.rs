//! Exact decimal price arithmetic.
//!
//! Prices carry two decimal places. Anything finer is rounded half-up
//! (`MidpointAwayFromZero`), which for non-negative prices is the usual
//! currency rounding.

use rust_decimal::{Decimal, RoundingStrategy};

pub const PRICE_SCALE: u32 = 2;

/// Largest price a `DECIMAL(10,2)` column holds: 99999999.99.
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, PRICE_SCALE);

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Round a price to the stored scale.
pub fn normalize(price: Decimal) -> Decimal {
    let mut rounded = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(PRICE_SCALE);
    rounded
}

/// True when `price`, once rounded to the stored scale, no longer fits.
pub fn exceeds_max(price: Decimal) -> bool {
    normalize(price) > MAX_PRICE
}

pub fn is_valid_percentage(percentage: Decimal) -> bool {
    percentage >= Decimal::ZERO && percentage <= HUNDRED
}

/// `price * percentage / 100`, unrounded. `None` on overflow.
pub fn discount_amount(price: Decimal, percentage: Decimal) -> Option<Decimal> {
    price.checked_mul(percentage)?.checked_div(HUNDRED)
}

/// Price after removing `percentage` percent, rounded to the stored scale.
///
/// Callers check the percentage with [`is_valid_percentage`] first.
pub fn apply_discount(price: Decimal, percentage: Decimal) -> Option<Decimal> {
    let discounted = price.checked_sub(discount_amount(price, percentage)?)?;
    Some(normalize(discounted))
}
