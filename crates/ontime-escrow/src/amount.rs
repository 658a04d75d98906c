//! Exact floor arithmetic on whole-unit amounts.
//!
//! Amounts are `Decimal`s holding whole numbers of the smallest unit. Every
//! division floors. The helpers split the dividend into quotient and
//! remainder first, so no intermediate product can leave the `Decimal`
//! range even for deposits near its upper bound.

use rust_decimal::Decimal;

/// `floor(amount * numer / denom)` for `numer <= denom`.
///
/// # Panics
/// Panics if `denom` is zero or `numer > denom`.
pub fn mul_div_floor(amount: Decimal, numer: u64, denom: u64) -> Decimal {
    assert!(denom > 0, "denominator must be non-zero");
    assert!(numer <= denom, "numerator must not exceed denominator");
    let d = Decimal::from(denom);
    let n = Decimal::from(numer);
    let rem = amount % d;
    let quot = (amount - rem) / d;
    quot * n + (rem * n / d).floor()
}

/// `floor(amount / parts)` and the undistributed remainder.
///
/// # Panics
/// Panics if `parts` is zero.
pub fn split_floor(amount: Decimal, parts: usize) -> (Decimal, Decimal) {
    assert!(parts > 0, "cannot split into zero parts");
    let d = Decimal::from(parts);
    let rem = amount % d;
    ((amount - rem) / d, rem)
}
