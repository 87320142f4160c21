//! Fixed-point price and quantity facade.
//!
//! ## Overview
//!
//! All prices and quantities inside the book are `u64` values scaled by
//! 10^8. Matching only ever compares, adds and subtracts them, so the hot
//! path never touches a heavyweight decimal type.
//!
//! [`rust_decimal`] sits behind this facade for everything at the boundary:
//! parsing human-readable numerals, formatting, and the 16-byte binary
//! encoding used by the order wire format.
//!
//! ## Why fixed-point?
//!
//! Floating-point arithmetic can produce different results on different
//! hardware, breaking determinism. Fixed-point ensures identical results
//! everywhere.
//!
//! ## Examples
//!
//! ```
//! use seqbook::types::price::{to_fixed, from_fixed, SCALE};
//!
//! let price = to_fixed("50000.12345678").unwrap();
//! assert_eq!(price, 5_000_012_345_678);
//! assert_eq!(from_fixed(price), "50000.12345678");
//! assert_eq!(to_fixed("1"), Some(SCALE));
//! ```

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Scaling factor for fixed-point arithmetic: 10^8.
pub const SCALE: u64 = 100_000_000;

/// Largest whole-unit value representable without overflow.
pub const MAX_VALUE: u64 = u64::MAX / SCALE;

/// Width of one binary-encoded decimal on the wire.
pub const ENCODED_LEN: usize = 16;

// ============================================================================
// Conversion
// ============================================================================

/// Convert a decimal string to fixed-point.
///
/// Returns `None` for negative values, unparsable input, or values out of
/// range.
///
/// # Example
///
/// ```
/// use seqbook::types::price::to_fixed;
///
/// assert_eq!(to_fixed("1.0"), Some(100_000_000));
/// assert_eq!(to_fixed("0.00000001"), Some(1));
/// assert_eq!(to_fixed("-1"), None);
/// ```
pub fn to_fixed(s: &str) -> Option<u64> {
    let decimal = Decimal::from_str(s).ok()?;
    decimal_to_fixed(decimal)
}

/// Convert a [`Decimal`] to fixed-point, rounding to 8 places.
pub fn decimal_to_fixed(d: Decimal) -> Option<u64> {
    if d.is_sign_negative() {
        return None;
    }

    let scaled = d.checked_mul(Decimal::from(SCALE))?;
    scaled.round_dp(0).to_u64()
}

/// Convert fixed-point back to a [`Decimal`].
pub fn fixed_to_decimal(value: u64) -> Decimal {
    Decimal::from(value) / Decimal::from(SCALE)
}

/// Format a fixed-point value with trailing zeros trimmed.
///
/// # Example
///
/// ```
/// use seqbook::types::price::from_fixed;
///
/// assert_eq!(from_fixed(100_000_000), "1");
/// assert_eq!(from_fixed(150_000_000), "1.5");
/// assert_eq!(from_fixed(5_000_012_345_678), "50000.12345678");
/// ```
pub fn from_fixed(value: u64) -> String {
    fixed_to_decimal(value).normalize().to_string()
}

// ============================================================================
// Binary encoding
// ============================================================================

/// Encode a fixed-point value as a 16-byte decimal for the wire format.
pub fn encode_fixed(value: u64) -> [u8; ENCODED_LEN] {
    fixed_to_decimal(value).serialize()
}

/// Decode a 16-byte wire decimal back into fixed-point.
///
/// Returns `None` when the encoded value is negative or out of range.
pub fn decode_fixed(bytes: [u8; ENCODED_LEN]) -> Option<u64> {
    decimal_to_fixed(Decimal::deserialize(bytes))
}

// ============================================================================
// Unit Tests
// ============================================================================
