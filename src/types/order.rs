//! Order types and the compact wire encoding.
//!
//! ## Stable integer values
//!
//! The enums here are part of the persisted wire format, so their integer
//! values are frozen:
//!
//! | Enum | Values |
//! |------|--------|
//! | `OrderClass` | market=0, limit=1 |
//! | `Side` | sell=0, buy=1 |
//! | `Flag` (bitset) | none=0, IoC=1, AoN=2, FoK=4, stop-loss=8, take-profit=16, snapshot=32 |
//!
//! ## Wire layout
//!
//! [`Order::compose`] produces: LEB128 varint id, then qty, price and
//! trigger price as 16-byte decimals, then one byte each for class, side
//! and flag. [`Order::decompose`] rejects any buffer whose residue after
//! the three decimals is not exactly those 3 bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::price::{decode_fixed, encode_fixed, ENCODED_LEN};

// ============================================================================
// Side enum
// ============================================================================

/// Order side: Sell (asks) or Buy (bids).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Sell order (ask) - wants to sell the asset
    #[default]
    Sell = 0,
    /// Buy order (bid) - wants to purchase the asset
    Buy = 1,
}

impl Side {
    /// Convert to u8 for serialization
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from u8 for deserialization
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Side::Sell),
            1 => Some(Side::Buy),
            _ => None,
        }
    }

    /// Returns the opposite side
    pub fn opposite(self) -> Self {
        match self {
            Side::Sell => Side::Buy,
            Side::Buy => Side::Sell,
        }
    }
}

// ============================================================================
// OrderClass enum
// ============================================================================

/// Order class: execute at any price (market) or bounded by a limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderClass {
    /// Market order - executes against the best available prices
    #[default]
    Market = 0,
    /// Limit order - executes at the limit price or better
    Limit = 1,
}

impl OrderClass {
    /// Convert to u8 for serialization
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Convert from u8 for deserialization
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(OrderClass::Market),
            1 => Some(OrderClass::Limit),
            _ => None,
        }
    }
}

// ============================================================================
// Flag bitset
// ============================================================================

/// Order modifier flags, combinable as a bitset.
///
/// `SNAPSHOT` is reserved for the surrounding system's snapshot protocol
/// and matches exactly like [`Flag::NONE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Flag(pub u8);

impl Flag {
    /// No modifier
    pub const NONE: Flag = Flag(0);
    /// Immediate-or-cancel: match what is possible now, discard the rest
    pub const IOC: Flag = Flag(1);
    /// All-or-none: match only if the whole quantity is available
    pub const AON: Flag = Flag(2);
    /// Fill-or-kill: match the whole quantity now or nothing
    pub const FOK: Flag = Flag(4);
    /// Stop-loss trigger
    pub const STOP_LOSS: Flag = Flag(8);
    /// Take-profit trigger
    pub const TAKE_PROFIT: Flag = Flag(16);
    /// Reserved snapshot marker, no matching effect
    pub const SNAPSHOT: Flag = Flag(32);

    /// True when every bit of `other` is set in `self`.
    pub fn contains(self, other: Flag) -> bool {
        self.0 & other.0 == other.0
    }

    /// True when `self` and `other` share any bit.
    pub fn intersects(self, other: Flag) -> bool {
        self.0 & other.0 != 0
    }

    /// Raw bit value
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl std::ops::BitOr for Flag {
    type Output = Flag;

    fn bitor(self, rhs: Flag) -> Flag {
        Flag(self.0 | rhs.0)
    }
}

// ============================================================================
// Order struct
// ============================================================================

/// Decoding failures for the binary order representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer is truncated, carries trailing garbage, or holds
    /// out-of-range field values.
    #[error("decompose failed: invalid bytes provided")]
    InvalidBytes,
}

/// A single order.
///
/// Prices and quantities are fixed-point `u64` values scaled by 10^8 (see
/// [`crate::types::price`]). `trig_price` is zero unless the flag carries
/// a stop-loss or take-profit bit; `price` is zero for market orders.
///
/// ## Example
///
/// ```
/// use seqbook::types::{Order, OrderClass, Side, Flag};
///
/// let order = Order::new(7, OrderClass::Limit, Side::Buy,
///                        200_000_000, 10_000_000_000, 0, Flag::NONE);
/// assert_eq!(order.qty, 200_000_000);
///
/// let bytes = order.compose();
/// assert_eq!(Order::decompose(&bytes), Ok(order));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier, caller-assigned
    pub id: u64,

    /// Market or limit
    pub class: OrderClass,

    /// Buy or sell
    pub side: Side,

    /// Modifier bitset
    pub flag: Flag,

    /// Remaining quantity (fixed-point, 10^8)
    pub qty: u64,

    /// Limit price (fixed-point, 10^8); zero for market orders
    pub price: u64,

    /// Trigger price (fixed-point, 10^8); zero for non-conditional orders
    pub trig_price: u64,
}

impl Order {
    /// Create a new order. Market orders have their price forced to zero.
    pub fn new(
        id: u64,
        class: OrderClass,
        side: Side,
        qty: u64,
        price: u64,
        trig_price: u64,
        flag: Flag,
    ) -> Self {
        let price = if class == OrderClass::Market { 0 } else { price };

        Self {
            id,
            class,
            side,
            flag,
            qty,
            price,
            trig_price,
        }
    }

    /// Convert the order to its binary representation.
    pub fn compose(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_VARINT_LEN + 3 * ENCODED_LEN + 3);

        put_uvarint(&mut buf, self.id);
        buf.extend_from_slice(&encode_fixed(self.qty));
        buf.extend_from_slice(&encode_fixed(self.price));
        buf.extend_from_slice(&encode_fixed(self.trig_price));
        buf.push(self.class.to_u8());
        buf.push(self.side.to_u8());
        buf.push(self.flag.bits());

        buf
    }

    /// Load an order from its binary representation.
    pub fn decompose(mut b: &[u8]) -> Result<Order, DecodeError> {
        let (id, n) = take_uvarint(b).ok_or(DecodeError::InvalidBytes)?;
        b = &b[n..];

        let qty = take_fixed(&mut b)?;
        let price = take_fixed(&mut b)?;
        let trig_price = take_fixed(&mut b)?;

        if b.len() != 3 {
            return Err(DecodeError::InvalidBytes);
        }

        Ok(Order {
            id,
            class: OrderClass::from_u8(b[0]).ok_or(DecodeError::InvalidBytes)?,
            side: Side::from_u8(b[1]).ok_or(DecodeError::InvalidBytes)?,
            flag: Flag(b[2]),
            qty,
            price,
            trig_price,
        })
    }
}

fn take_fixed(b: &mut &[u8]) -> Result<u64, DecodeError> {
    if b.len() < ENCODED_LEN {
        return Err(DecodeError::InvalidBytes);
    }

    let mut raw = [0u8; ENCODED_LEN];
    raw.copy_from_slice(&b[..ENCODED_LEN]);
    *b = &b[ENCODED_LEN..];

    decode_fixed(raw).ok_or(DecodeError::InvalidBytes)
}

// ============================================================================
// Varint encoding (LEB128)
// ============================================================================

/// Longest LEB128 encoding of a u64.
const MAX_VARINT_LEN: usize = 10;

fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push(value as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

fn take_uvarint(b: &[u8]) -> Option<(u64, usize)> {
    let mut x = 0u64;
    let mut shift = 0u32;

    for (i, &byte) in b.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return None;
        }
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return None;
            }
            return Some((x | (byte as u64) << shift, i + 1));
        }
        x |= ((byte & 0x7f) as u64) << shift;
        shift += 7;
    }

    None
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::price::to_fixed;

    #[test]
    fn test_side_values() {
        assert_eq!(Side::Sell.to_u8(), 0);
        assert_eq!(Side::Buy.to_u8(), 1);
        assert_eq!(Side::from_u8(0), Some(Side::Sell));
        assert_eq!(Side::from_u8(1), Some(Side::Buy));
        assert_eq!(Side::from_u8(2), None);
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_class_values() {
        assert_eq!(OrderClass::Market.to_u8(), 0);
        assert_eq!(OrderClass::Limit.to_u8(), 1);
        assert_eq!(OrderClass::from_u8(0), Some(OrderClass::Market));
        assert_eq!(OrderClass::from_u8(1), Some(OrderClass::Limit));
        assert_eq!(OrderClass::from_u8(2), None);
    }

    #[test]
    fn test_flag_bits() {
        assert_eq!(Flag::NONE.bits(), 0);
        assert_eq!(Flag::IOC.bits(), 1);
        assert_eq!(Flag::AON.bits(), 2);
        assert_eq!(Flag::FOK.bits(), 4);
        assert_eq!(Flag::STOP_LOSS.bits(), 8);
        assert_eq!(Flag::TAKE_PROFIT.bits(), 16);
        assert_eq!(Flag::SNAPSHOT.bits(), 32);
    }

    #[test]
    fn test_flag_ops() {
        let combined = Flag::STOP_LOSS | Flag::IOC;
        assert!(combined.contains(Flag::STOP_LOSS));
        assert!(combined.contains(Flag::IOC));
        assert!(!combined.contains(Flag::FOK));
        assert!(combined.intersects(Flag::STOP_LOSS | Flag::TAKE_PROFIT));
        assert!(!combined.intersects(Flag::AON | Flag::FOK));
        assert!(Flag::NONE.contains(Flag::NONE));
        assert!(!Flag::NONE.intersects(Flag::NONE));
    }

    #[test]
    fn test_market_order_price_zeroed() {
        let o = Order::new(1, OrderClass::Market, Side::Sell, 100, 500, 0, Flag::NONE);
        assert_eq!(o.price, 0);

        let o = Order::new(1, OrderClass::Limit, Side::Sell, 100, 500, 0, Flag::NONE);
        assert_eq!(o.price, 500);
    }

    #[test]
    fn test_compose_decompose_roundtrip() {
        let data = [
            Order::new(24324234, OrderClass::Limit, Side::Buy, to_fixed("1.1").unwrap(), to_fixed("110").unwrap(), 0, Flag::NONE),
            Order::new(3634345, OrderClass::Limit, Side::Buy, to_fixed("1.1").unwrap(), to_fixed("110").unwrap(), to_fixed("220").unwrap(), Flag::NONE),
            Order::new(4123412, OrderClass::Limit, Side::Buy, to_fixed("2.2").unwrap(), to_fixed("220").unwrap(), 0, Flag::AON),
            Order::new(830459304501, OrderClass::Limit, Side::Sell, to_fixed("3.3").unwrap(), to_fixed("330").unwrap(), 0, Flag::FOK),
            Order::new(237823742802, OrderClass::Limit, Side::Sell, to_fixed("4.4").unwrap(), to_fixed("440").unwrap(), 0, Flag::IOC),
        ];

        for order in data {
            let bytes = order.compose();
            let decoded = Order::decompose(&bytes).unwrap();
            assert_eq!(decoded, order);

            // recomposing must be byte-identical
            assert_eq!(decoded.compose(), bytes);
        }
    }

    #[test]
    fn test_decompose_invalid_bytes() {
        assert_eq!(Order::decompose(&[]), Err(DecodeError::InvalidBytes));

        let order = Order::new(42, OrderClass::Limit, Side::Buy, 100, 500, 0, Flag::NONE);
        let bytes = order.compose();

        // truncated
        assert_eq!(Order::decompose(&bytes[..bytes.len() - 1]), Err(DecodeError::InvalidBytes));

        // trailing garbage
        let mut long = bytes.clone();
        long.push(0);
        assert_eq!(Order::decompose(&long), Err(DecodeError::InvalidBytes));

        // bad class byte
        let mut bad = bytes.clone();
        let n = bad.len();
        bad[n - 3] = 9;
        assert_eq!(Order::decompose(&bad), Err(DecodeError::InvalidBytes));
    }

    #[test]
    fn test_uvarint_roundtrip() {
        for v in [0u64, 1, 127, 128, 300, u64::MAX / 2, u64::MAX] {
            let mut buf = Vec::new();
            put_uvarint(&mut buf, v);
            assert_eq!(take_uvarint(&buf), Some((v, buf.len())));
        }
    }

    #[test]
    fn test_uvarint_overlong() {
        // eleven continuation bytes never terminate a u64
        let overlong = [0x80u8; 11];
        assert_eq!(take_uvarint(&overlong), None);
    }
}
