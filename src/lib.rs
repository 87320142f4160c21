//! # seqbook
//!
//! Deterministic single-instrument limit order book, built to be embedded
//! inside an exchange or backtesting process.
//!
//! ## Architecture
//!
//! - **Types**: order primitives, fixed-point decimal facade, notification
//!   contract ([`types`])
//! - **OrderBook structures**: slab arena, intrusive FIFO queues, price
//!   ladders, object pools ([`orderbook`])
//! - **Engine**: price-time matching, conditional triggering, the token
//!   gate ([`engine`])
//!
//! ## Design Principles
//!
//! 1. **Determinism**: one logical producer, every operation serialised by
//!    a monotonically increasing token; identical inputs give identical
//!    books and notification streams
//! 2. **No floating point**: all math is fixed-point `u64` scaled by 10^8
//! 3. **Bounded allocation**: orders live in a pre-allocated slab arena,
//!    queues recycle through a ring pool
//! 4. **Synchronous hot path**: no async, no locks, no blocking calls
//!
//! ## Example
//!
//! ```
//! use seqbook::{OrderBook, OrderClass, Side, Flag};
//! use seqbook::testing::RecordingSink;
//! use seqbook::types::price::to_fixed;
//!
//! let mut ob = OrderBook::new(RecordingSink::new());
//!
//! let qty = to_fixed("2").unwrap();
//! let price = to_fixed("100").unwrap();
//!
//! ob.submit(1, 1, OrderClass::Limit, Side::Sell, qty, price, 0, Flag::NONE);
//! ob.submit(2, 2, OrderClass::Market, Side::Buy, qty, 0, 0, Flag::NONE);
//!
//! assert_eq!(ob.notifications().trades.len(), 1);
//! assert_eq!(ob.last_price(), price);
//! ```

pub mod engine;
pub mod orderbook;
pub mod testing;
pub mod types;

// Re-exports for convenience
pub use engine::{Options, OrderBook};
pub use orderbook::{LadderKind, OrderNode, OrderQueue, Pool, PriceLevel, TriggerQueue};
pub use types::{
    DecodeError, Flag, MsgType, NotificationHandler, Order, OrderClass, OrderNotification,
    OrderStatus, RejectReason, Side, Trade,
};
