//! Matching engine module.
//!
//! ## Design Principles
//!
//! 1. **Determinism**: the token gate serialises every mutation; the same
//!    call sequence always produces the same book and the same
//!    notification stream
//! 2. **Fixed-point math**: no floating point anywhere in matching
//! 3. **Synchronous execution**: no async, no blocking, no internal yields
//! 4. **Price-time priority**: best price first, FIFO within a price
//!
//! ## Matching rules
//!
//! - Buy orders match against asks (lowest price first)
//! - Sell orders match against bids (highest price first)
//! - Trades execute at the maker's price
//! - Unfilled limit residuals rest on the book (unless IoC/FoK)
//! - Stop-loss / take-profit orders park on trigger ladders and re-enter
//!   the matching core when the last trade price reaches their trigger

pub mod book;

pub use book::{Options, OrderBook};
