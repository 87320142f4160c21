//! Core data types for the order book.
//!
//! All quantities and prices use fixed-point representation (`u64` scaled
//! by 10^8, see [`price`]). The enums carry frozen integer values because
//! they participate in the binary wire format.
//!
//! ## Types
//!
//! - [`Order`]: the order primitive, with its binary encoding
//! - [`Side`], [`OrderClass`], [`Flag`]: order attributes
//! - [`OrderStatus`], [`MsgType`], [`RejectReason`]: notification vocabulary
//! - [`OrderNotification`], [`Trade`], [`NotificationHandler`]: the sink contract

mod notification;
mod order;
pub mod price;

// Re-export all types at module level
pub use notification::{
    MsgType, NotificationHandler, OrderNotification, OrderStatus, RejectReason, Trade,
};
pub use order::{DecodeError, Flag, Order, OrderClass, Side};
