//! Notification contract between the book and its host process.
//!
//! The book never returns results from `submit`/`cancel`; every order state
//! change and every fill is pushed synchronously into a caller-provided
//! [`NotificationHandler`]. The handler must not block: a bounded queue
//! write or an in-memory append is the expected implementation.
//!
//! Rejections travel as [`RejectReason`] values inside the order
//! notification; they are per-order and leave book state untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Status enums
// ============================================================================

/// Lifecycle status of an order, as reported through notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OrderStatus {
    /// Submission was rejected
    Rejected = 0,
    /// Order was cancelled by request
    Canceled = 1,
    /// Order traded but has remaining quantity
    FilledPartial = 2,
    /// Order traded its full quantity
    FilledComplete = 3,
    /// Cancellation was rejected
    CancelRejected = 4,
    /// Submission passed validation
    Accepted = 5,
}

/// The API call a notification refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MsgType {
    /// A `submit` call
    Submit = 0,
    /// A `cancel` call
    Cancel = 1,
}

// ============================================================================
// Rejection taxonomy
// ============================================================================

/// Per-order rejection reasons.
///
/// These are reported through the sink, never thrown; the only fatal
/// condition in the book is a token-sequence violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum RejectReason {
    /// Quantity is zero
    #[error("invalid order quantity")]
    InvalidQuantity,

    /// Limit price is zero
    #[error("invalid order price")]
    InvalidPrice,

    /// Stop/take order with zero trigger price
    #[error("invalid trigger price")]
    InvalidTrigger,

    /// Id collides with a resting order
    #[error("order already exists")]
    OrderExists,

    /// Cancel of an unknown id
    #[error("order does not exist")]
    NotFound,

    /// Matching is disabled and the order would cross
    #[error("matching disabled")]
    NoMatching,

    /// Market-price quote exhausted the book
    #[error("insufficient quantity to calculate price")]
    InsufficientQuantity,
}

// ============================================================================
// Notification payloads
// ============================================================================

/// An order state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNotification {
    /// Which call produced this notification
    pub msg_type: MsgType,
    /// Resulting status
    pub status: OrderStatus,
    /// Order the notification refers to
    pub order_id: u64,
    /// Quantity context (submitted, remaining, or zero; fixed-point 10^8)
    pub qty: u64,
    /// Rejection reason, when status is a rejection
    pub reason: Option<RejectReason>,
}

/// A single fill between a resting maker and an incoming taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// The resting order
    pub maker_order_id: u64,
    /// The incoming order
    pub taker_order_id: u64,
    /// Maker status after this fill
    pub maker_status: OrderStatus,
    /// Taker status after this fill
    pub taker_status: OrderStatus,
    /// Executed quantity (fixed-point, 10^8)
    pub qty: u64,
    /// Execution price, always the maker's price (fixed-point, 10^8)
    pub price: u64,
}

// ============================================================================
// Handler trait
// ============================================================================

/// Synchronous, non-blocking sink for book events.
///
/// Both methods are invoked from inside `submit`/`cancel`; the taker's own
/// accept notification always precedes its trade notifications, and trades
/// arrive in match order.
pub trait NotificationHandler {
    /// Deliver an order state change.
    fn put_order(
        &mut self,
        msg_type: MsgType,
        status: OrderStatus,
        order_id: u64,
        qty: u64,
        reason: Option<RejectReason>,
    );

    /// Deliver a fill.
    fn put_trade(
        &mut self,
        maker_order_id: u64,
        taker_order_id: u64,
        maker_status: OrderStatus,
        taker_status: OrderStatus,
        qty: u64,
        price: u64,
    );
}

// ============================================================================
// Unit Tests
// ============================================================================
