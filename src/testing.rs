//! Notification sinks for tests, benchmarks, and examples.

use crate::types::{
    MsgType, NotificationHandler, OrderNotification, OrderStatus, RejectReason, Trade,
};

/// Sink that discards everything. Useful for benchmarks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationHandler for NullSink {
    fn put_order(&mut self, _: MsgType, _: OrderStatus, _: u64, _: u64, _: Option<RejectReason>) {}

    fn put_trade(&mut self, _: u64, _: u64, _: OrderStatus, _: OrderStatus, _: u64, _: u64) {}
}

/// Sink that records every notification in order of arrival.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// Order notifications, oldest first
    pub orders: Vec<OrderNotification>,
    /// Trades, oldest first
    pub trades: Vec<Trade>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far.
    pub fn clear(&mut self) {
        self.orders.clear();
        self.trades.clear();
    }

    /// Sum of recorded trade quantities.
    pub fn qty_processed(&self) -> u64 {
        self.trades.iter().map(|t| t.qty).sum()
    }

    /// First rejection reason recorded, if any.
    pub fn first_reject(&self) -> Option<RejectReason> {
        self.orders.iter().find_map(|n| n.reason)
    }
}

impl NotificationHandler for RecordingSink {
    fn put_order(
        &mut self,
        msg_type: MsgType,
        status: OrderStatus,
        order_id: u64,
        qty: u64,
        reason: Option<RejectReason>,
    ) {
        self.orders.push(OrderNotification {
            msg_type,
            status,
            order_id,
            qty,
            reason,
        });
    }

    fn put_trade(
        &mut self,
        maker_order_id: u64,
        taker_order_id: u64,
        maker_status: OrderStatus,
        taker_status: OrderStatus,
        qty: u64,
        price: u64,
    ) {
        self.trades.push(Trade {
            maker_order_id,
            taker_order_id,
            maker_status,
            taker_status,
            qty,
            price,
        });
    }
}
