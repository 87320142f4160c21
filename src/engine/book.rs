//! The order book engine: sequencing gate, matching core, conditional
//! order triggering, and the public API.
//!
//! ## Determinism
//!
//! Every public operation takes a caller-supplied token that must advance
//! the book's counter by exactly one. A gap or repeat means the caller has
//! lost the operation sequence, the audit trail is unrecoverable, and the
//! book aborts. This is the sole concurrency contract: one logical
//! producer, every mutation serialised behind the token.
//!
//! ## Data flow
//!
//! `submit` validates, then either parks a conditional order on a trigger
//! ladder or hands the order to the matching core. Matching walks the
//! opposite ladder best-price-first, FIFO within each price, emitting a
//! trade per fill and moving the last trade price. Whenever the last price
//! moves, both trigger ladders are swept and newly eligible orders are
//! re-fed through the same matching path, which may cascade.

use std::collections::BTreeMap;

use slab::Slab;

use crate::orderbook::{LadderKind, Matcher, OrderNode, OrderQueue, Pool, PriceLevel, TriggerQueue};
use crate::types::price::SCALE;
use crate::types::{
    Flag, MsgType, NotificationHandler, Order, OrderClass, OrderStatus, RejectReason, Side,
};

// ============================================================================
// Construction options
// ============================================================================

/// Construction-time knobs for an [`OrderBook`].
#[derive(Debug, Clone)]
pub struct Options {
    /// When false, any order that would cross the book is rejected with
    /// `NoMatching`. Resting orders are still accepted.
    pub matching: bool,
    /// Pre-allocated slots in the order node arena.
    pub order_capacity: usize,
    /// Capacity of the queue recycling pool (rounded up to a power of two).
    pub queue_capacity: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            matching: true,
            order_capacity: 1024,
            queue_capacity: 256,
        }
    }
}

// ============================================================================
// Order book
// ============================================================================

/// A single-instrument limit order book with deterministic price-time
/// matching and stop-loss / take-profit triggering.
///
/// The book owns all of its state; the notification sink `N` receives
/// every order state change and trade synchronously.
///
/// ## Example
///
/// ```
/// use seqbook::{OrderBook, OrderClass, Side, Flag};
/// use seqbook::testing::RecordingSink;
///
/// let mut ob = OrderBook::new(RecordingSink::new());
///
/// // sell 2 @ 100, then buy 1 @ 100
/// ob.submit(1, 10, OrderClass::Limit, Side::Sell, 200_000_000, 10_000_000_000, 0, Flag::NONE);
/// ob.submit(2, 11, OrderClass::Limit, Side::Buy, 100_000_000, 10_000_000_000, 0, Flag::NONE);
///
/// assert_eq!(ob.notifications().trades.len(), 1);
/// assert_eq!(ob.last_price(), 10_000_000_000);
/// ```
#[derive(Debug)]
pub struct OrderBook<N: NotificationHandler> {
    arena: Slab<OrderNode>,
    queue_pool: Pool<OrderQueue>,

    bids: PriceLevel,
    asks: PriceLevel,
    trigger_over: PriceLevel,
    trigger_under: PriceLevel,

    orders: BTreeMap<u64, usize>,
    trig_orders: BTreeMap<u64, usize>,
    trig_queue: TriggerQueue,

    notifications: N,

    last_price: u64,
    last_token: u64,
    matching: bool,
}

impl<N: NotificationHandler> OrderBook<N> {
    /// Create a book with default [`Options`].
    pub fn new(notifications: N) -> Self {
        Self::with_options(notifications, Options::default())
    }

    /// Create a book with explicit options.
    pub fn with_options(notifications: N, opts: Options) -> Self {
        tracing::debug!(
            order_capacity = opts.order_capacity,
            queue_capacity = opts.queue_capacity,
            matching = opts.matching,
            "creating order book"
        );

        Self {
            arena: Slab::with_capacity(opts.order_capacity),
            queue_pool: Pool::with_capacity(opts.queue_capacity),
            bids: PriceLevel::new(LadderKind::Bid),
            asks: PriceLevel::new(LadderKind::Ask),
            trigger_over: PriceLevel::new(LadderKind::TriggerOver),
            trigger_under: PriceLevel::new(LadderKind::TriggerUnder),
            orders: BTreeMap::new(),
            trig_orders: BTreeMap::new(),
            trig_queue: TriggerQueue::new(),
            notifications,
            last_price: 0,
            last_token: 0,
            matching: opts.matching,
        }
    }

    // ========================================================================
    // Sequencing gate
    // ========================================================================

    /// Tokens must form the sequence 1, 2, 3, … across every gated call.
    /// Anything else is caller-side corruption and aborts the process.
    fn gate(&mut self, token: u64) {
        if self.last_token.wrapping_add(1) != token {
            panic!("invalid token {token}: cannot maintain determinism");
        }
        self.last_token = token;
    }

    fn reject(&mut self, msg_type: MsgType, id: u64, qty: u64, reason: RejectReason) {
        tracing::trace!(id, %reason, "rejected");

        let status = match msg_type {
            MsgType::Submit => OrderStatus::Rejected,
            MsgType::Cancel => OrderStatus::CancelRejected,
        };
        self.notifications
            .put_order(msg_type, status, id, qty, Some(reason));
    }

    // ========================================================================
    // Submit
    // ========================================================================

    /// Place a new order.
    ///
    /// All outcomes are reported through the notification sink: a
    /// rejection, or an accept followed by zero or more trades. Any
    /// residual of a plain limit order rests on its side of the book.
    #[allow(clippy::too_many_arguments)]
    pub fn submit(
        &mut self,
        token: u64,
        id: u64,
        class: OrderClass,
        side: Side,
        qty: u64,
        price: u64,
        trig_price: u64,
        flag: Flag,
    ) {
        self.gate(token);

        if qty == 0 {
            self.reject(MsgType::Submit, id, qty, RejectReason::InvalidQuantity);
            return;
        }

        if !self.matching && self.would_cross(class, side, price) {
            self.reject(MsgType::Submit, id, qty, RejectReason::NoMatching);
            return;
        }

        if flag.intersects(Flag::STOP_LOSS | Flag::TAKE_PROFIT) {
            if trig_price == 0 {
                self.reject(MsgType::Submit, id, qty, RejectReason::InvalidTrigger);
                return;
            }

            self.notifications
                .put_order(MsgType::Submit, OrderStatus::Accepted, id, qty, None);
            self.place_trigger(id, class, side, qty, price, trig_price, flag);
            return;
        }

        if class != OrderClass::Market {
            if self.orders.contains_key(&id) {
                self.reject(MsgType::Submit, id, 0, RejectReason::OrderExists);
                return;
            }
            if price == 0 {
                self.reject(MsgType::Submit, id, 0, RejectReason::InvalidPrice);
                return;
            }
        }

        self.notifications
            .put_order(MsgType::Submit, OrderStatus::Accepted, id, qty, None);
        self.process(id, class, side, qty, price, flag);
    }

    /// With matching disabled, market orders and crossing limit orders are
    /// turned away.
    fn would_cross(&self, class: OrderClass, side: Side, price: u64) -> bool {
        match class {
            OrderClass::Market => true,
            OrderClass::Limit => match side {
                Side::Buy => self.asks.best_price().is_some_and(|p| p <= price),
                Side::Sell => self.bids.best_price().is_some_and(|p| p >= price),
            },
        }
    }

    // ========================================================================
    // Conditional order placement
    // ========================================================================

    /// Park a stop/take order, or execute it straight away when its
    /// trigger condition already holds:
    ///
    /// | Flag | Side | Fires now when | Else parks on |
    /// |------|------|----------------|---------------|
    /// | stop-loss | buy | `trig ≤ last` | trigger-over |
    /// | stop-loss | sell | `last ≤ trig` | trigger-under |
    /// | take-profit | buy | `last ≤ trig` | trigger-under |
    /// | take-profit | sell | `trig ≤ last` | trigger-over |
    #[allow(clippy::too_many_arguments)]
    fn place_trigger(
        &mut self,
        id: u64,
        class: OrderClass,
        side: Side,
        qty: u64,
        price: u64,
        trig_price: u64,
        flag: Flag,
    ) {
        let fires = if flag.contains(Flag::STOP_LOSS) {
            match side {
                Side::Buy => trig_price <= self.last_price,
                Side::Sell => self.last_price <= trig_price,
            }
        } else {
            match side {
                Side::Buy => self.last_price <= trig_price,
                Side::Sell => trig_price <= self.last_price,
            }
        };

        if fires {
            self.process(id, class, side, qty, price, flag);
            return;
        }

        let order = Order::new(id, class, side, qty, price, trig_price, flag);
        let key = self.arena.insert(OrderNode::new(order));

        let ladder = if flag.contains(Flag::STOP_LOSS) == (side == Side::Buy) {
            &mut self.trigger_over
        } else {
            &mut self.trigger_under
        };
        ladder.append(key, &mut self.arena, &mut self.queue_pool);

        self.trig_orders.insert(id, key);
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// Run one order through the matching core, rest any limit residual,
    /// and release newly eligible conditional orders if the last price
    /// moved.
    fn process(&mut self, id: u64, class: OrderClass, side: Side, qty: u64, price: u64, flag: Flag) {
        let prev_last = self.last_price;

        match class {
            OrderClass::Market => {
                let Self {
                    arena,
                    queue_pool,
                    bids,
                    asks,
                    orders,
                    notifications,
                    last_price,
                    ..
                } = self;
                let mut m = Matcher {
                    arena,
                    directory: orders,
                    queue_pool,
                    sink: notifications,
                    last_price,
                };

                match side {
                    Side::Buy => asks.process_market(&mut m, id, qty, flag),
                    Side::Sell => bids.process_market(&mut m, id, qty, flag),
                };
            }
            OrderClass::Limit => {
                let processed = {
                    let Self {
                        arena,
                        queue_pool,
                        bids,
                        asks,
                        orders,
                        notifications,
                        last_price,
                        ..
                    } = self;
                    let mut m = Matcher {
                        arena,
                        directory: orders,
                        queue_pool,
                        sink: notifications,
                        last_price,
                    };

                    match side {
                        Side::Buy => asks.process_limit(&mut m, |p| p <= price, id, qty, flag),
                        Side::Sell => bids.process_limit(&mut m, |p| p >= price, id, qty, flag),
                    }
                };

                // IoC discards the residual; FoK either filled fully or
                // matched nothing. Everything else rests.
                if !flag.intersects(Flag::IOC | Flag::FOK) {
                    let left = qty - processed;
                    if left > 0 {
                        let order = Order::new(id, class, side, left, price, 0, flag);
                        let key = self.arena.insert(OrderNode::new(order));
                        match side {
                            Side::Buy => {
                                self.bids.append(key, &mut self.arena, &mut self.queue_pool)
                            }
                            Side::Sell => {
                                self.asks.append(key, &mut self.arena, &mut self.queue_pool)
                            }
                        }
                        self.orders.insert(id, key);
                    }
                }
            }
        }

        if self.last_price != prev_last {
            self.queue_triggered();
            self.drain_triggered();
        }
    }

    // ========================================================================
    // Trigger release
    // ========================================================================

    /// Move every conditional order whose trigger the last price has
    /// reached onto the staging queue. Trigger-over drains before
    /// trigger-under, each from the nearest-to-fire queue outward, FIFO
    /// within a price.
    fn queue_triggered(&mut self) {
        if self.last_price == 0 {
            return;
        }
        let last_price = self.last_price;

        let Self {
            arena,
            queue_pool,
            trigger_over,
            trigger_under,
            trig_orders,
            trig_queue,
            ..
        } = self;

        while let Some(price) = trigger_over.best_price() {
            if price > last_price {
                break;
            }
            while let Some(key) = trigger_over.queue_head(price) {
                trig_orders.remove(&arena[key].order.id);
                trigger_over.remove(key, arena, queue_pool);
                trig_queue.push(key, arena);
            }
        }

        while let Some(price) = trigger_under.best_price() {
            if price < last_price {
                break;
            }
            while let Some(key) = trigger_under.queue_head(price) {
                trig_orders.remove(&arena[key].order.id);
                trigger_under.remove(key, arena, queue_pool);
                trig_queue.push(key, arena);
            }
        }

        if !trig_queue.is_empty() {
            tracing::trace!(staged = trig_queue.len(), last_price, "conditional orders triggered");
        }
    }

    /// Re-feed staged orders through the matching core. Execution can move
    /// the last price again and stage further orders; the loop drains
    /// until the book is quiet.
    fn drain_triggered(&mut self) {
        while let Some(key) = self.trig_queue.pop(&mut self.arena) {
            let order = self.arena.remove(key).order;
            self.process(
                order.id,
                order.class,
                order.side,
                order.qty,
                order.price,
                order.flag,
            );
        }
    }

    // ========================================================================
    // Cancel
    // ========================================================================

    /// Cancel a resting or parked order by id.
    pub fn cancel(&mut self, token: u64, id: u64) {
        self.gate(token);

        if let Some(key) = self.orders.remove(&id) {
            let side = self.arena[key].order.side;
            {
                let Self {
                    arena,
                    queue_pool,
                    bids,
                    asks,
                    ..
                } = self;
                let ladder = match side {
                    Side::Buy => bids,
                    Side::Sell => asks,
                };
                ladder.remove(key, arena, queue_pool);
            }

            let order = self.arena.remove(key).order;
            self.notifications
                .put_order(MsgType::Cancel, OrderStatus::Canceled, id, order.qty, None);
            return;
        }

        if let Some(key) = self.trig_orders.remove(&id) {
            let (side, flag) = {
                let order = &self.arena[key].order;
                (order.side, order.flag)
            };
            {
                let Self {
                    arena,
                    queue_pool,
                    trigger_over,
                    trigger_under,
                    ..
                } = self;
                let ladder = if flag.contains(Flag::STOP_LOSS) == (side == Side::Buy) {
                    trigger_over
                } else {
                    trigger_under
                };
                ladder.remove(key, arena, queue_pool);
            }

            let order = self.arena.remove(key).order;
            self.notifications
                .put_order(MsgType::Cancel, OrderStatus::Canceled, id, order.qty, None);
            return;
        }

        self.reject(MsgType::Cancel, id, 0, RejectReason::NotFound);
    }

    // ========================================================================
    // Read-only access
    // ========================================================================

    /// Look up a resting or parked order by id.
    pub fn order(&self, id: u64) -> Option<&Order> {
        let key = self.orders.get(&id).or_else(|| self.trig_orders.get(&id))?;
        self.arena.get(*key).map(|node| &node.order)
    }

    /// The best (highest-priced) resting buy order. Advances the token.
    pub fn best_bid(&mut self, token: u64) -> Option<Order> {
        self.gate(token);
        let key = self.bids.best_price().and_then(|p| self.bids.queue_head(p))?;
        Some(self.arena[key].order)
    }

    /// The best (lowest-priced) resting sell order. Advances the token.
    pub fn best_ask(&mut self, token: u64) -> Option<Order> {
        self.gate(token);
        let key = self.asks.best_price().and_then(|p| self.asks.queue_head(p))?;
        Some(self.arena[key].order)
    }

    /// Quote the notional cost of taking `qty` from the opposite side at
    /// market, without touching the book.
    ///
    /// Returns `InsufficientQuantity` when the resting depth cannot cover
    /// the requested quantity.
    pub fn market_price(&self, side: Side, qty: u64) -> Result<u64, RejectReason> {
        let ladder = match side {
            Side::Buy => &self.asks,
            Side::Sell => &self.bids,
        };

        let mut left = u128::from(qty);
        let mut notional = 0u128;
        let mut cursor = ladder.best_price();

        while left > 0 {
            let Some(price) = cursor else {
                return Err(RejectReason::InsufficientQuantity);
            };
            let level_qty = u128::from(ladder.queue(price).map(|q| q.total_qty()).unwrap_or(0));

            let take = left.min(level_qty);
            notional += take * u128::from(price);
            left -= take;
            cursor = ladder.next_price(price);
        }

        Ok(u64::try_from(notional / u128::from(SCALE)).unwrap_or(u64::MAX))
    }

    /// Price of the most recent trade, zero before the first fill.
    pub fn last_price(&self) -> u64 {
        self.last_price
    }

    /// The bid ladder.
    pub fn bids(&self) -> &PriceLevel {
        &self.bids
    }

    /// The ask ladder.
    pub fn asks(&self) -> &PriceLevel {
        &self.asks
    }

    /// The ladder of conditionals waiting for the price to rise.
    pub fn trigger_over(&self) -> &PriceLevel {
        &self.trigger_over
    }

    /// The ladder of conditionals waiting for the price to fall.
    pub fn trigger_under(&self) -> &PriceLevel {
        &self.trigger_under
    }

    /// Number of resting (non-conditional) orders.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Number of parked conditional orders.
    pub fn trigger_count(&self) -> usize {
        self.trig_orders.len()
    }

    /// The notification sink.
    pub fn notifications(&self) -> &N {
        &self.notifications
    }

    /// Mutable access to the notification sink.
    pub fn notifications_mut(&mut self) -> &mut N {
        &mut self.notifications
    }

    /// Enable or disable matching. While disabled, crossing orders are
    /// rejected with `NoMatching`.
    pub fn set_matching(&mut self, enabled: bool) {
        self.matching = enabled;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
