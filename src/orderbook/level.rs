//! Side-typed price ladder: an ordered index of FIFO queues.
//!
//! ## Architecture
//!
//! A `PriceLevel` aggregates one semantic role of the book (bids, asks, or
//! one of the two trigger ladders) as a `BTreeMap` from price to
//! [`OrderQueue`], plus cached aggregate volume and order count. The map
//! gives every index operation (lookup, insert, delete, min, max,
//! largest-less-than, smallest-greater-than) in O(log n).
//!
//! ## Price ordering
//!
//! | Kind | Keyed by | Best queue |
//! |------|----------|------------|
//! | `Bid` | limit price | max |
//! | `Ask` | limit price | min |
//! | `TriggerOver` | trigger price | min (nearest to fire as price rises) |
//! | `TriggerUnder` | trigger price | max (nearest to fire as price falls) |
//!
//! ## Matching
//!
//! [`process_market`](PriceLevel::process_market) and
//! [`process_limit`](PriceLevel::process_limit) drain queues from the best
//! price outward, FIFO within each queue, emitting trades through the
//! matcher context. The AoN/FoK precheck walks the matchable queues
//! first and refuses to mutate anything when the taker cannot be fully
//! satisfied.

use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::ops::Bound;

use slab::Slab;

use crate::orderbook::{OrderNode, OrderQueue, Pool};
use crate::types::{Flag, NotificationHandler, Order, OrderStatus};

// ============================================================================
// Ladder kind
// ============================================================================

/// The semantic role of a ladder, which fixes its key and sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LadderKind {
    /// Resting buy orders, best = highest price
    Bid,
    /// Resting sell orders, best = lowest price
    Ask,
    /// Conditional orders firing when the last price rises to the trigger
    TriggerOver,
    /// Conditional orders firing when the last price falls to the trigger
    TriggerUnder,
}

impl LadderKind {
    /// The price an order is indexed under on this ladder.
    #[inline]
    pub fn key(self, order: &Order) -> u64 {
        match self {
            LadderKind::Bid | LadderKind::Ask => order.price,
            LadderKind::TriggerOver | LadderKind::TriggerUnder => order.trig_price,
        }
    }

    /// True when the best queue is the maximum-priced one.
    #[inline]
    fn max_first(self) -> bool {
        matches!(self, LadderKind::Bid | LadderKind::TriggerUnder)
    }
}

// ============================================================================
// Matcher context
// ============================================================================

/// Book-wide state the drain loops mutate, split-borrowed from the book.
pub(crate) struct Matcher<'a, N: NotificationHandler> {
    /// Node arena holding every resting and parked order
    pub arena: &'a mut Slab<OrderNode>,
    /// Resting directory (order id → arena key) for the ladder being drained
    pub directory: &'a mut BTreeMap<u64, usize>,
    /// Queue recycling pool
    pub queue_pool: &'a mut Pool<OrderQueue>,
    /// Notification sink
    pub sink: &'a mut N,
    /// Book-level last trade price, updated on every fill
    pub last_price: &'a mut u64,
}

// ============================================================================
// Price ladder
// ============================================================================

/// One side of the book (or one trigger ladder).
#[derive(Debug)]
pub struct PriceLevel {
    kind: LadderKind,
    tree: BTreeMap<u64, OrderQueue>,
    volume: u64,
    num_orders: u64,
}

impl PriceLevel {
    /// Create an empty ladder for the given role.
    pub fn new(kind: LadderKind) -> Self {
        Self {
            kind,
            tree: BTreeMap::new(),
            volume: 0,
            num_orders: 0,
        }
    }

    /// Number of orders resting on this ladder
    #[inline]
    pub fn len(&self) -> u64 {
        self.num_orders
    }

    /// True when nothing rests here
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_orders == 0
    }

    /// Number of price levels (queues)
    #[inline]
    pub fn depth(&self) -> usize {
        self.tree.len()
    }

    /// Total resting quantity across all queues
    #[inline]
    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Append an order, creating its queue lazily.
    pub fn append(&mut self, key: usize, arena: &mut Slab<OrderNode>, pool: &mut Pool<OrderQueue>) {
        let price = self.kind.key(&arena[key].order);
        let qty = arena[key].order.qty;

        let queue = match self.tree.entry(price) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let mut q = pool.acquire();
                q.reset(price);
                v.insert(q)
            }
        };
        queue.append(key, arena);

        self.num_orders += 1;
        self.volume += qty;
    }

    /// Unlink an order from its queue, releasing the queue if it empties.
    ///
    /// Returns the removed order's remaining quantity.
    pub fn remove(&mut self, key: usize, arena: &mut Slab<OrderNode>, pool: &mut Pool<OrderQueue>) -> u64 {
        let price = self.kind.key(&arena[key].order);

        let Some(queue) = self.tree.get_mut(&price) else {
            debug_assert!(false, "order not indexed on this ladder");
            return 0;
        };

        let qty = queue.remove(key, arena);
        if queue.is_empty() {
            if let Some(queue) = self.tree.remove(&price) {
                pool.release(queue);
            }
        }

        self.num_orders -= 1;
        self.volume -= qty;
        qty
    }

    /// Price of the best queue for this ladder's role.
    #[inline]
    pub fn best_price(&self) -> Option<u64> {
        if self.kind.max_first() {
            self.tree.keys().next_back().copied()
        } else {
            self.tree.keys().next().copied()
        }
    }

    /// The best queue, or `None` when the ladder is empty.
    pub fn best_queue(&self) -> Option<&OrderQueue> {
        self.best_price().and_then(|p| self.tree.get(&p))
    }

    /// Price of the queue one step worse than `price`.
    pub fn next_price(&self, price: u64) -> Option<u64> {
        if self.kind.max_first() {
            self.tree.range(..price).next_back().map(|(p, _)| *p)
        } else {
            self.tree
                .range((Bound::Excluded(price), Bound::Unbounded))
                .next()
                .map(|(p, _)| *p)
        }
    }

    /// The queue at an exact price.
    #[inline]
    pub fn queue(&self, price: u64) -> Option<&OrderQueue> {
        self.tree.get(&price)
    }

    /// Arena key of the oldest order at `price`.
    #[inline]
    pub fn queue_head(&self, price: u64) -> Option<usize> {
        self.tree.get(&price).and_then(|q| q.head())
    }

    /// Iterate queues in price order, for walking and verification.
    pub(crate) fn queues(&self) -> impl Iterator<Item = &OrderQueue> {
        self.tree.values()
    }

    // ========================================================================
    // Matching drains
    // ========================================================================

    /// Drain queues from the best price outward against a market taker.
    ///
    /// Returns the processed quantity. With AoN/FoK set, either the full
    /// `qty` is processed or nothing is touched.
    pub(crate) fn process_market<N: NotificationHandler>(
        &mut self,
        m: &mut Matcher<'_, N>,
        taker_id: u64,
        qty: u64,
        flag: Flag,
    ) -> u64 {
        if flag.intersects(Flag::AON | Flag::FOK) && qty > self.volume {
            return 0;
        }

        let mut left = qty;
        while left > 0 {
            let Some(price) = self.best_price() else { break };
            left -= self.process_queue(m, price, taker_id, left);
        }

        qty - left
    }

    /// Drain queues against a limit taker while `bound_ok` accepts the
    /// queue price (buy: `price <= limit`, sell: `price >= limit`).
    ///
    /// Returns the processed quantity, subject to the same AoN/FoK
    /// all-or-nothing contract as [`process_market`](Self::process_market).
    pub(crate) fn process_limit<N, F>(
        &mut self,
        m: &mut Matcher<'_, N>,
        bound_ok: F,
        taker_id: u64,
        qty: u64,
        flag: Flag,
    ) -> u64
    where
        N: NotificationHandler,
        F: Fn(u64) -> bool,
    {
        match self.best_price() {
            Some(p) if bound_ok(p) => {}
            _ => return 0,
        }

        if flag.intersects(Flag::AON | Flag::FOK) {
            let mut available = 0u64;
            let mut cursor = self.best_price();
            while let Some(price) = cursor {
                if !bound_ok(price) {
                    break;
                }
                available = available.saturating_add(
                    self.queue(price).map(|q| q.total_qty()).unwrap_or(0),
                );
                if available >= qty {
                    break;
                }
                cursor = self.next_price(price);
            }
            if available < qty {
                return 0;
            }
        }

        let mut left = qty;
        while left > 0 {
            let Some(price) = self.best_price() else { break };
            if !bound_ok(price) {
                break;
            }
            left -= self.process_queue(m, price, taker_id, left);
        }

        qty - left
    }

    /// Drain the head of one queue against a taker quantity.
    ///
    /// Implements the three-way compare of the inner matching loop: the
    /// maker partially fills (taker done), fully fills (taker continues),
    /// or both complete. Every fill updates the last trade price and is
    /// emitted through the sink; completed makers leave the directory, the
    /// queue, and the arena.
    fn process_queue<N: NotificationHandler>(
        &mut self,
        m: &mut Matcher<'_, N>,
        price: u64,
        taker_id: u64,
        mut qty: u64,
    ) -> u64 {
        let mut processed = 0u64;

        while qty > 0 {
            let Some(queue) = self.tree.get_mut(&price) else { break };
            let Some(head_key) = queue.head() else { break };

            let maker = &mut m.arena[head_key];
            let maker_id = maker.order.id;
            let maker_qty = maker.order.qty;

            match qty.cmp(&maker_qty) {
                Ordering::Less => {
                    maker.order.qty -= qty;
                    queue.reduce(qty);
                    self.volume -= qty;

                    m.sink.put_trade(
                        maker_id,
                        taker_id,
                        OrderStatus::FilledPartial,
                        OrderStatus::FilledComplete,
                        qty,
                        price,
                    );
                    *m.last_price = price;

                    processed += qty;
                    return processed;
                }
                Ordering::Greater | Ordering::Equal => {
                    let taker_status = if qty == maker_qty {
                        OrderStatus::FilledComplete
                    } else {
                        OrderStatus::FilledPartial
                    };

                    m.directory.remove(&maker_id);
                    self.remove(head_key, m.arena, m.queue_pool);
                    m.arena.remove(head_key);

                    m.sink.put_trade(
                        maker_id,
                        taker_id,
                        OrderStatus::FilledComplete,
                        taker_status,
                        maker_qty,
                        price,
                    );
                    *m.last_price = price;

                    processed += maker_qty;
                    qty -= maker_qty;
                }
            }
        }

        processed
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;
    use crate::types::{OrderClass, Side};

    fn insert_node(arena: &mut Slab<OrderNode>, id: u64, side: Side, qty: u64, price: u64) -> usize {
        let order = Order::new(id, OrderClass::Limit, side, qty, price, 0, Flag::NONE);
        arena.insert(OrderNode::new(order))
    }

    fn insert_trig_node(arena: &mut Slab<OrderNode>, id: u64, qty: u64, price: u64, trig: u64) -> usize {
        let order = Order::new(id, OrderClass::Limit, Side::Sell, qty, price, trig, Flag::STOP_LOSS);
        arena.insert(OrderNode::new(order))
    }

    #[test]
    fn test_append_remove_bookkeeping() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(4);
        let mut ladder = PriceLevel::new(LadderKind::Bid);

        assert!(ladder.best_price().is_none());

        let k1 = insert_node(&mut arena, 1, Side::Buy, 10, 100);
        let k2 = insert_node(&mut arena, 2, Side::Buy, 20, 200);

        ladder.append(k1, &mut arena, &mut pool);
        ladder.append(k2, &mut arena, &mut pool);

        assert_eq!(ladder.depth(), 2);
        assert_eq!(ladder.len(), 2);
        assert_eq!(ladder.volume(), 30);
        assert_eq!(ladder.best_price(), Some(200));

        assert_eq!(ladder.remove(k2, &mut arena, &mut pool), 20);
        assert_eq!(ladder.depth(), 1);
        assert_eq!(ladder.len(), 1);
        assert_eq!(ladder.volume(), 10);
        assert_eq!(ladder.best_price(), Some(100));

        ladder.remove(k1, &mut arena, &mut pool);
        assert!(ladder.is_empty());
        assert_eq!(ladder.depth(), 0);
        assert_eq!(ladder.volume(), 0);
        assert!(ladder.best_price().is_none());
    }

    #[test]
    fn test_price_finding() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(16);
        let mut ladder = PriceLevel::new(LadderKind::Ask);

        for (id, price) in [(1, 130), (2, 170), (3, 100), (4, 160), (5, 140), (6, 120), (7, 150), (8, 110)] {
            let k = insert_node(&mut arena, id, Side::Sell, 5, price);
            ladder.append(k, &mut arena, &mut pool);
        }

        assert_eq!(ladder.volume(), 40);
        assert_eq!(ladder.best_price(), Some(100));

        // ask ladder walks upward
        assert_eq!(ladder.next_price(100), Some(110));
        assert_eq!(ladder.next_price(150), Some(160));
        assert_eq!(ladder.next_price(170), None);
    }

    #[test]
    fn test_bid_walks_downward() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut ladder = PriceLevel::new(LadderKind::Bid);

        for (id, price) in [(1, 50), (2, 90), (3, 70)] {
            let k = insert_node(&mut arena, id, Side::Buy, 2, price);
            ladder.append(k, &mut arena, &mut pool);
        }

        assert_eq!(ladder.best_price(), Some(90));
        assert_eq!(ladder.next_price(90), Some(70));
        assert_eq!(ladder.next_price(70), Some(50));
        assert_eq!(ladder.next_price(50), None);
    }

    #[test]
    fn test_trigger_ladder_keyed_by_trigger_price() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut over = PriceLevel::new(LadderKind::TriggerOver);
        let mut under = PriceLevel::new(LadderKind::TriggerUnder);

        let k1 = insert_trig_node(&mut arena, 1, 5, 10, 130);
        let k2 = insert_trig_node(&mut arena, 2, 5, 20, 110);
        over.append(k1, &mut arena, &mut pool);
        over.append(k2, &mut arena, &mut pool);

        // nearest-to-fire for trigger-over is the smallest trigger
        assert_eq!(over.best_price(), Some(110));

        let k3 = insert_trig_node(&mut arena, 3, 5, 10, 80);
        let k4 = insert_trig_node(&mut arena, 4, 5, 20, 95);
        under.append(k3, &mut arena, &mut pool);
        under.append(k4, &mut arena, &mut pool);

        // nearest-to-fire for trigger-under is the largest trigger
        assert_eq!(under.best_price(), Some(95));
    }

    #[test]
    fn test_market_drain_sweeps_best_first() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut asks = PriceLevel::new(LadderKind::Ask);
        let mut directory = BTreeMap::new();
        let mut sink = RecordingSink::default();
        let mut last_price = 0u64;

        for (id, qty, price) in [(1, 2, 100), (2, 2, 110), (3, 2, 120)] {
            let k = insert_node(&mut arena, id, Side::Sell, qty, price);
            asks.append(k, &mut arena, &mut pool);
            directory.insert(id, k);
        }

        let processed = {
            let mut m = Matcher {
                arena: &mut arena,
                directory: &mut directory,
                queue_pool: &mut pool,
                sink: &mut sink,
                last_price: &mut last_price,
            };
            asks.process_market(&mut m, 900, 3, Flag::NONE)
        };

        assert_eq!(processed, 3);
        assert_eq!(last_price, 110);
        assert_eq!(asks.volume(), 3);
        assert_eq!(asks.depth(), 2);
        assert_eq!(directory.len(), 2);

        let trades = &sink.trades;
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].maker_order_id, 1);
        assert_eq!(trades[0].price, 100);
        assert_eq!(trades[0].qty, 2);
        assert_eq!(trades[0].maker_status, OrderStatus::FilledComplete);
        assert_eq!(trades[1].maker_order_id, 2);
        assert_eq!(trades[1].price, 110);
        assert_eq!(trades[1].qty, 1);
        assert_eq!(trades[1].maker_status, OrderStatus::FilledPartial);
        assert_eq!(trades[1].taker_status, OrderStatus::FilledComplete);
    }

    #[test]
    fn test_limit_drain_respects_bound() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut asks = PriceLevel::new(LadderKind::Ask);
        let mut directory = BTreeMap::new();
        let mut sink = RecordingSink::default();
        let mut last_price = 0u64;

        for (id, price) in [(1, 100), (2, 110), (3, 120)] {
            let k = insert_node(&mut arena, id, Side::Sell, 2, price);
            asks.append(k, &mut arena, &mut pool);
            directory.insert(id, k);
        }

        let processed = {
            let mut m = Matcher {
                arena: &mut arena,
                directory: &mut directory,
                queue_pool: &mut pool,
                sink: &mut sink,
                last_price: &mut last_price,
            };
            asks.process_limit(&mut m, |p| p <= 110, 900, 10, Flag::NONE)
        };

        // only the 100 and 110 levels are matchable
        assert_eq!(processed, 4);
        assert_eq!(asks.depth(), 1);
        assert_eq!(asks.best_price(), Some(120));
        assert_eq!(last_price, 110);
    }

    #[test]
    fn test_fok_precheck_refuses_partial() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut asks = PriceLevel::new(LadderKind::Ask);
        let mut directory = BTreeMap::new();
        let mut sink = RecordingSink::default();
        let mut last_price = 0u64;

        for (id, price) in [(1, 100), (2, 110)] {
            let k = insert_node(&mut arena, id, Side::Sell, 2, price);
            asks.append(k, &mut arena, &mut pool);
            directory.insert(id, k);
        }

        let processed = {
            let mut m = Matcher {
                arena: &mut arena,
                directory: &mut directory,
                queue_pool: &mut pool,
                sink: &mut sink,
                last_price: &mut last_price,
            };
            // 4 available under the bound, 5 wanted
            asks.process_limit(&mut m, |p| p <= 110, 900, 5, Flag::FOK)
        };

        assert_eq!(processed, 0);
        assert!(sink.trades.is_empty());
        assert_eq!(asks.volume(), 4);
        assert_eq!(last_price, 0);
    }

    #[test]
    fn test_fok_precheck_spans_multiple_queues() {
        let mut arena = Slab::new();
        let mut pool = Pool::with_capacity(8);
        let mut asks = PriceLevel::new(LadderKind::Ask);
        let mut directory = BTreeMap::new();
        let mut sink = RecordingSink::default();
        let mut last_price = 0u64;

        for (id, price) in [(1, 100), (2, 110), (3, 120)] {
            let k = insert_node(&mut arena, id, Side::Sell, 2, price);
            asks.append(k, &mut arena, &mut pool);
            directory.insert(id, k);
        }

        // needs two queues; the precheck must iterate past the best one
        let processed = {
            let mut m = Matcher {
                arena: &mut arena,
                directory: &mut directory,
                queue_pool: &mut pool,
                sink: &mut sink,
                last_price: &mut last_price,
            };
            asks.process_limit(&mut m, |p| p <= 120, 900, 6, Flag::FOK)
        };

        assert_eq!(processed, 6);
        assert!(asks.is_empty());
        assert_eq!(sink.trades.len(), 3);
    }
}
