//! Demo binary: smoke-runs the book and reports throughput.
//!
//! Drives a bounded price walk of limit orders against a book with a
//! discarding sink, the same shape of load the benchmarks use, and prints
//! a short summary.

use std::time::Instant;

use seqbook::testing::NullSink;
use seqbook::types::price::{from_fixed, to_fixed};
use seqbook::{Flag, Options, OrderBook, OrderClass, Side};

const OPS: u64 = 1_000_000;

fn main() {
    let mut ob = OrderBook::with_options(
        NullSink,
        Options {
            order_capacity: 1 << 20,
            queue_capacity: 1 << 10,
            ..Options::default()
        },
    );

    let lower = to_fixed("50").unwrap();
    let upper = to_fixed("100").unwrap();
    let step = to_fixed("0.25").unwrap();
    let qty = to_fixed("10").unwrap();

    let mut bid = (lower + upper) / 2;
    let mut rising = true;

    let mut tok = 0u64;
    let mut id = 0u64;

    println!("seqbook throughput demo: {} operations", OPS);
    let start = Instant::now();

    while tok < OPS {
        if rising {
            bid += step;
            if bid + step >= upper {
                rising = false;
            }
        } else {
            bid -= step;
            if bid - step <= lower {
                rising = true;
            }
        }

        tok += 1;
        id += 1;
        ob.submit(tok, id, OrderClass::Limit, Side::Buy, qty, bid, 0, Flag::NONE);

        tok += 1;
        id += 1;
        ob.submit(tok, id, OrderClass::Limit, Side::Sell, qty, bid + step, 0, Flag::NONE);

        // retire the oldest pair to keep the book bounded
        if id > 100 {
            tok += 1;
            ob.cancel(tok, id - 100);
            tok += 1;
            ob.cancel(tok, id - 99);
        }
    }

    let elapsed = start.elapsed();
    let rate = tok as f64 / elapsed.as_secs_f64();

    println!("  elapsed:        {:.2?}", elapsed);
    println!("  throughput:     {:.0} ops/sec", rate);
    println!("  resting orders: {}", ob.order_count());
    println!("  bid depth:      {}", ob.bids().depth());
    println!("  ask depth:      {}", ob.asks().depth());
    println!("  last price:     {}", from_fixed(ob.last_price()));
}
