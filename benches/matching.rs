//! Benchmarks for the spot exchange.
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark
//! cargo bench -- single_match
//! ```
//!
//! Results are saved to `target/criterion/` with HTML reports.

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use std::time::Duration;

use spot_dex::store::KvStore;
use spot_dex::{Coin, MemDex, Order, Params, Price, Side};

const BASE: &str = "ubtc";
const QUOTE: &str = "uusd";
const QUANTITY_STEP: u128 = 10_000;

// ============================================================================
// HELPER FUNCTIONS - Deterministic order generation
// ============================================================================

fn new_dex() -> MemDex {
    let mut params = Params::default();
    params.max_orders_per_denom = u64::MAX;
    let mut dex = MemDex::in_memory(params).unwrap();
    for name in ["maker", "taker"] {
        dex.accounts_mut().register(name);
        dex.ledger_mut().mint(name, &Coin::new(BASE, u64::MAX as u128)).unwrap();
        dex.ledger_mut().mint(name, &Coin::new(QUOTE, u64::MAX as u128)).unwrap();
    }
    dex
}

/// Canonical price of `ticks · 10^-6`.
fn price(mut ticks: u64) -> Price {
    let mut exponent = -6;
    while ticks % 10 == 0 {
        ticks /= 10;
        exponent += 1;
    }
    Price::new(ticks, exponent).unwrap()
}

fn limit(creator: &str, id: String, side: Side, ticks: u64, lots: u128) -> Order {
    Order::limit(creator, id, BASE, QUOTE, side, price(ticks), lots * QUANTITY_STEP)
}

/// Pre-populate the book with asks at increasing prices.
///
/// # Arguments
/// * `count` - Number of orders to add
/// * `base_ticks` - Best ask in 1e-6 ticks
/// * `step_ticks` - Price increment between levels
/// * `lots` - Quantity per order in quantity steps
fn populate_asks(dex: &mut MemDex, count: usize, base_ticks: u64, step_ticks: u64, lots: u128) {
    for i in 0..count {
        let ticks = base_ticks + i as u64 * step_ticks;
        dex.place_order(limit("maker", format!("ask-{}", i), Side::Sell, ticks, lots))
            .unwrap();
    }
}

/// Pre-populate the book with bids at decreasing prices.
fn populate_bids(dex: &mut MemDex, count: usize, base_ticks: u64, step_ticks: u64, lots: u128) {
    for i in 0..count {
        let ticks = base_ticks - i as u64 * step_ticks;
        dex.place_order(limit("maker", format!("bid-{}", i), Side::Buy, ticks, lots))
            .unwrap();
    }
}

/// Deterministic batch alternating sides around parity.
fn generate_order_batch(count: usize, seed: u64) -> Vec<Order> {
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let creator = if rng.gen_bool(0.5) { "maker" } else { "taker" };
            let ticks = rng.gen_range(950..=1050) * 1000;
            let lots = rng.gen_range(1..=100);
            limit(creator, format!("o{}", i), side, ticks, lots)
        })
        .collect()
}

// ============================================================================
// BENCHMARK: Single Match Latency
// ============================================================================

fn bench_single_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_match");
    group.measurement_time(Duration::from_secs(10));

    // Match against the best of 1,000 resting asks
    group.bench_function("against_1k_orders", |b| {
        let mut dex = new_dex();
        populate_asks(&mut dex, 1000, 1_000_000, 1000, 1);
        b.iter_batched(
            || (dex.clone(), limit("taker", "bid".into(), Side::Buy, 1_000_000, 1)),
            |(mut dex, order)| black_box(dex.place_order(order).unwrap()),
            BatchSize::LargeInput,
        );
    });

    // Sweep ten price levels
    group.bench_function("multi_level_sweep", |b| {
        let mut dex = new_dex();
        populate_asks(&mut dex, 100, 1_000_000, 1000, 1);
        b.iter_batched(
            || (dex.clone(), limit("taker", "bid".into(), Side::Buy, 1_009_000, 10)),
            |(mut dex, order)| black_box(dex.place_order(order).unwrap()),
            BatchSize::LargeInput,
        );
    });

    // Match through the reciprocal book
    group.bench_function("inverted_sweep", |b| {
        let mut dex = new_dex();
        for i in 0..100u64 {
            // bids for uusd paid in ubtc, i.e. asks for ubtc
            let order = Order::limit(
                "maker",
                format!("inv-{}", i),
                QUOTE,
                BASE,
                Side::Buy,
                price(1_000_000 - i * 10),
                100 * QUANTITY_STEP,
            );
            dex.place_order(order).unwrap();
        }
        b.iter_batched(
            || (dex.clone(), limit("taker", "bid".into(), Side::Buy, 1_010_000, 1000)),
            |(mut dex, order)| black_box(dex.place_order(order).unwrap()),
            BatchSize::LargeInput,
        );
    });

    // No match, the order rests
    group.bench_function("no_match_rest_on_book", |b| {
        let mut dex = new_dex();
        populate_asks(&mut dex, 1000, 1_000_000, 1000, 1);
        b.iter_batched(
            || (dex.clone(), limit("taker", "bid".into(), Side::Buy, 990_000, 1)),
            |(mut dex, order)| black_box(dex.place_order(order).unwrap()),
            BatchSize::LargeInput,
        );
    });

    group.finish();
}

// ============================================================================
// BENCHMARK: Order Operations
// ============================================================================

fn bench_order_operations(c: &mut Criterion) {
    let mut group = c.benchmark_group("order_operations");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("cancel_order", |b| {
        let mut dex = new_dex();
        populate_bids(&mut dex, 999, 1_000_000, 1000, 1);
        b.iter_batched(
            || dex.clone(),
            |mut dex| black_box(dex.cancel_order("maker", "bid-500").unwrap()),
            BatchSize::LargeInput,
        );
    });

    group.bench_function("get_order", |b| {
        let mut dex = new_dex();
        populate_bids(&mut dex, 999, 1_000_000, 1000, 1);
        b.iter(|| black_box(dex.get_order("maker", "bid-500").unwrap()));
    });

    group.finish();
}

// ============================================================================
// BENCHMARK: Throughput
// ============================================================================

fn bench_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("throughput");
    group.measurement_time(Duration::from_secs(15));
    group.sample_size(20);

    for batch_size in [1_000, 5_000] {
        group.throughput(Throughput::Elements(batch_size as u64));
        group.bench_with_input(BenchmarkId::new("orders", batch_size), &batch_size, |b, &size| {
            let orders = generate_order_batch(size, 42);
            b.iter_batched(
                || (new_dex(), orders.clone()),
                |(mut dex, orders)| {
                    for order in orders {
                        black_box(dex.place_order(order).unwrap());
                    }
                    dex.store().state_root()
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

// ============================================================================
// CRITERION ENTRY POINT
// ============================================================================

criterion_group!(
    benches,
    bench_single_match,
    bench_order_operations,
    bench_throughput
);

criterion_main!(benches);
