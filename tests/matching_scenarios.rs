//! End-to-end placement scenarios against the in-memory exchange.
//!
//! ```bash
//! cargo test --test matching_scenarios
//! ```

use spot_dex::store::KvStore;
use spot_dex::{
    Coin, ErrorKind, Event, GoodTil, MemDex, Order, Params, PlacementState, Side, TimeInForce,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

const BASE: &str = "ubtc";
const QUOTE: &str = "uusd";

/// Grid fine enough that every test price and quantity is admissible.
fn permissive_params() -> Params {
    let mut params = Params::default();
    params.price_tick_exponent = -20;
    params.quantity_step_exponent = -20;
    params
}

fn dex_with(params: Params, accounts: &[(&str, u128, u128)]) -> MemDex {
    let mut dex = MemDex::in_memory(params).unwrap();
    for (name, base, quote) in accounts {
        dex.accounts_mut().register(*name);
        dex.ledger_mut().mint(name, &Coin::new(BASE, *base)).unwrap();
        dex.ledger_mut().mint(name, &Coin::new(QUOTE, *quote)).unwrap();
    }
    dex
}

fn dex(accounts: &[(&str, u128, u128)]) -> MemDex {
    dex_with(permissive_params(), accounts)
}

fn limit(creator: &str, id: &str, side: Side, price: &str, quantity: u128) -> Order {
    Order::limit(creator, id, BASE, QUOTE, side, price.parse().unwrap(), quantity)
}

fn market(creator: &str, id: &str, side: Side, quantity: u128) -> Order {
    Order::market(creator, id, BASE, QUOTE, side, quantity)
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_partial_fill_rests_remainder() {
    let mut dex = dex(&[("alice", 1000, 0), ("bob", 0, 10_000)]);

    let ask = dex.place_order(limit("alice", "ask", Side::Sell, "375e-3", 1000)).unwrap();
    assert_eq!(ask.state, PlacementState::Resting);

    let bid = dex.place_order(limit("bob", "bid", Side::Buy, "376e-3", 10_000)).unwrap();
    assert_eq!(bid.state, PlacementState::Resting);
    assert_eq!(bid.trades, 1);
    assert_eq!(bid.remaining_base_quantity, 9000);
    assert_eq!(bid.remaining_spendable_balance, 3385);

    // the ask closed, the bid rests with its remainder locked
    assert_eq!(dex.get_order("alice", "ask").unwrap_err().kind(), ErrorKind::NotFound);
    let resting = dex.get_order("bob", "bid").unwrap();
    assert_eq!(resting.remaining_base_quantity, 9000);
    assert_eq!(resting.remaining_spendable_balance, 3385);

    let ledger = dex.ledger();
    assert_eq!(ledger.balance("alice", QUOTE), 375);
    assert_eq!(ledger.balance("alice", BASE), 0);
    assert_eq!(ledger.locked_balance("alice", BASE), 0);
    assert_eq!(ledger.balance("bob", BASE), 1000);
    assert_eq!(ledger.balance("bob", QUOTE), 10_000 - 375);
    assert_eq!(ledger.locked_balance("bob", QUOTE), 3385);
}

#[test]
fn test_inverted_book_wins_with_better_price() {
    let mut dex = dex(&[("alice", 100, 0), ("bob", 100, 0), ("carol", 0, 60)]);

    // alice asks 0.5 uusd per ubtc
    dex.place_order(limit("alice", "ask", Side::Sell, "5e-1", 100)).unwrap();
    // bob pays 2.5 ubtc per uusd on the reciprocal pair, i.e. asks 0.4 uusd per ubtc
    let reciprocal = Order::limit("bob", "bid", QUOTE, BASE, Side::Buy, "25e-1".parse().unwrap(), 40);
    assert_eq!(dex.place_order(reciprocal).unwrap().state, PlacementState::Resting);
    assert_eq!(dex.ledger().locked_balance("bob", BASE), 100);

    let taker = dex.place_order(limit("carol", "buy", Side::Buy, "6e-1", 100)).unwrap();
    assert_eq!(taker.state, PlacementState::Filled);
    assert_eq!(taker.trades, 1);

    // carol paid 0.4 per ubtc to bob, alice was not touched
    assert_eq!(dex.ledger().balance("carol", BASE), 100);
    assert_eq!(dex.ledger().balance("carol", QUOTE), 20);
    assert_eq!(dex.ledger().balance("bob", QUOTE), 40);
    assert_eq!(dex.ledger().locked_balance("bob", BASE), 0);
    assert!(dex.get_order("bob", "bid").unwrap_err().is_not_found());
    assert_eq!(dex.get_order("alice", "ask").unwrap().remaining_base_quantity, 100);
}

#[test]
fn test_equal_price_fills_in_sequence_order() {
    let mut dex = dex(&[("alice", 100, 0), ("bob", 100, 0), ("carol", 0, 1000)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    dex.place_order(limit("bob", "b", Side::Sell, "1", 100)).unwrap();
    dex.take_events();

    let taker = dex.place_order(limit("carol", "c", Side::Buy, "1", 150)).unwrap();
    assert_eq!(taker.state, PlacementState::Filled);
    assert_eq!(taker.trades, 2);

    assert!(dex.get_order("alice", "a").unwrap_err().is_not_found());
    assert_eq!(dex.get_order("bob", "b").unwrap().remaining_base_quantity, 50);
    assert_eq!(dex.ledger().balance("alice", QUOTE), 100);
    assert_eq!(dex.ledger().balance("bob", QUOTE), 50);

    let reduced: Vec<String> = dex
        .take_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::OrderReduced { creator, .. } => Some(creator),
            _ => None,
        })
        .collect();
    assert_eq!(reduced, vec!["alice", "bob", "carol"]);
}

#[test]
fn test_good_til_height_expires_and_refunds() {
    let mut dex = dex(&[("alice", 100, 0)]);
    dex.advance_block(310, 1_000).unwrap();
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100).with_good_til(GoodTil::height(343)))
        .unwrap();
    assert_eq!(dex.ledger().locked_balance("alice", BASE), 100);

    let receipt = dex.advance_block(342, 1_100).unwrap();
    assert_eq!(receipt.orders_expired, 0);
    assert!(dex.get_order("alice", "a").is_ok());

    let receipt = dex.advance_block(343, 1_200).unwrap();
    assert_eq!(receipt.orders_expired, 1);
    assert!(dex.get_order("alice", "a").unwrap_err().is_not_found());
    assert_eq!(dex.ledger().locked_balance("alice", BASE), 0);
    assert_eq!(dex.ledger().balance("alice", BASE), 100);
    assert!(dex.scheduler().is_empty());
    assert!(matches!(dex.take_events().last(), Some(Event::OrderClosed { .. })));
}

#[test]
fn test_good_til_time_and_height_fire_once() {
    let mut dex = dex(&[("alice", 100, 0)]);
    dex.advance_block(10, 1_000).unwrap();
    let good_til = GoodTil {
        block_height: Some(20),
        block_time: Some(1_050),
    };
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100).with_good_til(good_til))
        .unwrap();
    assert_eq!(dex.scheduler().len(), 2);

    // time fires first, the height deadline is cancelled with the order
    let receipt = dex.advance_block(11, 1_050).unwrap();
    assert_eq!(receipt.orders_expired, 1);
    assert!(dex.scheduler().is_empty());
    assert_eq!(dex.advance_block(20, 1_100).unwrap().orders_expired, 0);
}

#[test]
fn test_filled_maker_cancels_good_til() {
    let mut dex = dex(&[("alice", 100, 0), ("bob", 0, 100)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100).with_good_til(GoodTil::height(50)))
        .unwrap();
    dex.place_order(limit("bob", "b", Side::Buy, "1", 100)).unwrap();
    assert!(dex.scheduler().is_empty());
    assert_eq!(dex.advance_block(50, 1).unwrap().orders_expired, 0);
}

#[test]
fn test_cancel_twice_is_not_found() {
    let mut dex = dex(&[("alice", 100, 0), ("bob", 0, 100)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    dex.cancel_order("alice", "a").unwrap();
    assert_eq!(dex.ledger().locked_balance("alice", BASE), 0);

    let err = dex.cancel_order("alice", "a").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(dex.ledger().balance("alice", BASE), 100);

    // a filled order is gone as well
    dex.place_order(limit("alice", "a2", Side::Sell, "1", 100)).unwrap();
    dex.place_order(limit("bob", "b", Side::Buy, "1", 100)).unwrap();
    assert!(dex.cancel_order("alice", "a2").unwrap_err().is_not_found());
}

#[test]
fn test_fill_or_kill() {
    let mut dex = dex(&[("alice", 100, 0), ("carol", 0, 1000)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    let root = dex.store().state_root();

    let killed = dex
        .place_order(limit("carol", "c1", Side::Buy, "1", 150).with_time_in_force(TimeInForce::Fok))
        .unwrap();
    assert_eq!(killed.state, PlacementState::Dropped);
    assert_eq!(killed.trades, 0);
    assert_eq!(dex.get_order("alice", "a").unwrap().remaining_base_quantity, 100);
    assert_eq!(dex.ledger().balance("carol", QUOTE), 1000);
    // only the sequence counter moved
    assert_ne!(dex.store().state_root(), root);

    let filled = dex
        .place_order(limit("carol", "c2", Side::Buy, "1", 100).with_time_in_force(TimeInForce::Fok))
        .unwrap();
    assert_eq!(filled.state, PlacementState::Filled);
    assert_eq!(filled.sequence, killed.sequence + 1);
    assert_eq!(dex.ledger().balance("carol", BASE), 100);
}

#[test]
fn test_immediate_or_cancel_drops_remainder() {
    let mut dex = dex(&[("alice", 100, 0), ("carol", 0, 1000)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();

    let ioc = dex
        .place_order(limit("carol", "c", Side::Buy, "1", 150).with_time_in_force(TimeInForce::Ioc))
        .unwrap();
    assert_eq!(ioc.state, PlacementState::Dropped);
    assert_eq!(ioc.remaining_base_quantity, 50);
    assert!(dex.get_order("carol", "c").unwrap_err().is_not_found());
    assert_eq!(dex.ledger().balance("carol", QUOTE), 900);
    assert_eq!(dex.ledger().locked_balance("carol", QUOTE), 0);
}

/// Alice bids 100 at 3.5; 3.5 = 7/2 so trades are clamped to even quantities.
fn dex_with_even_clamped_bid() -> MemDex {
    let mut dex = dex(&[("alice", 0, 350), ("bob", 5, 0)]);
    dex.place_order(limit("alice", "a", Side::Buy, "35e-1", 100)).unwrap();
    dex
}

#[test]
fn test_fill_or_kill_with_rounded_remainder_is_dropped() {
    let mut dex = dex_with_even_clamped_bid();

    // only 4 of 5 could execute at 3.5
    let placement = dex
        .place_order(limit("bob", "b", Side::Sell, "3", 5).with_time_in_force(TimeInForce::Fok))
        .unwrap();
    assert_eq!(placement.state, PlacementState::Dropped);
    assert_eq!(placement.trades, 0);
    assert_eq!(placement.remaining_base_quantity, 5);

    assert_eq!(dex.ledger().balance("bob", BASE), 5);
    assert_eq!(dex.ledger().balance("bob", QUOTE), 0);
    let maker = dex.get_order("alice", "a").unwrap();
    assert_eq!(maker.remaining_base_quantity, 100);
    assert_eq!(dex.ledger().locked_balance("alice", QUOTE), 350);
}

#[test]
fn test_rounded_remainder_rests_when_executable() {
    let mut dex = dex_with_even_clamped_bid();

    let placement = dex.place_order(limit("bob", "b", Side::Sell, "3", 5)).unwrap();
    assert_eq!(placement.state, PlacementState::Resting);
    assert_eq!(placement.trades, 1);
    assert_eq!(placement.remaining_base_quantity, 1);

    // 4 sold at 3.5, the last unit rests at 3
    assert_eq!(dex.ledger().balance("bob", QUOTE), 14);
    assert_eq!(dex.ledger().balance("bob", BASE), 1);
    assert_eq!(dex.ledger().locked_balance("bob", BASE), 1);
    let resting = dex.get_order("bob", "b").unwrap();
    assert_eq!(resting.remaining_base_quantity, 1);
    assert_eq!(resting.remaining_spendable_balance, 1);

    let maker = dex.get_order("alice", "a").unwrap();
    assert_eq!(maker.remaining_base_quantity, 96);
    assert_eq!(maker.remaining_spendable_balance, 336);
}

#[test]
fn test_taker_too_small_for_maker_price() {
    let mut dex = dex(&[("alice", 1000, 0), ("carol", 0, 100)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1e-3", 1000)).unwrap();
    dex.take_events();

    // 5 at 0.001 rounds down to nothing
    let fok = dex
        .place_order(limit("carol", "c1", Side::Buy, "1e-3", 5).with_time_in_force(TimeInForce::Fok))
        .unwrap();
    assert_eq!(fok.state, PlacementState::Dropped);
    assert_eq!(fok.trades, 0);

    let gtc = dex.place_order(limit("carol", "c2", Side::Buy, "1e-3", 5)).unwrap();
    assert_eq!(gtc.state, PlacementState::Dropped);
    assert_eq!(gtc.trades, 0);
    assert_eq!(gtc.remaining_base_quantity, 5);
    assert!(dex.get_order("carol", "c2").unwrap_err().is_not_found());

    assert_eq!(dex.ledger().balance("carol", QUOTE), 100);
    assert_eq!(dex.ledger().locked_balance("carol", QUOTE), 0);
    let maker = dex.get_order("alice", "a").unwrap();
    assert_eq!(maker.remaining_base_quantity, 1000);
    assert_eq!(maker.remaining_spendable_balance, 1000);
    assert!(!dex
        .take_events()
        .iter()
        .any(|event| matches!(event, Event::OrderReduced { .. })));
}

#[test]
fn test_market_buy_bounded_by_balance() {
    let mut dex = dex(&[("alice", 100, 0), ("carol", 0, 150)]);
    dex.place_order(limit("alice", "a", Side::Sell, "2", 100)).unwrap();

    let placement = dex.place_order(market("carol", "c", Side::Buy, 100)).unwrap();
    assert_eq!(placement.state, PlacementState::Filled);
    assert_eq!(dex.ledger().balance("carol", BASE), 75);
    assert_eq!(dex.ledger().balance("carol", QUOTE), 0);

    let maker = dex.get_order("alice", "a").unwrap();
    assert_eq!(maker.remaining_base_quantity, 25);
    assert_eq!(maker.remaining_spendable_balance, 25);
    assert_eq!(dex.ledger().locked_balance("alice", BASE), 25);
}

#[test]
fn test_market_sell_against_bids() {
    let mut dex = dex(&[("bob", 0, 200), ("carol", 1000, 0)]);
    dex.place_order(limit("bob", "b", Side::Buy, "2", 100)).unwrap();

    let placement = dex.place_order(market("carol", "c", Side::Sell, 60)).unwrap();
    assert_eq!(placement.state, PlacementState::Filled);
    assert_eq!(dex.ledger().balance("carol", QUOTE), 120);
    assert_eq!(dex.ledger().balance("carol", BASE), 940);
    assert_eq!(dex.get_order("bob", "b").unwrap().remaining_base_quantity, 40);

    // nothing left to match, the remainder is dropped
    let empty = dex.place_order(market("carol", "c2", Side::Buy, 10)).unwrap();
    assert_eq!(empty.state, PlacementState::Dropped);
    assert_eq!(empty.trades, 0);
}

#[test]
fn test_ledger_failure_aborts_placement() {
    let mut dex = dex(&[("alice", 200, 0), ("dave", 0, 10)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    dex.take_events();
    let root = dex.store().state_root();

    let err = dex.place_order(limit("dave", "d", Side::Buy, "1", 100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);

    assert_eq!(dex.store().state_root(), root);
    assert!(dex.take_events().is_empty());
    assert_eq!(dex.get_order("alice", "a").unwrap().remaining_base_quantity, 100);
    assert_eq!(dex.ledger().balance("dave", QUOTE), 10);

    // the failed placement consumed no sequence
    let next = dex.place_order(limit("alice", "a2", Side::Sell, "2", 10)).unwrap();
    assert_eq!(next.sequence, 2);
}

#[test]
fn test_failed_lock_leaves_no_record_or_task() {
    let mut dex = dex(&[("dave", 0, 10)]);
    let order = limit("dave", "d", Side::Buy, "1", 100).with_good_til(GoodTil::height(5));
    assert_eq!(dex.place_order(order).unwrap_err().kind(), ErrorKind::Capability);
    assert!(dex.scheduler().is_empty());
    assert!(dex.orders_of("dave").unwrap().is_empty());
}

#[test]
fn test_duplicate_order_id_rejected() {
    let mut dex = dex(&[("alice", 1000, 0), ("bob", 1000, 0)]);
    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    let err = dex.place_order(limit("alice", "a", Side::Sell, "2", 100)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    // IDs are scoped per creator
    dex.place_order(limit("bob", "a", Side::Sell, "1", 100)).unwrap();
}

#[test]
fn test_max_orders_per_denom() {
    let mut params = permissive_params();
    params.max_orders_per_denom = 2;
    let mut dex = dex_with(params, &[("alice", 1000, 0)]);
    dex.place_order(limit("alice", "a1", Side::Sell, "1", 100)).unwrap();
    dex.place_order(limit("alice", "a2", Side::Sell, "2", 100)).unwrap();
    let err = dex.place_order(limit("alice", "a3", Side::Sell, "3", 100)).unwrap_err();
    assert!(matches!(err, spot_dex::DexError::TooManyOrders { max: 2, .. }));

    dex.cancel_order("alice", "a1").unwrap();
    dex.place_order(limit("alice", "a3", Side::Sell, "3", 100)).unwrap();
}

#[test]
fn test_reserve_locked_while_resting() {
    let mut params = permissive_params();
    params.order_reserve = Some(Coin::new("ucore", 10));
    let mut dex = dex_with(params, &[("alice", 100, 0), ("bob", 0, 100)]);
    dex.ledger_mut().mint("alice", &Coin::new("ucore", 10)).unwrap();

    dex.place_order(limit("alice", "a", Side::Sell, "1", 100)).unwrap();
    assert_eq!(dex.ledger().locked_balance("alice", "ucore"), 10);
    assert_eq!(dex.get_order("alice", "a").unwrap().reserve, Some(Coin::new("ucore", 10)));

    // a second resting order cannot cover its reserve
    dex.ledger_mut().mint("alice", &Coin::new(BASE, 10)).unwrap();
    let err = dex.place_order(limit("alice", "a2", Side::Sell, "1", 10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capability);

    // filling the maker returns the reserve
    dex.place_order(limit("bob", "b", Side::Buy, "1", 100)).unwrap();
    assert_eq!(dex.ledger().locked_balance("alice", "ucore"), 0);
    assert_eq!(dex.ledger().balance("alice", "ucore"), 10);
}

#[test]
fn test_off_grid_price_and_quantity_rejected() {
    let mut dex = dex_with(Params::default(), &[("alice", 1_000_000, 0)]);
    // default grid: tick 1e-6, step 1e4
    let err = dex.place_order(limit("alice", "a", Side::Sell, "1234567e-12", 10_000)).unwrap_err();
    assert!(matches!(err, spot_dex::DexError::PriceTick { .. }));
    let err = dex.place_order(limit("alice", "a", Side::Sell, "1", 10_001)).unwrap_err();
    assert!(matches!(err, spot_dex::DexError::QuantityStep { .. }));
    assert!(dex.place_order(limit("alice", "a", Side::Sell, "1", 20_000)).is_ok());
}

#[test]
fn test_conservation_across_trades() {
    let mut dex = dex(&[("alice", 10_000, 10_000), ("bob", 10_000, 10_000), ("carol", 10_000, 10_000)]);
    dex.place_order(limit("alice", "a1", Side::Sell, "13e-1", 700)).unwrap();
    dex.place_order(limit("bob", "b1", Side::Sell, "127e-2", 900)).unwrap();
    dex.place_order(limit("alice", "a2", Side::Buy, "11e-1", 500)).unwrap();
    dex.place_order(limit("carol", "c1", Side::Buy, "131e-2", 1200)).unwrap();
    dex.place_order(market("bob", "b2", Side::Sell, 300)).unwrap();
    dex.place_order(Order::limit("carol", "c2", QUOTE, BASE, Side::Buy, "1".parse().unwrap(), 400))
        .unwrap();

    assert_eq!(dex.ledger().supply(BASE), 30_000);
    assert_eq!(dex.ledger().supply(QUOTE), 30_000);

    // every lock is backed by a resting order
    let mut locked_base = 0;
    let mut locked_quote = 0;
    for side in [Side::Buy, Side::Sell] {
        for order in dex.order_book_orders(BASE, QUOTE, side).unwrap() {
            match side {
                Side::Buy => locked_quote += order.remaining_spendable_balance,
                Side::Sell => locked_base += order.remaining_spendable_balance,
            }
        }
        for order in dex.order_book_orders(QUOTE, BASE, side).unwrap() {
            match side {
                Side::Buy => locked_base += order.remaining_spendable_balance,
                Side::Sell => locked_quote += order.remaining_spendable_balance,
            }
        }
    }
    assert_eq!(dex.ledger().locked_supply(BASE), locked_base);
    assert_eq!(dex.ledger().locked_supply(QUOTE), locked_quote);
}
