//! Spot DEX - Binary Entry Point
//!
//! Runs a short in-memory session: two resting asks, a crossing bid, a
//! good-til expiry, and prints the resulting balances and state root.

use spot_dex::{Coin, GoodTil, MemDex, Order, Params, Side};
use tracing::info;

fn main() -> spot_dex::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let mut params = Params::default();
    params.price_tick_exponent = -6;
    params.quantity_step_exponent = -6;
    let mut dex = MemDex::in_memory(params)?;

    for name in ["alice", "bob"] {
        dex.accounts_mut().register(name);
    }
    dex.ledger_mut().mint("alice", &Coin::new("ubtc", 5_000))?;
    dex.ledger_mut().mint("bob", &Coin::new("uusd", 10_000))?;
    dex.advance_block(300, 1_700_000_000)?;

    let ask = |id: &str, price: &str, quantity: u128| -> spot_dex::Result<Order> {
        Ok(Order::limit("alice", id, "ubtc", "uusd", Side::Sell, price.parse()?, quantity))
    };
    dex.place_order(ask("ask-1", "375e-3", 1_000)?)?;
    dex.place_order(ask("ask-2", "38e-2", 2_000)?.with_good_til(GoodTil::height(310)))?;

    let bid = Order::limit("bob", "bid-1", "ubtc", "uusd", Side::Buy, "376e-3".parse()?, 10_000);
    let placement = dex.place_order(bid)?;
    info!(?placement, "bid placed");

    let receipt = dex.advance_block(310, 1_700_000_060)?;
    info!(
        expired = receipt.orders_expired,
        state_root = %receipt.state_root_hex(),
        "block processed"
    );

    for name in ["alice", "bob"] {
        for denom in ["ubtc", "uusd"] {
            info!(
                account = name,
                denom,
                balance = dex.ledger().balance(name, denom),
                locked = dex.ledger().locked_balance(name, denom),
                "balance"
            );
        }
    }
    for event in dex.take_events() {
        info!(?event, "event");
    }
    Ok(())
}
