//! Accumulated effects of one matching pass.
//!
//! Fund movements are keyed by account number and coalesced per
//! `(account, denom)`; zero amounts are never recorded.

use crate::types::{Coin, Order, OrderBookRecord, Trade};

/// Coin owed to or by one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountNumberCoin {
    pub account_number: u64,
    pub coin: Coin,
}

/// What one maker order exchanged during the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReduction {
    pub account_number: u64,
    pub order_id: String,
    pub order_sequence: u64,
    pub sent_coin: Coin,
    pub received_coin: Coin,
}

#[derive(Debug, Clone)]
pub struct MatchingResult {
    /// Placement request, with its assigned sequence.
    pub taker_order: Order,
    /// Taker remainder after matching.
    pub taker_record: OrderBookRecord,
    /// Matching stopped on this taker. A rounded remainder may still be left.
    pub taker_closed: bool,
    /// Taker -> maker payments.
    pub taker_sends: Vec<AccountNumberCoin>,
    /// Maker -> taker payments out of locked balances.
    pub maker_unlock_and_sends: Vec<AccountNumberCoin>,
    /// Residual locks and reserves of closed makers.
    pub maker_unlocks: Vec<AccountNumberCoin>,
    pub removed_records: Vec<OrderBookRecord>,
    /// Partially filled maker, at most one since it closes the taker.
    pub updated_record: Option<OrderBookRecord>,
    pub maker_reductions: Vec<OrderReduction>,
    pub taker_sent: Coin,
    pub taker_received: Coin,
    pub trades: Vec<Trade>,
}

impl MatchingResult {
    pub fn new(taker_order: Order, taker_record: OrderBookRecord) -> Self {
        let taker_sent = Coin::new(taker_order.spend_denom(), 0);
        let taker_received = Coin::new(taker_order.receive_denom(), 0);
        Self {
            taker_order,
            taker_record,
            taker_closed: false,
            taker_sends: Vec::new(),
            maker_unlock_and_sends: Vec::new(),
            maker_unlocks: Vec::new(),
            removed_records: Vec::new(),
            updated_record: None,
            maker_reductions: Vec::new(),
            taker_sent,
            taker_received,
            trades: Vec::new(),
        }
    }

    /// Taker pays `taker_spends` to the maker and gets `taker_receives` back.
    pub fn register_trade(&mut self, maker: &OrderBookRecord, taker_spends: Coin, taker_receives: Coin) {
        self.taker_sent.amount += taker_spends.amount;
        self.taker_received.amount += taker_receives.amount;

        match self
            .maker_reductions
            .iter_mut()
            .find(|r| r.order_sequence == maker.order_sequence)
        {
            Some(reduction) => {
                reduction.sent_coin.amount += taker_receives.amount;
                reduction.received_coin.amount += taker_spends.amount;
            }
            None => self.maker_reductions.push(OrderReduction {
                account_number: maker.account_number,
                order_id: maker.order_id.clone(),
                order_sequence: maker.order_sequence,
                sent_coin: taker_receives.clone(),
                received_coin: taker_spends.clone(),
            }),
        }

        append_or_add(&mut self.taker_sends, maker.account_number, taker_spends);
        append_or_add(&mut self.maker_unlock_and_sends, maker.account_number, taker_receives);
    }

    pub fn register_maker_unlock(&mut self, account_number: u64, coin: Coin) {
        append_or_add(&mut self.maker_unlocks, account_number, coin);
    }

    pub fn register_removed_record(&mut self, record: OrderBookRecord) {
        self.removed_records.push(record);
    }

    pub fn register_updated_record(&mut self, record: OrderBookRecord) {
        self.updated_record = Some(record);
    }

    /// Whether the taker exchanged anything.
    pub fn taker_traded(&self) -> bool {
        self.taker_sent.is_positive() || self.taker_received.is_positive()
    }
}

fn append_or_add(entries: &mut Vec<AccountNumberCoin>, account_number: u64, coin: Coin) {
    if coin.is_zero() {
        return;
    }
    match entries
        .iter_mut()
        .find(|e| e.account_number == account_number && e.coin.denom == coin.denom)
    {
        Some(entry) => entry.coin.amount += coin.amount,
        None => entries.push(AccountNumberCoin {
            account_number,
            coin,
        }),
    }
}
