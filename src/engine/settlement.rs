//! All-or-nothing application of a placement or a cancellation.
//!
//! ## Transaction Model
//!
//! ```text
//! CacheStore (store writes)   ─┐
//! Settlement (ledger batch,    ├─ commit: ledger.execute, then store write
//!   scheduler undo log,        │  abort:  drop cache, undo scheduler ops
//!   pending events)           ─┘
//! ```
//!
//! Store mutations go to the caller's [`CacheStore`](crate::store::CacheStore),
//! fund movements to one [`LedgerActions`] batch, scheduler calls are
//! executed at once but logged so they can be reverted. Events are only
//! returned after the ledger accepted the batch.

use std::collections::HashMap;

use crate::engine::MatchingResult;
use crate::error::{DexError, Result};
use crate::host::{
    AccountCoin, AccountDirectory, Deadline, GoodTilScheduler, GoodTilTask, Ledger, LedgerActions,
    TaskHandle, Transfer,
};
use crate::orderbook::OrderBookStore;
use crate::store::KvStore;
use crate::types::{Coin, Event, GoodTil, Order, OrderBookRecord, OrderData, Params};

/// Deadlines of a good-til, height first.
pub(crate) fn deadlines(good_til: &GoodTil) -> Vec<Deadline> {
    let mut out = Vec::with_capacity(2);
    if let Some(height) = good_til.block_height {
        out.push(Deadline::Height(height));
    }
    if let Some(time) = good_til.block_time {
        out.push(Deadline::Time(time));
    }
    out
}

enum SchedulerUndo {
    Unschedule(TaskHandle),
    Reschedule(GoodTilTask, Deadline),
}

/// Effects of one state transition, pending commit.
pub struct Settlement<'h, A: AccountDirectory + ?Sized, G: GoodTilScheduler + ?Sized> {
    accounts: &'h A,
    scheduler: &'h mut G,
    addresses: HashMap<u64, String>,
    actions: LedgerActions,
    undo: Vec<SchedulerUndo>,
    events: Vec<Event>,
}

impl<'h, A: AccountDirectory + ?Sized, G: GoodTilScheduler + ?Sized> Settlement<'h, A, G> {
    pub fn new(accounts: &'h A, scheduler: &'h mut G) -> Self {
        Self {
            accounts,
            scheduler,
            addresses: HashMap::new(),
            actions: LedgerActions::default(),
            undo: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Build the transition with `build`, then execute the ledger batch.
    ///
    /// On any error the scheduler operations are reverted and the error is
    /// returned; the caller drops its store cache. On success the pending
    /// events are returned for emission after the store commit.
    pub fn run<L, F>(accounts: &'h A, scheduler: &'h mut G, ledger: &mut L, build: F) -> Result<Vec<Event>>
    where
        L: Ledger + ?Sized,
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let mut settlement = Self::new(accounts, scheduler);
        if let Err(err) = build(&mut settlement) {
            settlement.rollback();
            return Err(err);
        }
        settlement.commit(ledger)
    }

    fn commit<L: Ledger + ?Sized>(self, ledger: &mut L) -> Result<Vec<Event>> {
        if !self.actions.is_empty() {
            if let Err(err) = ledger.execute(&self.actions) {
                tracing::warn!(error = %err, "ledger rejected the settlement");
                self.rollback();
                return Err(err.into());
            }
        }
        tracing::debug!(
            sends = self.actions.sends.len(),
            unlock_and_sends = self.actions.unlock_and_sends.len(),
            unlocks = self.actions.unlocks.len(),
            locks = self.actions.locks.len(),
            "settlement committed"
        );
        Ok(self.events)
    }

    fn rollback(mut self) {
        while let Some(op) = self.undo.pop() {
            match op {
                SchedulerUndo::Unschedule(handle) => self.scheduler.cancel(&handle),
                SchedulerUndo::Reschedule(task, deadline) => {
                    if let Err(err) = self.scheduler.schedule(task, deadline) {
                        tracing::error!(error = %err, "failed to restore good til task");
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Building blocks
    // ------------------------------------------------------------------------

    /// Address of an account number, cached for the batch.
    pub fn address_of(&mut self, account_number: u64) -> Result<String> {
        if let Some(address) = self.addresses.get(&account_number) {
            return Ok(address.clone());
        }
        let address = self.accounts.address_of(account_number)?;
        self.addresses.insert(account_number, address.clone());
        Ok(address)
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn send(&mut self, from: &str, to: &str, coin: Coin) {
        push_transfer(&mut self.actions.sends, from, to, coin);
    }

    pub fn unlock_and_send(&mut self, from: &str, to: &str, coin: Coin) {
        push_transfer(&mut self.actions.unlock_and_sends, from, to, coin);
    }

    pub fn unlock(&mut self, address: &str, coin: Coin) {
        push_account_coin(&mut self.actions.unlocks, address, coin);
    }

    pub fn lock(&mut self, address: &str, coin: Coin) {
        push_account_coin(&mut self.actions.locks, address, coin);
    }

    fn schedule_good_til(&mut self, creator: &str, order_sequence: u64, good_til: &GoodTil) -> Result<()> {
        for deadline in deadlines(good_til) {
            let task = GoodTilTask {
                order_sequence,
                creator: creator.to_string(),
            };
            let handle = self.scheduler.schedule(task, deadline)?;
            self.undo.push(SchedulerUndo::Unschedule(handle));
        }
        Ok(())
    }

    fn cancel_good_til(&mut self, creator: &str, order_sequence: u64, good_til: &GoodTil) {
        for deadline in deadlines(good_til) {
            let handle = TaskHandle {
                deadline,
                order_sequence,
            };
            self.scheduler.cancel(&handle);
            self.undo.push(SchedulerUndo::Reschedule(
                GoodTilTask {
                    order_sequence,
                    creator: creator.to_string(),
                },
                deadline,
            ));
        }
    }

    // ------------------------------------------------------------------------
    // Resting orders
    // ------------------------------------------------------------------------

    /// Delete a resting order with its index entries and counters.
    ///
    /// Fund unlocks are the caller's concern. Returns the stored order data.
    pub fn remove_resting_order<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        record: &OrderBookRecord,
    ) -> Result<OrderData> {
        let data = store.get_order_data(record.order_sequence)?.ok_or_else(|| {
            DexError::invalid_state(format!("order data of {} not found", record.order_sequence))
        })?;
        let price = record.price.as_ref().ok_or_else(|| {
            DexError::invalid_state(format!("resting order {} has no price", record.order_sequence))
        })?;
        let book = store.get_order_book_data(record.order_book_id)?;

        store.remove_order_book_record(record.order_book_id, record.side, price, record.order_sequence);
        store.remove_order_data(record.order_sequence);
        store.remove_order_id(record.account_number, &record.order_id)?;
        store.decrement_orders_count(record.account_number, &book.base_denom()?)?;
        store.decrement_orders_count(record.account_number, &book.quote_denom()?)?;

        let creator = self.address_of(record.account_number)?;
        if let Some(good_til) = data.good_til() {
            self.cancel_good_til(&creator, record.order_sequence, &good_til);
        }

        self.emit(Event::OrderClosed {
            creator,
            id: record.order_id.clone(),
            sequence: record.order_sequence,
            remaining_base_quantity: record.remaining_base_quantity,
            remaining_spendable_balance: record.remaining_spendable_balance,
        });
        Ok(data)
    }

    /// Store the taker remainder as a resting order and lock its funds.
    pub fn create_resting_order<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        params: &Params,
        order: &Order,
        record: &OrderBookRecord,
    ) -> Result<()> {
        let price = order
            .price
            .as_ref()
            .ok_or_else(|| DexError::invalid_input("only limit orders can rest"))?;
        let reserve = params.reserve();

        self.lock(&order.creator, Coin::new(order.spend_denom(), record.remaining_spendable_balance));
        if let Some(reserve) = reserve {
            self.lock(&order.creator, reserve.clone());
        }

        store.save_order_book_record(record)?;
        store.save_order_data(
            record.order_sequence,
            &OrderData::new(
                &order.id,
                record.account_number,
                record.order_book_id,
                order.side,
                price,
                order.quantity,
                order.good_til,
                reserve,
            )?,
        )?;
        store.save_order_id(record.account_number, &order.id, record.order_sequence)?;
        store.increment_orders_count(
            record.account_number,
            &order.base_denom,
            params.max_orders_per_denom,
        )?;
        store.increment_orders_count(
            record.account_number,
            &order.quote_denom,
            params.max_orders_per_denom,
        )?;

        if let Some(good_til) = &order.good_til {
            self.schedule_good_til(&order.creator, record.order_sequence, good_til)?;
        }

        self.emit(Event::OrderCreated {
            creator: order.creator.clone(),
            id: order.id.clone(),
            sequence: record.order_sequence,
            remaining_base_quantity: record.remaining_base_quantity,
            remaining_spendable_balance: record.remaining_spendable_balance,
        });
        tracing::debug!(record = %record, "resting order created");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Matching result
    // ------------------------------------------------------------------------

    /// Fund movements, maker record changes and reduction events of a pass.
    pub fn apply_matching_result<S: KvStore + ?Sized>(
        &mut self,
        store: &mut S,
        result: &MatchingResult,
    ) -> Result<()> {
        let taker = result.taker_order.creator.clone();

        for entry in &result.taker_sends {
            let maker = self.address_of(entry.account_number)?;
            self.send(&taker, &maker, entry.coin.clone());
        }
        for entry in &result.maker_unlock_and_sends {
            let maker = self.address_of(entry.account_number)?;
            self.unlock_and_send(&maker, &taker, entry.coin.clone());
        }
        for entry in &result.maker_unlocks {
            let maker = self.address_of(entry.account_number)?;
            self.unlock(&maker, entry.coin.clone());
        }

        for reduction in &result.maker_reductions {
            let creator = self.address_of(reduction.account_number)?;
            self.emit(Event::OrderReduced {
                creator,
                id: reduction.order_id.clone(),
                sequence: reduction.order_sequence,
                sent_coin: reduction.sent_coin.clone(),
                received_coin: reduction.received_coin.clone(),
            });
        }
        if result.taker_sent.is_positive() {
            self.emit(Event::OrderReduced {
                creator: taker.clone(),
                id: result.taker_order.id.clone(),
                sequence: result.taker_record.order_sequence,
                sent_coin: result.taker_sent.clone(),
                received_coin: result.taker_received.clone(),
            });
        }

        for record in &result.removed_records {
            self.remove_resting_order(store, record)?;
        }
        if let Some(record) = &result.updated_record {
            store.save_order_book_record(record)?;
        }
        Ok(())
    }
}

fn push_transfer(entries: &mut Vec<Transfer>, from: &str, to: &str, coin: Coin) {
    if coin.is_zero() {
        return;
    }
    match entries
        .iter_mut()
        .find(|t| t.from == from && t.to == to && t.coin.denom == coin.denom)
    {
        Some(transfer) => transfer.coin.amount += coin.amount,
        None => entries.push(Transfer {
            from: from.to_string(),
            to: to.to_string(),
            coin,
        }),
    }
}

fn push_account_coin(entries: &mut Vec<AccountCoin>, address: &str, coin: Coin) {
    if coin.is_zero() {
        return;
    }
    match entries
        .iter_mut()
        .find(|e| e.address == address && e.coin.denom == coin.denom)
    {
        Some(entry) => entry.coin.amount += coin.amount,
        None => entries.push(AccountCoin {
            address: address.to_string(),
            coin,
        }),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
