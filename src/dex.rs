//! Exchange facade: placement, cancellation, queries and block processing.
//!
//! ## Placement
//!
//! ```text
//! validate ─> grid ─> duplicate check ─> book ids ─> initial balance
//!    ─> sequence ─> match ─> (rest | drop) ─> settle ─> commit ─> events
//! ```
//!
//! Every placement runs on a [`CacheStore`] over the committed store. The
//! cache is written back only after the ledger accepted the fund
//! movements; any error before that leaves store, ledger and scheduler
//! untouched.
//!
//! ## Example
//!
//! ```
//! use spot_dex::dex::{MemDex, PlacementState};
//! use spot_dex::types::{Coin, Order, Params, Side};
//!
//! let mut params = Params::default();
//! params.price_tick_exponent = -20;
//! params.quantity_step_exponent = -20;
//! let mut dex = MemDex::in_memory(params).unwrap();
//! dex.accounts_mut().register("alice");
//! dex.accounts_mut().register("bob");
//! dex.ledger_mut().mint("alice", &Coin::new("ubtc", 1000)).unwrap();
//! dex.ledger_mut().mint("bob", &Coin::new("uusd", 3760)).unwrap();
//!
//! let ask = Order::limit("alice", "ask", "ubtc", "uusd", Side::Sell, "375e-3".parse().unwrap(), 1000);
//! assert_eq!(dex.place_order(ask).unwrap().state, PlacementState::Resting);
//!
//! let bid = Order::limit("bob", "bid", "ubtc", "uusd", Side::Buy, "376e-3".parse().unwrap(), 10000);
//! let placement = dex.place_order(bid).unwrap();
//! assert_eq!(placement.state, PlacementState::Resting);
//! assert_eq!(placement.remaining_base_quantity, 9000);
//! assert_eq!(placement.remaining_spendable_balance, 3385);
//! ```

use crate::engine::{is_executable_as_maker, MatchingEngine, Settlement};
use crate::error::{DexError, ErrorKind, Result};
use crate::host::{
    AccountDirectory, DelayQueue, EventSink, GoodTilScheduler, Ledger, MemAccounts, MemLedger,
};
use crate::orderbook::{OrderBookStore, PriceGrid};
use crate::store::{CacheStore, KvStore, MemStore};
use crate::types::{
    BlockInfo, BlockReceipt, Coin, Event, Order, OrderBookInfo, OrderBookRecord, OrderType, Params,
    Side, TimeInForce,
};

/// What happened to the taker of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementState {
    /// The taker's quantity, or the balance it could spend, is used up.
    Filled,
    /// The remainder was stored as a resting order.
    Resting,
    /// The remainder was discarded (IOC, market, unexecutable dust, or a
    /// FOK that could not fill).
    Dropped,
}

/// Outcome of [`Dex::place_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub sequence: u64,
    pub state: PlacementState,
    pub remaining_base_quantity: u128,
    pub remaining_spendable_balance: u128,
    pub trades: usize,
}

/// Spot exchange over a store and the host capabilities.
#[derive(Debug, Clone)]
pub struct Dex<S, L, A, G, E> {
    store: S,
    params: Params,
    block: BlockInfo,
    ledger: L,
    accounts: A,
    scheduler: G,
    events: E,
}

/// Fully in-memory exchange.
pub type MemDex = Dex<MemStore, MemLedger, MemAccounts, DelayQueue, Vec<Event>>;

impl MemDex {
    pub fn in_memory(params: Params) -> Result<Self> {
        Dex::new(
            MemStore::new(),
            params,
            MemLedger::new(),
            MemAccounts::new(),
            DelayQueue::new(),
            Vec::new(),
        )
    }

    /// Drain the emitted events.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

impl<S, L, A, G, E> Dex<S, L, A, G, E>
where
    S: KvStore,
    L: Ledger,
    A: AccountDirectory,
    G: GoodTilScheduler,
    E: EventSink,
{
    pub fn new(store: S, params: Params, ledger: L, accounts: A, scheduler: G, events: E) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            store,
            params,
            block: BlockInfo::default(),
            ledger,
            accounts,
            scheduler,
            events,
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn block(&self) -> BlockInfo {
        self.block
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn accounts(&self) -> &A {
        &self.accounts
    }

    pub fn accounts_mut(&mut self) -> &mut A {
        &mut self.accounts
    }

    pub fn scheduler(&self) -> &G {
        &self.scheduler
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Grid of a pair under the current params.
    pub fn price_grid(&self, base_denom: &str, quote_denom: &str) -> Result<PriceGrid> {
        PriceGrid::for_pair(&self.params, base_denom, quote_denom)
    }

    // ========================================================================
    // Placement
    // ========================================================================

    /// Validate, match and settle a new order.
    pub fn place_order(&mut self, mut order: Order) -> Result<Placement> {
        order.validate()?;
        self.validate_good_til(&order)?;
        let account_number = self.accounts.account_number_of(&order.creator)?;
        self.price_grid(&order.base_denom, &order.quote_denom)?
            .validate_order(&order)?;

        let Self {
            store,
            params,
            ledger,
            accounts,
            scheduler,
            events,
            ..
        } = self;

        let mut cache = CacheStore::new(&*store);
        if cache.get_order_sequence(account_number, &order.id)?.is_some() {
            return Err(DexError::DuplicateOrderId {
                account: order.creator.clone(),
                id: order.id.clone(),
            });
        }
        let (order_book_id, inverted_order_book_id) =
            cache.get_or_create_order_book_ids(&order.base_denom, &order.quote_denom)?;
        let initial_balance = initial_remaining_balance(&*ledger, &order)?;
        let sequence = cache.next_order_sequence()?;
        order.sequence = sequence;

        let taker_record = OrderBookRecord {
            order_book_id,
            side: order.side,
            price: order.price,
            order_sequence: sequence,
            order_id: order.id.clone(),
            account_number,
            remaining_base_quantity: order.quantity,
            remaining_spendable_balance: initial_balance,
        };

        let result = MatchingEngine::new(&cache).match_order(inverted_order_book_id, &order, taker_record)?;

        let placed = Event::OrderPlaced {
            creator: order.creator.clone(),
            id: order.id.clone(),
            sequence,
        };

        let remainder = &result.taker_record;
        let filled =
            remainder.remaining_base_quantity == 0 || remainder.remaining_spendable_balance == 0;

        if order.time_in_force == TimeInForce::Fok && remainder.remaining_base_quantity > 0 {
            // keep the consumed sequence and the book registration only
            let batch = cache.into_writes();
            store.write(batch);
            events.emit(placed);
            tracing::info!(
                creator = %order.creator,
                id = %order.id,
                sequence,
                "fill or kill order could not be filled"
            );
            return Ok(Placement {
                sequence,
                state: PlacementState::Dropped,
                remaining_base_quantity: order.quantity,
                remaining_spendable_balance: initial_balance,
                trades: 0,
            });
        }

        let rests = order.order_type == OrderType::Limit
            && order.time_in_force == TimeInForce::Gtc
            && !filled
            && is_executable_as_maker(remainder)?;

        let params: &Params = params;
        let emitted = Settlement::run(&*accounts, &mut *scheduler, &mut *ledger, |settlement| {
            settlement.emit(placed);
            settlement.apply_matching_result(&mut cache, &result)?;
            if rests {
                settlement.create_resting_order(
                    &mut cache,
                    params,
                    &result.taker_order,
                    &result.taker_record,
                )?;
            }
            Ok(())
        })?;

        let batch = cache.into_writes();
        store.write(batch);
        for event in emitted {
            events.emit(event);
        }

        let state = if filled {
            PlacementState::Filled
        } else if rests {
            PlacementState::Resting
        } else {
            PlacementState::Dropped
        };
        tracing::info!(
            creator = %order.creator,
            id = %order.id,
            sequence,
            ?state,
            trades = result.trades.len(),
            "order placed"
        );

        Ok(Placement {
            sequence,
            state,
            remaining_base_quantity: result.taker_record.remaining_base_quantity,
            remaining_spendable_balance: result.taker_record.remaining_spendable_balance,
            trades: result.trades.len(),
        })
    }

    fn validate_good_til(&self, order: &Order) -> Result<()> {
        let Some(good_til) = &order.good_til else {
            return Ok(());
        };
        if let Some(height) = good_til.block_height {
            if height <= self.block.height {
                return Err(DexError::invalid_input(format!(
                    "good til block height {} must be above the current height {}",
                    height, self.block.height
                )));
            }
        }
        if let Some(time) = good_til.block_time {
            if time <= self.block.time {
                return Err(DexError::invalid_input(format!(
                    "good til block time {} must be after the current block time {}",
                    time, self.block.time
                )));
            }
        }
        Ok(())
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    /// Cancel a resting order of `creator`. Unknown orders are `NotFound`.
    pub fn cancel_order(&mut self, creator: &str, order_id: &str) -> Result<()> {
        let account_number = self.accounts.account_number_of(creator)?;
        let sequence = self
            .store
            .get_order_sequence(account_number, order_id)?
            .ok_or_else(|| {
                DexError::NotFound(format!("order {} of {}", order_id, creator))
            })?;
        self.cancel_order_by_sequence(sequence)
    }

    /// Remove a resting order and refund its lock and reserve.
    pub fn cancel_order_by_sequence(&mut self, order_sequence: u64) -> Result<()> {
        let Self {
            store,
            ledger,
            accounts,
            scheduler,
            events,
            ..
        } = self;

        let data = store
            .get_order_data(order_sequence)?
            .ok_or_else(|| DexError::NotFound(format!("order sequence {}", order_sequence)))?;
        let side = data.side()?;
        let price = data.price()?;
        let record = store
            .get_order_book_record(data.order_book_id, side, &price, order_sequence)?
            .ok_or_else(|| {
                DexError::invalid_state(format!("record of order {} not found", order_sequence))
            })?;
        let book = store.get_order_book_data(data.order_book_id)?;
        let spend_denom = match side {
            Side::Buy => book.quote_denom()?,
            Side::Sell => book.base_denom()?,
        };

        let mut cache = CacheStore::new(&*store);
        let emitted = Settlement::run(&*accounts, &mut *scheduler, &mut *ledger, |settlement| {
            let creator = settlement.address_of(record.account_number)?;
            settlement.unlock(&creator, Coin::new(spend_denom, record.remaining_spendable_balance));
            if let Some(reserve) = data.reserve()? {
                settlement.unlock(&creator, reserve);
            }
            settlement.remove_resting_order(&mut cache, &record)?;
            Ok(())
        })?;

        let batch = cache.into_writes();
        store.write(batch);
        for event in emitted {
            events.emit(event);
        }
        tracing::info!(
            sequence = order_sequence,
            id = %record.order_id,
            "order cancelled"
        );
        Ok(())
    }

    // ========================================================================
    // Block processing
    // ========================================================================

    /// Move to a new block and run the good-til cancellations now due.
    pub fn advance_block(&mut self, height: u64, time: u64) -> Result<BlockReceipt> {
        if height < self.block.height || time < self.block.time {
            return Err(DexError::invalid_input(format!(
                "block ({}, {}) is before the current block ({}, {})",
                height, time, self.block.height, self.block.time
            )));
        }
        self.block = BlockInfo::new(height, time);

        let mut expired = 0u64;
        for task in self.scheduler.pop_due(height, time) {
            match self.cancel_order_by_sequence(task.order_sequence) {
                Ok(()) => {
                    expired += 1;
                    tracing::info!(
                        sequence = task.order_sequence,
                        creator = %task.creator,
                        height,
                        "order expired"
                    );
                }
                Err(err) if err.is_not_found() => {
                    tracing::debug!(sequence = task.order_sequence, "expired order already gone");
                }
                Err(err) if err.kind() == ErrorKind::InternalState => return Err(err),
                Err(err) => {
                    tracing::warn!(sequence = task.order_sequence, error = %err, "failed to expire order");
                }
            }
        }

        Ok(BlockReceipt::new(height, time, expired, self.store.state_root()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Resting order of `creator` with `order_id`.
    pub fn get_order(&self, creator: &str, order_id: &str) -> Result<Order> {
        let account_number = self.accounts.account_number_of(creator)?;
        let sequence = self
            .store
            .get_order_sequence(account_number, order_id)?
            .ok_or_else(|| DexError::NotFound(format!("order {} of {}", order_id, creator)))?;
        self.get_order_by_sequence(sequence)
    }

    pub fn get_order_by_sequence(&self, order_sequence: u64) -> Result<Order> {
        let data = self
            .store
            .get_order_data(order_sequence)?
            .ok_or_else(|| DexError::NotFound(format!("order sequence {}", order_sequence)))?;
        let side = data.side()?;
        let price = data.price()?;
        let record = self
            .store
            .get_order_book_record(data.order_book_id, side, &price, order_sequence)?
            .ok_or_else(|| {
                DexError::invalid_state(format!("record of order {} not found", order_sequence))
            })?;
        let book = self.store.get_order_book_data(data.order_book_id)?;

        Ok(Order {
            creator: self.accounts.address_of(record.account_number)?,
            order_type: OrderType::Limit,
            id: record.order_id,
            sequence: order_sequence,
            base_denom: book.base_denom()?,
            quote_denom: book.quote_denom()?,
            price: Some(price),
            quantity: data.quantity,
            side,
            remaining_base_quantity: record.remaining_base_quantity,
            remaining_spendable_balance: record.remaining_spendable_balance,
            good_til: data.good_til(),
            time_in_force: TimeInForce::Gtc,
            reserve: data.reserve()?,
        })
    }

    /// Resting orders of `creator`, by order ID.
    pub fn orders_of(&self, creator: &str) -> Result<Vec<Order>> {
        let account_number = self.accounts.account_number_of(creator)?;
        self.store
            .account_order_sequences(account_number)?
            .into_iter()
            .map(|sequence| self.get_order_by_sequence(sequence))
            .collect()
    }

    /// Resting orders of one side of `(base, quote)`, best first.
    pub fn order_book_orders(&self, base_denom: &str, quote_denom: &str, side: Side) -> Result<Vec<Order>> {
        let Some(order_book_id) = self.store.get_order_book_id(base_denom, quote_denom)? else {
            return Ok(Vec::new());
        };
        self.iterate_order_book(order_book_id, side).collect()
    }

    /// Lazy view of one side of a book as orders, best first.
    pub fn iterate_order_book(&self, order_book_id: u32, side: Side) -> impl Iterator<Item = Result<Order>> + '_ {
        self.store
            .order_book_side_iterator(order_book_id, side)
            .map(move |record| record.and_then(|r| self.get_order_by_sequence(r.order_sequence)))
    }

    /// Raw records of one side of a book, best first.
    pub fn order_book_records(&self, order_book_id: u32, side: Side) -> Result<Vec<OrderBookRecord>> {
        self.store.order_book_side_iterator(order_book_id, side).collect()
    }

    /// Every registered book direction.
    pub fn order_books(&self) -> Result<Vec<OrderBookInfo>> {
        self.store.order_books()
    }
}

/// Spendable balance the taker starts matching with.
fn initial_remaining_balance<L: Ledger + ?Sized>(ledger: &L, order: &Order) -> Result<u128> {
    match order.order_type {
        OrderType::Limit => Ok(order.compute_limit_order_locked_balance()?.amount),
        OrderType::Market => {
            let spendable = ledger.spendable_balance(&order.creator, order.spend_denom())?;
            Ok(match order.side {
                Side::Buy => spendable,
                Side::Sell => spendable.min(order.quantity),
            })
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
