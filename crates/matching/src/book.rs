// Copyright 2026 The Crucible Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::{BTreeMap, HashMap, VecDeque, btree_map};

use crucible_sdk::types::{CancelOrderCommand, DoneReason, NewOrderCommand, Side};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::event::{Counters, EventMeta, LogEvent};
use crate::types::BookOrder;

/// Error types for book mutations driven by log replay
///
/// These are defensive: any of them indicates a corrupted log or a matching
/// bug, and the caller must fail loudly rather than self-correct.
#[derive(Debug, Error)]
pub enum BookError {
	#[error("order not found on {side:?} side: {order_id}")]
	OrderNotFound { order_id: String, side: Side },
	#[error("size underflow for order {order_id}: remaining {remaining} decrease {decrease}")]
	SizeUnderflow {
		order_id: String,
		remaining: Decimal,
		decrease: Decimal,
	},
}

/// Price level: all resting orders at one price, in strict FIFO order
#[derive(Debug, Clone)]
pub struct PriceLevel {
	price: Decimal,
	orders: VecDeque<BookOrder>,
	total_size: Decimal,
}

impl PriceLevel {
	fn new(price: Decimal) -> Self {
		Self {
			price,
			orders: VecDeque::new(),
			total_size: Decimal::ZERO,
		}
	}

	fn add_order(&mut self, order: BookOrder) {
		self.total_size += order.remaining_size;
		self.orders.push_back(order);
	}

	fn front_mut(&mut self) -> Option<&mut BookOrder> {
		self.orders.front_mut()
	}

	fn pop_front(&mut self) -> Option<BookOrder> {
		let order = self.orders.pop_front();
		if let Some(order) = &order {
			self.total_size -= order.remaining_size;
		}
		order
	}

	fn remove_order(&mut self, order_id: &str) -> Option<BookOrder> {
		let pos = self.orders.iter().position(|o| o.order_id == order_id)?;
		let order = self.orders.remove(pos);
		if let Some(order) = &order {
			self.total_size -= order.remaining_size;
		}
		order
	}

	pub fn price(&self) -> Decimal {
		self.price
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	pub fn total_size(&self) -> Decimal {
		self.total_size
	}

	pub fn order_count(&self) -> usize {
		self.orders.len()
	}
}

/// One side of the order book
///
/// Levels are kept in a `BTreeMap` keyed by price; the best level is the
/// lowest price for the ask side and the highest for the bid side. An
/// order-ID index maps to the resting price for O(1) lookup and cancel.
/// Within a level, orders are strict FIFO by arrival.
#[derive(Debug, Clone)]
pub struct BookSide {
	side: Side,
	levels: BTreeMap<Decimal, PriceLevel>,
	order_index: HashMap<String, Decimal>,
	next_arrival: u64,
}

impl BookSide {
	pub fn new(side: Side) -> Self {
		Self {
			side,
			levels: BTreeMap::new(),
			order_index: HashMap::new(),
			next_arrival: 0,
		}
	}

	pub fn side(&self) -> Side {
		self.side
	}

	/// Best resting price on this side, if any
	pub fn best_price(&self) -> Option<Decimal> {
		match self.side {
			Side::Sell => self.levels.first_key_value().map(|(p, _)| *p),
			Side::Buy => self.levels.last_key_value().map(|(p, _)| *p),
		}
	}

	fn best_level_entry(&mut self) -> Option<btree_map::OccupiedEntry<'_, Decimal, PriceLevel>> {
		match self.side {
			Side::Sell => self.levels.first_entry(),
			Side::Buy => self.levels.last_entry(),
		}
	}

	/// Run the matching algorithm for a new taker order on this side
	///
	/// Emits, in causal order: Received for the taker; one Match per
	/// execution against the opposing side's best-price, earliest-arrival
	/// maker, with Done(FILLED) for a maker interleaved immediately when its
	/// remaining size reaches zero; then either Done(FILLED) for a fully
	/// consumed taker (no Open), or Open for a resting remainder (no Done).
	///
	/// Trade price is always the maker's resting price, so price improvement
	/// favors the resting order. All arithmetic is exact decimal.
	pub fn execute_new_order(
		&mut self,
		command: &NewOrderCommand,
		opposing: &mut BookSide,
		counters: &mut Counters,
	) -> Vec<LogEvent> {
		let mut events = Vec::new();
		events.push(LogEvent::Received {
			meta: EventMeta::with_sequence(counters.next_sequence()),
			order: command.clone(),
		});

		let mut remaining = command.size;

		while remaining > Decimal::ZERO {
			let Some(mut level_entry) = opposing.best_level_entry() else {
				break;
			};

			let maker_price = *level_entry.key();
			let crosses = match command.side {
				Side::Buy => command.price >= maker_price,
				Side::Sell => command.price <= maker_price,
			};
			if !crosses {
				break;
			}

			let mut filled_maker = None;
			let level_exhausted;
			{
				let level = level_entry.get_mut();
				if let Some(maker) = level.front_mut() {
					let trade_size = remaining.min(maker.remaining_size);
					events.push(LogEvent::Match {
						meta: EventMeta::with_sequence(counters.next_sequence()),
						trade_id: counters.next_trade_id(),
						maker_order_id: maker.order_id.clone(),
						taker_order_id: command.order_id.clone(),
						side: maker.side,
						price: maker_price,
						size: trade_size,
						funds: maker_price * trade_size,
					});

					maker.remaining_size -= trade_size;
					remaining -= trade_size;
					let maker_filled = maker.remaining_size.is_zero();
					level.total_size -= trade_size;

					if maker_filled {
						filled_maker = level.pop_front();
					}
				}
				level_exhausted = level.is_empty();
			}

			if level_exhausted {
				level_entry.remove();
			} else {
				drop(level_entry);
			}

			// Done for a fully filled maker is emitted as part of the same
			// match step, before the next maker is considered
			if let Some(filled) = filled_maker {
				opposing.order_index.remove(&filled.order_id);
				events.push(LogEvent::Done {
					meta: EventMeta::with_sequence(counters.next_sequence()),
					order_id: filled.order_id,
					side: filled.side,
					price: Some(filled.price),
					reason: DoneReason::Filled,
				});
			}
		}

		if remaining.is_zero() {
			// Fully filled before resting: no Open, and no price on the
			// Done since the order never entered book state
			events.push(LogEvent::Done {
				meta: EventMeta::with_sequence(counters.next_sequence()),
				order_id: command.order_id.clone(),
				side: command.side,
				price: None,
				reason: DoneReason::Filled,
			});
		} else {
			let record = BookOrder::resting(command, remaining, self.next_arrival);
			self.add_order(record);
			events.push(LogEvent::Open {
				meta: EventMeta::with_sequence(counters.next_sequence()),
				order_id: command.order_id.clone(),
				user_id: command.user_id.clone(),
				price: command.price,
				remaining_size: remaining,
				side: command.side,
			});
		}

		events
	}

	/// Remove a resting order by ID, emitting Done(CANCELLED) with its
	/// resting price; `None` if the ID is not on this side
	pub fn execute_cancel(
		&mut self,
		command: &CancelOrderCommand,
		counters: &mut Counters,
	) -> Option<LogEvent> {
		let order = self.remove_order_by_id(&command.order_id)?;
		Some(LogEvent::Done {
			meta: EventMeta::with_sequence(counters.next_sequence()),
			order_id: order.order_id,
			side: order.side,
			price: Some(order.price),
			reason: DoneReason::Cancelled,
		})
	}

	/// Arrival rank the next resting order on this side will receive
	pub fn next_arrival_rank(&self) -> u64 {
		self.next_arrival
	}

	/// Restore the arrival counter captured in a snapshot
	///
	/// The counter counts every order that ever rested on this side, not
	/// just the survivors, so it cannot be re-derived from the resting
	/// orders: when the newest order was filled or cancelled before the
	/// capture, the surviving ranks alone would understate it.
	pub(crate) fn set_next_arrival_rank(&mut self, rank: u64) {
		self.next_arrival = self.next_arrival.max(rank);
	}

	/// Insert a resting order record
	///
	/// Used both when a taker's remainder rests during live matching and
	/// when replay applies an Open event.
	pub fn add_order(&mut self, order: BookOrder) {
		self.next_arrival = self.next_arrival.max(order.arrival_rank + 1);
		self.order_index
			.insert(order.order_id.clone(), order.price);
		self.levels
			.entry(order.price)
			.or_insert_with(|| PriceLevel::new(order.price))
			.add_order(order);
	}

	/// Decrease a resting order's remaining size (replay of a Match event)
	///
	/// A record zeroed here is left in place: the Done event that follows in
	/// the log performs the removal. Decreasing below zero is a corrupted
	/// log.
	pub fn decrease_order_size(&mut self, order_id: &str, size: Decimal) -> Result<(), BookError> {
		let side = self.side;
		let price = *self
			.order_index
			.get(order_id)
			.ok_or_else(|| BookError::OrderNotFound {
				order_id: order_id.to_string(),
				side,
			})?;
		let level = self
			.levels
			.get_mut(&price)
			.ok_or_else(|| BookError::OrderNotFound {
				order_id: order_id.to_string(),
				side,
			})?;
		let order = level
			.orders
			.iter_mut()
			.find(|o| o.order_id == order_id)
			.ok_or_else(|| BookError::OrderNotFound {
				order_id: order_id.to_string(),
				side,
			})?;

		if size > order.remaining_size {
			return Err(BookError::SizeUnderflow {
				order_id: order_id.to_string(),
				remaining: order.remaining_size,
				decrease: size,
			});
		}

		order.remaining_size -= size;
		level.total_size -= size;
		Ok(())
	}

	/// Remove a resting order by ID; `None` if unknown
	pub fn remove_order_by_id(&mut self, order_id: &str) -> Option<BookOrder> {
		let price = self.order_index.remove(order_id)?;
		let level = self.levels.get_mut(&price)?;
		let order = level.remove_order(order_id);
		if level.is_empty() {
			self.levels.remove(&price);
		}
		order
	}

	pub fn get_order_by_id(&self, order_id: &str) -> Option<&BookOrder> {
		let price = self.order_index.get(order_id)?;
		self.levels
			.get(price)?
			.orders
			.iter()
			.find(|o| o.order_id == order_id)
	}

	/// Resting orders in book order: best price first, FIFO within a price
	pub fn iter(&self) -> impl Iterator<Item = &BookOrder> {
		let levels: Box<dyn Iterator<Item = &PriceLevel>> = match self.side {
			Side::Sell => Box::new(self.levels.values()),
			Side::Buy => Box::new(self.levels.values().rev()),
		};
		levels.flat_map(|level| level.orders.iter())
	}

	pub fn order_count(&self) -> usize {
		self.order_index.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order_index.is_empty()
	}
}
