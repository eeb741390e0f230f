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

use crucible_sdk::types::{CancelOrderCommand, NewOrderCommand, Side};
use tracing::warn;

use crate::book::{BookError, BookSide};
use crate::config::MatchingConfig;
use crate::dedup::SlidingBloomFilter;
use crate::event::{Counters, LogEvent};
use crate::snapshot::{OrderBookSnapshot, SNAPSHOT_VERSION, SnapshotError};
use crate::types::BookOrder;

/// The order book for one instrument
///
/// Owns both sides, the dedup filter, the shared sequence/trade counters,
/// and the recovery cursors. Single-writer: exactly one logical thread
/// executes commands and advances state for a given instrument, which is
/// why no operation here locks, blocks, or yields. Parallelism across
/// instruments comes from one `OrderBook` instance per instrument.
#[derive(Debug)]
pub struct OrderBook {
	product_id: String,
	counters: Counters,
	order_id_filter: SlidingBloomFilter,
	asks: BookSide,
	bids: BookSide,
	/// Position in the inbound command stream already reflected in state
	command_offset: u64,
	/// Position in the outbound log stream already applied
	log_offset: u64,
	/// Whether the last applied log event was the final event of its
	/// command; restart points are only valid when stable
	stable: bool,
}

impl OrderBook {
	pub fn new(product_id: impl Into<String>) -> Self {
		Self::with_config(&MatchingConfig {
			product_id: product_id.into(),
			..MatchingConfig::default()
		})
	}

	pub fn with_config(config: &MatchingConfig) -> Self {
		Self {
			product_id: config.product_id.clone(),
			counters: Counters::default(),
			order_id_filter: SlidingBloomFilter::new(
				config.dedup_capacity,
				config.dedup_generations,
			),
			asks: BookSide::new(Side::Sell),
			bids: BookSide::new(Side::Buy),
			command_offset: 0,
			log_offset: 0,
			stable: true,
		}
	}

	/// Execute a new-order command at the given inbound stream position
	///
	/// Returns the full event sequence in causal order, with offsets
	/// stamped and `command_finished` set on the final event. Returns
	/// `None` on a dedup hit: the repeat (or rare filter collision) is
	/// logged and dropped with no state change and no events.
	pub fn execute_new_order(
		&mut self,
		command: &NewOrderCommand,
		command_offset: u64,
	) -> Option<Vec<LogEvent>> {
		if self.order_id_filter.contains(&command.order_id) {
			warn!(
				order_id = %command.order_id,
				order = %serde_json::to_string(command).unwrap_or_default(),
				"received repeated order, dropping"
			);
			return None;
		}
		self.order_id_filter.put(&command.order_id);

		let mut events = match command.side {
			Side::Buy => self
				.bids
				.execute_new_order(command, &mut self.asks, &mut self.counters),
			Side::Sell => self
				.asks
				.execute_new_order(command, &mut self.bids, &mut self.counters),
		};

		self.finalize_command(&mut events, command_offset);
		Some(events)
	}

	/// Execute a cancel command at the given inbound stream position
	///
	/// Returns `None` when the ID is not resting on either side (already
	/// done, never opened, or unknown); this is non-fatal. The ID is looked
	/// up on the ask side before the bid side, matching the engine's
	/// long-standing behavior; IDs are contractually unique across sides,
	/// so the order is unobservable unless that contract is violated.
	pub fn execute_cancel(
		&mut self,
		command: &CancelOrderCommand,
		command_offset: u64,
	) -> Option<LogEvent> {
		let side = self
			.asks
			.get_order_by_id(&command.order_id)
			.or_else(|| self.bids.get_order_by_id(&command.order_id))
			.map(|order| order.side)?;

		let event = match side {
			Side::Buy => self.bids.execute_cancel(command, &mut self.counters),
			Side::Sell => self.asks.execute_cancel(command, &mut self.counters),
		};

		event.map(|mut event| {
			self.finalize_command(std::slice::from_mut(&mut event), command_offset);
			event
		})
	}

	fn finalize_command(&mut self, events: &mut [LogEvent], command_offset: u64) {
		let last = events.len().saturating_sub(1);
		for (i, event) in events.iter_mut().enumerate() {
			self.log_offset += 1;
			let meta = event.meta_mut();
			meta.log_offset = self.log_offset;
			meta.command_offset = command_offset;
			meta.command_finished = i == last;
		}
		self.command_offset = command_offset;
		self.stable = true;
	}

	/// Apply one log event's recorded effect directly to state
	///
	/// Recovery never recomputes trades: counters and cursors are set from
	/// the event's fields, and book mutations reproduce the net effect of
	/// the original matching. Events must be applied in original emission
	/// order; any inconsistency (unknown maker, size underflow) means the
	/// log is corrupted and recovery must abort.
	pub fn restore_log(&mut self, event: &LogEvent) -> Result<(), BookError> {
		let meta = *event.meta();
		self.counters.sequence = meta.sequence;
		self.log_offset = meta.log_offset;
		self.command_offset = meta.command_offset;
		self.stable = meta.command_finished;

		match event {
			LogEvent::Received { order, .. } => {
				// The filter's state is part of book state: without this,
				// replayed IDs could be processed twice after recovery
				self.order_id_filter.put(&order.order_id);
				Ok(())
			}
			LogEvent::Open {
				order_id,
				user_id,
				price,
				remaining_size,
				side,
				..
			} => {
				let book_side = self.side_mut(*side);
				let record = BookOrder {
					order_id: order_id.clone(),
					side: *side,
					price: *price,
					remaining_size: *remaining_size,
					user_id: user_id.clone(),
					arrival_rank: book_side.next_arrival_rank(),
				};
				book_side.add_order(record);
				Ok(())
			}
			LogEvent::Match {
				trade_id,
				maker_order_id,
				side,
				size,
				..
			} => {
				self.counters.trade_id = *trade_id;
				self.side_mut(*side).decrease_order_size(maker_order_id, *size)
			}
			LogEvent::Done {
				order_id,
				side,
				price,
				..
			} => {
				// No price means the order never rested, so there is
				// nothing to remove
				if price.is_none() {
					return Ok(());
				}
				self.side_mut(*side)
					.remove_order_by_id(order_id)
					.map(|_| ())
					.ok_or(BookError::OrderNotFound {
						order_id: order_id.clone(),
						side: *side,
					})
			}
		}
	}

	/// Capture the versioned full-state snapshot of this book
	pub fn snapshot(&self) -> OrderBookSnapshot {
		OrderBookSnapshot {
			version: SNAPSHOT_VERSION,
			product_id: self.product_id.clone(),
			sequence: self.counters.sequence,
			trade_id: self.counters.trade_id,
			command_offset: self.command_offset,
			log_offset: self.log_offset,
			stable: self.stable,
			asks_next_arrival: self.asks.next_arrival_rank(),
			bids_next_arrival: self.bids.next_arrival_rank(),
			asks: self.asks.iter().cloned().collect(),
			bids: self.bids.iter().cloned().collect(),
		}
	}

	/// Rebuild a book from a snapshot taken at a command boundary
	///
	/// The restored book is advanced purely by replaying log events emitted
	/// after the snapshot point. Dedup sizing comes from `config`; the
	/// filter starts empty and is repopulated by replayed Received events.
	pub fn from_snapshot(
		snapshot: OrderBookSnapshot,
		config: &MatchingConfig,
	) -> Result<Self, SnapshotError> {
		if snapshot.version != SNAPSHOT_VERSION {
			return Err(SnapshotError::UnsupportedVersion(snapshot.version));
		}

		let mut book = Self::with_config(&MatchingConfig {
			product_id: snapshot.product_id,
			..config.clone()
		});
		book.counters.sequence = snapshot.sequence;
		book.counters.trade_id = snapshot.trade_id;
		book.command_offset = snapshot.command_offset;
		book.log_offset = snapshot.log_offset;
		book.stable = snapshot.stable;
		for order in snapshot.asks {
			book.asks.add_order(order);
		}
		for order in snapshot.bids {
			book.bids.add_order(order);
		}
		// The counters count every order that ever rested, so they must
		// come from the capture, not from the surviving ranks
		book.asks.set_next_arrival_rank(snapshot.asks_next_arrival);
		book.bids.set_next_arrival_rank(snapshot.bids_next_arrival);
		Ok(book)
	}

	fn side_mut(&mut self, side: Side) -> &mut BookSide {
		match side {
			Side::Buy => &mut self.bids,
			Side::Sell => &mut self.asks,
		}
	}

	pub fn product_id(&self) -> &str {
		&self.product_id
	}

	pub fn sequence(&self) -> u64 {
		self.counters.sequence
	}

	pub fn trade_id(&self) -> u64 {
		self.counters.trade_id
	}

	pub fn command_offset(&self) -> u64 {
		self.command_offset
	}

	pub fn log_offset(&self) -> u64 {
		self.log_offset
	}

	pub fn is_stable(&self) -> bool {
		self.stable
	}

	pub fn asks(&self) -> &BookSide {
		&self.asks
	}

	pub fn bids(&self) -> &BookSide {
		&self.bids
	}
}
