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

//! Read-only projections of an order book
//!
//! Two surfaces live here:
//!
//! - [`L3OrderBookSnapshot`]: the per-order market depth view consumed by
//!   external feeds and UIs, with prices and sizes rendered as canonical
//!   exact-decimal strings
//! - [`OrderBookSnapshot`]: the versioned full-state capture used at
//!   startup; a restored book is then advanced purely by log replay, never
//!   by ad hoc field copying
//!
//! Neither projection mutates the book.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::orderbook::OrderBook;
use crate::types::BookOrder;

/// Current full-state snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Error types for snapshot restore
#[derive(Debug, Error)]
pub enum SnapshotError {
	#[error("unsupported snapshot version: {0}")]
	UnsupportedVersion(u32),
}

/// One resting order rendered for the L3 view: `[order_id, price, size]`
///
/// Price and size are exact-decimal strings with no trailing zero padding,
/// so the line round-trips order identity, price, and size exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct L3Line(pub String, pub String, pub String);

impl From<&BookOrder> for L3Line {
	fn from(order: &BookOrder) -> Self {
		Self(
			order.order_id.clone(),
			order.price.normalize().to_string(),
			order.remaining_size.normalize().to_string(),
		)
	}
}

/// Per-order market depth view of a book
///
/// Sides are ordered exactly as resting: best price first, FIFO within a
/// price. Built on demand for external consumers; not used internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct L3OrderBookSnapshot {
	pub product_id: String,
	pub sequence: u64,
	pub trade_id: u64,
	/// Capture time, unix milliseconds
	pub time: u64,
	pub asks: Vec<L3Line>,
	pub bids: Vec<L3Line>,
}

impl From<&OrderBook> for L3OrderBookSnapshot {
	fn from(book: &OrderBook) -> Self {
		Self {
			product_id: book.product_id().to_string(),
			sequence: book.sequence(),
			trade_id: book.trade_id(),
			time: unix_millis(),
			asks: book.asks().iter().map(L3Line::from).collect(),
			bids: book.bids().iter().map(L3Line::from).collect(),
		}
	}
}

/// Versioned full-state capture of an order book
///
/// Captures everything log replay needs to resume from this point:
/// counters, recovery cursors, the stable flag, and both sides' resting
/// orders in book order. The dedup filter's contents are deliberately not
/// captured; Received events replayed after the snapshot point repopulate
/// it, so the guaranteed dedup window restarts at the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookSnapshot {
	pub version: u32,
	pub product_id: String,
	pub sequence: u64,
	pub trade_id: u64,
	pub command_offset: u64,
	pub log_offset: u64,
	pub stable: bool,
	/// Arrival counter of the ask side, counting every order that ever
	/// rested there (not just survivors); restored verbatim so Opens
	/// replayed after the capture get the same ranks as the live book
	pub asks_next_arrival: u64,
	/// Arrival counter of the bid side, same contract
	pub bids_next_arrival: u64,
	pub asks: Vec<BookOrder>,
	pub bids: Vec<BookOrder>,
}

fn unix_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_millis() as u64)
		.unwrap_or_default()
}
