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

use crucible_sdk::types::{DoneReason, NewOrderCommand, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fields common to every log event
///
/// `sequence` increases by exactly 1 per event across the whole book (both
/// sides share one counter). `log_offset` is the event's position in the
/// outbound log stream and `command_offset` the position of the originating
/// command in the inbound stream. `command_finished` is set only on the last
/// event of a command; consumers use it to know the command's full effect is
/// represented, and recovery uses it to resume only at command boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
	pub sequence: u64,
	pub log_offset: u64,
	pub command_offset: u64,
	pub command_finished: bool,
}

impl EventMeta {
	/// Meta with only the sequence stamped; offsets are filled in by the
	/// order book when the command's event batch is finalized
	pub fn with_sequence(sequence: u64) -> Self {
		Self {
			sequence,
			log_offset: 0,
			command_offset: 0,
			command_finished: false,
		}
	}
}

/// Events produced by matching and consumed by downstream collaborators and
/// by the recovery path
///
/// Events are immutable once emitted and are sufficient to rebuild the full
/// book state by replay. The serialized form is tagged by kind so that a
/// stream containing an unrecognized kind fails to decode instead of being
/// silently skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEvent {
	/// Order accepted and passed dedup
	Received {
		#[serde(flatten)]
		meta: EventMeta,
		order: NewOrderCommand,
	},

	/// Order now resting on the book
	Open {
		#[serde(flatten)]
		meta: EventMeta,
		order_id: String,
		user_id: String,
		price: Decimal,
		remaining_size: Decimal,
		side: Side,
	},

	/// One execution between a resting maker and an incoming taker
	///
	/// `side` is the side on which the maker rests; replay decreases the
	/// maker's remaining size on this side. Per-party fill notifications
	/// (each from its own perspective) are derived downstream.
	Match {
		#[serde(flatten)]
		meta: EventMeta,
		trade_id: u64,
		maker_order_id: String,
		taker_order_id: String,
		side: Side,
		price: Decimal,
		size: Decimal,
		funds: Decimal,
	},

	/// Order leaves the book
	///
	/// `price` is present only if the order ever rested. An absent price
	/// marks an order that never entered book state (immediately and fully
	/// filled, or a cancel of an unknown ID), and replay performs no removal
	/// in that case.
	Done {
		#[serde(flatten)]
		meta: EventMeta,
		order_id: String,
		side: Side,
		price: Option<Decimal>,
		reason: DoneReason,
	},
}

impl LogEvent {
	pub fn meta(&self) -> &EventMeta {
		match self {
			LogEvent::Received { meta, .. } => meta,
			LogEvent::Open { meta, .. } => meta,
			LogEvent::Match { meta, .. } => meta,
			LogEvent::Done { meta, .. } => meta,
		}
	}

	pub fn meta_mut(&mut self) -> &mut EventMeta {
		match self {
			LogEvent::Received { meta, .. } => meta,
			LogEvent::Open { meta, .. } => meta,
			LogEvent::Match { meta, .. } => meta,
			LogEvent::Done { meta, .. } => meta,
		}
	}

	pub fn sequence(&self) -> u64 {
		self.meta().sequence
	}

	/// Whether this event is the final event of its originating command
	pub fn is_command_finished(&self) -> bool {
		self.meta().command_finished
	}

	/// The order ID this event is about
	pub fn order_id(&self) -> &str {
		match self {
			LogEvent::Received { order, .. } => &order.order_id,
			LogEvent::Open { order_id, .. } => order_id,
			// A match touches two orders; the maker is the one whose book
			// state changes
			LogEvent::Match { maker_order_id, .. } => maker_order_id,
			LogEvent::Done { order_id, .. } => order_id,
		}
	}
}

/// Shared emission counters for one order book
///
/// Both book sides stamp events from the same counters, which is what makes
/// `sequence` gapless across the book. Plain integers: the single-writer
/// discipline means no cross-thread synchronization is needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Counters {
	pub sequence: u64,
	pub trade_id: u64,
}

impl Counters {
	pub fn next_sequence(&mut self) -> u64 {
		self.sequence += 1;
		self.sequence
	}

	pub fn next_trade_id(&mut self) -> u64 {
		self.trade_id += 1;
		self.trade_id
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rust_decimal_macros::dec;

	#[test]
	fn test_event_kind_tagging() {
		let event = LogEvent::Done {
			meta: EventMeta::with_sequence(7),
			order_id: "order_1".to_string(),
			side: Side::Buy,
			price: Some(dec!(100)),
			reason: DoneReason::Cancelled,
		};

		let json = serde_json::to_string(&event).unwrap();
		assert!(json.contains("\"kind\":\"done\""));
		assert!(json.contains("\"reason\":\"CANCELLED\""));

		let parsed: LogEvent = serde_json::from_str(&json).unwrap();
		assert_eq!(parsed.sequence(), 7);
		assert_eq!(parsed.order_id(), "order_1");
	}

	#[test]
	fn test_unknown_kind_fails_to_decode() {
		let json = r#"{"kind":"order_rebalanced","sequence":1,"log_offset":1,"command_offset":1,"command_finished":true}"#;
		let result: Result<LogEvent, _> = serde_json::from_str(json);
		assert!(result.is_err());
	}

	#[test]
	fn test_counters_are_gapless() {
		let mut counters = Counters::default();
		assert_eq!(counters.next_sequence(), 1);
		assert_eq!(counters.next_sequence(), 2);
		assert_eq!(counters.next_trade_id(), 1);
		assert_eq!(counters.next_sequence(), 3);
		assert_eq!(counters.trade_id, 1);
	}
}
