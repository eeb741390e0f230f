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

//! Log-driven crash recovery
//!
//! On restart, the external collaborator feeds the persisted log events, in
//! original emission order, through [`replay_log`]. Replay is a pure
//! application of already-decided outcomes: the matching algorithm never
//! runs, counters and cursors are set from the events themselves, and the
//! resulting book state is identical to the live end state.
//!
//! Recovery is strict: an event that cannot be applied, or a serialized
//! event of an unrecognized kind, aborts recovery with an error instead of
//! being skipped. A book recovered past such a point could silently diverge
//! from every downstream consumer.

use thiserror::Error;
use tracing::info;

use crate::book::BookError;
use crate::event::LogEvent;
use crate::orderbook::OrderBook;

/// Error types for recovery
#[derive(Debug, Error)]
pub enum ReplayError {
	#[error("failed to apply log event: {0}")]
	Apply(#[from] BookError),
	#[error("failed to decode log event: {0}")]
	Decode(#[from] serde_json::Error),
}

/// Decode one serialized log event
///
/// An unrecognized event kind is a hard failure: recovery cannot proceed
/// safely through a state transition it does not understand.
pub fn decode_event(bytes: &[u8]) -> Result<LogEvent, ReplayError> {
	Ok(serde_json::from_slice(bytes)?)
}

/// Replay a stream of log events into a book, in order
///
/// Returns the sequence of the last applied event. The caller is expected
/// to have chosen a stream that starts at a command boundary (the book's
/// stable flag ends up reflecting whether the stream did too).
pub fn replay_log(
	book: &mut OrderBook,
	events: impl IntoIterator<Item = LogEvent>,
) -> Result<u64, ReplayError> {
	let start_sequence = book.sequence();
	let mut applied = 0u64;

	for event in events {
		book.restore_log(&event)?;
		applied += 1;
	}

	info!(
		product_id = book.product_id(),
		applied,
		from_sequence = start_sequence,
		to_sequence = book.sequence(),
		stable = book.is_stable(),
		"log replay complete"
	);
	Ok(book.sequence())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_event_kind_is_fatal() {
		let json = br#"{"kind":"order_migrated","sequence":1,"log_offset":1,"command_offset":1,"command_finished":true,"order_id":"order_1"}"#;
		assert!(matches!(decode_event(json), Err(ReplayError::Decode(_))));
	}

	#[test]
	fn test_empty_replay_is_noop() {
		let mut book = OrderBook::new("BTC-USDT");
		let last = replay_log(&mut book, Vec::new()).unwrap();
		assert_eq!(last, 0);
		assert!(book.is_stable());
	}
}
