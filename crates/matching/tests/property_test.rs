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

//! Property tests for the matching invariants
//!
//! These exercise random command streams against the universally
//! quantified properties: gapless sequences, size conservation, FIFO
//! priority, dedup within the window, and live/replay equivalence.

use std::collections::HashMap;

use crucible_matching::{LogEvent, OrderBook, replay_log};
use crucible_sdk::types::{NewOrderCommand, Side};
use proptest::collection::vec;
use proptest::prelude::*;
use rust_decimal::Decimal;

fn order(order_id: String, side: Side, price: Decimal, size: Decimal) -> NewOrderCommand {
	NewOrderCommand {
		order_id,
		product_id: "BTC-USDT".to_string(),
		user_id: "user_1".to_string(),
		side,
		price,
		size,
	}
}

/// (is_buy, price tick above 90, size)
fn command_stream() -> impl Strategy<Value = Vec<(bool, u8, u8)>> {
	vec((any::<bool>(), 0u8..20, 1u8..=10), 1..60)
}

fn run_commands(book: &mut OrderBook, commands: &[(bool, u8, u8)]) -> Vec<LogEvent> {
	let mut log = Vec::new();
	for (i, (is_buy, tick, size)) in commands.iter().enumerate() {
		let cmd = order(
			format!("order_{i}"),
			if *is_buy { Side::Buy } else { Side::Sell },
			Decimal::from(90 + u64::from(*tick)),
			Decimal::from(*size),
		);
		if let Some(events) = book.execute_new_order(&cmd, i as u64 + 1) {
			log.extend(events);
		}
	}
	log
}

proptest! {
	#![proptest_config(ProptestConfig::with_cases(64))]

	#[test]
	fn prop_sequence_gapless(commands in command_stream()) {
		let mut book = OrderBook::new("BTC-USDT");
		let log = run_commands(&mut book, &commands);

		for (i, event) in log.iter().enumerate() {
			prop_assert_eq!(event.sequence(), i as u64 + 1);
			prop_assert_eq!(event.meta().log_offset, i as u64 + 1);
		}
		prop_assert_eq!(book.sequence(), log.len() as u64);
	}

	#[test]
	fn prop_sizes_conserved_and_never_negative(commands in command_stream()) {
		let mut book = OrderBook::new("BTC-USDT");
		let log = run_commands(&mut book, &commands);

		for resting in book.asks().iter().chain(book.bids().iter()) {
			prop_assert!(resting.remaining_size > Decimal::ZERO);
		}

		// initial size == matched size + final remaining, per order
		let mut matched: HashMap<String, Decimal> = HashMap::new();
		for event in &log {
			if let LogEvent::Match { maker_order_id, taker_order_id, size, .. } = event {
				*matched.entry(maker_order_id.clone()).or_default() += *size;
				*matched.entry(taker_order_id.clone()).or_default() += *size;
			}
		}
		for (i, (_, _, size)) in commands.iter().enumerate() {
			let order_id = format!("order_{i}");
			let initial = Decimal::from(*size);
			let filled = matched.get(&order_id).copied().unwrap_or_default();
			let remaining = book
				.asks()
				.get_order_by_id(&order_id)
				.or_else(|| book.bids().get_order_by_id(&order_id))
				.map(|o| o.remaining_size)
				.unwrap_or_default();
			prop_assert_eq!(initial, filled + remaining);
		}
	}

	#[test]
	fn prop_replay_reproduces_live_state(commands in command_stream()) {
		let mut live = OrderBook::new("BTC-USDT");
		let log = run_commands(&mut live, &commands);

		let mut recovered = OrderBook::new("BTC-USDT");
		replay_log(&mut recovered, log).unwrap();

		prop_assert_eq!(recovered.sequence(), live.sequence());
		prop_assert_eq!(recovered.trade_id(), live.trade_id());
		prop_assert_eq!(recovered.is_stable(), live.is_stable());

		let live_asks: Vec<_> = live.asks().iter().collect();
		let recovered_asks: Vec<_> = recovered.asks().iter().collect();
		prop_assert_eq!(recovered_asks, live_asks);

		let live_bids: Vec<_> = live.bids().iter().collect();
		let recovered_bids: Vec<_> = recovered.bids().iter().collect();
		prop_assert_eq!(recovered_bids, live_bids);
	}

	#[test]
	fn prop_duplicate_ids_never_double_process(commands in command_stream()) {
		let mut book = OrderBook::new("BTC-USDT");
		for (i, (is_buy, tick, size)) in commands.iter().enumerate() {
			let cmd = order(
				format!("order_{i}"),
				if *is_buy { Side::Buy } else { Side::Sell },
				Decimal::from(90 + u64::from(*tick)),
				Decimal::from(*size),
			);
			let _ = book.execute_new_order(&cmd, i as u64 + 1);
			// Immediate redelivery of the same ID is always dropped
			prop_assert!(book.execute_new_order(&cmd, i as u64 + 1).is_none());
		}
	}

	#[test]
	fn prop_fifo_within_price_level(sizes in vec(1u8..=10, 2..10)) {
		let mut book = OrderBook::new("BTC-USDT");
		let mut total = Decimal::ZERO;
		for (i, size) in sizes.iter().enumerate() {
			total += Decimal::from(*size);
			let _ = book.execute_new_order(
				&order(format!("bid_{i}"), Side::Buy, Decimal::from(100u64), Decimal::from(*size)),
				i as u64 + 1,
			);
		}

		let events = book
			.execute_new_order(
				&order("sweep".to_string(), Side::Sell, Decimal::from(100u64), total),
				sizes.len() as u64 + 1,
			)
			.unwrap();

		let makers: Vec<String> = events
			.iter()
			.filter_map(|e| match e {
				LogEvent::Match { maker_order_id, .. } => Some(maker_order_id.clone()),
				_ => None,
			})
			.collect();
		let expected: Vec<String> = (0..sizes.len()).map(|i| format!("bid_{i}")).collect();
		prop_assert_eq!(makers, expected);
	}
}
