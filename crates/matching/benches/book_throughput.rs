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

use std::hint::black_box;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use rust_decimal::Decimal;

use crucible_matching::OrderBook;
use crucible_sdk::types::{NewOrderCommand, Side};

const RESTING_ORDERS: usize = 1_000;

fn order(order_id: String, side: Side, price: u64, size: u64) -> NewOrderCommand {
	NewOrderCommand {
		order_id,
		product_id: "BTC-USDT".to_string(),
		user_id: "bench_user".to_string(),
		side,
		price: Decimal::from(price),
		size: Decimal::from(size),
	}
}

fn seeded_book() -> OrderBook {
	let mut book = OrderBook::new("BTC-USDT");
	for i in 0..RESTING_ORDERS {
		let cmd = order(
			format!("seed_{i}"),
			Side::Sell,
			50_000 + (i as u64 % 100),
			1,
		);
		let _ = book.execute_new_order(&cmd, i as u64 + 1);
	}
	book
}

fn bench_resting_inserts(c: &mut Criterion) {
	c.bench_function("insert_non_crossing_orders", |b| {
		b.iter_batched(
			|| OrderBook::new("BTC-USDT"),
			|mut book| {
				for i in 0..RESTING_ORDERS {
					let cmd = order(
						format!("order_{i}"),
						Side::Buy,
						40_000 + (i as u64 % 100),
						1,
					);
					black_box(book.execute_new_order(&cmd, i as u64 + 1));
				}
				book
			},
			BatchSize::SmallInput,
		)
	});
}

fn bench_sweep_deep_book(c: &mut Criterion) {
	c.bench_function("sweep_deep_book", |b| {
		b.iter_batched(
			seeded_book,
			|mut book| {
				let taker = order(
					"taker".to_string(),
					Side::Buy,
					60_000,
					RESTING_ORDERS as u64,
				);
				black_box(book.execute_new_order(&taker, RESTING_ORDERS as u64 + 1));
				book
			},
			BatchSize::SmallInput,
		)
	});
}

criterion_group!(benches, bench_resting_inserts, bench_sweep_deep_book);
criterion_main!(benches);
