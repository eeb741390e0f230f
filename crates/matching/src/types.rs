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

use crucible_sdk::types::{NewOrderCommand, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A resting order held by one side of the book
///
/// A record exists only while the order has unmatched size and has not been
/// cancelled. It is owned exclusively by the [`BookSide`](crate::BookSide)
/// holding it: created on first rest, mutated in place on partial fill, and
/// removed on full fill or cancel. `remaining_size` stays positive for the
/// whole time the order rests (the one exception is mid-command replay,
/// where a record zeroed by a Match event is removed by the Done event that
/// follows it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookOrder {
	/// Upstream-assigned unique order ID
	pub order_id: String,
	/// Side of the book holding this record
	pub side: Side,
	/// Resting limit price
	pub price: Decimal,
	/// Unmatched size
	pub remaining_size: Decimal,
	/// Owner of the order
	pub user_id: String,
	/// Position in the side's arrival order, for time priority within a
	/// price level
	pub arrival_rank: u64,
}

impl BookOrder {
	/// Build the record that rests the unmatched remainder of a taker order
	pub fn resting(command: &NewOrderCommand, remaining_size: Decimal, arrival_rank: u64) -> Self {
		Self {
			order_id: command.order_id.clone(),
			side: command.side,
			price: command.price,
			remaining_size,
			user_id: command.user_id.clone(),
			arrival_rank,
		}
	}
}
