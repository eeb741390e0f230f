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

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
	Buy,
	Sell,
}

impl Side {
	/// The side a taker order matches against
	pub fn opposite(self) -> Side {
		match self {
			Side::Buy => Side::Sell,
			Side::Sell => Side::Buy,
		}
	}
}

/// Reason an order left the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DoneReason {
	Filled,
	Cancelled,
}

/// Request to place a new limit order
///
/// The order ID is assigned by the upstream system and is globally unique
/// by contract, but delivery is at-least-once: the matching core defends
/// against repeated delivery of the same ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderCommand {
	/// Upstream-assigned unique order ID (idempotency key)
	pub order_id: String,
	/// Instrument identifier (e.g., "BTC-USDT")
	pub product_id: String,
	/// Owner of the order
	pub user_id: String,
	/// Order side
	pub side: Side,
	/// Limit price (exact decimal)
	pub price: Decimal,
	/// Size/quantity (exact decimal)
	pub size: Decimal,
}

/// Request to cancel a resting order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderCommand {
	/// ID of the order to remove from the book
	pub order_id: String,
}

/// Envelope for command transport dispatch
///
/// The delivery mechanism preserves per-instrument order but may repeat
/// commands; the core treats the envelope as opaque until routed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderCommand {
	NewOrder(NewOrderCommand),
	CancelOrder(CancelOrderCommand),
}

impl OrderCommand {
	/// Order ID carried by the command
	pub fn order_id(&self) -> &str {
		match self {
			OrderCommand::NewOrder(cmd) => &cmd.order_id,
			OrderCommand::CancelOrder(cmd) => &cmd.order_id,
		}
	}
}
