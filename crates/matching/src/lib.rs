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

//! Crucible Matching Core
//!
//! This crate is the core of a price-time priority order-matching engine for
//! a single trading instrument. It accepts new-order and cancel commands,
//! matches crossing orders with exact decimal arithmetic, and emits an
//! ordered, replayable log of every state change.
//!
//! Architecture:
//! - Single-writer per instrument: one logical thread drives one [`OrderBook`],
//!   so the core needs no internal locking
//! - Event sourcing: the log events returned by each command are the single
//!   source of truth; replaying them into a fresh book reproduces state
//!   without re-running the matching algorithm
//! - Idempotent under at-least-once delivery: a sliding bloom filter drops
//!   repeated order IDs within a bounded recent window
//!
//! Command delivery, log persistence, and downstream projections are the
//! responsibility of external collaborators; everything in this crate is
//! synchronous and CPU-bound.

pub mod book;
pub mod config;
pub mod dedup;
pub mod event;
pub mod orderbook;
pub mod recovery;
pub mod snapshot;
pub mod types;

pub use book::{BookError, BookSide, PriceLevel};
pub use config::MatchingConfig;
pub use dedup::SlidingBloomFilter;
pub use event::{Counters, EventMeta, LogEvent};
pub use orderbook::OrderBook;
pub use recovery::{ReplayError, decode_event, replay_log};
pub use snapshot::{L3OrderBookSnapshot, OrderBookSnapshot, SnapshotError};
pub use types::BookOrder;
