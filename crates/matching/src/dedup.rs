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

//! Bounded-memory duplicate rejection for order IDs
//!
//! Upstream delivery is at-least-once, so the same order ID can arrive more
//! than once. An exact set would grow without bound; instead a small ring of
//! fixed-capacity bloom filters guarantees zero false negatives within the
//! retained window at bounded memory cost. The explicit trade-offs:
//!
//! - An ID reused after it has aged out of all retained generations is not
//!   detected as a repeat
//! - A legitimately new ID can rarely collide and be rejected; callers log
//!   the rejection, it is never fatal

use std::collections::VecDeque;
use std::fmt;

use sha2::{Digest, Sha256};
use tracing::debug;

/// Designed false-positive rate per generation at full load
const TARGET_FP_RATE: f64 = 0.001;

/// One fixed-capacity bloom filter
///
/// Bit count and hash count are derived from the designed capacity and the
/// target false-positive rate; probing uses Kirsch-Mitzenmacher double
/// hashing over a single SHA-256 digest of the ID.
struct BloomGeneration {
	bits: Vec<u64>,
	bit_count: u64,
	hash_count: u32,
	inserted: usize,
	capacity: usize,
}

impl BloomGeneration {
	fn with_capacity(capacity: usize) -> Self {
		let n = capacity.max(1) as f64;
		let ln2 = std::f64::consts::LN_2;
		let bit_count = ((n * (1.0 / TARGET_FP_RATE).ln()) / (ln2 * ln2)).ceil() as u64;
		let bit_count = bit_count.max(64);
		let hash_count = ((bit_count as f64 / n) * ln2).round().clamp(1.0, 16.0) as u32;

		Self {
			bits: vec![0u64; bit_count.div_ceil(64) as usize],
			bit_count,
			hash_count,
			inserted: 0,
			capacity: capacity.max(1),
		}
	}

	fn hash_pair(id: &str) -> (u64, u64) {
		let digest = Sha256::digest(id.as_bytes());
		let mut h1 = [0u8; 8];
		let mut h2 = [0u8; 8];
		h1.copy_from_slice(&digest[0..8]);
		h2.copy_from_slice(&digest[8..16]);
		(u64::from_be_bytes(h1), u64::from_be_bytes(h2))
	}

	fn put(&mut self, id: &str) {
		let (h1, h2) = Self::hash_pair(id);
		for i in 0..self.hash_count {
			let bit = h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % self.bit_count;
			self.bits[(bit / 64) as usize] |= 1u64 << (bit % 64);
		}
		self.inserted += 1;
	}

	fn contains(&self, id: &str) -> bool {
		let (h1, h2) = Self::hash_pair(id);
		(0..self.hash_count).all(|i| {
			let bit = h1.wrapping_add(u64::from(i).wrapping_mul(h2)) % self.bit_count;
			self.bits[(bit / 64) as usize] & (1u64 << (bit % 64)) != 0
		})
	}

	/// Estimated load has reached the designed capacity
	fn is_full(&self) -> bool {
		self.inserted >= self.capacity
	}
}

/// Generational bloom filter over recently seen order IDs
///
/// All inserts go to the newest generation; membership checks consult every
/// retained generation. When the newest generation reaches its designed
/// capacity a fresh generation is started and the oldest beyond the ring
/// size is discarded, which is what bounds memory.
pub struct SlidingBloomFilter {
	generations: VecDeque<BloomGeneration>,
	generation_capacity: usize,
	max_generations: usize,
}

impl SlidingBloomFilter {
	/// Filter retaining roughly `expected_items` recent IDs across
	/// `generations` rotating filters
	pub fn new(expected_items: usize, generations: usize) -> Self {
		let max_generations = generations.max(1);
		let generation_capacity = (expected_items / max_generations).max(1);

		let mut ring = VecDeque::with_capacity(max_generations);
		ring.push_back(BloomGeneration::with_capacity(generation_capacity));

		Self {
			generations: ring,
			generation_capacity,
			max_generations,
		}
	}

	/// Whether `id` was inserted within the retained window
	///
	/// No false negatives within the window; rare false positives are the
	/// accepted cost of bounded memory.
	pub fn contains(&self, id: &str) -> bool {
		self.generations.iter().any(|g| g.contains(id))
	}

	/// Record `id`, rotating generations when the newest is at capacity
	pub fn put(&mut self, id: &str) {
		if self
			.generations
			.back()
			.is_none_or(|newest| newest.is_full())
		{
			self.generations
				.push_back(BloomGeneration::with_capacity(self.generation_capacity));
			while self.generations.len() > self.max_generations {
				self.generations.pop_front();
				debug!(
					retained = self.max_generations,
					"dedup filter rotated, oldest generation discarded"
				);
			}
		}

		if let Some(newest) = self.generations.back_mut() {
			newest.put(id);
		}
	}
}

impl fmt::Debug for SlidingBloomFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SlidingBloomFilter")
			.field("generations", &self.generations.len())
			.field("generation_capacity", &self.generation_capacity)
			.field("max_generations", &self.max_generations)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_no_false_negatives_within_window() {
		let mut filter = SlidingBloomFilter::new(1000, 2);

		for i in 0..1000 {
			filter.put(&format!("order_{i}"));
		}
		for i in 0..1000 {
			assert!(filter.contains(&format!("order_{i}")));
		}
	}

	#[test]
	fn test_fresh_ids_not_contained() {
		let mut filter = SlidingBloomFilter::new(10_000, 2);

		for i in 0..5000 {
			filter.put(&format!("order_{i}"));
		}

		let misses = (0..1000)
			.filter(|i| filter.contains(&format!("unseen_{i}")))
			.count();
		// Target rate is 0.1% per generation; allow generous slack
		assert!(misses < 20, "false positive count too high: {misses}");
	}

	#[test]
	fn test_generation_rotation_discards_old_ids() {
		// Two generations of 100 each: after 400 inserts the first
		// hundred IDs have aged out of the retained window
		let mut filter = SlidingBloomFilter::new(200, 2);

		for i in 0..400 {
			filter.put(&format!("order_{i}"));
		}

		for i in 300..400 {
			assert!(filter.contains(&format!("order_{i}")));
		}
		let stale_hits = (0..100)
			.filter(|i| filter.contains(&format!("order_{i}")))
			.count();
		assert!(stale_hits < 5, "aged-out IDs still reported: {stale_hits}");
	}
}
