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

use serde::{Deserialize, Serialize};

/// Matching core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
	/// Instrument identifier
	pub product_id: String,
	/// Total recent order IDs the dedup filter is sized for
	pub dedup_capacity: usize,
	/// Number of rotating dedup filter generations
	pub dedup_generations: usize,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			product_id: "BTC-USDT".to_string(),
			dedup_capacity: 1_000_000,
			dedup_generations: 2,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables
	pub fn from_env() -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}

	/// Load configuration from file
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("MATCHING"))
			.build()?;

		cfg.try_deserialize()
	}
}
