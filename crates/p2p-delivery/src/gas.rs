//! EIP-1559 fee policy.
//!
//! Fees are a pure function of the latest base fee. When the base fee cannot
//! be observed the policy falls back to fixed defaults instead of failing, so
//! a slow RPC never blocks a submission outright.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const GWEI: u64 = 1_000_000_000;

/// Fee bid for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasQuote {
	pub base_fee: U256,
	pub max_priority_fee_per_gas: U256,
	pub max_fee_per_gas: U256,
	pub is_congested: bool,
}

/// Thresholds and floors used to derive a [`GasQuote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasPolicy {
	pub congestion_threshold: U256,
	pub min_priority_fee: U256,
	pub min_max_fee: U256,
	pub fallback: GasQuote,
}

impl Default for GasPolicy {
	fn default() -> Self {
		Self {
			congestion_threshold: U256::from(5 * GWEI),
			min_priority_fee: U256::from(GWEI),
			min_max_fee: U256::from(2 * GWEI),
			fallback: GasQuote {
				base_fee: U256::from(GWEI),
				max_priority_fee_per_gas: U256::from(2 * GWEI),
				max_fee_per_gas: U256::from(4 * GWEI),
				is_congested: false,
			},
		}
	}
}

impl GasPolicy {
	pub fn is_congested(&self, base_fee: U256) -> bool {
		base_fee > self.congestion_threshold
	}

	/// Prices a transaction from an optional base fee observation.
	pub fn price(&self, base_fee: Option<U256>) -> GasQuote {
		let Some(base_fee) = base_fee else {
			warn!("Base fee unavailable, using fallback gas pricing");
			return self.fallback;
		};

		let is_congested = self.is_congested(base_fee);
		let multiplier = U256::from(if is_congested { 2u64 } else { 1u64 });
		let scaled = base_fee.saturating_mul(multiplier);

		let max_priority_fee_per_gas = (scaled / U256::from(10u64)).max(self.min_priority_fee);
		let max_fee_per_gas = (scaled.saturating_mul(U256::from(12u64)) / U256::from(10u64))
			.max(self.min_max_fee);

		debug!(
			%base_fee,
			is_congested,
			priority_fee = %max_priority_fee_per_gas,
			max_fee = %max_fee_per_gas,
			"Computed gas quote"
		);

		GasQuote {
			base_fee,
			max_priority_fee_per_gas,
			max_fee_per_gas,
			is_congested,
		}
	}
}

/// Pads a gas estimate: 130% when congested, 120% otherwise, rounded down.
pub fn gas_limit_with_buffer(estimate: u64, congested: bool) -> u64 {
	let percent: u128 = if congested { 130 } else { 120 };
	let padded = (estimate as u128 * percent) / 100;
	u64::try_from(padded).unwrap_or(u64::MAX)
}

/// Point-in-time cache for the latest base fee.
///
/// An entry older than `ttl` is never returned; callers must observe again.
#[derive(Debug)]
pub struct BaseFeeCache {
	ttl: Duration,
	entry: Mutex<Option<(U256, Instant)>>,
}

impl BaseFeeCache {
	/// One block on the networks the escrow is deployed to.
	pub const DEFAULT_TTL: Duration = Duration::from_secs(12);

	pub fn new(ttl: Duration) -> Self {
		Self {
			ttl,
			entry: Mutex::new(None),
		}
	}

	pub async fn get(&self) -> Option<U256> {
		let entry = self.entry.lock().await;
		entry
			.as_ref()
			.filter(|(_, observed_at)| observed_at.elapsed() < self.ttl)
			.map(|(fee, _)| *fee)
	}

	pub async fn put(&self, base_fee: U256) {
		*self.entry.lock().await = Some((base_fee, Instant::now()));
	}

	/// Returns the cached fee or runs `observe`, caching a successful result.
	pub async fn get_or_observe<F, Fut, E>(&self, observe: F) -> Result<U256, E>
	where
		F: FnOnce() -> Fut,
		Fut: std::future::Future<Output = Result<U256, E>>,
	{
		if let Some(fee) = self.get().await {
			return Ok(fee);
		}
		let fee = observe().await?;
		self.put(fee).await;
		Ok(fee)
	}
}

impl Default for BaseFeeCache {
	fn default() -> Self {
		Self::new(Self::DEFAULT_TTL)
	}
}
