//! Bounded retries for off-chain reads.

use crate::FlowError;
use backoff::backoff::Backoff;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Linear backoff: attempt `n` is followed by a wait of `n * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	/// Total attempts including the first; at least 1.
	pub max_attempts: u32,
	pub step: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			step: Duration::from_secs(1),
		}
	}
}

impl RetryPolicy {
	pub fn new(max_attempts: u32, step: Duration) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			step,
		}
	}

	/// Fresh delay schedule for one call.
	pub fn backoff(&self) -> LinearBackoff {
		LinearBackoff {
			step: self.step,
			attempt: 0,
			max_attempts: self.max_attempts,
		}
	}

	/// Runs `op` until it succeeds, fails with a non-retryable error, or
	/// exhausts the attempt bound. The last error is returned as-is.
	pub async fn run<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, FlowError>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T, FlowError>>,
	{
		let mut backoff = self.backoff();
		loop {
			let err = match op().await {
				Ok(value) => return Ok(value),
				Err(err) if !err.is_retryable() => return Err(err),
				Err(err) => err,
			};

			let Some(delay) = backoff.next_backoff() else {
				warn!(
					operation,
					attempts = self.max_attempts,
					error = %err,
					"Retries exhausted"
				);
				return Err(err);
			};
			warn!(
				operation,
				attempt = backoff.attempt,
				max_attempts = self.max_attempts,
				delay_ms = delay.as_millis() as u64,
				error = %err,
				"Retrying"
			);
			tokio::time::sleep(delay).await;
		}
	}
}

/// Delay schedule growing by `step` per failed attempt. Runs dry once
/// `max_attempts` attempts have been made.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
	step: Duration,
	attempt: u32,
	max_attempts: u32,
}

impl Backoff for LinearBackoff {
	fn next_backoff(&mut self) -> Option<Duration> {
		if self.attempt + 1 >= self.max_attempts {
			return None;
		}
		self.attempt += 1;
		Some(self.step.saturating_mul(self.attempt))
	}

	fn reset(&mut self) {
		self.attempt = 0;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use p2p_api::{ApiError, NetworkError};
	use std::sync::atomic::{AtomicU32, Ordering};

	fn timeout() -> FlowError {
		FlowError::Api(ApiError::Network(NetworkError::Timeout(1)))
	}

	#[test]
	fn test_linear_schedule_runs_dry_at_bound() {
		let policy = RetryPolicy::new(4, Duration::from_millis(250));
		let mut backoff = policy.backoff();
		assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(250)));
		assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(500)));
		assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(750)));
		assert_eq!(backoff.next_backoff(), None);

		backoff.reset();
		assert_eq!(backoff.next_backoff(), Some(Duration::from_millis(250)));
	}

	#[test]
	fn test_single_attempt_never_waits() {
		let mut backoff = RetryPolicy::new(1, Duration::from_secs(1)).backoff();
		assert_eq!(backoff.next_backoff(), None);
	}

	#[test]
	fn test_attempts_floor_at_one() {
		assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
	}

	#[tokio::test]
	async fn test_retries_up_to_bound() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(3, Duration::ZERO);

		let result: Result<(), _> = policy
			.run("quote", || {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err(timeout()) }
			})
			.await;

		assert!(result.unwrap_err().is_retryable());
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn test_succeeds_after_transient_failure() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(3, Duration::ZERO);

		let result = policy
			.run("gate-sign", || {
				let n = calls.fetch_add(1, Ordering::SeqCst);
				async move {
					if n == 0 {
						Err(timeout())
					} else {
						Ok(n)
					}
				}
			})
			.await;

		assert_eq!(result.unwrap(), 1);
	}

	#[tokio::test]
	async fn test_non_retryable_error_stops_immediately() {
		let calls = AtomicU32::new(0);
		let policy = RetryPolicy::new(5, Duration::ZERO);

		let result: Result<(), _> = policy
			.run("quote", || {
				calls.fetch_add(1, Ordering::SeqCst);
				async { Err(FlowError::validation("amount", "zero")) }
			})
			.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
