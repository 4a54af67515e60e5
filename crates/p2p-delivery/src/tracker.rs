//! Transaction status tracking.
//!
//! Each on-chain write goes through a [`TxStatus`] with two steps, signing
//! and mining. A status that has failed is never resumed; the caller starts a
//! fresh attempt instead. The [`SubmissionRegistry`] keeps the latest status
//! of each action per intent and lets only one of them be in flight at a time.

use dashmap::DashMap;
use p2p_types::{truncate_hash, TransactionReceipt, TxAction, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackerError {
	#[error("{action} already in flight for {key}")]
	InFlight { key: String, action: TxAction },
	#[error("invalid tracker step: {0}")]
	InvalidStep(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StepStatus {
	#[default]
	Idle,
	Loading,
	Success,
	Error,
}

/// Signing and mining progress of a single submission attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
	pub signing: StepStatus,
	pub mining: StepStatus,
	pub hash: Option<B256>,
	pub error: Option<String>,
}

impl TxStatus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn is_loading(&self) -> bool {
		self.signing == StepStatus::Loading || self.mining == StepStatus::Loading
	}

	pub fn is_terminal(&self) -> bool {
		self.mining == StepStatus::Success || self.mining == StepStatus::Error
	}

	pub fn begin_signing(&mut self) -> Result<(), TrackerError> {
		if self.mining != StepStatus::Idle || self.signing != StepStatus::Idle {
			return Err(TrackerError::InvalidStep(format!(
				"cannot start signing with signing={:?}, mining={:?}",
				self.signing, self.mining
			)));
		}
		self.signing = StepStatus::Loading;
		Ok(())
	}

	pub fn signed(&mut self, hash: B256) -> Result<(), TrackerError> {
		if self.signing != StepStatus::Loading {
			return Err(TrackerError::InvalidStep(format!(
				"signed while signing={:?}",
				self.signing
			)));
		}
		self.signing = StepStatus::Success;
		self.mining = StepStatus::Loading;
		self.hash = Some(hash);
		Ok(())
	}

	pub fn mined(&mut self, receipt: &TransactionReceipt) -> Result<(), TrackerError> {
		if self.mining != StepStatus::Loading {
			return Err(TrackerError::InvalidStep(format!(
				"mined while mining={:?}",
				self.mining
			)));
		}
		self.mining = StepStatus::Success;
		self.hash = Some(receipt.hash);
		Ok(())
	}

	/// Marks both steps failed. Terminal for this attempt.
	pub fn fail(&mut self, reason: impl Into<String>) {
		self.signing = StepStatus::Error;
		self.mining = StepStatus::Error;
		self.error = Some(reason.into());
	}
}

type Attempts = HashMap<TxAction, TxStatus>;

/// Live submission statuses keyed by intent, one slot per action.
#[derive(Debug, Clone, Default)]
pub struct SubmissionRegistry {
	entries: Arc<DashMap<String, Attempts>>,
}

impl SubmissionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Starts a fresh attempt for `action` on `key` with signing in progress.
	///
	/// Rejected while any attempt for the same key is loading, whatever its
	/// action. A finished or failed attempt for `action` is replaced.
	pub fn begin(&self, key: impl Into<String>, action: TxAction) -> Result<SubmissionGuard, TrackerError> {
		let key = key.into();
		let mut fresh = TxStatus::new();
		fresh.begin_signing()?;

		// The entry lock covers the check and the insert
		let mut attempts = self.entries.entry(key.clone()).or_default();
		if let Some((&live, _)) = attempts.iter().find(|(_, status)| status.is_loading()) {
			warn!(key = %key, %action, in_flight = %live, "Rejected concurrent submission");
			return Err(TrackerError::InFlight { key, action: live });
		}
		attempts.insert(action, fresh);
		drop(attempts);

		debug!(key = %key, %action, "Started submission attempt");
		Ok(SubmissionGuard {
			entries: Arc::clone(&self.entries),
			key,
			action,
		})
	}

	pub fn status(&self, key: &str, action: TxAction) -> Option<TxStatus> {
		self.entries
			.get(key)
			.and_then(|attempts| attempts.get(&action).cloned())
	}

	pub fn is_in_flight(&self, key: &str, action: TxAction) -> bool {
		self.status(key, action).is_some_and(|s| s.is_loading())
	}
}

/// Handle on one submission attempt.
///
/// Dropping the guard before the attempt reaches a terminal state discards
/// the attempt; nothing completes it in the background.
#[derive(Debug)]
pub struct SubmissionGuard {
	entries: Arc<DashMap<String, Attempts>>,
	key: String,
	action: TxAction,
}

impl SubmissionGuard {
	pub fn action(&self) -> TxAction {
		self.action
	}

	pub fn status(&self) -> Option<TxStatus> {
		self.entries
			.get(&self.key)
			.and_then(|attempts| attempts.get(&self.action).cloned())
	}

	fn update<T>(&self, f: impl FnOnce(&mut TxStatus) -> Result<T, TrackerError>) -> Result<T, TrackerError> {
		let mut attempts = self
			.entries
			.get_mut(&self.key)
			.ok_or_else(|| TrackerError::InvalidStep("attempt was discarded".to_string()))?;
		let status = attempts
			.get_mut(&self.action)
			.ok_or_else(|| TrackerError::InvalidStep("attempt was discarded".to_string()))?;
		f(status)
	}

	pub fn signed(&self, hash: B256) -> Result<(), TrackerError> {
		self.update(|status| status.signed(hash))?;
		info!(
			key = %self.key,
			action = %self.action,
			tx_hash = %truncate_hash(&hash.to_string()),
			"Transaction signed, awaiting inclusion"
		);
		Ok(())
	}

	pub fn mined(&self, receipt: &TransactionReceipt) -> Result<(), TrackerError> {
		self.update(|status| status.mined(receipt))?;
		info!(
			key = %self.key,
			action = %self.action,
			tx_hash = %truncate_hash(&receipt.hash.to_string()),
			block = receipt.block_number,
			"Transaction mined"
		);
		Ok(())
	}

	pub fn fail(&self, reason: impl Into<String>) {
		let reason = reason.into();
		warn!(key = %self.key, action = %self.action, error = %reason, "Submission failed");
		if let Err(e) = self.update(|status| {
			status.fail(reason);
			Ok(())
		}) {
			debug!(key = %self.key, action = %self.action, error = %e, "Failure not recorded");
		}
	}
}

impl Drop for SubmissionGuard {
	fn drop(&mut self) {
		let mut abandoned = false;
		if let Some(mut attempts) = self.entries.get_mut(&self.key) {
			if attempts.get(&self.action).is_some_and(|status| !status.is_terminal()) {
				attempts.remove(&self.action);
				abandoned = true;
			}
		}
		self.entries.remove_if(&self.key, |_, attempts| attempts.is_empty());
		if abandoned {
			debug!(key = %self.key, action = %self.action, "Discarded unfinished submission");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn receipt(hash: B256) -> TransactionReceipt {
		TransactionReceipt {
			hash,
			block_number: 10,
			success: true,
			logs: vec![],
		}
	}

	#[test]
	fn test_status_happy_path() {
		let mut status = TxStatus::new();
		status.begin_signing().unwrap();
		assert_eq!(status.signing, StepStatus::Loading);

		status.signed(B256::repeat_byte(1)).unwrap();
		assert_eq!(status.signing, StepStatus::Success);
		assert_eq!(status.mining, StepStatus::Loading);

		status.mined(&receipt(B256::repeat_byte(1))).unwrap();
		assert_eq!(status.mining, StepStatus::Success);
		assert_eq!(status.hash, Some(B256::repeat_byte(1)));
		assert!(status.is_terminal());
	}

	#[test]
	fn test_signing_requires_idle_mining() {
		let mut status = TxStatus::new();
		status.begin_signing().unwrap();
		status.signed(B256::ZERO).unwrap();
		assert!(status.begin_signing().is_err());
	}

	#[test]
	fn test_failed_status_is_not_resumed() {
		let mut status = TxStatus::new();
		status.begin_signing().unwrap();
		status.fail("user rejected");
		assert_eq!(status.signing, StepStatus::Error);
		assert_eq!(status.mining, StepStatus::Error);
		assert!(status.begin_signing().is_err());
		assert!(status.signed(B256::ZERO).is_err());
	}

	#[test]
	fn test_duplicate_submission_rejected_while_mining() {
		let registry = SubmissionRegistry::new();
		let guard = registry.begin("intent-1", TxAction::Fulfill).unwrap();
		guard.signed(B256::repeat_byte(2)).unwrap();

		let err = registry.begin("intent-1", TxAction::Fulfill).unwrap_err();
		assert_eq!(
			err,
			TrackerError::InFlight {
				key: "intent-1".to_string(),
				action: TxAction::Fulfill
			}
		);

		// Other intents are independent
		assert!(registry.begin("intent-2", TxAction::Fulfill).is_ok());
		drop(guard);
	}

	#[test]
	fn test_other_action_rejected_while_intent_in_flight() {
		let registry = SubmissionRegistry::new();
		let fulfill = registry.begin("intent-1", TxAction::Fulfill).unwrap();
		fulfill.signed(B256::repeat_byte(5)).unwrap();

		for action in [TxAction::Cancel, TxAction::Release] {
			let err = registry.begin("intent-1", action).unwrap_err();
			assert_eq!(
				err,
				TrackerError::InFlight {
					key: "intent-1".to_string(),
					action: TxAction::Fulfill
				}
			);
		}
		assert!(registry.status("intent-1", TxAction::Cancel).is_none());

		fulfill.mined(&receipt(B256::repeat_byte(5))).unwrap();
		let cancel = registry.begin("intent-1", TxAction::Cancel).unwrap();
		assert!(registry.is_in_flight("intent-1", TxAction::Cancel));
		// Finished fulfill keeps its slot next to the new attempt
		let fulfilled = registry.status("intent-1", TxAction::Fulfill).unwrap();
		assert_eq!(fulfilled.mining, StepStatus::Success);

		cancel.fail("reverted");
		assert!(registry.begin("intent-1", TxAction::Release).is_ok());
	}

	#[test]
	fn test_fail_after_discard_is_ignored() {
		let registry = SubmissionRegistry::new();
		let guard = registry.begin("intent-1", TxAction::Signal).unwrap();
		registry.entries.remove("intent-1");

		guard.fail("reverted");
		assert!(guard.status().is_none());
		assert!(registry.status("intent-1", TxAction::Signal).is_none());
	}

	#[test]
	fn test_failed_attempt_replaced_by_fresh_one() {
		let registry = SubmissionRegistry::new();
		{
			let guard = registry.begin("intent-1", TxAction::Signal).unwrap();
			guard.fail("reverted");
		}
		let status = registry.status("intent-1", TxAction::Signal).unwrap();
		assert_eq!(status.mining, StepStatus::Error);

		let retry = registry.begin("intent-1", TxAction::Signal).unwrap();
		let status = retry.status().unwrap();
		assert_eq!(status.signing, StepStatus::Loading);
		assert_eq!(status.mining, StepStatus::Idle);
		assert!(status.error.is_none());
	}

	#[test]
	fn test_dropped_guard_discards_attempt() {
		let registry = SubmissionRegistry::new();
		let guard = registry.begin("intent-1", TxAction::Release).unwrap();
		guard.signed(B256::repeat_byte(3)).unwrap();
		assert!(registry.is_in_flight("intent-1", TxAction::Release));

		drop(guard);
		assert!(registry.status("intent-1", TxAction::Release).is_none());
		assert!(registry.begin("intent-1", TxAction::Release).is_ok());
	}

	#[test]
	fn test_mined_attempt_survives_drop() {
		let registry = SubmissionRegistry::new();
		let guard = registry.begin("intent-1", TxAction::Cancel).unwrap();
		guard.signed(B256::repeat_byte(4)).unwrap();
		guard.mined(&receipt(B256::repeat_byte(4))).unwrap();
		drop(guard);

		let status = registry.status("intent-1", TxAction::Cancel).unwrap();
		assert_eq!(status.mining, StepStatus::Success);
		assert!(!registry.is_in_flight("intent-1", TxAction::Cancel));
	}
}
