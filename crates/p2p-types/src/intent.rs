//! Intent domain model.
//!
//! An intent reserves part of a deposit while the taker performs the fiat
//! payment off-chain. It ends either fulfilled (proof accepted, funds
//! released) or cancelled/pruned (reservation returned to the deposit).

use crate::DepositView;
use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// An intent signaled against a deposit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
	pub intent_hash: B256,
	pub owner: Address,
	pub to: Address,
	pub escrow: Address,
	pub deposit_id: U256,
	pub amount: U256,
	pub timestamp: U256,
	pub payment_method: B256,
	pub fiat_currency: B256,
	pub conversion_rate: U256,
	pub referrer: Address,
	pub referrer_fee: U256,
	pub post_intent_hook: Address,
	pub data: Bytes,
}

/// An intent together with the deposit it reserves against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentView {
	pub intent: Intent,
	pub deposit: DepositView,
}

/// The exact parameter tuple a gating signature is bound to.
///
/// Any difference between the tuple that was signed and the values submitted
/// on-chain invalidates the signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentTuple {
	pub processor_name: String,
	pub payee_details: String,
	pub deposit_id: U256,
	pub amount: U256,
	pub to_address: Address,
	pub payment_method: B256,
	pub fiat_currency: B256,
	pub conversion_rate: U256,
	pub chain_id: u64,
	pub orchestrator_address: Address,
	pub escrow_address: Address,
}

/// Time-bounded authorization issued by a gating service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatingSignature {
	pub signature: Bytes,
	/// Unix timestamp (seconds) after which the signature is worthless.
	pub signature_expiration: U256,
}

impl GatingSignature {
	/// True once `now` (Unix seconds) has reached the expiration.
	pub fn is_expired(&self, now: u64) -> bool {
		U256::from(now) >= self.signature_expiration
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_gating_signature_expiry() {
		let sig = GatingSignature {
			signature: Bytes::from(vec![1, 2, 3]),
			signature_expiration: U256::from(1_700_000_100u64),
		};
		assert!(!sig.is_expired(1_700_000_000));
		assert!(sig.is_expired(1_700_000_100));
		assert!(sig.is_expired(1_700_000_101));
	}

	#[test]
	fn test_far_future_expiration_never_expires() {
		let sig = GatingSignature {
			signature: Bytes::new(),
			signature_expiration: U256::MAX,
		};
		assert!(!sig.is_expired(u64::MAX));
	}
}
