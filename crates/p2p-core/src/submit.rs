//! Tracked on-chain submission shared by the intent flow and maker client.

use p2p_delivery::{
	gas_limit_with_buffer, BaseFeeCache, DeliveryError, EscrowCall, EscrowInterface, GasPolicy,
	GasQuote, SubmissionGuard, SubmissionRegistry,
};
use p2p_types::{truncate_hash, TransactionReceipt};
use std::sync::Arc;
use tracing::{info, warn};

/// Prices, sends and confirms escrow writes, one live attempt per key.
pub struct Submitter {
	escrow: Arc<dyn EscrowInterface>,
	policy: GasPolicy,
	base_fee: BaseFeeCache,
	registry: SubmissionRegistry,
}

impl Submitter {
	pub fn new(escrow: Arc<dyn EscrowInterface>, policy: GasPolicy, base_fee: BaseFeeCache) -> Self {
		Self {
			escrow,
			policy,
			base_fee,
			registry: SubmissionRegistry::new(),
		}
	}

	pub fn escrow(&self) -> &Arc<dyn EscrowInterface> {
		&self.escrow
	}

	pub fn registry(&self) -> &SubmissionRegistry {
		&self.registry
	}

	/// Current fee bid. Falls back to the policy defaults when the base fee
	/// cannot be read.
	pub async fn gas_quote(&self) -> GasQuote {
		let escrow = &self.escrow;
		match self.base_fee.get_or_observe(|| escrow.base_fee()).await {
			Ok(base_fee) => self.policy.price(Some(base_fee)),
			Err(e) => {
				warn!(error = %e, "Failed to read base fee");
				self.policy.price(None)
			}
		}
	}

	/// Submits `call` and waits for it to be mined.
	///
	/// Errors are returned immediately; nothing is resubmitted. A reverted
	/// receipt is a [`DeliveryError::Contract`].
	pub async fn submit(&self, key: &str, call: EscrowCall) -> Result<TransactionReceipt, DeliveryError> {
		let guard = self.registry.begin(key, call.action())?;
		let result = self.submit_tracked(&guard, &call).await;
		if let Err(e) = &result {
			guard.fail(e.to_string());
		}
		result
	}

	async fn submit_tracked(
		&self,
		guard: &SubmissionGuard,
		call: &EscrowCall,
	) -> Result<TransactionReceipt, DeliveryError> {
		let fees = self.gas_quote().await;
		let estimate = self.escrow.estimate_gas(call).await?;
		let gas_limit = gas_limit_with_buffer(estimate, fees.is_congested);

		let hash = self.escrow.send(call, &fees, gas_limit).await?;
		guard.signed(hash)?;

		let receipt = self.escrow.wait_for_receipt(hash).await?;
		if !receipt.success {
			return Err(DeliveryError::Contract(format!(
				"{} transaction {} reverted",
				call.action(),
				truncate_hash(&hash.to_string())
			)));
		}
		guard.mined(&receipt)?;

		info!(
			action = %call.action(),
			tx_hash = %truncate_hash(&receipt.hash.to_string()),
			block = receipt.block_number,
			congested = fees.is_congested,
			"Submission confirmed"
		);
		Ok(receipt)
	}
}
