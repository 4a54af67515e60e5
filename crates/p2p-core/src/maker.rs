//! Deposit owner operations and escrow reads.

use crate::{FlowError, Submitter};
use p2p_delivery::EscrowCall;
use p2p_types::{
	truncate_hash, Address, DepositView, IntentView, TransactionReceipt, B256, U256,
};
use p2p_views::{parse_deposit_view, parse_intent_view};
use std::sync::Arc;
use tracing::info;

pub struct MakerClient {
	submitter: Arc<Submitter>,
}

impl MakerClient {
	pub fn new(submitter: Arc<Submitter>) -> Self {
		Self { submitter }
	}

	pub async fn deposit(&self, deposit_id: U256) -> Result<DepositView, FlowError> {
		let raw = self.submitter.escrow().get_deposit(deposit_id).await?;
		let view = parse_deposit_view(&raw)?;
		if view.deposit.depositor == Address::ZERO {
			return Err(FlowError::validation(
				"deposit_id",
				format!("deposit {} does not exist", deposit_id),
			));
		}
		Ok(view)
	}

	/// Number of deposits ever created; the next deposit gets this id.
	pub async fn deposit_counter(&self) -> Result<U256, FlowError> {
		Ok(self.submitter.escrow().deposit_counter().await?)
	}

	pub async fn account_intent(&self, owner: Address) -> Result<Option<B256>, FlowError> {
		Ok(self.submitter.escrow().account_intent(owner).await?)
	}

	pub async fn intent(&self, intent_hash: B256) -> Result<IntentView, FlowError> {
		let raw = self.submitter.escrow().get_intent(intent_hash).await?;
		let view = parse_intent_view(&raw)?;
		if view.intent.owner == Address::ZERO {
			return Err(FlowError::validation(
				"intent_hash",
				format!("no open intent {}", intent_hash),
			));
		}
		Ok(view)
	}

	/// Withdraws the remaining liquidity of a deposit the sender controls.
	pub async fn withdraw_deposit(&self, deposit_id: U256) -> Result<TransactionReceipt, FlowError> {
		let view = self.deposit(deposit_id).await?;
		self.ensure_controls(&view, "deposit_id")?;

		let receipt = self
			.submitter
			.submit(&format!("deposit-{}", deposit_id), EscrowCall::Withdraw(deposit_id))
			.await?;
		info!(
			%deposit_id,
			remaining = %view.deposit.remaining_deposits,
			tx_hash = %truncate_hash(&receipt.hash.to_string()),
			"Withdrew deposit"
		);
		Ok(receipt)
	}

	/// Releases an intent's funds to its payer without a payment proof.
	pub async fn release_funds_to_payer(
		&self,
		intent_hash: B256,
	) -> Result<TransactionReceipt, FlowError> {
		let view = self.intent(intent_hash).await?;
		self.ensure_controls(&view.deposit, "intent_hash")?;

		let receipt = self
			.submitter
			.submit(&intent_hash.to_string(), EscrowCall::Release(intent_hash))
			.await?;
		info!(
			intent_hash = %truncate_hash(&intent_hash.to_string()),
			amount = %view.intent.amount,
			to = %view.intent.to,
			tx_hash = %truncate_hash(&receipt.hash.to_string()),
			"Released funds to payer"
		);
		Ok(receipt)
	}

	fn ensure_controls(&self, view: &DepositView, field: &str) -> Result<(), FlowError> {
		let sender = self.submitter.escrow().sender();
		let deposit = &view.deposit;
		if deposit.depositor == sender || deposit.delegate == sender {
			Ok(())
		} else {
			Err(FlowError::validation(
				field,
				format!(
					"deposit {} is controlled by {}, not {}",
					deposit.deposit_id, deposit.depositor, sender
				),
			))
		}
	}
}
