//! On-chain delivery for escrow and orchestrator writes.
//!
//! This crate owns the contract ABI, the fee policy, per-action submission
//! tracking and the [`EscrowInterface`] through which the intent flow reads
//! views and sends transactions.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use p2p_types::{TransactionReceipt, TxAction};
use thiserror::Error;

pub mod abi;
pub mod gas;
pub mod implementations;
pub mod tracker;

pub use gas::{gas_limit_with_buffer, BaseFeeCache, GasPolicy, GasQuote, GWEI};
pub use tracker::{StepStatus, SubmissionGuard, SubmissionRegistry, TrackerError, TxStatus};

/// Errors that can occur during on-chain delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// The contract reverted, or simulation failed.
	#[error("Contract error: {0}")]
	Contract(String),
	/// Transport or RPC failure.
	#[error("Network error: {0}")]
	Network(String),
	#[error("Tracker error: {0}")]
	Tracker(#[from] TrackerError),
	/// Calldata or return data could not be encoded or decoded.
	#[error("Encoding error: {0}")]
	Encoding(String),
}

impl DeliveryError {
	/// Classifies an RPC error message, separating reverts from transport
	/// failures.
	pub fn from_rpc(context: &str, message: impl std::fmt::Display) -> Self {
		let message = message.to_string();
		if message.contains("revert") {
			Self::Contract(format!("{}: {}", context, message))
		} else {
			Self::Network(format!("{}: {}", context, message))
		}
	}
}

/// A state-changing call against the escrow or orchestrator.
#[derive(Debug, Clone)]
pub enum EscrowCall {
	Signal(abi::SignalIntentParams),
	Fulfill(abi::FulfillIntentParams),
	Cancel(B256),
	Release(B256),
	Withdraw(U256),
}

impl EscrowCall {
	pub fn action(&self) -> TxAction {
		match self {
			Self::Signal(_) => TxAction::Signal,
			Self::Fulfill(_) => TxAction::Fulfill,
			Self::Cancel(_) => TxAction::Cancel,
			Self::Release(_) => TxAction::Release,
			Self::Withdraw(_) => TxAction::Withdraw,
		}
	}

	pub fn calldata(&self) -> Bytes {
		let data = match self {
			Self::Signal(params) => abi::IOrchestrator::signalIntentCall {
				params: params.clone(),
			}
			.abi_encode(),
			Self::Fulfill(params) => abi::IOrchestrator::fulfillIntentCall {
				params: params.clone(),
			}
			.abi_encode(),
			Self::Cancel(intent_hash) => abi::IOrchestrator::cancelIntentCall {
				intentHash: *intent_hash,
			}
			.abi_encode(),
			Self::Release(intent_hash) => abi::IOrchestrator::releaseFundsToPayerCall {
				intentHash: *intent_hash,
			}
			.abi_encode(),
			Self::Withdraw(deposit_id) => abi::IEscrow::withdrawDepositCall {
				depositId: *deposit_id,
			}
			.abi_encode(),
		};
		data.into()
	}

	/// Intent writes go to the orchestrator, deposit writes to the escrow.
	pub fn target(&self, escrow: Address, orchestrator: Address) -> Address {
		match self {
			Self::Withdraw(_) => escrow,
			_ => orchestrator,
		}
	}
}

/// Reads and writes against the deployed escrow.
#[async_trait]
pub trait EscrowInterface: Send + Sync {
	fn chain_id(&self) -> u64;

	fn escrow_address(&self) -> Address;

	fn orchestrator_address(&self) -> Address;

	/// Account that signs submissions.
	fn sender(&self) -> Address;

	/// Base fee of the latest block.
	async fn base_fee(&self) -> Result<U256, DeliveryError>;

	async fn estimate_gas(&self, call: &EscrowCall) -> Result<u64, DeliveryError>;

	/// Signs and broadcasts `call`, returning the transaction hash.
	async fn send(
		&self,
		call: &EscrowCall,
		fees: &GasQuote,
		gas_limit: u64,
	) -> Result<B256, DeliveryError>;

	async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, DeliveryError>;

	/// `getDeposit` result as JSON, ready for the view parsers.
	async fn get_deposit(&self, deposit_id: U256) -> Result<serde_json::Value, DeliveryError>;

	/// `getIntent` result as JSON, ready for the view parsers.
	async fn get_intent(&self, intent_hash: B256) -> Result<serde_json::Value, DeliveryError>;

	/// Open intent of `owner`, if any.
	async fn account_intent(&self, owner: Address) -> Result<Option<B256>, DeliveryError>;

	async fn deposit_counter(&self) -> Result<U256, DeliveryError>;
}

/// Finds the hash of the intent created by a `signalIntent` receipt.
pub fn signaled_intent_hash(receipt: &TransactionReceipt, orchestrator: Address) -> Option<B256> {
	receipt
		.logs
		.iter()
		.filter(|log| log.address == orchestrator)
		.find(|log| log.topics.first() == Some(&abi::IOrchestrator::IntentSignaled::SIGNATURE_HASH))
		.and_then(|log| log.topics.get(1).copied())
}

#[cfg(test)]
mod tests {
	use super::*;
	use p2p_types::Log;

	fn receipt_with(logs: Vec<Log>) -> TransactionReceipt {
		TransactionReceipt {
			hash: B256::repeat_byte(0xee),
			block_number: 1,
			success: true,
			logs,
		}
	}

	#[test]
	fn test_signaled_intent_hash_from_log() {
		let orchestrator = Address::repeat_byte(0x22);
		let intent_hash = B256::repeat_byte(0xab);
		let receipt = receipt_with(vec![
			Log {
				address: Address::repeat_byte(0x99),
				topics: vec![B256::repeat_byte(0x01)],
				data: Bytes::new(),
			},
			Log {
				address: orchestrator,
				topics: vec![
					abi::IOrchestrator::IntentSignaled::SIGNATURE_HASH,
					intent_hash,
					B256::ZERO,
					B256::ZERO,
				],
				data: Bytes::new(),
			},
		]);

		assert_eq!(signaled_intent_hash(&receipt, orchestrator), Some(intent_hash));
	}

	#[test]
	fn test_signaled_intent_hash_ignores_other_emitters() {
		let receipt = receipt_with(vec![Log {
			address: Address::repeat_byte(0x99),
			topics: vec![
				abi::IOrchestrator::IntentSignaled::SIGNATURE_HASH,
				B256::repeat_byte(0xab),
			],
			data: Bytes::new(),
		}]);

		assert_eq!(signaled_intent_hash(&receipt, Address::repeat_byte(0x22)), None);
	}

	#[test]
	fn test_calls_route_to_contracts() {
		let escrow = Address::repeat_byte(0x01);
		let orchestrator = Address::repeat_byte(0x02);

		assert_eq!(EscrowCall::Withdraw(U256::from(1u64)).target(escrow, orchestrator), escrow);
		assert_eq!(EscrowCall::Cancel(B256::ZERO).target(escrow, orchestrator), orchestrator);
		assert_eq!(EscrowCall::Release(B256::ZERO).target(escrow, orchestrator), orchestrator);
	}

	#[test]
	fn test_calldata_selectors() {
		let cancel = EscrowCall::Cancel(B256::repeat_byte(0x05)).calldata();
		assert_eq!(&cancel[..4], &abi::IOrchestrator::cancelIntentCall::SELECTOR);
		assert_eq!(&cancel[4..], B256::repeat_byte(0x05).as_slice());

		let withdraw = EscrowCall::Withdraw(U256::from(9u64)).calldata();
		assert_eq!(&withdraw[..4], &abi::IEscrow::withdrawDepositCall::SELECTOR);
		assert_eq!(EscrowCall::Withdraw(U256::ZERO).action(), TxAction::Withdraw);
	}

	#[test]
	fn test_fulfill_calldata_round_trips() {
		let params = abi::FulfillIntentParams {
			paymentProof: Bytes::from(vec![1, 2, 3]),
			intentHash: B256::repeat_byte(0x07),
			verificationData: Bytes::new(),
			postIntentHookData: Bytes::new(),
		};
		let calldata = EscrowCall::Fulfill(params).calldata();
		let decoded = abi::IOrchestrator::fulfillIntentCall::abi_decode(&calldata).unwrap();
		assert_eq!(decoded.params.intentHash, B256::repeat_byte(0x07));
		assert_eq!(decoded.params.paymentProof.as_ref(), &[1, 2, 3]);
	}

	#[test]
	fn test_rpc_error_classification() {
		assert!(matches!(
			DeliveryError::from_rpc("send", "execution reverted: not enough liquidity"),
			DeliveryError::Contract(_)
		));
		assert!(matches!(
			DeliveryError::from_rpc("send", "connection refused"),
			DeliveryError::Network(_)
		));
	}
}
