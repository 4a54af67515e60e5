//! Alloy-based escrow client.
//!
//! Submits escrow and orchestrator transactions through a JSON-RPC provider
//! that signs with a local private key, and decodes view results into JSON
//! for the view parsers.

use crate::{abi, DeliveryError, EscrowCall, EscrowInterface, GasQuote};
use alloy::eips::BlockNumberOrTag;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use alloy::sol_types::SolCall;
use alloy::transports::layers::RetryBackoffLayer;
use async_trait::async_trait;
use p2p_types::{truncate_hash, Log, TransactionReceipt};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for [`AlloyEscrow`].
#[derive(Debug, Clone)]
pub struct AlloyEscrowConfig {
	pub rpc_url: String,
	pub chain_id: u64,
	pub escrow: Address,
	/// Falls back to the escrow address when unset.
	pub orchestrator: Option<Address>,
	pub receipt_timeout: Duration,
	pub poll_interval: Duration,
}

/// Escrow client backed by an alloy provider with a wallet filler.
pub struct AlloyEscrow {
	provider: DynProvider,
	chain_id: u64,
	escrow: Address,
	orchestrator: Address,
	sender: Address,
	receipt_timeout: Duration,
	poll_interval: Duration,
}

impl AlloyEscrow {
	pub fn new(config: AlloyEscrowConfig, signer: PrivateKeySigner) -> Result<Self, DeliveryError> {
		let url = config
			.rpc_url
			.parse()
			.map_err(|e| DeliveryError::Network(format!("Invalid RPC URL: {}", e)))?;

		let signer = signer.with_chain_id(Some(config.chain_id));
		let sender = signer.address();
		let wallet = EthereumWallet::from(signer);

		// Retries rate limits and transient transport failures only
		let retry_layer = RetryBackoffLayer::new(5, 1000, 10);
		let client = RpcClient::builder().layer(retry_layer).http(url);

		let provider = ProviderBuilder::new()
			.wallet(wallet)
			.connect_client(client)
			.erased();

		Ok(Self {
			provider,
			chain_id: config.chain_id,
			escrow: config.escrow,
			orchestrator: config.orchestrator.unwrap_or(config.escrow),
			sender,
			receipt_timeout: config.receipt_timeout,
			poll_interval: config.poll_interval,
		})
	}

	fn request(&self, call: &EscrowCall) -> TransactionRequest {
		TransactionRequest::default()
			.from(self.sender)
			.to(call.target(self.escrow, self.orchestrator))
			.input(call.calldata().into())
	}

	async fn view(&self, to: Address, calldata: Vec<u8>) -> Result<Bytes, DeliveryError> {
		self.provider
			.call(TransactionRequest::default().to(to).input(calldata.into()))
			.await
			.map_err(|e| DeliveryError::from_rpc("eth_call failed", e))
	}

	fn convert_receipt(receipt: &alloy::rpc::types::TransactionReceipt) -> TransactionReceipt {
		let logs = receipt
			.inner
			.logs()
			.iter()
			.map(|log| Log {
				address: log.address(),
				topics: log.topics().to_vec(),
				data: log.inner.data.data.clone(),
			})
			.collect();

		TransactionReceipt {
			hash: receipt.transaction_hash,
			block_number: receipt.block_number.unwrap_or(0),
			success: receipt.status(),
			logs,
		}
	}
}

#[async_trait]
impl EscrowInterface for AlloyEscrow {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	fn escrow_address(&self) -> Address {
		self.escrow
	}

	fn orchestrator_address(&self) -> Address {
		self.orchestrator
	}

	fn sender(&self) -> Address {
		self.sender
	}

	async fn base_fee(&self) -> Result<U256, DeliveryError> {
		let block = self
			.provider
			.get_block_by_number(BlockNumberOrTag::Latest)
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get latest block: {}", e)))?
			.ok_or_else(|| DeliveryError::Network("Latest block not found".to_string()))?;

		block
			.header
			.base_fee_per_gas
			.map(U256::from)
			.ok_or_else(|| DeliveryError::Network("Latest block has no base fee".to_string()))
	}

	async fn estimate_gas(&self, call: &EscrowCall) -> Result<u64, DeliveryError> {
		self.provider
			.estimate_gas(self.request(call))
			.await
			.map_err(|e| DeliveryError::from_rpc("Failed to estimate gas", e))
	}

	async fn send(
		&self,
		call: &EscrowCall,
		fees: &GasQuote,
		gas_limit: u64,
	) -> Result<B256, DeliveryError> {
		let request = self
			.request(call)
			.gas_limit(gas_limit)
			.max_fee_per_gas(fees.max_fee_per_gas.saturating_to::<u128>())
			.max_priority_fee_per_gas(fees.max_priority_fee_per_gas.saturating_to::<u128>());

		debug!(
			action = %call.action(),
			to = %call.target(self.escrow, self.orchestrator),
			gas_limit,
			max_fee = %fees.max_fee_per_gas,
			"Sending transaction"
		);

		let pending = self
			.provider
			.send_transaction(request)
			.await
			.map_err(|e| DeliveryError::from_rpc("Failed to send transaction", e))?;

		let tx_hash = *pending.tx_hash();
		info!(
			action = %call.action(),
			tx_hash = %truncate_hash(&tx_hash.to_string()),
			"Submitted transaction"
		);
		Ok(tx_hash)
	}

	async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, DeliveryError> {
		let start = tokio::time::Instant::now();

		loop {
			if start.elapsed() > self.receipt_timeout {
				return Err(DeliveryError::Network(format!(
					"Timeout waiting for receipt of {} after {}s",
					truncate_hash(&hash.to_string()),
					self.receipt_timeout.as_secs()
				)));
			}

			match self.provider.get_transaction_receipt(hash).await {
				Ok(Some(receipt)) => return Ok(Self::convert_receipt(&receipt)),
				Ok(None) => {
					tokio::time::sleep(self.poll_interval).await;
				}
				Err(e) => {
					return Err(DeliveryError::Network(format!(
						"Failed to get receipt: {}",
						e
					)));
				}
			}
		}
	}

	async fn get_deposit(&self, deposit_id: U256) -> Result<serde_json::Value, DeliveryError> {
		let data = self
			.view(
				self.escrow,
				abi::IEscrow::getDepositCall {
					depositId: deposit_id,
				}
				.abi_encode(),
			)
			.await?;
		let view = abi::IEscrow::getDepositCall::abi_decode_returns(&data)
			.map_err(|e| DeliveryError::Encoding(format!("getDeposit returned: {}", e)))?;
		serde_json::to_value(&view).map_err(|e| DeliveryError::Encoding(e.to_string()))
	}

	async fn get_intent(&self, intent_hash: B256) -> Result<serde_json::Value, DeliveryError> {
		let data = self
			.view(
				self.orchestrator,
				abi::IOrchestrator::getIntentCall {
					intentHash: intent_hash,
				}
				.abi_encode(),
			)
			.await?;
		let view = abi::IOrchestrator::getIntentCall::abi_decode_returns(&data)
			.map_err(|e| DeliveryError::Encoding(format!("getIntent returned: {}", e)))?;
		serde_json::to_value(&view).map_err(|e| DeliveryError::Encoding(e.to_string()))
	}

	async fn account_intent(&self, owner: Address) -> Result<Option<B256>, DeliveryError> {
		let data = self
			.view(
				self.orchestrator,
				abi::IOrchestrator::getAccountIntentCall { account: owner }.abi_encode(),
			)
			.await?;
		let hash = abi::IOrchestrator::getAccountIntentCall::abi_decode_returns(&data)
			.map_err(|e| DeliveryError::Encoding(format!("getAccountIntent returned: {}", e)))?;
		Ok((hash != B256::ZERO).then_some(hash))
	}

	async fn deposit_counter(&self) -> Result<U256, DeliveryError> {
		let data = self
			.view(self.escrow, abi::IEscrow::depositCounterCall {}.abi_encode())
			.await?;
		abi::IEscrow::depositCounterCall::abi_decode_returns(&data)
			.map_err(|e| DeliveryError::Encoding(format!("depositCounter returned: {}", e)))
	}
}
