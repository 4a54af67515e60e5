//! Wiring of configured collaborators into flows and maker operations.

use crate::prover::FileProver;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use p2p_api::{GatingClient, GatingClientConfig, QuoteClient, QuoteClientConfig};
use p2p_catalog::{CatalogRegistry, PaymentMethodCatalog, StaticCatalog};
use p2p_config::P2pConfig;
use p2p_core::{
	gas_policy, CuratorQuotes, FlowConfig, FlowContext, IntentFlow, MakerClient, ProverInterface,
	Submitter,
};
use p2p_delivery::implementations::evm::{AlloyEscrow, AlloyEscrowConfig};
use p2p_delivery::{BaseFeeCache, EscrowInterface};
use p2p_types::{Address, QuoteRequest, B256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything a command needs, built once from configuration.
pub struct ClientService {
	config: P2pConfig,
	submitter: Arc<Submitter>,
	quotes: Arc<CuratorQuotes>,
	gating: Arc<GatingClient>,
	catalogs: CatalogRegistry,
}

impl ClientService {
	pub fn new(config: P2pConfig) -> Result<Self> {
		let signer: PrivateKeySigner = config
			.account
			.private_key
			.trim()
			.parse()
			.context("Invalid account private key")?;

		let escrow = AlloyEscrow::new(
			AlloyEscrowConfig {
				rpc_url: config.network.rpc_url.clone(),
				chain_id: config.network.chain_id,
				escrow: config.network.escrow_address,
				orchestrator: config.network.orchestrator_address,
				receipt_timeout: Duration::from_secs(config.network.receipt_timeout_secs),
				poll_interval: Duration::from_millis(config.network.poll_interval_ms),
			},
			signer,
		)
		.context("Failed to create escrow client")?;

		let submitter = Arc::new(Submitter::new(
			Arc::new(escrow),
			gas_policy(&config.gas),
			BaseFeeCache::new(Duration::from_secs(config.gas.base_fee_ttl_secs)),
		));

		let quotes = Arc::new(CuratorQuotes::new(QuoteClient::new(QuoteClientConfig {
			base_api_url: config.api.base_url.clone(),
			api_key: config.api.api_key.clone(),
			timeout_ms: config.api.timeout_ms,
		})));

		let mut gating_config = GatingClientConfig::new(config.api.base_url.clone());
		gating_config.api_key = config.api.api_key.clone();
		gating_config.authorization_token = config.api.authorization_token.clone();
		gating_config.timeout_ms = config.api.timeout_ms;
		let gating = Arc::new(GatingClient::new(gating_config));

		let mut catalogs = CatalogRegistry::new();
		if let Some(path) = &config.catalog.path {
			let catalog = StaticCatalog::from_file(path)
				.with_context(|| format!("Failed to load catalog {}", path.display()))?;
			info!(
				path = %path.display(),
				entries = catalog.len(),
				env = %config.network.environment,
				network = %config.network.name,
				"Loaded payment method catalog"
			);
			catalogs.register(
				config.network.environment,
				config.network.name.clone(),
				Arc::new(catalog),
			);
		}

		Ok(Self {
			config,
			submitter,
			quotes,
			gating,
			catalogs,
		})
	}

	pub fn config(&self) -> &P2pConfig {
		&self.config
	}

	pub fn catalogs(&self) -> &CatalogRegistry {
		&self.catalogs
	}

	pub fn submitter(&self) -> &Arc<Submitter> {
		&self.submitter
	}

	pub fn sender(&self) -> Address {
		self.submitter.escrow().sender()
	}

	/// Catalog for the configured environment and network. Without one,
	/// every mutating resolution fails with the empty key list.
	pub fn catalog(&self) -> Arc<dyn PaymentMethodCatalog> {
		let network = &self.config.network;
		self.catalogs
			.get(network.environment, &network.name)
			.unwrap_or_else(|| {
				warn!(
					env = %network.environment,
					network = %network.name,
					"No payment method catalog configured"
				);
				Arc::new(StaticCatalog::default())
			})
	}

	pub fn maker(&self) -> MakerClient {
		MakerClient::new(Arc::clone(&self.submitter))
	}

	fn context(&self, prover: Arc<dyn ProverInterface>) -> FlowContext {
		FlowContext {
			quotes: self.quotes.clone(),
			gating: self.gating.clone(),
			prover,
			catalog: self.catalog(),
			submitter: Arc::clone(&self.submitter),
		}
	}

	/// Fresh flow for quoting and signaling. Proofs are not available yet.
	pub fn new_flow(&self) -> IntentFlow {
		IntentFlow::new(
			FlowConfig::from_settings(&self.config.flow),
			self.context(Arc::new(FileProver::new(Vec::new()))),
		)
	}

	/// Flow picking up an open intent, proving with the given files.
	pub async fn resume_flow(
		&self,
		intent_hash: B256,
		proofs: Vec<PathBuf>,
	) -> Result<IntentFlow> {
		let flow = IntentFlow::resume(
			FlowConfig::from_settings(&self.config.flow),
			self.context(Arc::new(FileProver::new(proofs))),
			intent_hash,
		)
		.await
		.context("Failed to resume intent")?;
		Ok(flow)
	}

	/// Quote request for the configured chain, paying out to `recipient`
	/// or the signer.
	pub fn quote_request(
		&self,
		amount: String,
		fiat_currency: String,
		payment_platforms: Vec<String>,
		recipient: Option<Address>,
		destination_token: Address,
	) -> QuoteRequest {
		let user = self.sender();
		QuoteRequest {
			payment_platforms,
			fiat_currency,
			amount,
			user,
			recipient: recipient.unwrap_or(user),
			destination_chain_id: self.config.network.chain_id,
			destination_token,
		}
	}
}
