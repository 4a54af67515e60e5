//! Configuration types for the on-ramp client.

use p2p_catalog::Environment;
use p2p_types::Address;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete client configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct P2pConfig {
	#[serde(default = "default_log_level")]
	pub log_level: String,
	pub network: NetworkConfig,
	pub account: AccountConfig,
	pub api: ApiConfig,
	#[serde(default)]
	pub flow: FlowSettings,
	#[serde(default)]
	pub gas: GasSettings,
	#[serde(default)]
	pub catalog: CatalogSettings,
}

/// Chain and contract settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
	/// Network name used to select a payment method catalog
	pub name: String,
	pub chain_id: u64,
	pub rpc_url: String,
	pub escrow_address: Address,
	/// Defaults to the escrow address when unset
	#[serde(default)]
	pub orchestrator_address: Option<Address>,
	#[serde(default = "default_environment")]
	pub environment: Environment,
	#[serde(default = "default_receipt_timeout_secs")]
	pub receipt_timeout_secs: u64,
	#[serde(default = "default_poll_interval_ms")]
	pub poll_interval_ms: u64,
}

/// Signing account
#[derive(Clone, Deserialize, Serialize)]
pub struct AccountConfig {
	pub private_key: String,
}

impl std::fmt::Debug for AccountConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AccountConfig")
			.field("private_key", &"<redacted>")
			.finish()
	}
}

/// Off-chain API settings shared by the gating service and the curator
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	pub base_url: String,
	#[serde(default)]
	pub api_key: Option<String>,
	#[serde(default)]
	pub authorization_token: Option<String>,
	#[serde(default = "default_api_timeout_ms")]
	pub timeout_ms: u64,
}

/// Intent flow behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlowSettings {
	/// Attempts per off-chain read, including the first
	#[serde(default = "default_max_attempts")]
	pub max_attempts: u32,
	/// Linear backoff step; attempt `n` waits `n * step`
	#[serde(default = "default_backoff_step_ms")]
	pub backoff_step_ms: u64,
	#[serde(default = "default_true")]
	pub enforce_single_intent: bool,
	/// Tag byte prepended to encoded proofs, when the verifier expects one
	#[serde(default)]
	pub proof_tag: Option<u8>,
}

impl Default for FlowSettings {
	fn default() -> Self {
		Self {
			max_attempts: default_max_attempts(),
			backoff_step_ms: default_backoff_step_ms(),
			enforce_single_intent: true,
			proof_tag: None,
		}
	}
}

/// Fee policy, in gwei
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GasSettings {
	pub congestion_threshold_gwei: u64,
	pub min_priority_fee_gwei: u64,
	pub min_max_fee_gwei: u64,
	pub fallback_base_fee_gwei: u64,
	pub fallback_priority_fee_gwei: u64,
	pub fallback_max_fee_gwei: u64,
	pub base_fee_ttl_secs: u64,
}

impl Default for GasSettings {
	fn default() -> Self {
		Self {
			congestion_threshold_gwei: 5,
			min_priority_fee_gwei: 1,
			min_max_fee_gwei: 2,
			fallback_base_fee_gwei: 1,
			fallback_priority_fee_gwei: 2,
			fallback_max_fee_gwei: 4,
			base_fee_ttl_secs: 12,
		}
	}
}

/// Payment method catalog source
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogSettings {
	/// JSON catalog file for the configured environment and network
	#[serde(default)]
	pub path: Option<PathBuf>,
}

fn default_log_level() -> String {
	"info".to_string()
}

fn default_environment() -> Environment {
	Environment::Production
}

fn default_receipt_timeout_secs() -> u64 {
	120
}

fn default_poll_interval_ms() -> u64 {
	2_000
}

fn default_api_timeout_ms() -> u64 {
	15_000
}

fn default_max_attempts() -> u32 {
	3
}

fn default_backoff_step_ms() -> u64 {
	1_000
}

fn default_true() -> bool {
	true
}
