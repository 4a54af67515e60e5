//! Intent lifecycle orchestration.
//!
//! [`IntentFlow`] drives one intent from quote to release or cancellation,
//! validating every state change against the transition table in
//! [`state`]. [`MakerClient`] covers the deposit owner's side: reading
//! deposits, releasing funds to a payer and withdrawing.

use async_trait::async_trait;
use p2p_api::QuoteClient;
use p2p_config::{FlowSettings, GasSettings};
use p2p_delivery::{GasPolicy, GasQuote, GWEI};
use p2p_proof::ProofArtifact;
use p2p_types::{IntentTuple, Quote, QuoteRequest, B256, U256};
use std::time::Duration;

pub mod error;
pub mod flow;
pub mod maker;
pub mod retry;
pub mod state;
pub mod submit;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ErrorKind, FlowError};
pub use flow::{FlowContext, IntentFlow, SignaledIntent};
pub use maker::MakerClient;
pub use retry::RetryPolicy;
pub use state::{FailureKind, FlowState, Transition};
pub use submit::Submitter;

/// Source of viable deposit matches for a fiat amount.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
	async fn fetch_quotes(&self, request: &QuoteRequest) -> Result<Vec<Quote>, FlowError>;
}

/// External prover producing payment attestations for an intent.
#[async_trait]
pub trait ProverInterface: Send + Sync {
	async fn prove(
		&self,
		intent_hash: B256,
		intent: &IntentTuple,
	) -> Result<Vec<ProofArtifact>, FlowError>;
}

/// Quote provider backed by the curator API.
pub struct CuratorQuotes {
	client: QuoteClient,
}

impl CuratorQuotes {
	pub fn new(client: QuoteClient) -> Self {
		Self { client }
	}
}

#[async_trait]
impl QuoteProvider for CuratorQuotes {
	async fn fetch_quotes(&self, request: &QuoteRequest) -> Result<Vec<Quote>, FlowError> {
		let raw = self.client.fetch_exact_fiat(request).await?;
		Ok(p2p_views::parse_quotes(&raw)?)
	}
}

/// Behavior knobs for [`IntentFlow`].
#[derive(Debug, Clone)]
pub struct FlowConfig {
	pub retry: RetryPolicy,
	/// Refuse to signal while the sender already has an open intent.
	pub enforce_single_intent: bool,
	pub proof_tag: Option<u8>,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			retry: RetryPolicy::default(),
			enforce_single_intent: true,
			proof_tag: None,
		}
	}
}

impl FlowConfig {
	pub fn from_settings(settings: &FlowSettings) -> Self {
		Self {
			retry: RetryPolicy::new(
				settings.max_attempts,
				Duration::from_millis(settings.backoff_step_ms),
			),
			enforce_single_intent: settings.enforce_single_intent,
			proof_tag: settings.proof_tag,
		}
	}
}

/// Builds the fee policy from gwei-denominated settings.
pub fn gas_policy(settings: &GasSettings) -> GasPolicy {
	let gwei = |n: u64| U256::from(n).saturating_mul(U256::from(GWEI));
	GasPolicy {
		congestion_threshold: gwei(settings.congestion_threshold_gwei),
		min_priority_fee: gwei(settings.min_priority_fee_gwei),
		min_max_fee: gwei(settings.min_max_fee_gwei),
		fallback: GasQuote {
			base_fee: gwei(settings.fallback_base_fee_gwei),
			max_priority_fee_per_gas: gwei(settings.fallback_priority_fee_gwei),
			max_fee_per_gas: gwei(settings.fallback_max_fee_gwei),
			is_congested: false,
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_default_settings_match_default_policy() {
		assert_eq!(gas_policy(&GasSettings::default()), GasPolicy::default());
	}

	#[test]
	fn test_flow_config_from_settings() {
		let settings = FlowSettings {
			max_attempts: 0,
			backoff_step_ms: 250,
			enforce_single_intent: false,
			proof_tag: Some(2),
		};
		let config = FlowConfig::from_settings(&settings);
		assert_eq!(config.retry.max_attempts, 1);
		assert_eq!(config.retry.step, Duration::from_millis(250));
		assert!(!config.enforce_single_intent);
		assert_eq!(config.proof_tag, Some(2));
	}
}
