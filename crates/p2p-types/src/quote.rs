//! Quote types exchanged with the curator quote API.

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

/// Request for deposits able to fill an exact fiat amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
	/// Payment platform names, e.g. `venmo`, `wise`.
	pub payment_platforms: Vec<String>,
	/// ISO currency code, e.g. `USD`.
	pub fiat_currency: String,
	/// Fiat amount in the currency's smallest display unit, as a decimal string.
	pub amount: String,
	pub user: Address,
	pub recipient: Address,
	pub destination_chain_id: u64,
	pub destination_token: Address,
}

/// One viable deposit match returned by the quote collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
	pub deposit_id: U256,
	pub processor_name: String,
	pub payment_method: B256,
	pub payee_details: String,
	pub fiat_currency: B256,
	pub conversion_rate: U256,
	pub fiat_amount: U256,
	pub token_amount: U256,
	/// Gating signer for this rail; `None` when the rail is ungated.
	pub intent_gating_service: Option<Address>,
}

impl Quote {
	pub fn requires_gating(&self) -> bool {
		self.intent_gating_service
			.is_some_and(|service| service != Address::ZERO)
	}
}
