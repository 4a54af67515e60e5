//! Deposit domain model.
//!
//! A deposit is collateral locked on-chain by a maker and offered against a
//! set of payment methods, each with its accepted fiat currencies.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// Minimum and maximum token amount a single intent may reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentAmountRange {
	pub min: U256,
	pub max: U256,
}

impl IntentAmountRange {
	pub fn contains(&self, amount: U256) -> bool {
		amount >= self.min && amount <= self.max
	}
}

/// Fee accounting carried by a deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositFees {
	pub maker_protocol_fee: U256,
	pub reserved_maker_fees: U256,
	pub accrued_maker_fees: U256,
	pub accrued_referrer_fees: U256,
}

/// On-chain collateral offered by a maker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deposit {
	pub deposit_id: U256,
	pub depositor: Address,
	pub delegate: Address,
	pub token: Address,
	pub amount: U256,
	pub intent_amount_range: IntentAmountRange,
	pub accepting_intents: bool,
	pub remaining_deposits: U256,
	pub outstanding_intent_amount: U256,
	pub fees: DepositFees,
	pub intent_guardian: Address,
	pub referrer: Address,
	pub referrer_fee: U256,
	pub payment_methods: Vec<PaymentMethodConfig>,
}

impl Deposit {
	/// Checks `remaining_deposits + outstanding_intent_amount <= amount`.
	pub fn check_invariant(&self) -> bool {
		self.remaining_deposits
			.checked_add(self.outstanding_intent_amount)
			.is_some_and(|total| total <= self.amount)
	}

	/// Finds the configuration for a payment method hash.
	pub fn payment_method(&self, method: &B256) -> Option<&PaymentMethodConfig> {
		self.payment_methods
			.iter()
			.find(|config| &config.payment_method == method)
	}

	/// Whether an intent of `amount` could be signaled against this deposit.
	pub fn can_fill(&self, amount: U256) -> bool {
		self.accepting_intents
			&& self.intent_amount_range.contains(amount)
			&& amount <= self.remaining_deposits
	}
}

/// Aggregate returned by the deposit view function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositView {
	pub deposit: Deposit,
	pub available_liquidity: U256,
	pub intent_hashes: Vec<B256>,
}

/// Data the verifier needs to check a payment made over one rail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationData {
	/// Signer whose authorization is required to signal intents, zero when ungated.
	pub intent_gating_service: Address,
	/// Hash of the maker's payee details on the payment rail.
	pub payee_details: B256,
	pub data: Bytes,
}

/// A fiat currency accepted by a payment method with its floor rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Currency {
	pub code: B256,
	pub min_conversion_rate: U256,
}

/// A payment rail a deposit accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodConfig {
	pub payment_method: B256,
	pub verification_data: VerificationData,
	pub currencies: Vec<Currency>,
}

impl PaymentMethodConfig {
	/// Intents over this rail need a gating-service signature.
	pub fn requires_gating(&self) -> bool {
		self.verification_data.intent_gating_service != Address::ZERO
	}

	pub fn currency(&self, code: &B256) -> Option<&Currency> {
		self.currencies.iter().find(|c| &c.code == code)
	}
}
