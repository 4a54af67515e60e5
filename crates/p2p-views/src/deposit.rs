use crate::{Fields, ParseError};
use p2p_types::{
	Currency, Deposit, DepositFees, DepositView, IntentAmountRange, PaymentMethodConfig, U256,
	VerificationData,
};
use serde_json::Value;
use tracing::debug;

/// Parses a flat deposit payload carrying its own `depositId` and
/// `paymentMethods`.
pub fn parse_deposit(value: &Value) -> Result<Deposit, ParseError> {
	let fields = Fields::new(value, "")?;
	let deposit_id = fields.uint("depositId")?;
	let payment_methods = fields.each("paymentMethods", parse_payment_method_config_at)?;
	deposit_from_fields(&fields, deposit_id, payment_methods)
}

/// Parses the escrow's `DepositView` aggregate.
///
/// The id and payment methods live beside the inner `deposit` struct, not
/// inside it.
pub fn parse_deposit_view(value: &Value) -> Result<DepositView, ParseError> {
	let fields = Fields::new(value, "")?;
	let deposit_id = fields.uint("depositId")?;
	let payment_methods = fields.each("paymentMethods", parse_payment_method_config_at)?;
	let deposit = deposit_from_fields(&fields.child("deposit")?, deposit_id, payment_methods)?;

	let intent_hashes = fields.each("intentHashes", |item, path| {
		let raw = item.as_str().ok_or_else(|| ParseError::InvalidValue {
			field: path.clone(),
			reason: "expected bytes32 string".to_string(),
		})?;
		p2p_types::parse_bytes32(raw).map_err(|e| ParseError::InvalidValue {
			field: path,
			reason: e.to_string(),
		})
	})?;

	let view = DepositView {
		deposit,
		available_liquidity: fields.uint("availableLiquidity")?,
		intent_hashes,
	};
	debug!(
		deposit_id = %view.deposit.deposit_id,
		available_liquidity = %view.available_liquidity,
		intents = view.intent_hashes.len(),
		"Parsed deposit view"
	);
	Ok(view)
}

pub fn parse_payment_method_config(value: &Value) -> Result<PaymentMethodConfig, ParseError> {
	parse_payment_method_config_at(value, String::new())
}

fn parse_payment_method_config_at(
	value: &Value,
	path: String,
) -> Result<PaymentMethodConfig, ParseError> {
	let fields = Fields::new(value, path)?;
	let verification = fields.child("verificationData")?;

	Ok(PaymentMethodConfig {
		payment_method: fields.bytes32("paymentMethod")?,
		verification_data: VerificationData {
			intent_gating_service: verification.address("intentGatingService")?,
			payee_details: verification.bytes32("payeeDetails")?,
			data: verification.bytes("data")?,
		},
		currencies: fields.each("currencies", |item, path| {
			let currency = Fields::new(item, path)?;
			Ok(Currency {
				code: currency.bytes32("code")?,
				min_conversion_rate: currency.uint("minConversionRate")?,
			})
		})?,
	})
}

fn deposit_from_fields(
	fields: &Fields<'_>,
	deposit_id: U256,
	payment_methods: Vec<PaymentMethodConfig>,
) -> Result<Deposit, ParseError> {
	let range = fields.child("intentAmountRange")?;

	let deposit = Deposit {
		deposit_id,
		depositor: fields.address("depositor")?,
		delegate: fields.address("delegate")?,
		token: fields.address("token")?,
		amount: fields.uint("amount")?,
		intent_amount_range: IntentAmountRange {
			min: range.uint("min")?,
			max: range.uint("max")?,
		},
		accepting_intents: fields.bool("acceptingIntents")?,
		remaining_deposits: fields.uint("remainingDeposits")?,
		outstanding_intent_amount: fields.uint("outstandingIntentAmount")?,
		fees: DepositFees {
			maker_protocol_fee: fields.uint("makerProtocolFee")?,
			reserved_maker_fees: fields.uint("reservedMakerFees")?,
			accrued_maker_fees: fields.uint("accruedMakerFees")?,
			accrued_referrer_fees: fields.uint("accruedReferrerFees")?,
		},
		intent_guardian: fields.address("intentGuardian")?,
		referrer: fields.address("referrer")?,
		referrer_fee: fields.uint("referrerFee")?,
		payment_methods,
	};

	if !deposit.check_invariant() {
		return Err(ParseError::InvariantViolated(format!(
			"deposit {}: remainingDeposits {} + outstandingIntentAmount {} exceeds amount {}",
			deposit.deposit_id,
			deposit.remaining_deposits,
			deposit.outstanding_intent_amount,
			deposit.amount
		)));
	}

	Ok(deposit)
}
