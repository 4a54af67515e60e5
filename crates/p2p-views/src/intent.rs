use crate::{parse_deposit_view, Fields, ParseError};
use p2p_types::{Intent, IntentView, B256};
use serde_json::Value;

/// Parses a flat intent payload that carries its own `intentHash`.
pub fn parse_intent(value: &Value) -> Result<Intent, ParseError> {
	let fields = Fields::new(value, "")?;
	let intent_hash = fields.bytes32("intentHash")?;
	intent_from_fields(&fields, intent_hash)
}

/// Parses the orchestrator's `IntentView`: the hash at the top level, the
/// intent struct and the deposit view beside it.
pub fn parse_intent_view(value: &Value) -> Result<IntentView, ParseError> {
	let fields = Fields::new(value, "")?;
	let intent_hash = fields.bytes32("intentHash")?;
	let intent = intent_from_fields(&fields.child("intent")?, intent_hash)?;

	let deposit = parse_deposit_view(fields.get("deposit")?).map_err(|e| nest(e, "deposit"))?;
	if deposit.deposit.deposit_id != intent.deposit_id {
		return Err(ParseError::InvariantViolated(format!(
			"intent references deposit {} but view carries deposit {}",
			intent.deposit_id, deposit.deposit.deposit_id
		)));
	}

	Ok(IntentView { intent, deposit })
}

fn intent_from_fields(fields: &Fields<'_>, intent_hash: B256) -> Result<Intent, ParseError> {
	Ok(Intent {
		intent_hash,
		owner: fields.address("owner")?,
		to: fields.address("to")?,
		escrow: fields.address("escrow")?,
		deposit_id: fields.uint("depositId")?,
		amount: fields.uint("amount")?,
		timestamp: fields.uint("timestamp")?,
		payment_method: fields.bytes32("paymentMethod")?,
		fiat_currency: fields.bytes32("fiatCurrency")?,
		conversion_rate: fields.uint("conversionRate")?,
		referrer: fields.address("referrer")?,
		referrer_fee: fields.uint("referrerFee")?,
		post_intent_hook: fields.address("postIntentHook")?,
		data: fields.bytes("data")?,
	})
}

/// Prefixes the field path of an error raised by a nested parser.
fn nest(error: ParseError, prefix: &str) -> ParseError {
	match error {
		ParseError::MissingField(path) => ParseError::MissingField(format!("{}.{}", prefix, path)),
		ParseError::InvalidValue { field, reason } => ParseError::InvalidValue {
			field: format!("{}.{}", prefix, field),
			reason,
		},
		other => other,
	}
}
