use crate::{Fields, ParseError};
use p2p_types::{ascii_to_bytes32, ensure_bytes32, is_bytes32_hex, parse_bytes32, Address, Quote, U256};
use serde_json::Value;
use std::str::FromStr;

/// Parses one curator quote.
///
/// Intent-level fields may sit in a nested `intent` object or at the top
/// level; the nested object wins. When the quote carries no
/// `paymentMethodHash` the hash is derived from the processor name, which is
/// only good enough for display and filtering.
pub fn parse_quote(value: &Value) -> Result<Quote, ParseError> {
	parse_quote_at(value, String::new())
}

pub fn parse_quotes(values: &[Value]) -> Result<Vec<Quote>, ParseError> {
	values
		.iter()
		.enumerate()
		.map(|(i, value)| parse_quote_at(value, format!("quotes[{}]", i)))
		.collect()
}

struct QuoteFields<'a> {
	outer: Fields<'a>,
	intent: Option<Fields<'a>>,
}

impl<'a> QuoteFields<'a> {
	fn pick(&self, key: &str) -> &Fields<'a> {
		match &self.intent {
			Some(intent) if intent.opt(key).is_some() => intent,
			_ => &self.outer,
		}
	}

	fn uint(&self, key: &str) -> Result<U256, ParseError> {
		self.pick(key).uint(key)
	}

	fn str(&self, key: &str) -> Result<&'a str, ParseError> {
		self.pick(key).str(key)
	}

	fn opt_str(&self, key: &str) -> Result<Option<&'a str>, ParseError> {
		let fields = self.pick(key);
		match fields.opt(key) {
			Some(_) => fields.str(key).map(Some),
			None => Ok(None),
		}
	}
}

fn parse_quote_at(value: &Value, path: String) -> Result<Quote, ParseError> {
	let outer = Fields::new(value, path)?;
	let intent = match outer.opt("intent") {
		Some(_) => Some(outer.child("intent")?),
		None => None,
	};
	let fields = QuoteFields { outer, intent };

	let processor_name = fields.str("processorName")?.to_ascii_lowercase();

	let payment_method = match fields.opt_str("paymentMethodHash")? {
		Some(raw) => parse_bytes32(raw).map_err(|e| ParseError::InvalidValue {
			field: fields.pick("paymentMethodHash").path_of("paymentMethodHash"),
			reason: e.to_string(),
		})?,
		None => ensure_bytes32(&processor_name, true).map_err(|e| ParseError::InvalidValue {
			field: fields.pick("processorName").path_of("processorName"),
			reason: e.to_string(),
		})?,
	};

	let currency_key = if fields.pick("fiatCurrencyCode").opt("fiatCurrencyCode").is_some() {
		"fiatCurrencyCode"
	} else {
		"fiatCurrency"
	};
	let currency = fields.str(currency_key)?;
	let fiat_currency = if is_bytes32_hex(currency) {
		parse_bytes32(currency).map_err(|e| e.to_string())
	} else {
		ascii_to_bytes32(&currency.to_ascii_uppercase()).map_err(|e| e.to_string())
	}
	.map_err(|reason| ParseError::InvalidValue {
		field: fields.pick(currency_key).path_of(currency_key),
		reason,
	})?;

	let intent_gating_service = match fields.opt_str("intentGatingService")? {
		Some(raw) => Some(Address::from_str(raw).map_err(|e| ParseError::InvalidValue {
			field: fields.pick("intentGatingService").path_of("intentGatingService"),
			reason: e.to_string(),
		})?),
		None => None,
	};

	Ok(Quote {
		deposit_id: fields.uint("depositId")?,
		processor_name,
		payment_method,
		payee_details: fields.str("payeeDetails")?.to_string(),
		fiat_currency,
		conversion_rate: fields.uint("conversionRate")?,
		fiat_amount: fields.uint("fiatAmount")?,
		token_amount: fields.uint("tokenAmount")?,
		intent_gating_service,
	})
}
