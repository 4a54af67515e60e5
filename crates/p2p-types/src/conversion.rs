//! Numeric coercion for untyped payloads.
//!
//! View results and API responses carry integers as decimal strings, `0x` hex
//! strings or JSON numbers depending on the producer. Everything is folded
//! into [`U256`] here; nothing is ever routed through a float.

use alloy::primitives::U256;
use serde_json::Value;
use std::str::FromStr;

/// Parses a decimal or `0x`-prefixed hex string into a [`U256`].
pub fn parse_uint_str(value: &str) -> Result<U256, String> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		return Err("empty string".to_string());
	}
	if let Some(digits) = trimmed
		.strip_prefix("0x")
		.or_else(|| trimmed.strip_prefix("0X"))
	{
		if digits.is_empty() {
			return Ok(U256::ZERO);
		}
		return U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex integer: {}", e));
	}
	if !trimmed.chars().all(|c| c.is_ascii_digit()) {
		return Err(format!("not an unsigned integer: {}", trimmed));
	}
	U256::from_str(trimmed).map_err(|e| format!("invalid decimal integer: {}", e))
}

/// Coerces a JSON value into a [`U256`].
///
/// Accepts unsigned JSON numbers and strings understood by [`parse_uint_str`].
/// Negative numbers, floats, booleans and structured values are rejected.
pub fn coerce_uint(value: &Value) -> Result<U256, String> {
	match value {
		Value::Number(n) => n
			.as_u64()
			.map(U256::from)
			.ok_or_else(|| format!("not an unsigned integer: {}", n)),
		Value::String(s) => parse_uint_str(s),
		other => Err(format!("expected integer, found {}", json_type_name(other))),
	}
}

/// Returns the JSON type name used in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
