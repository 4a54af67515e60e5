//! Parsers from untyped view payloads to the canonical domain model.
//!
//! Payloads come from two producers: escrow view calls (ABI structs
//! serialized to JSON, integers as `0x` hex) and the curator API (integers
//! as decimal strings or numbers). Every numeric field is folded into
//! `U256`; a missing or null field is an error, never a default.

use p2p_types::{coerce_uint, json_type_name, parse_bytes32, Address, Bytes, B256, U256};
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;

mod deposit;
mod intent;
mod quote;

pub use deposit::{parse_deposit, parse_deposit_view, parse_payment_method_config};
pub use intent::{parse_intent, parse_intent_view};
pub use quote::{parse_quote, parse_quotes};

/// Errors that can occur while parsing a view payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
	#[error("Missing field: {0}")]
	MissingField(String),
	#[error("Invalid value for {field}: {reason}")]
	InvalidValue { field: String, reason: String },
	#[error("Invariant violated: {0}")]
	InvariantViolated(String),
}

/// Typed accessors over one JSON object, tracking its path for errors.
pub(crate) struct Fields<'a> {
	map: &'a Map<String, Value>,
	path: String,
}

impl<'a> Fields<'a> {
	pub fn new(value: &'a Value, path: impl Into<String>) -> Result<Self, ParseError> {
		let path = path.into();
		match value {
			Value::Object(map) => Ok(Self { map, path }),
			other => Err(ParseError::InvalidValue {
				field: if path.is_empty() { "<root>".to_string() } else { path },
				reason: format!("expected object, found {}", json_type_name(other)),
			}),
		}
	}

	pub fn path_of(&self, key: &str) -> String {
		if self.path.is_empty() {
			key.to_string()
		} else {
			format!("{}.{}", self.path, key)
		}
	}

	pub fn opt(&self, key: &str) -> Option<&'a Value> {
		self.map.get(key).filter(|v| !v.is_null())
	}

	pub fn get(&self, key: &str) -> Result<&'a Value, ParseError> {
		self.opt(key)
			.ok_or_else(|| ParseError::MissingField(self.path_of(key)))
	}

	fn invalid(&self, key: &str, reason: impl Into<String>) -> ParseError {
		ParseError::InvalidValue {
			field: self.path_of(key),
			reason: reason.into(),
		}
	}

	pub fn child(&self, key: &str) -> Result<Fields<'a>, ParseError> {
		Fields::new(self.get(key)?, self.path_of(key))
	}

	pub fn uint(&self, key: &str) -> Result<U256, ParseError> {
		coerce_uint(self.get(key)?).map_err(|reason| self.invalid(key, reason))
	}

	pub fn str(&self, key: &str) -> Result<&'a str, ParseError> {
		let value = self.get(key)?;
		value
			.as_str()
			.ok_or_else(|| self.invalid(key, format!("expected string, found {}", json_type_name(value))))
	}

	pub fn address(&self, key: &str) -> Result<Address, ParseError> {
		let raw = self.str(key)?;
		Address::from_str(raw).map_err(|e| self.invalid(key, e.to_string()))
	}

	pub fn bytes32(&self, key: &str) -> Result<B256, ParseError> {
		let raw = self.str(key)?;
		parse_bytes32(raw).map_err(|e| self.invalid(key, e.to_string()))
	}

	pub fn bytes(&self, key: &str) -> Result<Bytes, ParseError> {
		let raw = self.str(key)?;
		Bytes::from_str(raw).map_err(|e| self.invalid(key, e.to_string()))
	}

	pub fn bool(&self, key: &str) -> Result<bool, ParseError> {
		let value = self.get(key)?;
		value
			.as_bool()
			.ok_or_else(|| self.invalid(key, format!("expected boolean, found {}", json_type_name(value))))
	}

	pub fn array(&self, key: &str) -> Result<&'a Vec<Value>, ParseError> {
		let value = self.get(key)?;
		value
			.as_array()
			.ok_or_else(|| self.invalid(key, format!("expected array, found {}", json_type_name(value))))
	}

	/// Parses every element of an array field with `parse`, passing the
	/// element path along.
	pub fn each<T>(
		&self,
		key: &str,
		mut parse: impl FnMut(&'a Value, String) -> Result<T, ParseError>,
	) -> Result<Vec<T>, ParseError> {
		let path = self.path_of(key);
		self.array(key)?
			.iter()
			.enumerate()
			.map(|(i, item)| parse(item, format!("{}[{}]", path, i)))
			.collect()
	}
}
