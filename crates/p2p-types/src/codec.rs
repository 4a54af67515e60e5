//! Canonical 32-byte identifier encoding.
//!
//! On-chain keys such as payment-method hashes and fiat currency codes are
//! stored as `bytes32`. Two distinct encodings produce them: keccak-256 of
//! the name (payment methods) and right zero-padded ASCII (currency codes).
//! The two namespaces never overlap and callers must pick one explicitly.

use alloy::primitives::{keccak256, B256};
use thiserror::Error;

/// Errors raised while encoding a value into a 32-byte identifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodingError {
	#[error("Value is not a 32-byte hex string: {0}")]
	NotBytes32(String),
	#[error("Value is {len} bytes long, exceeding 32 bytes: {value}")]
	TooLong { value: String, len: usize },
	#[error("Invalid hex: {0}")]
	InvalidHex(String),
}

/// Returns true when `value` is `0x` followed by exactly 64 hex characters.
pub fn is_bytes32_hex(value: &str) -> bool {
	let Some(digits) = value
		.strip_prefix("0x")
		.or_else(|| value.strip_prefix("0X"))
	else {
		return false;
	};
	digits.len() == 64 && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parses a 32-byte hex string into a [`B256`].
pub fn parse_bytes32(value: &str) -> Result<B256, EncodingError> {
	if !is_bytes32_hex(value) {
		return Err(EncodingError::NotBytes32(value.to_string()));
	}
	let bytes = hex::decode(&value[2..]).map_err(|e| EncodingError::InvalidHex(e.to_string()))?;
	Ok(B256::from_slice(&bytes))
}

/// Returns `value` unchanged when it is already a 32-byte hex string.
///
/// Otherwise, when `hash_if_ascii` is set, returns the keccak-256 hash of the
/// UTF-8 bytes of `value`. Without the flag a non-hex input is rejected.
pub fn ensure_bytes32(value: &str, hash_if_ascii: bool) -> Result<B256, EncodingError> {
	if is_bytes32_hex(value) {
		return parse_bytes32(value);
	}
	if !hash_if_ascii {
		return Err(EncodingError::NotBytes32(value.to_string()));
	}
	Ok(keccak256(value.as_bytes()))
}

/// Left-aligns the UTF-8 bytes of `value` and zero-pads them to 32 bytes.
///
/// This is not the inverse of the hash path in [`ensure_bytes32`].
pub fn ascii_to_bytes32(value: &str) -> Result<B256, EncodingError> {
	let bytes = value.as_bytes();
	if bytes.len() > 32 {
		return Err(EncodingError::TooLong {
			value: value.to_string(),
			len: bytes.len(),
		});
	}
	let mut out = [0u8; 32];
	out[..bytes.len()].copy_from_slice(bytes);
	Ok(B256::from(out))
}

/// Decodes a zero-padded ASCII identifier back to text.
///
/// Returns `None` when the trimmed bytes are not valid UTF-8, which is the
/// case for hashed identifiers.
pub fn bytes32_to_ascii(value: &B256) -> Option<String> {
	let end = value
		.as_slice()
		.iter()
		.rposition(|b| *b != 0)
		.map(|i| i + 1)
		.unwrap_or(0);
	let text = std::str::from_utf8(&value.as_slice()[..end]).ok()?;
	if text.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
		Some(text.to_string())
	} else {
		None
	}
}
