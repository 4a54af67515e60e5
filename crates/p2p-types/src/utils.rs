//! Formatting and clock helpers shared across crates.

/// Truncate a hash or long identifier for display purposes.
///
/// Shows the first 6 and last 4 characters with an ellipsis in between,
/// leaving strings of 12 characters or fewer untouched.
///
/// # Examples
/// - `"0xa096c418fd1192ba7f5b506beea682a633f9ab82911fa3d7a249b8d80889a0b4"` becomes `"0xa096...a0b4"`
/// - `"0x12345"` remains `"0x12345"`
pub fn truncate_hash(hash: &str) -> String {
	if hash.len() <= 12 {
		hash.to_string()
	} else {
		format!("{}...{}", &hash[..6], &hash[hash.len() - 4..])
	}
}

/// Adds a `0x` prefix unless one is already present.
pub fn with_0x_prefix(value: &str) -> String {
	if value.starts_with("0x") {
		value.to_string()
	} else {
		format!("0x{}", value)
	}
}

/// Current Unix time in seconds.
pub fn now_unix() -> u64 {
	chrono::Utc::now().timestamp().max(0) as u64
}
