//! In-memory catalog implementation.

use crate::{CatalogError, PaymentMethodCatalog};
use p2p_types::{ensure_bytes32, parse_bytes32, B256};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Catalog backed by a fixed name → hash map.
///
/// Keys are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
	entries: BTreeMap<String, B256>,
}

impl StaticCatalog {
	pub fn from_entries<I, K>(entries: I) -> Self
	where
		I: IntoIterator<Item = (K, B256)>,
		K: AsRef<str>,
	{
		Self {
			entries: entries
				.into_iter()
				.map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v))
				.collect(),
		}
	}

	/// Builds a catalog whose hashes are the keccak-256 of each lower-cased name.
	pub fn from_hashed_names<I, K>(names: I) -> Result<Self, CatalogError>
	where
		I: IntoIterator<Item = K>,
		K: AsRef<str>,
	{
		let mut entries = BTreeMap::new();
		for name in names {
			let key = name.as_ref().to_ascii_lowercase();
			let hash = ensure_bytes32(&key, true)?;
			entries.insert(key, hash);
		}
		Ok(Self { entries })
	}

	/// Parses a catalog document.
	///
	/// Two shapes are accepted per entry: `"venmo": "0x…"` and
	/// `"venmo": { "paymentMethodHash": "0x…" }`.
	pub fn from_json(contents: &str) -> Result<Self, CatalogError> {
		let document: Value =
			serde_json::from_str(contents).map_err(|e| CatalogError::Parse(e.to_string()))?;
		let object = document
			.as_object()
			.ok_or_else(|| CatalogError::Parse("catalog must be a JSON object".to_string()))?;

		let mut entries = BTreeMap::new();
		for (name, value) in object {
			let raw = match value {
				Value::String(s) => s.as_str(),
				Value::Object(inner) => inner
					.get("paymentMethodHash")
					.and_then(Value::as_str)
					.ok_or_else(|| {
						CatalogError::Parse(format!("entry '{}' has no paymentMethodHash", name))
					})?,
				_ => {
					return Err(CatalogError::Parse(format!(
						"entry '{}' must be a string or object",
						name
					)))
				}
			};
			entries.insert(name.to_ascii_lowercase(), parse_bytes32(raw)?);
		}

		Ok(Self { entries })
	}

	pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
		let contents = std::fs::read_to_string(path)?;
		Self::from_json(&contents)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl PaymentMethodCatalog for StaticCatalog {
	fn lookup(&self, name: &str) -> Option<B256> {
		self.entries.get(&name.to_ascii_lowercase()).copied()
	}

	fn keys(&self) -> Vec<String> {
		self.entries.keys().cloned().collect()
	}
}
