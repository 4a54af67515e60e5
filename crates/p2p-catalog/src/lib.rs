//! Payment method catalog resolution.
//!
//! Maps human-readable processor names (`venmo`, `wise`, ...) to the
//! canonical `bytes32` identifiers the escrow stores. Catalogs are injected
//! as a lookup capability; the resolver never cares where one came from.
//!
//! Two resolution paths exist on purpose. Read paths fall back to hashing the
//! name when the catalog has no entry, which may not match the on-chain value.
//! Mutating paths use [`resolve_payment_method_hash_from_catalog`], which
//! refuses to guess.

use p2p_types::{ascii_to_bytes32, ensure_bytes32, is_bytes32_hex, parse_bytes32, EncodingError, B256};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub mod catalog;

pub use catalog::StaticCatalog;

/// Errors that can occur while resolving catalog identifiers.
#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("Unknown payment processor '{name}'; available processors: {}", .available.join(", "))]
	UnknownProcessor { name: String, available: Vec<String> },
	#[error("Encoding error: {0}")]
	Encoding(#[from] EncodingError),
	#[error("Catalog parse error: {0}")]
	Parse(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Lookup capability for a payment method catalog.
pub trait PaymentMethodCatalog: Send + Sync {
	/// Returns the stored hash for a lower-cased processor name.
	fn lookup(&self, name: &str) -> Option<B256>;

	/// All processor names the catalog knows, sorted.
	fn keys(&self) -> Vec<String>;
}

/// Deployment environment a catalog belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	Production,
	Staging,
	Local,
}

impl fmt::Display for Environment {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Production => write!(f, "production"),
			Self::Staging => write!(f, "staging"),
			Self::Local => write!(f, "local"),
		}
	}
}

impl FromStr for Environment {
	type Err = CatalogError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"production" | "prod" => Ok(Self::Production),
			"staging" => Ok(Self::Staging),
			"local" => Ok(Self::Local),
			other => Err(CatalogError::Parse(format!("Unknown environment: {}", other))),
		}
	}
}

/// Catalogs keyed by environment and network name.
#[derive(Default, Clone)]
pub struct CatalogRegistry {
	catalogs: HashMap<(Environment, String), Arc<dyn PaymentMethodCatalog>>,
}

impl CatalogRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_catalog(
		mut self,
		env: Environment,
		network: impl Into<String>,
		catalog: Arc<dyn PaymentMethodCatalog>,
	) -> Self {
		self.register(env, network, catalog);
		self
	}

	pub fn register(
		&mut self,
		env: Environment,
		network: impl Into<String>,
		catalog: Arc<dyn PaymentMethodCatalog>,
	) {
		self.catalogs
			.insert((env, network.into().to_ascii_lowercase()), catalog);
	}

	pub fn get(&self, env: Environment, network: &str) -> Option<Arc<dyn PaymentMethodCatalog>> {
		self.catalogs
			.get(&(env, network.to_ascii_lowercase()))
			.cloned()
	}
}

/// Resolves a processor name for read paths.
///
/// Hex input is returned as-is. Otherwise the catalog registered for
/// `(env, network)` is consulted; on a miss or without a catalog the name is
/// hashed. The hashed fallback is not guaranteed to match the on-chain value.
pub fn resolve_payment_method_hash(
	name: &str,
	registry: &CatalogRegistry,
	env: Environment,
	network: &str,
) -> Result<B256, CatalogError> {
	if is_bytes32_hex(name) {
		return Ok(parse_bytes32(name)?);
	}

	let key = name.to_ascii_lowercase();
	match registry.get(env, network) {
		Some(catalog) => {
			if let Some(hash) = catalog.lookup(&key) {
				debug!(processor = %key, "Resolved payment method from catalog");
				return Ok(hash);
			}
			warn!(
				processor = %key,
				%env,
				network,
				"Processor missing from catalog, falling back to keccak hash which may not match on-chain value"
			);
		}
		None => {
			warn!(
				processor = %key,
				%env,
				network,
				"No catalog available, falling back to keccak hash which may not match on-chain value"
			);
		}
	}

	Ok(ensure_bytes32(&key, true)?)
}

/// Resolves a processor name against an authoritative catalog.
///
/// Used on mutating paths: a miss fails with [`CatalogError::UnknownProcessor`]
/// listing the catalog's keys instead of deriving a possibly wrong hash.
pub fn resolve_payment_method_hash_from_catalog(
	name: &str,
	catalog: &dyn PaymentMethodCatalog,
) -> Result<B256, CatalogError> {
	if is_bytes32_hex(name) {
		return Ok(parse_bytes32(name)?);
	}

	let key = name.to_ascii_lowercase();
	catalog
		.lookup(&key)
		.ok_or_else(|| CatalogError::UnknownProcessor {
			name: name.to_string(),
			available: catalog.keys(),
		})
}

/// Reverse lookup of a payment method hash, for display.
pub fn resolve_payment_method_name(hash: &B256, catalog: &dyn PaymentMethodCatalog) -> Option<String> {
	catalog
		.keys()
		.into_iter()
		.find(|key| catalog.lookup(key).as_ref() == Some(hash))
}

/// Resolves a fiat currency code into its padded `bytes32` form.
///
/// Hex input passes through; anything else is upper-cased and ASCII-padded.
pub fn resolve_fiat_currency_bytes32(code: &str) -> Result<B256, CatalogError> {
	if is_bytes32_hex(code) {
		return Ok(parse_bytes32(code)?);
	}
	Ok(ascii_to_bytes32(&code.to_ascii_uppercase())?)
}
