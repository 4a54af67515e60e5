//! Configuration loading for the on-ramp client.
//!
//! Files may be TOML, JSON or YAML. `${VAR}` placeholders are substituted
//! from the environment before parsing, `P2P_*` variables override parsed
//! values, and the result is validated before it is handed out.

use regex::Regex;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

pub mod types;

pub use types::*;

pub const DEFAULT_CONFIG_PATH: &str = "config/local.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
	#[error("File not found: {0}")]
	FileNotFound(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),

	#[error("Environment variable not found: {0}")]
	EnvVarNotFound(String),

	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
	Toml,
	Json,
	Yaml,
}

impl ConfigFormat {
	pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
		match path.extension().and_then(|s| s.to_str()) {
			Some("toml") => Ok(Self::Toml),
			Some("json") => Ok(Self::Json),
			Some("yaml") | Some("yml") => Ok(Self::Yaml),
			_ => Err(ConfigError::ParseError(format!(
				"Unsupported config format: {}",
				path.display()
			))),
		}
	}
}

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<PathBuf>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "P2P_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_path_buf());
		self
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<P2pConfig, ConfigError> {
		let path = self.file_path.as_deref().ok_or_else(|| {
			ConfigError::FileNotFound("No configuration file specified".to_string())
		})?;
		if !path.exists() {
			return Err(ConfigError::FileNotFound(path.display().to_string()));
		}

		info!(path = %path.display(), "Loading configuration");
		let format = ConfigFormat::from_path(path)?;
		let contents = tokio::fs::read_to_string(path).await?;
		self.load_str(&contents, format)
	}

	/// Runs the full pipeline on in-memory contents.
	pub fn load_str(&self, contents: &str, format: ConfigFormat) -> Result<P2pConfig, ConfigError> {
		let substituted = substitute_env_vars(contents)?;
		let mut config = parse(&substituted, format)?;
		self.apply_env_overrides(&mut config)?;
		validate_config(&config)?;
		Ok(config)
	}

	fn env_var(&self, name: &str) -> Option<String> {
		env::var(format!("{}{}", self.env_prefix, name)).ok()
	}

	fn apply_env_overrides(&self, config: &mut P2pConfig) -> Result<(), ConfigError> {
		if let Some(key) = self.env_var("PRIVATE_KEY") {
			debug!("Overriding private key from environment");
			config.account.private_key = key;
		}

		if let Some(url) = self.env_var("RPC_URL") {
			debug!("Overriding RPC URL from environment");
			config.network.rpc_url = url;
		}

		if let Some(key) = self.env_var("API_KEY") {
			debug!("Overriding API key from environment");
			config.api.api_key = Some(key);
		}

		if let Some(level) = self.env_var("LOG_LEVEL") {
			config.log_level = level;
		}

		Ok(())
	}
}

fn env_placeholder() -> &'static Regex {
	static PATTERN: OnceLock<Regex> = OnceLock::new();
	PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// Replaces every `${VAR}` with the value of `VAR`.
pub fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
	let mut result = content.to_string();

	for cap in env_placeholder().captures_iter(content) {
		let full_match = &cap[0];
		let var_name = &cap[1];

		let env_value =
			env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

		result = result.replace(full_match, &env_value);
	}

	Ok(result)
}

fn parse(contents: &str, format: ConfigFormat) -> Result<P2pConfig, ConfigError> {
	match format {
		ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string())),
		ConfigFormat::Json => {
			serde_json::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
		ConfigFormat::Yaml => {
			serde_yaml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))
		}
	}
}

fn validate_url(field: &str, url: &str) -> Result<(), ConfigError> {
	if url.starts_with("http://") || url.starts_with("https://") {
		Ok(())
	} else {
		Err(ConfigError::ValidationError(format!(
			"{} must start with http:// or https://",
			field
		)))
	}
}

/// Validate configuration
pub fn validate_config(config: &P2pConfig) -> Result<(), ConfigError> {
	let key = config.account.private_key.trim();
	let key_without_prefix = key.strip_prefix("0x").unwrap_or(key);
	if key_without_prefix.len() != 64 || !key_without_prefix.chars().all(|c| c.is_ascii_hexdigit()) {
		return Err(ConfigError::ValidationError(
			"Private key must be 64 hex characters (32 bytes)".to_string(),
		));
	}

	validate_url("network.rpc_url", &config.network.rpc_url)?;
	validate_url("api.base_url", &config.api.base_url)?;

	if config.network.chain_id == 0 {
		return Err(ConfigError::ValidationError(
			"network.chain_id must be at least 1".to_string(),
		));
	}

	if config.network.escrow_address.is_zero() {
		return Err(ConfigError::ValidationError(
			"network.escrow_address must not be the zero address".to_string(),
		));
	}

	if config.flow.max_attempts == 0 {
		return Err(ConfigError::ValidationError(
			"flow.max_attempts must be at least 1".to_string(),
		));
	}

	if config.gas.fallback_max_fee_gwei < config.gas.fallback_priority_fee_gwei {
		return Err(ConfigError::ValidationError(
			"gas.fallback_max_fee_gwei must not be below gas.fallback_priority_fee_gwei".to_string(),
		));
	}

	Ok(())
}
