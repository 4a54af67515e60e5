use crate::state::FlowState;
use p2p_api::{ApiError, NetworkError};
use p2p_catalog::CatalogError;
use p2p_config::ConfigError;
use p2p_delivery::DeliveryError;
use p2p_proof::ProofError;
use p2p_types::{EncodingError, U256};
use p2p_views::ParseError;
use std::fmt;
use thiserror::Error;

/// Caller-facing error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	Validation,
	Network,
	Api,
	Contract,
	Encoding,
	Parse,
	UnknownProcessor,
}

impl fmt::Display for ErrorKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Validation => write!(f, "validation"),
			Self::Network => write!(f, "network"),
			Self::Api => write!(f, "api"),
			Self::Contract => write!(f, "contract"),
			Self::Encoding => write!(f, "encoding"),
			Self::Parse => write!(f, "parse"),
			Self::UnknownProcessor => write!(f, "unknown_processor"),
		}
	}
}

#[derive(Debug, Error)]
pub enum FlowError {
	#[error("Invalid {field}: {reason}")]
	Validation { field: String, reason: String },

	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: FlowState, to: FlowState },

	#[error("Gating signature expired at {0}")]
	ExpiredSignature(U256),

	#[error("Prover error: {0}")]
	Prover(String),

	#[error("Receipt of {0} carries no IntentSignaled event")]
	MissingIntentEvent(String),

	#[error(transparent)]
	Api(#[from] ApiError),

	#[error(transparent)]
	Delivery(#[from] DeliveryError),

	#[error(transparent)]
	Catalog(#[from] CatalogError),

	#[error(transparent)]
	Proof(#[from] ProofError),

	#[error(transparent)]
	Parse(#[from] ParseError),

	#[error(transparent)]
	Encoding(#[from] EncodingError),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

impl FlowError {
	pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::Validation {
			field: field.into(),
			reason: reason.into(),
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::Validation { .. } | Self::InvalidTransition { .. } | Self::Config(_) => {
				ErrorKind::Validation
			}
			Self::ExpiredSignature(_) | Self::Prover(_) => ErrorKind::Api,
			Self::MissingIntentEvent(_) => ErrorKind::Contract,
			Self::Api(ApiError::Network(_)) => ErrorKind::Network,
			Self::Api(_) => ErrorKind::Api,
			Self::Delivery(DeliveryError::Contract(_)) => ErrorKind::Contract,
			Self::Delivery(DeliveryError::Network(_)) => ErrorKind::Network,
			Self::Delivery(DeliveryError::Tracker(_)) => ErrorKind::Validation,
			Self::Delivery(DeliveryError::Encoding(_)) => ErrorKind::Encoding,
			Self::Catalog(CatalogError::UnknownProcessor { .. }) => ErrorKind::UnknownProcessor,
			Self::Catalog(CatalogError::Encoding(_)) => ErrorKind::Encoding,
			Self::Catalog(_) => ErrorKind::Parse,
			Self::Proof(_) | Self::Encoding(_) => ErrorKind::Encoding,
			Self::Parse(_) => ErrorKind::Parse,
		}
	}

	/// True for failures of off-chain reads that may succeed on a later
	/// attempt. Submission errors are never retryable here; the caller
	/// re-enters the step instead.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Api(ApiError::Network(NetworkError::Cancelled)) => false,
			Self::Api(_) | Self::ExpiredSignature(_) | Self::Prover(_) => true,
			_ => false,
		}
	}
}
