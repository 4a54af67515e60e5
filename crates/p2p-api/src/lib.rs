//! HTTP clients for the off-chain services an intent flow talks to.
//!
//! The gating service signs intents for gated payment methods; the curator
//! returns quotes for a fiat amount. Both speak the same response envelope
//! and share the transport helpers defined here.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub mod gating;
pub mod quote;

pub use gating::{GatingClient, GatingClientConfig, GatingInterface};
pub use quote::{QuoteClient, QuoteClientConfig};

/// Transport-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
	#[error("request timed out after {0} ms")]
	Timeout(u64),
	#[error("request cancelled")]
	Cancelled,
	#[error("transport error: {0}")]
	Transport(String),
}

/// Errors that can occur when calling an off-chain service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
	#[error("Network error: {0}")]
	Network(#[from] NetworkError),
	#[error("API returned status {status}: {body}")]
	Status { status: u16, body: String },
	#[error("Malformed response: {0}")]
	MalformedResponse(String),
}

/// Response envelope shared by the gating service and the curator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
	#[serde(default)]
	pub success: bool,
	#[serde(default)]
	pub message: Option<String>,
	pub response_object: Option<T>,
	#[serde(default)]
	pub status_code: Option<u16>,
}

/// Headers and timeout shared by every request to one service.
#[derive(Debug, Clone)]
pub(crate) struct RequestOptions<'a> {
	pub api_key: Option<&'a str>,
	pub authorization_token: Option<&'a str>,
	pub timeout_ms: u64,
}

/// POSTs `body` as JSON and returns the parsed JSON body of a 2xx reply.
///
/// The whole exchange runs under `tokio::time::timeout`; when it fires the
/// request future is dropped, which closes the connection.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
	client: &reqwest::Client,
	url: &str,
	body: &B,
	options: RequestOptions<'_>,
) -> Result<serde_json::Value, ApiError> {
	let mut request = client
		.post(url)
		.header(reqwest::header::CONTENT_TYPE, "application/json")
		.json(body);
	if let Some(key) = options.api_key {
		request = request.header("x-api-key", key);
	}
	if let Some(token) = options.authorization_token {
		request = request.header(reqwest::header::AUTHORIZATION, format!("Bearer {}", token));
	}

	let exchange = async {
		let response = request
			.send()
			.await
			.map_err(|e| NetworkError::Transport(e.to_string()))?;
		let status = response.status();
		let text = response
			.text()
			.await
			.map_err(|e| NetworkError::Transport(e.to_string()))?;
		Ok::<_, ApiError>((status, text))
	};

	let (status, text) =
		match tokio::time::timeout(Duration::from_millis(options.timeout_ms), exchange).await {
			Ok(result) => result?,
			Err(_) => return Err(NetworkError::Timeout(options.timeout_ms).into()),
		};

	debug!(url, status = status.as_u16(), "Received API response");

	if !status.is_success() {
		return Err(ApiError::Status {
			status: status.as_u16(),
			body: text,
		});
	}

	serde_json::from_str(&text).map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

/// Races `fut` against `cancel`, dropping whichever loses.
pub(crate) async fn with_cancel<T, F, C>(fut: F, cancel: C) -> Result<T, ApiError>
where
	F: Future<Output = Result<T, ApiError>>,
	C: Future<Output = ()>,
{
	tokio::select! {
		result = fut => result,
		_ = cancel => Err(NetworkError::Cancelled.into()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_envelope_parsing() {
		let json = r#"{
			"success": true,
			"message": "ok",
			"responseObject": { "value": 1 },
			"statusCode": 200
		}"#;
		let response: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
		assert!(response.success);
		assert_eq!(response.status_code, Some(200));
		assert_eq!(response.response_object.unwrap()["value"], 1);
	}

	#[test]
	fn test_envelope_without_object() {
		let json = r#"{ "success": false, "message": "denied" }"#;
		let response: ApiResponse<serde_json::Value> = serde_json::from_str(json).unwrap();
		assert!(!response.success);
		assert!(response.response_object.is_none());
		assert_eq!(response.message.as_deref(), Some("denied"));
	}

	#[tokio::test]
	async fn test_with_cancel_prefers_cancellation() {
		let result: Result<(), ApiError> = with_cancel(
			async {
				tokio::time::sleep(Duration::from_secs(5)).await;
				Ok(())
			},
			async {},
		)
		.await;
		assert_eq!(result.unwrap_err(), ApiError::Network(NetworkError::Cancelled));
	}
}
