//! Gating-service signer client.
//!
//! Gated payment methods require a short-lived signature from the deposit's
//! intent gating service before the escrow accepts `signalIntent` or
//! `fulfillIntent`. The signature binds the exact intent tuple posted here.

use crate::{post_json, with_cancel, ApiError, RequestOptions};
use async_trait::async_trait;
use p2p_types::{coerce_uint, truncate_hash, Bytes, GatingSignature, IntentTuple};
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

/// Path of the intent signing endpoint, relative to the base URL.
pub const VERIFY_INTENT_PATH: &str = "/v2/verify/intent";

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Connection settings for the gating service.
#[derive(Debug, Clone)]
pub struct GatingClientConfig {
	pub base_api_url: String,
	pub api_key: Option<String>,
	pub authorization_token: Option<String>,
	pub timeout_ms: u64,
}

impl GatingClientConfig {
	pub fn new(base_api_url: impl Into<String>) -> Self {
		Self {
			base_api_url: base_api_url.into(),
			api_key: None,
			authorization_token: None,
			timeout_ms: DEFAULT_TIMEOUT_MS,
		}
	}
}

/// Source of gating signatures.
#[async_trait]
pub trait GatingInterface: Send + Sync {
	/// Requests a signature binding the given intent tuple.
	async fn request_intent_signature(&self, tuple: &IntentTuple) -> Result<GatingSignature, ApiError>;
}

/// Wire shape of the intent tuple. Integers travel as decimal strings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignIntentRequest {
	processor_name: String,
	payee_details: String,
	deposit_id: String,
	amount: String,
	to_address: String,
	payment_method: String,
	fiat_currency: String,
	conversion_rate: String,
	chain_id: String,
	orchestrator_address: String,
	escrow_address: String,
}

impl From<&IntentTuple> for SignIntentRequest {
	fn from(tuple: &IntentTuple) -> Self {
		Self {
			processor_name: tuple.processor_name.clone(),
			payee_details: tuple.payee_details.clone(),
			deposit_id: tuple.deposit_id.to_string(),
			amount: tuple.amount.to_string(),
			to_address: tuple.to_address.to_string(),
			payment_method: tuple.payment_method.to_string(),
			fiat_currency: tuple.fiat_currency.to_string(),
			conversion_rate: tuple.conversion_rate.to_string(),
			chain_id: tuple.chain_id.to_string(),
			orchestrator_address: tuple.orchestrator_address.to_string(),
			escrow_address: tuple.escrow_address.to_string(),
		}
	}
}

/// HTTP client for the gating service.
pub struct GatingClient {
	client: reqwest::Client,
	config: GatingClientConfig,
}

impl GatingClient {
	pub fn new(config: GatingClientConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}

	pub fn config(&self) -> &GatingClientConfig {
		&self.config
	}

	fn endpoint(&self) -> String {
		format!(
			"{}{}",
			self.config.base_api_url.trim_end_matches('/'),
			VERIFY_INTENT_PATH
		)
	}

	/// Like [`GatingInterface::request_intent_signature`], but abandons the
	/// request as soon as `cancel` resolves.
	pub async fn request_intent_signature_cancellable<C>(
		&self,
		tuple: &IntentTuple,
		cancel: C,
	) -> Result<GatingSignature, ApiError>
	where
		C: Future<Output = ()> + Send,
	{
		with_cancel(self.sign(tuple), cancel).await
	}

	async fn sign(&self, tuple: &IntentTuple) -> Result<GatingSignature, ApiError> {
		let url = self.endpoint();
		debug!(
			url = %url,
			deposit_id = %tuple.deposit_id,
			processor = %tuple.processor_name,
			"Requesting gating signature"
		);

		let body = post_json(
			&self.client,
			&url,
			&SignIntentRequest::from(tuple),
			RequestOptions {
				api_key: self.config.api_key.as_deref(),
				authorization_token: self.config.authorization_token.as_deref(),
				timeout_ms: self.config.timeout_ms,
			},
		)
		.await?;

		let signature = extract_signature(&body)?;
		info!(
			signature = %truncate_hash(&signature.signature.to_string()),
			expiration = %signature.signature_expiration,
			"Obtained gating signature"
		);
		Ok(signature)
	}
}

#[async_trait]
impl GatingInterface for GatingClient {
	async fn request_intent_signature(&self, tuple: &IntentTuple) -> Result<GatingSignature, ApiError> {
		self.sign(tuple).await
	}
}

/// Pulls the signature and its expiration out of a response envelope.
///
/// The expiration is read from `intentData.signatureExpiration` first and
/// `signatureExpiration` second; older service versions use the latter.
pub fn extract_signature(body: &Value) -> Result<GatingSignature, ApiError> {
	let object = body
		.get("responseObject")
		.ok_or_else(|| ApiError::MalformedResponse("missing responseObject".to_string()))?;

	let signed = object
		.get("signedIntent")
		.and_then(Value::as_str)
		.ok_or_else(|| ApiError::MalformedResponse("missing signedIntent".to_string()))?;
	let signature = hex::decode(signed.trim_start_matches("0x"))
		.map_err(|e| ApiError::MalformedResponse(format!("invalid signedIntent: {}", e)))?;

	let expiration = object
		.get("intentData")
		.and_then(|data| data.get("signatureExpiration"))
		.or_else(|| object.get("signatureExpiration"))
		.filter(|value| !value.is_null())
		.ok_or_else(|| ApiError::MalformedResponse("missing signatureExpiration".to_string()))?;
	let signature_expiration = coerce_uint(expiration)
		.map_err(|e| ApiError::MalformedResponse(format!("invalid signatureExpiration: {}", e)))?;

	Ok(GatingSignature {
		signature: Bytes::from(signature),
		signature_expiration,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::NetworkError;
	use p2p_types::{Address, B256, U256};
	use serde_json::json;
	use std::time::Duration;
	use wiremock::matchers::{body_partial_json, header, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	fn tuple() -> IntentTuple {
		IntentTuple {
			processor_name: "venmo".to_string(),
			payee_details: "0xpayee".to_string(),
			deposit_id: U256::from(42u64),
			amount: U256::from(1_000_000u64),
			to_address: Address::repeat_byte(0x11),
			payment_method: B256::repeat_byte(0x01),
			fiat_currency: B256::repeat_byte(0x02),
			conversion_rate: U256::from(1_010_000_000_000_000_000u64),
			chain_id: 8453,
			orchestrator_address: Address::repeat_byte(0x22),
			escrow_address: Address::repeat_byte(0x33),
		}
	}

	fn client(server: &MockServer, timeout_ms: u64) -> GatingClient {
		GatingClient::new(GatingClientConfig {
			base_api_url: server.uri(),
			api_key: Some("key-123".to_string()),
			authorization_token: Some("token-abc".to_string()),
			timeout_ms,
		})
	}

	#[test]
	fn test_extract_signature_prefers_intent_data() {
		let body = json!({
			"success": true,
			"responseObject": {
				"signedIntent": "0xabcd",
				"intentData": { "signatureExpiration": "1700000100" },
				"signatureExpiration": "5"
			}
		});
		let sig = extract_signature(&body).unwrap();
		assert_eq!(sig.signature.as_ref(), &[0xab, 0xcd]);
		assert_eq!(sig.signature_expiration, U256::from(1_700_000_100u64));
	}

	#[test]
	fn test_extract_signature_falls_back_to_top_level_expiration() {
		let body = json!({
			"responseObject": { "signedIntent": "0x01", "signatureExpiration": 99 }
		});
		assert_eq!(
			extract_signature(&body).unwrap().signature_expiration,
			U256::from(99u64)
		);
	}

	#[test]
	fn test_extract_signature_keeps_large_expiration_exact() {
		let body = json!({
			"responseObject": {
				"signedIntent": "0x01",
				"signatureExpiration": "340282366920938463463374607431768211457"
			}
		});
		let expected: U256 = "340282366920938463463374607431768211457".parse().unwrap();
		assert_eq!(extract_signature(&body).unwrap().signature_expiration, expected);
	}

	#[test]
	fn test_extract_signature_missing_fields() {
		let missing_sig = json!({ "responseObject": { "signatureExpiration": "1" } });
		assert!(matches!(
			extract_signature(&missing_sig),
			Err(ApiError::MalformedResponse(_))
		));

		let missing_exp = json!({ "responseObject": { "signedIntent": "0x01", "intentData": {} } });
		assert!(matches!(
			extract_signature(&missing_exp),
			Err(ApiError::MalformedResponse(_))
		));
	}

	#[test]
	fn test_request_body_uses_decimal_strings() {
		let body = serde_json::to_value(SignIntentRequest::from(&tuple())).unwrap();
		assert_eq!(body["depositId"], "42");
		assert_eq!(body["amount"], "1000000");
		assert_eq!(body["conversionRate"], "1010000000000000000");
		assert_eq!(body["chainId"], "8453");
		assert_eq!(body["processorName"], "venmo");
	}

	#[tokio::test]
	async fn test_request_signature_success() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v2/verify/intent"))
			.and(header("x-api-key", "key-123"))
			.and(header("authorization", "Bearer token-abc"))
			.and(body_partial_json(json!({ "depositId": "42" })))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"success": true,
				"message": "Intent signed",
				"responseObject": {
					"signedIntent": "0xdeadbeef",
					"intentData": { "signatureExpiration": "1700000100" }
				},
				"statusCode": 200
			})))
			.expect(1)
			.mount(&server)
			.await;

		let sig = client(&server, 5_000)
			.request_intent_signature(&tuple())
			.await
			.unwrap();
		assert_eq!(sig.signature.as_ref(), &[0xde, 0xad, 0xbe, 0xef]);
		assert_eq!(sig.signature_expiration, U256::from(1_700_000_100u64));
	}

	#[tokio::test]
	async fn test_request_signature_non_2xx() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v2/verify/intent"))
			.respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
			.mount(&server)
			.await;

		let err = client(&server, 5_000)
			.request_intent_signature(&tuple())
			.await
			.unwrap_err();
		assert_eq!(
			err,
			ApiError::Status {
				status: 403,
				body: "forbidden".to_string()
			}
		);
	}

	#[tokio::test]
	async fn test_request_signature_timeout() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v2/verify/intent"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(json!({}))
					.set_delay(Duration::from_millis(2_000)),
			)
			.mount(&server)
			.await;

		let err = client(&server, 50)
			.request_intent_signature(&tuple())
			.await
			.unwrap_err();
		assert_eq!(err, ApiError::Network(NetworkError::Timeout(50)));
	}

	#[tokio::test]
	async fn test_request_signature_cancelled() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(path("/v2/verify/intent"))
			.respond_with(
				ResponseTemplate::new(200)
					.set_body_json(json!({}))
					.set_delay(Duration::from_millis(2_000)),
			)
			.mount(&server)
			.await;

		let err = client(&server, 5_000)
			.request_intent_signature_cancellable(
				&tuple(),
				tokio::time::sleep(Duration::from_millis(20)),
			)
			.await
			.unwrap_err();
		assert_eq!(err, ApiError::Network(NetworkError::Cancelled));
	}
}
