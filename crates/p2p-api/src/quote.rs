//! Curator quote client.
//!
//! Returns the raw `responseObject.quotes` array; typed parsing happens in
//! the view parsers so API payloads and on-chain views share one coercion
//! path.

use crate::{post_json, with_cancel, ApiError, RequestOptions};
use p2p_types::QuoteRequest;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

pub const EXACT_FIAT_QUOTE_PATH: &str = "/v2/quote/exact-fiat";

#[derive(Debug, Clone)]
pub struct QuoteClientConfig {
	pub base_api_url: String,
	pub api_key: Option<String>,
	pub timeout_ms: u64,
}

pub struct QuoteClient {
	client: reqwest::Client,
	config: QuoteClientConfig,
}

impl QuoteClient {
	pub fn new(config: QuoteClientConfig) -> Self {
		Self {
			client: reqwest::Client::new(),
			config,
		}
	}

	/// Fetches quotes for an exact fiat amount.
	pub async fn fetch_exact_fiat(&self, request: &QuoteRequest) -> Result<Vec<Value>, ApiError> {
		let url = format!(
			"{}{}",
			self.config.base_api_url.trim_end_matches('/'),
			EXACT_FIAT_QUOTE_PATH
		);
		debug!(
			url = %url,
			amount = %request.amount,
			currency = %request.fiat_currency,
			"Requesting quotes"
		);

		let body = post_json(
			&self.client,
			&url,
			request,
			RequestOptions {
				api_key: self.config.api_key.as_deref(),
				authorization_token: None,
				timeout_ms: self.config.timeout_ms,
			},
		)
		.await?;

		extract_quotes(&body)
	}

	pub async fn fetch_exact_fiat_cancellable<C>(
		&self,
		request: &QuoteRequest,
		cancel: C,
	) -> Result<Vec<Value>, ApiError>
	where
		C: Future<Output = ()>,
	{
		with_cancel(self.fetch_exact_fiat(request), cancel).await
	}
}

fn extract_quotes(body: &Value) -> Result<Vec<Value>, ApiError> {
	match body.get("responseObject").and_then(|o| o.get("quotes")) {
		Some(Value::Array(quotes)) => Ok(quotes.clone()),
		// The curator omits the array when nothing matches
		Some(Value::Null) | None if body.get("responseObject").is_some() => Ok(Vec::new()),
		_ => Err(ApiError::MalformedResponse(
			"missing responseObject.quotes".to_string(),
		)),
	}
}
