//! In-memory collaborators for flow and maker tests.

use crate::{
	FlowConfig, FlowContext, FlowError, IntentFlow, ProverInterface, QuoteProvider, RetryPolicy,
	Submitter,
};
use alloy::sol_types::SolEvent;
use async_trait::async_trait;
use p2p_api::{ApiError, GatingInterface};
use p2p_catalog::StaticCatalog;
use p2p_delivery::{
	abi, BaseFeeCache, DeliveryError, EscrowCall, EscrowInterface, GasPolicy, GasQuote, GWEI,
};
use p2p_proof::ProofArtifact;
use p2p_types::{
	ensure_bytes32, Address, Bytes, GatingSignature, IntentTuple, Log, Quote, QuoteRequest,
	TransactionReceipt, TxAction, B256, U256,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const ESCROW: Address = Address::repeat_byte(0x01);
pub const ORCHESTRATOR: Address = Address::repeat_byte(0x02);
pub const SENDER: Address = Address::repeat_byte(0x0a);
pub const RECIPIENT: Address = Address::repeat_byte(0x0b);
pub const GATING_SERVICE: Address = Address::repeat_byte(0x0c);
pub const SIGNALED_INTENT: B256 = B256::repeat_byte(0x5a);
/// 2100-01-01T00:00:00Z
pub const FAR_FUTURE: u64 = 4_102_444_800;

pub fn venmo_hash() -> B256 {
	ensure_bytes32("venmo", true).unwrap()
}

pub fn fresh_signature() -> GatingSignature {
	GatingSignature {
		signature: Bytes::from(vec![0xaa; 65]),
		signature_expiration: U256::from(FAR_FUTURE),
	}
}

pub fn quote_request() -> QuoteRequest {
	QuoteRequest {
		payment_platforms: vec!["venmo".to_string()],
		fiat_currency: "USD".to_string(),
		amount: "250".to_string(),
		user: SENDER,
		recipient: RECIPIENT,
		destination_chain_id: 8453,
		destination_token: Address::repeat_byte(0x0d),
	}
}

pub fn gated_quote() -> Quote {
	Quote {
		deposit_id: U256::from(7u64),
		processor_name: "venmo".to_string(),
		payment_method: venmo_hash(),
		payee_details: format!("0x{}", "03".repeat(32)),
		fiat_currency: B256::repeat_byte(0x04),
		conversion_rate: U256::from(1_010_000_000_000_000_000u64),
		fiat_amount: U256::from(250u64),
		token_amount: U256::from(250_000u64),
		intent_gating_service: Some(GATING_SERVICE),
	}
}

pub fn test_config() -> FlowConfig {
	FlowConfig {
		retry: RetryPolicy::new(2, Duration::ZERO),
		enforce_single_intent: true,
		proof_tag: None,
	}
}

pub fn deposit_view_json(depositor: Address) -> Value {
	json!({
		"depositId": "0x7",
		"deposit": {
			"depositor": depositor.to_string(),
			"delegate": Address::ZERO.to_string(),
			"token": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
			"amount": "0xf4240",
			"intentAmountRange": { "min": "0x186a0", "max": "0x7a120" },
			"acceptingIntents": true,
			"remainingDeposits": "0x927c0",
			"outstandingIntentAmount": "0x61a80",
			"makerProtocolFee": "0x0",
			"reservedMakerFees": "0x0",
			"accruedMakerFees": "0x0",
			"accruedReferrerFees": "0x0",
			"intentGuardian": Address::ZERO.to_string(),
			"referrer": Address::ZERO.to_string(),
			"referrerFee": "0x0"
		},
		"availableLiquidity": "0x927c0",
		"paymentMethods": [{
			"paymentMethod": venmo_hash().to_string(),
			"verificationData": {
				"intentGatingService": GATING_SERVICE.to_string(),
				"payeeDetails": B256::repeat_byte(0x03).to_string(),
				"data": "0x"
			},
			"currencies": [
				{ "code": B256::repeat_byte(0x04).to_string(), "minConversionRate": "0xe043da617250000" }
			]
		}],
		"intentHashes": [SIGNALED_INTENT.to_string()]
	})
}

pub fn intent_view_json() -> Value {
	json!({
		"intentHash": SIGNALED_INTENT.to_string(),
		"intent": {
			"owner": SENDER.to_string(),
			"to": RECIPIENT.to_string(),
			"escrow": ESCROW.to_string(),
			"depositId": "0x7",
			"amount": "0x3d090",
			"timestamp": "0x6553f100",
			"paymentMethod": venmo_hash().to_string(),
			"fiatCurrency": B256::repeat_byte(0x04).to_string(),
			"conversionRate": "0xe043da617250000",
			"referrer": Address::ZERO.to_string(),
			"referrerFee": "0x0",
			"postIntentHook": Address::ZERO.to_string(),
			"data": "0x"
		},
		"deposit": deposit_view_json(SENDER)
	})
}

#[derive(Default)]
struct EscrowState {
	calls: Vec<(B256, EscrowCall)>,
	open_intent: Option<B256>,
	revert_on: Option<TxAction>,
	omit_events: bool,
	fail_base_fee: bool,
	sent_fees: Vec<GasQuote>,
	intent_view: Option<Value>,
	deposit_view: Option<Value>,
}

/// Escrow double that mines every transaction it accepts.
#[derive(Default)]
pub struct MockEscrow {
	state: Mutex<EscrowState>,
}

impl MockEscrow {
	pub fn calls(&self) -> Vec<EscrowCall> {
		let state = self.state.lock().unwrap();
		state.calls.iter().map(|(_, call)| call.clone()).collect()
	}

	pub fn actions(&self) -> Vec<TxAction> {
		self.calls().iter().map(EscrowCall::action).collect()
	}

	pub fn set_open_intent(&self, intent: Option<B256>) {
		self.state.lock().unwrap().open_intent = intent;
	}

	pub fn revert_on(&self, action: Option<TxAction>) {
		self.state.lock().unwrap().revert_on = action;
	}

	pub fn omit_events(&self) {
		self.state.lock().unwrap().omit_events = true;
	}

	/// Base fee reads fail with a network error from now on.
	pub fn fail_base_fee(&self) {
		self.state.lock().unwrap().fail_base_fee = true;
	}

	/// Fee bids of every accepted `send`, in order.
	pub fn sent_fees(&self) -> Vec<GasQuote> {
		self.state.lock().unwrap().sent_fees.clone()
	}

	pub fn set_intent_view(&self, view: Option<Value>) {
		self.state.lock().unwrap().intent_view = view;
	}

	pub fn set_deposit_view(&self, view: Option<Value>) {
		self.state.lock().unwrap().deposit_view = view;
	}
}

#[async_trait]
impl EscrowInterface for MockEscrow {
	fn chain_id(&self) -> u64 {
		8453
	}

	fn escrow_address(&self) -> Address {
		ESCROW
	}

	fn orchestrator_address(&self) -> Address {
		ORCHESTRATOR
	}

	fn sender(&self) -> Address {
		SENDER
	}

	async fn base_fee(&self) -> Result<U256, DeliveryError> {
		if self.state.lock().unwrap().fail_base_fee {
			return Err(DeliveryError::Network("eth_getBlockByNumber timed out".to_string()));
		}
		Ok(U256::from(GWEI))
	}

	async fn estimate_gas(&self, _call: &EscrowCall) -> Result<u64, DeliveryError> {
		Ok(100_000)
	}

	async fn send(
		&self,
		call: &EscrowCall,
		fees: &GasQuote,
		_gas_limit: u64,
	) -> Result<B256, DeliveryError> {
		let mut state = self.state.lock().unwrap();
		if state.revert_on == Some(call.action()) {
			return Err(DeliveryError::from_rpc(
				"Failed to send transaction",
				"execution reverted",
			));
		}
		let hash = B256::with_last_byte(state.calls.len() as u8 + 1);
		state.calls.push((hash, call.clone()));
		state.sent_fees.push(*fees);
		Ok(hash)
	}

	async fn wait_for_receipt(&self, hash: B256) -> Result<TransactionReceipt, DeliveryError> {
		let state = self.state.lock().unwrap();
		let (_, call) = state
			.calls
			.iter()
			.find(|(h, _)| *h == hash)
			.ok_or_else(|| DeliveryError::Network("unknown transaction".to_string()))?;

		let logs = match call {
			EscrowCall::Signal(params) if !state.omit_events => vec![Log {
				address: ORCHESTRATOR,
				topics: vec![
					abi::IOrchestrator::IntentSignaled::SIGNATURE_HASH,
					SIGNALED_INTENT,
					ESCROW.into_word(),
					B256::from(params.depositId.to_be_bytes::<32>()),
				],
				data: Bytes::new(),
			}],
			_ => vec![],
		};

		Ok(TransactionReceipt {
			hash,
			block_number: 100,
			success: true,
			logs,
		})
	}

	async fn get_deposit(&self, _deposit_id: U256) -> Result<Value, DeliveryError> {
		self.state
			.lock()
			.unwrap()
			.deposit_view
			.clone()
			.ok_or_else(|| DeliveryError::Contract("execution reverted".to_string()))
	}

	async fn get_intent(&self, _intent_hash: B256) -> Result<Value, DeliveryError> {
		self.state
			.lock()
			.unwrap()
			.intent_view
			.clone()
			.ok_or_else(|| DeliveryError::Contract("execution reverted".to_string()))
	}

	async fn account_intent(&self, _owner: Address) -> Result<Option<B256>, DeliveryError> {
		Ok(self.state.lock().unwrap().open_intent)
	}

	async fn deposit_counter(&self) -> Result<U256, DeliveryError> {
		Ok(U256::from(8u64))
	}
}

type GatingResponder = Box<dyn Fn(u32) -> Result<GatingSignature, ApiError> + Send + Sync>;

/// Gating double answering by call number, starting at 1.
pub struct MockGating {
	pub calls: AtomicU32,
	respond: Mutex<GatingResponder>,
}

impl MockGating {
	pub fn new() -> Self {
		Self {
			calls: AtomicU32::new(0),
			respond: Mutex::new(Box::new(|_| Ok(fresh_signature()))),
		}
	}

	pub fn set<F>(&self, respond: F)
	where
		F: Fn(u32) -> Result<GatingSignature, ApiError> + Send + Sync + 'static,
	{
		*self.respond.lock().unwrap() = Box::new(respond);
	}
}

#[async_trait]
impl GatingInterface for MockGating {
	async fn request_intent_signature(&self, _tuple: &IntentTuple) -> Result<GatingSignature, ApiError> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
		let respond = self.respond.lock().unwrap();
		(*respond)(call)
	}
}

pub struct MockQuotes {
	pub calls: AtomicU32,
	response: Mutex<Result<Vec<Quote>, ApiError>>,
}

impl MockQuotes {
	pub fn new(quotes: Vec<Quote>) -> Self {
		Self {
			calls: AtomicU32::new(0),
			response: Mutex::new(Ok(quotes)),
		}
	}

	pub fn set(&self, response: Result<Vec<Quote>, ApiError>) {
		*self.response.lock().unwrap() = response;
	}
}

#[async_trait]
impl QuoteProvider for MockQuotes {
	async fn fetch_quotes(&self, _request: &QuoteRequest) -> Result<Vec<Quote>, FlowError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		Ok(self.response.lock().unwrap().clone()?)
	}
}

#[derive(Default)]
pub struct MockProver {
	fail_next: Mutex<Option<FlowError>>,
	pub calls: AtomicU32,
}

impl MockProver {
	/// Next `prove` call returns `err`; later calls succeed again.
	pub fn failing_once(err: FlowError) -> Self {
		Self {
			fail_next: Mutex::new(Some(err)),
			calls: AtomicU32::new(0),
		}
	}
}

#[async_trait]
impl ProverInterface for MockProver {
	async fn prove(
		&self,
		_intent_hash: B256,
		_intent: &IntentTuple,
	) -> Result<Vec<ProofArtifact>, FlowError> {
		self.calls.fetch_add(1, Ordering::SeqCst);
		if let Some(err) = self.fail_next.lock().unwrap().take() {
			return Err(err);
		}
		Ok(vec![ProofArtifact::new(vec![0x01, 0x02, 0x03])])
	}
}

/// Wires the doubles together the way the CLI wires the real collaborators.
pub struct Harness {
	pub escrow: Arc<MockEscrow>,
	pub gating: Arc<MockGating>,
	pub quotes: Arc<MockQuotes>,
	pub submitter: Arc<Submitter>,
	catalog: Arc<StaticCatalog>,
}

impl Harness {
	pub fn with_quote(quote: Quote) -> Self {
		let escrow = Arc::new(MockEscrow::default());
		let submitter = Arc::new(Submitter::new(
			escrow.clone(),
			GasPolicy::default(),
			BaseFeeCache::default(),
		));
		Self {
			escrow,
			gating: Arc::new(MockGating::new()),
			quotes: Arc::new(MockQuotes::new(vec![quote])),
			submitter,
			catalog: Arc::new(StaticCatalog::from_hashed_names(["venmo", "revolut"]).unwrap()),
		}
	}

	pub fn gated() -> Self {
		Self::with_quote(gated_quote())
	}

	pub fn ungated() -> Self {
		let mut quote = gated_quote();
		quote.intent_gating_service = None;
		Self::with_quote(quote)
	}

	pub fn context(&self) -> FlowContext {
		FlowContext {
			quotes: self.quotes.clone(),
			gating: self.gating.clone(),
			prover: Arc::new(MockProver::default()),
			catalog: self.catalog.clone(),
			submitter: self.submitter.clone(),
		}
	}

	pub fn flow(&self) -> IntentFlow {
		IntentFlow::new(test_config(), self.context())
	}
}
