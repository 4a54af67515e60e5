//! The intent lifecycle state machine.
//!
//! Each step method checks the current state, does its work and records the
//! resulting transition. How a failed step ends depends on the error:
//!
//! - submission and caller-input errors return the flow to the state the step
//!   was entered from, so the step can be re-entered with a fresh tracker;
//! - off-chain reads that exhaust their retries end in
//!   `Failed(Retryable)`;
//! - anything else ends in `Failed(Fatal)`.

use crate::state::{FailureKind, FlowState, Transition};
use crate::{FlowConfig, FlowError, ProverInterface, QuoteProvider, Submitter};
use alloy::sol_types::SolValue;
use chrono::Utc;
use p2p_api::GatingInterface;
use p2p_catalog::{
	resolve_payment_method_hash_from_catalog, resolve_payment_method_name, PaymentMethodCatalog,
};
use p2p_delivery::{abi, signaled_intent_hash, EscrowCall};
use p2p_proof::ProofBundle;
use p2p_types::{
	now_unix, parse_uint_str, truncate_hash, Address, Bytes, GatingSignature, IntentTuple, Quote,
	QuoteRequest, TransactionReceipt, B256, U256,
};
use p2p_views::{parse_intent_view, ParseError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every flow.
#[derive(Clone)]
pub struct FlowContext {
	pub quotes: Arc<dyn QuoteProvider>,
	pub gating: Arc<dyn GatingInterface>,
	pub prover: Arc<dyn ProverInterface>,
	pub catalog: Arc<dyn PaymentMethodCatalog>,
	pub submitter: Arc<Submitter>,
}

/// What is fixed once an intent exists on-chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignaledIntent {
	pub intent_hash: B256,
	/// Tuple any gating signature for this intent must be bound to.
	pub tuple: IntentTuple,
	pub gated: bool,
}

pub struct IntentFlow {
	id: String,
	config: FlowConfig,
	ctx: FlowContext,
	initial: FlowState,
	state: FlowState,
	history: Vec<Transition>,
	recipient: Option<Address>,
	quotes: Vec<Quote>,
	intent: Option<SignaledIntent>,
	payment_proof: Option<Bytes>,
	gating_signature: Option<GatingSignature>,
}

impl IntentFlow {
	pub fn new(config: FlowConfig, ctx: FlowContext) -> Self {
		Self::starting_at(config, ctx, FlowState::Quoting)
	}

	fn starting_at(config: FlowConfig, ctx: FlowContext, state: FlowState) -> Self {
		Self {
			id: uuid::Uuid::new_v4().to_string(),
			config,
			ctx,
			initial: state,
			state,
			history: Vec::new(),
			recipient: None,
			quotes: Vec::new(),
			intent: None,
			payment_proof: None,
			gating_signature: None,
		}
	}

	/// Picks up an intent that is already open on-chain, in `Signaled`.
	///
	/// The gating tuple is rebuilt from the orchestrator's intent view. The
	/// processor name comes from a reverse catalog lookup and the payee
	/// details from the deposit's stored hash.
	pub async fn resume(
		config: FlowConfig,
		ctx: FlowContext,
		intent_hash: B256,
	) -> Result<Self, FlowError> {
		let escrow = Arc::clone(ctx.submitter.escrow());
		let raw = escrow.get_intent(intent_hash).await?;
		let view = parse_intent_view(&raw)?;
		let intent = view.intent;

		if intent.owner == Address::ZERO {
			return Err(FlowError::validation(
				"intent_hash",
				format!("no open intent {}", intent_hash),
			));
		}
		if intent.owner != escrow.sender() {
			warn!(
				intent_hash = %truncate_hash(&intent_hash.to_string()),
				owner = %intent.owner,
				"Resuming an intent owned by another account; submissions will revert"
			);
		}

		let method = view
			.deposit
			.deposit
			.payment_method(&intent.payment_method)
			.ok_or_else(|| {
				ParseError::InvariantViolated(format!(
					"deposit {} has no payment method {}",
					intent.deposit_id, intent.payment_method
				))
			})?;

		let processor_name = resolve_payment_method_name(&intent.payment_method, ctx.catalog.as_ref())
			.unwrap_or_else(|| intent.payment_method.to_string());

		let signaled = SignaledIntent {
			intent_hash,
			tuple: IntentTuple {
				processor_name,
				payee_details: method.verification_data.payee_details.to_string(),
				deposit_id: intent.deposit_id,
				amount: intent.amount,
				to_address: intent.to,
				payment_method: intent.payment_method,
				fiat_currency: intent.fiat_currency,
				conversion_rate: intent.conversion_rate,
				chain_id: escrow.chain_id(),
				orchestrator_address: escrow.orchestrator_address(),
				escrow_address: intent.escrow,
			},
			gated: method.requires_gating(),
		};

		let mut flow = Self::starting_at(config, ctx, FlowState::Signaled);
		info!(
			flow_id = %flow.id,
			intent_hash = %truncate_hash(&intent_hash.to_string()),
			deposit_id = %signaled.tuple.deposit_id,
			gated = signaled.gated,
			"Resumed intent flow"
		);
		flow.recipient = Some(intent.to);
		flow.intent = Some(signaled);
		Ok(flow)
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn state(&self) -> FlowState {
		self.state
	}

	pub fn history(&self) -> &[Transition] {
		&self.history
	}

	/// Every state the flow has been in, in order.
	pub fn visited(&self) -> Vec<FlowState> {
		std::iter::once(self.initial)
			.chain(self.history.iter().map(|t| t.to))
			.collect()
	}

	pub fn quotes(&self) -> &[Quote] {
		&self.quotes
	}

	pub fn intent(&self) -> Option<&SignaledIntent> {
		self.intent.as_ref()
	}

	/// Quoting: asks the quote collaborator for deposits able to fill the
	/// request. No match ends the flow in `Failed(NoLiquidity)` and returns
	/// an empty slice.
	pub async fn fetch_quotes(&mut self, request: QuoteRequest) -> Result<&[Quote], FlowError> {
		if self.state != FlowState::Quoting {
			return Err(FlowError::InvalidTransition {
				from: self.state,
				to: FlowState::QuoteReady,
			});
		}
		validate_quote_request(&request)?;

		let provider = &self.ctx.quotes;
		let req = &request;
		let result = self
			.config
			.retry
			.run("quote", || async move { provider.fetch_quotes(req).await })
			.await;

		match result {
			Ok(quotes) if quotes.is_empty() => {
				self.transition(
					FlowState::Failed(FailureKind::NoLiquidity),
					Some(format!("no deposit can fill {} {}", request.amount, request.fiat_currency)),
				)?;
				Ok(self.quotes.as_slice())
			}
			Ok(quotes) => {
				let count = quotes.len();
				self.quotes = quotes;
				self.recipient = Some(request.recipient);
				self.transition(FlowState::QuoteReady, Some(format!("{} quotes", count)))?;
				Ok(self.quotes.as_slice())
			}
			Err(e) => Err(self.settle(FlowState::Quoting, e)),
		}
	}

	/// Signaling: opens an intent against the quote at `index`.
	///
	/// Returns the intent hash read back from the `IntentSignaled` event.
	pub async fn signal(&mut self, index: usize) -> Result<B256, FlowError> {
		self.ensure_can(FlowState::Signaling)?;
		let quote = self.quotes.get(index).cloned().ok_or_else(|| {
			FlowError::validation(
				"quote",
				format!("index {} out of range for {} quotes", index, self.quotes.len()),
			)
		})?;

		self.transition(
			FlowState::Signaling,
			Some(format!("deposit {} via {}", quote.deposit_id, quote.processor_name)),
		)?;

		match self.signal_quote(&quote).await {
			Ok(signaled) => {
				let intent_hash = signaled.intent_hash;
				self.intent = Some(signaled);
				self.transition(
					FlowState::Signaled,
					Some(format!("intent {}", truncate_hash(&intent_hash.to_string()))),
				)?;
				Ok(intent_hash)
			}
			Err(e) => Err(self.settle(FlowState::QuoteReady, e)),
		}
	}

	async fn signal_quote(&self, quote: &Quote) -> Result<SignaledIntent, FlowError> {
		let escrow = self.ctx.submitter.escrow();
		let owner = escrow.sender();

		if quote.token_amount.is_zero() {
			return Err(FlowError::validation("amount", "quote carries a zero token amount"));
		}

		if self.config.enforce_single_intent {
			if let Some(existing) = escrow.account_intent(owner).await? {
				return Err(FlowError::validation(
					"owner",
					format!("{} already has open intent {}", owner, existing),
				));
			}
		}

		// Mutating path: only the authoritative catalog may name the rail
		let payment_method =
			resolve_payment_method_hash_from_catalog(&quote.processor_name, self.ctx.catalog.as_ref())?;
		if payment_method != quote.payment_method {
			warn!(
				processor = %quote.processor_name,
				quoted = %quote.payment_method,
				catalog = %payment_method,
				"Quoted payment method differs from catalog, using catalog value"
			);
		}

		let tuple = IntentTuple {
			processor_name: quote.processor_name.clone(),
			payee_details: quote.payee_details.clone(),
			deposit_id: quote.deposit_id,
			amount: quote.token_amount,
			to_address: self.recipient.unwrap_or(owner),
			payment_method,
			fiat_currency: quote.fiat_currency,
			conversion_rate: quote.conversion_rate,
			chain_id: escrow.chain_id(),
			orchestrator_address: escrow.orchestrator_address(),
			escrow_address: escrow.escrow_address(),
		};

		let gated = quote.requires_gating();
		let signature = if gated {
			Some(self.request_gating_signature(&tuple).await?)
		} else {
			None
		};

		let params = abi::SignalIntentParams {
			escrow: tuple.escrow_address,
			depositId: tuple.deposit_id,
			amount: tuple.amount,
			to: tuple.to_address,
			paymentMethod: tuple.payment_method,
			fiatCurrency: tuple.fiat_currency,
			conversionRate: tuple.conversion_rate,
			referrer: Address::ZERO,
			referrerFee: U256::ZERO,
			gatingServiceSignature: signature
				.as_ref()
				.map(|s| s.signature.clone())
				.unwrap_or_default(),
			signatureExpiration: signature
				.as_ref()
				.map(|s| s.signature_expiration)
				.unwrap_or_default(),
			postIntentHook: Address::ZERO,
			data: Bytes::new(),
		};

		let receipt = self
			.ctx
			.submitter
			.submit(&self.id, EscrowCall::Signal(params))
			.await?;

		let intent_hash = signaled_intent_hash(&receipt, escrow.orchestrator_address())
			.ok_or_else(|| FlowError::MissingIntentEvent(receipt.hash.to_string()))?;

		Ok(SignaledIntent {
			intent_hash,
			tuple,
			gated,
		})
	}

	/// Marks the intent as waiting for the off-chain fiat payment. No timeout
	/// is enforced here; intent expiry is the escrow's concern.
	pub fn await_payment(&mut self) -> Result<(), FlowError> {
		self.transition(FlowState::AwaitingPayment, None)
	}

	/// ProofSubmission: collects attestations from the prover and encodes
	/// them for the verifier.
	pub async fn submit_proof(&mut self) -> Result<(), FlowError> {
		self.ensure_can(FlowState::ProofSubmission)?;
		let intent = self.signaled()?.clone();
		self.transition(FlowState::ProofSubmission, None)?;

		match self.prove(&intent).await {
			Ok(proof) => {
				debug!(flow_id = %self.id, bytes = proof.len(), "Encoded payment proof");
				self.payment_proof = Some(proof);
				Ok(())
			}
			Err(e) => Err(self.settle(FlowState::AwaitingPayment, e)),
		}
	}

	async fn prove(&self, intent: &SignaledIntent) -> Result<Bytes, FlowError> {
		let prover = &self.ctx.prover;
		let artifacts = self
			.config
			.retry
			.run("prove", || async move {
				prover.prove(intent.intent_hash, &intent.tuple).await
			})
			.await?;

		let bundle = ProofBundle::new(artifacts, self.config.proof_tag)?;
		Ok(bundle.encode())
	}

	/// GateVerifying: obtains a fresh gating signature when the rail is
	/// gated. Ungated rails pass straight through.
	pub async fn verify_gate(&mut self) -> Result<(), FlowError> {
		self.ensure_can(FlowState::GateVerifying)?;
		let intent = self.signaled()?.clone();
		self.transition(FlowState::GateVerifying, None)?;

		if !intent.gated {
			debug!(flow_id = %self.id, "Payment method is not gated");
			self.gating_signature = None;
			return Ok(());
		}

		match self.request_gating_signature(&intent.tuple).await {
			Ok(signature) => {
				self.gating_signature = Some(signature);
				Ok(())
			}
			Err(e) => Err(self.settle(FlowState::GateVerifying, e)),
		}
	}

	/// Releasing: submits `fulfillIntent` with the encoded proof.
	///
	/// A gating signature that expired since [`verify_gate`](Self::verify_gate)
	/// is discarded and re-requested before anything is sent.
	pub async fn release(&mut self) -> Result<TransactionReceipt, FlowError> {
		self.ensure_can(FlowState::Releasing)?;
		let intent = self.signaled()?.clone();
		let proof = self
			.payment_proof
			.clone()
			.ok_or_else(|| FlowError::validation("payment_proof", "no proof has been submitted"))?;

		let verification_data = if intent.gated {
			let stale = self
				.gating_signature
				.as_ref()
				.map_or(true, |s| s.is_expired(now_unix()));
			if stale {
				info!(flow_id = %self.id, "Gating signature expired, requesting a fresh one");
				match self.request_gating_signature(&intent.tuple).await {
					Ok(signature) => self.gating_signature = Some(signature),
					Err(e) => return Err(self.settle(FlowState::GateVerifying, e)),
				}
			}
			match &self.gating_signature {
				Some(sig) => Bytes::from(
					(sig.signature.clone(), sig.signature_expiration).abi_encode_params(),
				),
				None => Bytes::new(),
			}
		} else {
			Bytes::new()
		};

		self.transition(FlowState::Releasing, None)?;

		let call = EscrowCall::Fulfill(abi::FulfillIntentParams {
			paymentProof: proof,
			intentHash: intent.intent_hash,
			verificationData: verification_data,
			postIntentHookData: Bytes::new(),
		});

		match self
			.ctx
			.submitter
			.submit(&intent.intent_hash.to_string(), call)
			.await
		{
			Ok(receipt) => {
				self.transition(
					FlowState::Fulfilled,
					Some(format!("tx {}", truncate_hash(&receipt.hash.to_string()))),
				)?;
				Ok(receipt)
			}
			Err(e) => Err(self.settle(FlowState::GateVerifying, e.into())),
		}
	}

	/// Runs proof submission, gate verification and release in sequence.
	pub async fn fulfill(&mut self) -> Result<TransactionReceipt, FlowError> {
		self.submit_proof().await?;
		self.verify_gate().await?;
		self.release().await
	}

	/// Cancelling: cancels the open intent, returning its amount to the
	/// deposit.
	pub async fn cancel(&mut self) -> Result<TransactionReceipt, FlowError> {
		self.ensure_can(FlowState::Cancelling)?;
		let intent_hash = self.signaled()?.intent_hash;
		let entered_from = self.state;
		self.transition(FlowState::Cancelling, None)?;

		match self
			.ctx
			.submitter
			.submit(&intent_hash.to_string(), EscrowCall::Cancel(intent_hash))
			.await
		{
			Ok(receipt) => {
				self.transition(
					FlowState::Cancelled,
					Some(format!("tx {}", truncate_hash(&receipt.hash.to_string()))),
				)?;
				Ok(receipt)
			}
			Err(e) => Err(self.settle(entered_from, e.into())),
		}
	}

	async fn request_gating_signature(&self, tuple: &IntentTuple) -> Result<GatingSignature, FlowError> {
		let gating = &self.ctx.gating;
		self.config
			.retry
			.run("gate-sign", || async move {
				let signature = gating.request_intent_signature(tuple).await?;
				if signature.is_expired(now_unix()) {
					warn!(
						expiration = %signature.signature_expiration,
						"Discarding expired gating signature"
					);
					return Err(FlowError::ExpiredSignature(signature.signature_expiration));
				}
				Ok(signature)
			})
			.await
	}

	fn signaled(&self) -> Result<&SignaledIntent, FlowError> {
		self.intent
			.as_ref()
			.ok_or_else(|| FlowError::validation("intent", "no intent has been signaled"))
	}

	fn ensure_can(&self, to: FlowState) -> Result<(), FlowError> {
		if self.state.can_transition_to(to) {
			Ok(())
		} else {
			Err(FlowError::InvalidTransition {
				from: self.state,
				to,
			})
		}
	}

	fn transition(&mut self, to: FlowState, reason: Option<String>) -> Result<(), FlowError> {
		self.ensure_can(to)?;
		info!(
			flow_id = %self.id,
			from = %self.state,
			to = %to,
			reason = reason.as_deref().unwrap_or(""),
			"Intent flow state changed"
		);
		self.history.push(Transition {
			from: self.state,
			to,
			at: Utc::now(),
			reason,
		});
		self.state = to;
		Ok(())
	}

	/// Moves the flow to where a failed step leaves it and hands the error
	/// back.
	fn settle(&mut self, entered_from: FlowState, err: FlowError) -> FlowError {
		let target = match &err {
			FlowError::Validation { .. } | FlowError::Delivery(_) => entered_from,
			e if e.is_retryable() => FlowState::Failed(FailureKind::Retryable),
			_ => FlowState::Failed(FailureKind::Fatal),
		};
		if target == self.state {
			return err;
		}

		let target = if self.state.can_transition_to(target) {
			target
		} else {
			FlowState::Failed(FailureKind::Fatal)
		};
		match target {
			FlowState::Failed(kind) => {
				error!(flow_id = %self.id, state = %self.state, ?kind, error = %err, "Intent flow failed")
			}
			_ => {
				warn!(flow_id = %self.id, state = %self.state, to = %target, error = %err, "Step failed, rolling back")
			}
		}
		let _ = self.transition(target, Some(err.to_string()));
		err
	}
}

fn validate_quote_request(request: &QuoteRequest) -> Result<(), FlowError> {
	if request.payment_platforms.is_empty() {
		return Err(FlowError::validation(
			"payment_platforms",
			"at least one payment platform is required",
		));
	}
	let amount = parse_uint_str(&request.amount)
		.map_err(|reason| FlowError::validation("amount", reason))?;
	if amount.is_zero() {
		return Err(FlowError::validation("amount", "must be greater than zero"));
	}
	if request.fiat_currency.trim().is_empty() {
		return Err(FlowError::validation("fiat_currency", "must not be empty"));
	}
	Ok(())
}
