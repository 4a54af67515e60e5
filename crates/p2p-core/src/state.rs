//! Intent flow states and the transition table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a flow ended in [`FlowState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
	/// The quote collaborator found no deposit able to fill the request.
	NoLiquidity,
	/// An off-chain read kept failing; a new attempt may succeed.
	Retryable,
	Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
	Quoting,
	QuoteReady,
	Signaling,
	Signaled,
	AwaitingPayment,
	ProofSubmission,
	GateVerifying,
	Releasing,
	Fulfilled,
	Cancelling,
	Cancelled,
	Failed(FailureKind),
}

impl fmt::Display for FlowState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Quoting => write!(f, "Quoting"),
			Self::QuoteReady => write!(f, "QuoteReady"),
			Self::Signaling => write!(f, "Signaling"),
			Self::Signaled => write!(f, "Signaled"),
			Self::AwaitingPayment => write!(f, "AwaitingPayment"),
			Self::ProofSubmission => write!(f, "ProofSubmission"),
			Self::GateVerifying => write!(f, "GateVerifying"),
			Self::Releasing => write!(f, "Releasing"),
			Self::Fulfilled => write!(f, "Fulfilled"),
			Self::Cancelling => write!(f, "Cancelling"),
			Self::Cancelled => write!(f, "Cancelled"),
			Self::Failed(kind) => write!(f, "Failed({:?})", kind),
		}
	}
}

impl FlowState {
	pub fn is_terminal(&self) -> bool {
		matches!(self, Self::Fulfilled | Self::Cancelled | Self::Failed(_))
	}

	/// Whether the flow may move from `self` to `to`.
	///
	/// Submission and proof steps also have an edge back to the state they
	/// were entered from, taken when the step fails without losing the intent.
	pub fn can_transition_to(&self, to: FlowState) -> bool {
		use FlowState::*;

		match (*self, to) {
			(from, _) if from.is_terminal() => false,
			(Quoting, QuoteReady) => true,
			(QuoteReady, Signaling) => true,
			(Signaling, Signaled) => true,
			(Signaled, AwaitingPayment) => true,
			(AwaitingPayment, ProofSubmission) => true,
			(ProofSubmission, GateVerifying) => true,
			(GateVerifying, Releasing) => true,
			(Releasing, Fulfilled) => true,
			(Signaled | AwaitingPayment, Cancelling) => true,
			(Cancelling, Cancelled) => true,
			// Rollbacks after a failed submission
			(Signaling, QuoteReady) => true,
			(ProofSubmission, AwaitingPayment) => true,
			(Releasing, GateVerifying) => true,
			(Cancelling, Signaled | AwaitingPayment) => true,
			(_, Failed(_)) => true,
			_ => false,
		}
	}
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
	pub from: FlowState,
	pub to: FlowState,
	pub at: DateTime<Utc>,
	pub reason: Option<String>,
}
