//! Escrow and orchestrator ABI surface.
//!
//! View structs derive `Serialize` so call results can be handed to the view
//! parsers as JSON without a second hand-written mapping.

use alloy::sol;

sol! {
	/// Bounds on the size of a single intent against a deposit.
	#[derive(Debug, serde::Serialize)]
	struct Range {
		uint256 min;
		uint256 max;
	}

	/// Deposit storage struct as returned inside `DepositView`.
	#[derive(Debug, serde::Serialize)]
	struct Deposit {
		address depositor;
		address delegate;
		address token;
		uint256 amount;
		Range intentAmountRange;
		bool acceptingIntents;
		uint256 remainingDeposits;
		uint256 outstandingIntentAmount;
		uint256 makerProtocolFee;
		uint256 reservedMakerFees;
		uint256 accruedMakerFees;
		uint256 accruedReferrerFees;
		address intentGuardian;
		address referrer;
		uint256 referrerFee;
	}

	#[derive(Debug, serde::Serialize)]
	struct DepositPaymentMethodData {
		address intentGatingService;
		bytes32 payeeDetails;
		bytes data;
	}

	#[derive(Debug, serde::Serialize)]
	struct Currency {
		bytes32 code;
		uint256 minConversionRate;
	}

	#[derive(Debug, serde::Serialize)]
	struct PaymentMethodDataView {
		bytes32 paymentMethod;
		DepositPaymentMethodData verificationData;
		Currency[] currencies;
	}

	#[derive(Debug, serde::Serialize)]
	struct DepositView {
		uint256 depositId;
		Deposit deposit;
		uint256 availableLiquidity;
		PaymentMethodDataView[] paymentMethods;
		bytes32[] intentHashes;
	}

	#[derive(Debug, serde::Serialize)]
	struct Intent {
		address owner;
		address to;
		address escrow;
		uint256 depositId;
		uint256 amount;
		uint256 timestamp;
		bytes32 paymentMethod;
		bytes32 fiatCurrency;
		uint256 conversionRate;
		address referrer;
		uint256 referrerFee;
		address postIntentHook;
		bytes data;
	}

	#[derive(Debug, serde::Serialize)]
	struct IntentView {
		bytes32 intentHash;
		Intent intent;
		DepositView deposit;
	}

	/// Parameters of `signalIntent`.
	#[derive(Debug)]
	struct SignalIntentParams {
		address escrow;
		uint256 depositId;
		uint256 amount;
		address to;
		bytes32 paymentMethod;
		bytes32 fiatCurrency;
		uint256 conversionRate;
		address referrer;
		uint256 referrerFee;
		bytes gatingServiceSignature;
		uint256 signatureExpiration;
		address postIntentHook;
		bytes data;
	}

	/// Parameters of `fulfillIntent`.
	#[derive(Debug)]
	struct FulfillIntentParams {
		bytes paymentProof;
		bytes32 intentHash;
		bytes verificationData;
		bytes postIntentHookData;
	}

	/// Taker-facing intent entry points.
	interface IOrchestrator {
		function signalIntent(SignalIntentParams params) external;
		function fulfillIntent(FulfillIntentParams params) external;
		function cancelIntent(bytes32 intentHash) external;
		function releaseFundsToPayer(bytes32 intentHash) external;
		function getAccountIntent(address account) external view returns (bytes32);
		function getIntent(bytes32 intentHash) external view returns (IntentView memory);

		event IntentSignaled(
			bytes32 indexed intentHash,
			address indexed escrow,
			uint256 indexed depositId,
			bytes32 paymentMethod,
			address owner,
			address to,
			uint256 amount,
			bytes32 fiatCurrency,
			uint256 conversionRate,
			uint256 timestamp
		);
	}

	/// Maker-facing deposit storage.
	interface IEscrow {
		function withdrawDeposit(uint256 depositId) external;
		function depositCounter() external view returns (uint256);
		function getDeposit(uint256 depositId) external view returns (DepositView memory);
	}
}
