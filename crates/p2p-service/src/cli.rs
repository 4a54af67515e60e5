//! Command-line interface definitions.

use clap::{Parser, Subcommand};
use p2p_config::DEFAULT_CONFIG_PATH;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "p2p-cli")]
#[command(about = "Peer-to-peer fiat on-ramp client", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, env = "P2P_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
	pub config: PathBuf,

	/// Log level override (trace, debug, info, warn, error)
	#[arg(short, long)]
	pub log_level: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

/// Arguments shared by commands that need quotes.
#[derive(clap::Args, Debug, Clone)]
pub struct QuoteArgs {
	/// Fiat amount to pay, as a decimal string
	#[arg(long)]
	pub amount: String,

	/// ISO currency code, e.g. USD
	#[arg(long, default_value = "USD")]
	pub currency: String,

	/// Payment platform, e.g. venmo; repeat for several
	#[arg(long = "platform", required = true)]
	pub platforms: Vec<String>,

	/// Address receiving the released tokens; defaults to the signer
	#[arg(long)]
	pub recipient: Option<String>,

	/// Token to receive on the destination chain
	#[arg(long)]
	pub token: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
	/// Validate the configuration file
	Validate,

	/// Resolve a payment processor name to its on-chain hash
	ResolveMethod {
		/// Processor name, or a bytes32 hash to pass through
		name: String,
	},

	/// Show the current fee bid
	Gas,

	/// Show a deposit
	Deposit {
		/// Deposit id
		id: String,
	},

	/// Show the open intent of an account
	Intent {
		/// Intent owner address
		owner: String,
	},

	/// Fetch quotes for an exact fiat amount
	Quote(QuoteArgs),

	/// Quote and signal an intent against the best quote
	Signal {
		#[command(flatten)]
		quote: QuoteArgs,

		/// Index of the quote to signal against
		#[arg(long, default_value_t = 0)]
		index: usize,
	},

	/// Submit payment proofs and fulfill an open intent
	Fulfill {
		/// Intent hash
		hash: String,

		/// Proof artifact file (raw bytes or 0x-prefixed hex); one or two
		#[arg(long = "proof", required = true, num_args = 1..=2)]
		proofs: Vec<PathBuf>,
	},

	/// Cancel an open intent
	Cancel {
		/// Intent hash
		hash: String,
	},

	/// Release an intent's funds to the payer (deposit owner)
	Release {
		/// Intent hash
		hash: String,
	},

	/// Withdraw a deposit (deposit owner)
	Withdraw {
		/// Deposit id
		id: String,
	},
}
