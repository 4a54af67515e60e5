//! Transaction delivery types.
//!
//! This module defines the on-chain write actions the client performs and the
//! receipts returned once they are mined.

use alloy::primitives::{Address, Bytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The on-chain write actions, one tracker slot each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxAction {
	Signal,
	Fulfill,
	Release,
	Cancel,
	Withdraw,
}

impl fmt::Display for TxAction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Signal => write!(f, "signal"),
			Self::Fulfill => write!(f, "fulfill"),
			Self::Release => write!(f, "release"),
			Self::Cancel => write!(f, "cancel"),
			Self::Withdraw => write!(f, "withdraw"),
		}
	}
}

/// Event log emitted by a mined transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
}

/// Transaction receipt containing execution details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionReceipt {
	/// The hash of the transaction.
	pub hash: B256,
	/// The block number where the transaction was included.
	pub block_number: u64,
	/// Whether the transaction executed successfully.
	pub success: bool,
	pub logs: Vec<Log>,
}
