//! Escrow client implementations.
//!
//! Available implementations:
//! - `evm::alloy`: JSON-RPC provider with a local signer

pub mod evm;
