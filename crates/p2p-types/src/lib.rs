//! Shared types for the peer-to-peer on-ramp client.
//!
//! Holds the canonical domain model (deposits, intents, quotes, gating
//! signatures), the 32-byte identifier codec used for on-chain keys, and the
//! numeric coercion helpers every payload parser relies on.

pub mod codec;
pub mod conversion;
pub mod delivery;
pub mod deposit;
pub mod intent;
pub mod quote;
pub mod utils;

pub use codec::*;
pub use conversion::*;
pub use delivery::*;
pub use deposit::*;
pub use intent::*;
pub use quote::*;
pub use utils::*;

pub use alloy::primitives::{Address, Bytes, B256, U256};
