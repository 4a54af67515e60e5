pub mod alloy;

pub use self::alloy::{AlloyEscrow, AlloyEscrowConfig};
