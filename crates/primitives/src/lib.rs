//! Shared leaf types for the SPV vault core.

pub mod constants;
mod token;
mod utxo;

pub use token::*;
pub use utxo::*;
