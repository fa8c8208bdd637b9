//! Decoding of vault withdrawal transactions observed on bitcoin.
//!
//! A withdrawal packs its fee rates into the first two input sequence
//! fields and its chain-specific routing payload into an `OP_RETURN`
//! output; [`WithdrawalInfo::parse`] validates the whole layout up front
//! and hands back an immutable, fully-checked view.

mod errors;
mod op_return;
mod withdrawal;

pub use errors::*;
pub use op_return::*;
pub use withdrawal::*;
