//! Bitcoin proof-of-work arithmetic over the compact `nbits` encoding.
//!
//! Everything here is a total function over arbitrary 32-bit inputs; no
//! consensus validation happens at this layer.  The arithmetic is pure
//! integer math so results are bit-exact across platforms.

mod compact;
mod work;

pub use compact::*;
pub use work::*;

pub use spvault_primitives::constants::DIFF_ADJUSTMENT_PERIOD;
