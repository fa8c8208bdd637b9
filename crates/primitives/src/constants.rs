//! Protocol-level constants.

/// Fixed-point scale for all three withdrawal fee rates (parts per 100 000,
/// i.e. 5 decimal digits of precision).
pub const FEE_RATE_SCALE: u128 = 100_000;

/// Maximum fee rate representable in the 20-bit sequence field ranges.
pub const MAX_FEE_RATE: u32 = 0xFFFFF;

/// Offset added to a withdrawal transaction's locktime to obtain the
/// execution expiry destined for the on-chain 32-bit field.
pub const EXPIRY_OFFSET: u64 = 1_000_000_000;

/// Number of bitcoin blocks between difficulty adjustments.
pub const DIFF_ADJUSTMENT_PERIOD: u32 = 2016;
