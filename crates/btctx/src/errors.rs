//! Errors raised while decoding withdrawal transactions.

use thiserror::Error;

/// Structural violation of the withdrawal transaction layout.
///
/// Always a construction-time failure: the transaction is invalid or
/// adversarial and must be rejected, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedWithdrawal {
    /// Withdrawals need the vault input plus the fee-encoding input.
    #[error("need at least 2 inputs, got {0}")]
    TooFewInputs(usize),

    /// Withdrawals need the new vault output plus the `OP_RETURN` output.
    #[error("need at least 2 outputs, got {0}")]
    TooFewOutputs(usize),

    /// The high bit of the input's sequence marks it as fee-rate-encoding.
    #[error("input {input} sequence high bit not set")]
    SequenceFlagUnset { input: usize },

    /// `locktime + EXPIRY_OFFSET` no longer fits the on-chain 32-bit field.
    #[error("execution expiry {0} overflows u32")]
    ExpiryOverflow(u64),

    /// Output 1 has an empty script.
    #[error("output 1 has an empty script")]
    EmptyScript,

    /// Output 1 does not start with `OP_RETURN`.
    #[error("output 1 is not OP_RETURN")]
    NotOpReturn,

    /// Output 1 is a bare `OP_RETURN` with no push opcode.
    #[error("output 1 OP_RETURN has no push opcode")]
    MissingPushOpcode,

    /// Output 1 pushes `OP_0`, which carries no payload.
    #[error("output 1 OP_RETURN followed by OP_0")]
    EmptyPush,

    /// The push opcode is neither a direct push nor `OP_PUSHDATA1`.
    #[error("output 1 OP_RETURN has invalid push opcode {0:#04x}")]
    InvalidPushOpcode(u8),

    /// `OP_PUSHDATA1` is not followed by its length byte.
    #[error("output 1 OP_PUSHDATA1 missing length byte")]
    MissingPushLength,

    /// The declared push length exceeds the remaining script bytes.
    #[error("output 1 OP_RETURN data length mismatch: declared {declared}, got {actual}")]
    PushLengthMismatch { declared: usize, actual: usize },

    /// The chain-specific payload decoder rejected the `OP_RETURN` data.
    #[error("invalid OP_RETURN payload: {0}")]
    InvalidPayload(String),
}

/// Arithmetic or schema violation on an otherwise well-formed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// A fee component references a token slot the withdrawal doesn't carry.
    #[error("{fee} fee references token index {index} out of bounds")]
    TokenIndexOutOfBounds { fee: &'static str, index: usize },

    /// A per-token total (amount plus fees) reached `2^64`.
    #[error("token {index} total amount overflows u64")]
    AmountOverflow { index: usize },
}
