//! Ledger consistency errors.

use spvault_btctx::AmountError;
use spvault_primitives::VaultUtxo;
use thiserror::Error;

/// Failure applying an event or replaying a withdrawal batch.
///
/// None of these are transient: they signal an out-of-order batch, an
/// overdraw, or a lifecycle violation, and the caller must re-fetch chain
/// state or drop the offending transaction rather than retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateUpdateError {
    /// The vault has not been opened yet (or was closed).
    #[error("vault is not opened")]
    VaultNotOpened,

    /// The vault already holds (or held) an ownership UTXO and cannot be
    /// opened again.
    #[error("vault was already opened")]
    VaultAlreadyOpened,

    /// A withdrawal does not spend the vault's current ownership UTXO;
    /// the batch is out of order or references an unrelated UTXO.
    #[error("withdrawal spends {found}, vault UTXO is {expected:?}")]
    InvalidUtxoChain {
        expected: Option<VaultUtxo>,
        found: VaultUtxo,
    },

    /// A withdrawal or deposit references a token slot the vault does not
    /// have configured.
    #[error("token index {index} not configured in vault")]
    UnknownTokenIndex { index: usize },

    /// A withdrawal takes more of a token than the vault holds.
    #[error("token {index} balance {available} cannot cover withdrawal of {required}")]
    InsufficientVaultBalance {
        index: usize,
        available: u64,
        required: u64,
    },

    /// A deposit pushed a token balance past `u64::MAX`.
    #[error("token {index} balance overflows")]
    BalanceOverflow { index: usize },

    /// Fee arithmetic on the withdrawal itself failed.
    #[error(transparent)]
    Amount(#[from] AmountError),
}
