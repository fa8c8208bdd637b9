use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

/// Configuration for one token slot of a vault.
///
/// The position of a config in the vault's token list is the canonical
/// index used by every amount array; it never changes once the vault is
/// opened.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Arbitrary, Serialize, Deserialize,
)]
pub struct TokenConfig {
    /// Chain-specific address of the token.
    pub token: String,

    /// Multiplier scaling the vault-internal raw unit to the token's
    /// actual on-chain unit.
    pub multiplier: u64,
}

/// Balance of one token slot of a vault.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Arbitrary, Serialize, Deserialize,
)]
pub struct VaultBalance {
    /// Chain-specific address of the token.
    pub token: String,

    /// Multiplier scaling `raw_amount` to `scaled_amount`.
    pub multiplier: u64,

    /// Raw amount, exactly as tracked in the vault state.
    pub raw_amount: u64,

    /// Derived amount of actual token units, `raw_amount * multiplier`.
    /// Never stored independently of `raw_amount`.
    pub scaled_amount: u128,
}

impl VaultBalance {
    /// Creates a zero balance for a token slot.
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            token: config.token.clone(),
            multiplier: config.multiplier,
            raw_amount: 0,
            scaled_amount: 0,
        }
    }

    /// Recomputes `scaled_amount` from `raw_amount`.
    pub fn rescale(&mut self) {
        self.scaled_amount = self.raw_amount as u128 * self.multiplier as u128;
    }
}

impl From<&TokenConfig> for VaultBalance {
    fn from(config: &TokenConfig) -> Self {
        Self::new(config)
    }
}
