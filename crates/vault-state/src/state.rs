use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use spvault_btctx::WithdrawalInfo;
use spvault_primitives::{TokenConfig, VaultBalance, VaultUtxo};
use tracing::debug;

use crate::{StateUpdateError, VaultEvent};

/// State of a single SPV vault.
///
/// Created unopened; an [`VaultEvent::Open`] sets the ownership UTXO and
/// token slots, and the vault is never deleted afterwards — a closed
/// vault keeps its historical record.
#[derive(
    Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Arbitrary, Serialize, Deserialize,
)]
pub struct VaultState {
    owner: String,
    vault_id: u128,
    balances: Vec<VaultBalance>,
    utxo: Option<VaultUtxo>,
    confirmations: u32,
    withdrawal_count: u64,
    deposit_count: u64,
    opened: bool,
}

/// Result of replaying a pending withdrawal batch over a vault's state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProjection {
    pub withdrawal_count: u64,
    pub balances: Vec<VaultBalance>,
}

impl VaultState {
    /// Creates a fresh, unopened vault record.
    pub fn new(owner: impl Into<String>, vault_id: u128) -> Self {
        Self {
            owner: owner.into(),
            vault_id,
            balances: Vec::new(),
            utxo: None,
            confirmations: 0,
            withdrawal_count: 0,
            deposit_count: 0,
            opened: false,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn vault_id(&self) -> u128 {
        self.vault_id
    }

    /// Current token balances, index-aligned with the configured slots.
    pub fn balances(&self) -> &[VaultBalance] {
        &self.balances
    }

    /// Token configuration, in canonical slot order.
    pub fn token_data(&self) -> Vec<TokenConfig> {
        self.balances
            .iter()
            .map(|bal| TokenConfig {
                token: bal.token.clone(),
                multiplier: bal.multiplier,
            })
            .collect()
    }

    /// The UTXO currently controlling the vault, if it was ever opened.
    pub fn utxo(&self) -> Option<VaultUtxo> {
        self.utxo
    }

    /// Confirmations a bitcoin transaction needs before its claim is
    /// authorized.
    pub fn confirmations(&self) -> u32 {
        self.confirmations
    }

    pub fn withdrawal_count(&self) -> u64 {
        self.withdrawal_count
    }

    pub fn deposit_count(&self) -> u64 {
        self.deposit_count
    }

    /// Whether the vault is open and able to process claims.
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Applies one confirmed on-chain event.
    ///
    /// Events mutate the state atomically: on error the vault is left
    /// exactly as it was.
    pub fn apply_event(&mut self, event: &VaultEvent) -> Result<(), StateUpdateError> {
        match event {
            VaultEvent::Open {
                utxo,
                confirmations,
                tokens,
            } => {
                // a closed vault still holds its last UTXO, so this also
                // rejects reopening
                if self.utxo.is_some() {
                    return Err(StateUpdateError::VaultAlreadyOpened);
                }
                self.balances = tokens.iter().map(VaultBalance::new).collect();
                self.utxo = Some(*utxo);
                self.confirmations = *confirmations;
                self.withdrawal_count = 0;
                self.deposit_count = 0;
                self.opened = true;
            }

            VaultEvent::Deposit { amounts } => {
                self.ensure_opened()?;
                let mut balances = self.balances.clone();
                for (index, amount) in amounts.iter().enumerate() {
                    let balance = balances
                        .get_mut(index)
                        .ok_or(StateUpdateError::UnknownTokenIndex { index })?;
                    balance.raw_amount = balance
                        .raw_amount
                        .checked_add(*amount)
                        .ok_or(StateUpdateError::BalanceOverflow { index })?;
                    balance.rescale();
                }
                self.balances = balances;
                self.deposit_count += 1;
            }

            VaultEvent::Claim { withdrawal } => {
                self.ensure_opened()?;
                let mut balances = self.balances.clone();
                let mut utxo = self.utxo;
                let mut withdrawal_count = self.withdrawal_count;
                debit_withdrawal(&mut balances, &mut utxo, &mut withdrawal_count, withdrawal)?;
                for balance in &mut balances {
                    balance.rescale();
                }
                self.balances = balances;
                self.utxo = utxo;
                self.withdrawal_count = withdrawal_count;
            }

            VaultEvent::Front { btc_txid, .. } => {
                // fronting is an off-ledger advance, tracked by the
                // contract layer
                self.ensure_opened()?;
                debug!(%btc_txid, "fronted withdrawal, no balance effect");
            }

            VaultEvent::Close { error, .. } => {
                debug!(%error, "vault closed");
                self.opened = false;
            }
        }
        Ok(())
    }

    /// Projects the vault's balances past an ordered batch of withdrawals
    /// presumed already executed on bitcoin but not yet claimed.
    ///
    /// Pure: `self` is never mutated.  Each withdrawal must spend the UTXO
    /// created by the previous one (or the vault's current UTXO for the
    /// first).
    pub fn calculate_state_after(
        &self,
        withdrawals: &[WithdrawalInfo],
    ) -> Result<StateProjection, StateUpdateError> {
        let mut balances = self.balances.clone();
        let mut utxo = self.utxo;
        let mut withdrawal_count = self.withdrawal_count;

        for withdrawal in withdrawals {
            debug!(txid = %withdrawal.txid(), "replaying pending withdrawal");
            debit_withdrawal(&mut balances, &mut utxo, &mut withdrawal_count, withdrawal)?;
        }

        for balance in &mut balances {
            balance.rescale();
        }

        Ok(StateProjection {
            withdrawal_count,
            balances,
        })
    }

    fn ensure_opened(&self) -> Result<(), StateUpdateError> {
        if !self.opened {
            return Err(StateUpdateError::VaultNotOpened);
        }
        Ok(())
    }
}

/// Applies one withdrawal's debits to a working copy of the vault
/// balances, enforcing the UTXO chain link.
///
/// Shared by authoritative claim application and batch prediction so both
/// run the identical arithmetic.
fn debit_withdrawal(
    balances: &mut [VaultBalance],
    utxo: &mut Option<VaultUtxo>,
    withdrawal_count: &mut u64,
    withdrawal: &WithdrawalInfo,
) -> Result<(), StateUpdateError> {
    let spent = withdrawal.spent_vault_utxo();
    if *utxo != Some(spent) {
        return Err(StateUpdateError::InvalidUtxoChain {
            expected: *utxo,
            found: spent,
        });
    }

    for (index, required) in withdrawal.total_output()?.into_iter().enumerate() {
        let balance = balances
            .get_mut(index)
            .ok_or(StateUpdateError::UnknownTokenIndex { index })?;
        balance.raw_amount = balance.raw_amount.checked_sub(required).ok_or(
            StateUpdateError::InsufficientVaultBalance {
                index,
                available: balance.raw_amount,
                required,
            },
        )?;
    }

    *utxo = Some(withdrawal.created_vault_utxo());
    *withdrawal_count += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use bitcoin::OutPoint;
    use spvault_btctx::MalformedWithdrawal;
    use spvault_test_utils::{build_simple_withdrawal, vault_outpoint, MockPayloadCodec};

    use super::*;

    const NO_FEES: (u32, u32, u32) = (0, 0, 0);

    fn two_tokens() -> Vec<TokenConfig> {
        vec![
            TokenConfig {
                token: "tokA".into(),
                multiplier: 1,
            },
            TokenConfig {
                token: "tokB".into(),
                multiplier: 1_000,
            },
        ]
    }

    fn opened_vault() -> VaultState {
        let mut vault = VaultState::new("owner", 1);
        vault
            .apply_event(&VaultEvent::Open {
                utxo: vault_outpoint(0xAA, 0).into(),
                confirmations: 3,
                tokens: two_tokens(),
            })
            .unwrap();
        vault
            .apply_event(&VaultEvent::Deposit {
                amounts: vec![1_000_000, 500_000],
            })
            .unwrap();
        vault
    }

    fn withdrawal(
        spent: OutPoint,
        amounts: &[u64],
    ) -> Result<WithdrawalInfo, MalformedWithdrawal> {
        let tx = build_simple_withdrawal(spent, NO_FEES, "alice", amounts, None);
        WithdrawalInfo::parse(&tx, &MockPayloadCodec)
    }

    #[test]
    fn test_open_lifecycle() {
        let mut vault = VaultState::new("owner", 1);
        assert!(!vault.is_opened());
        assert_eq!(
            vault.apply_event(&VaultEvent::Deposit { amounts: vec![1] }),
            Err(StateUpdateError::VaultNotOpened)
        );

        let open = VaultEvent::Open {
            utxo: vault_outpoint(0xAA, 0).into(),
            confirmations: 3,
            tokens: two_tokens(),
        };
        vault.apply_event(&open).unwrap();
        assert!(vault.is_opened());
        assert_eq!(vault.confirmations(), 3);
        assert_eq!(vault.utxo(), Some(vault_outpoint(0xAA, 0).into()));
        assert_eq!(vault.balances().len(), 2);
        assert!(vault.balances().iter().all(|b| b.raw_amount == 0));

        assert_eq!(
            vault.apply_event(&open),
            Err(StateUpdateError::VaultAlreadyOpened)
        );
    }

    #[test]
    fn test_deposit_accumulates() {
        let vault = opened_vault();
        assert_eq!(vault.deposit_count(), 1);
        assert_eq!(vault.balances()[0].raw_amount, 1_000_000);
        assert_eq!(vault.balances()[1].raw_amount, 500_000);
        assert_eq!(vault.balances()[1].scaled_amount, 500_000_000);

        let mut vault = vault;
        assert_eq!(
            vault.apply_event(&VaultEvent::Deposit {
                amounts: vec![1, 2, 3],
            }),
            Err(StateUpdateError::UnknownTokenIndex { index: 2 })
        );
        // failed deposit leaves counts and balances untouched
        assert_eq!(vault.deposit_count(), 1);
        assert_eq!(vault.balances()[0].raw_amount, 1_000_000);
    }

    #[test]
    fn test_claim_advances_utxo_and_balances() {
        let mut vault = opened_vault();
        let w = withdrawal(vault_outpoint(0xAA, 0), &[250_000, 100_000]).unwrap();
        let created = w.created_vault_utxo();

        vault
            .apply_event(&VaultEvent::Claim {
                withdrawal: w.clone(),
            })
            .unwrap();
        assert_eq!(vault.balances()[0].raw_amount, 750_000);
        assert_eq!(vault.balances()[1].raw_amount, 400_000);
        assert_eq!(vault.balances()[1].scaled_amount, 400_000_000);
        assert_eq!(vault.utxo(), Some(created));
        assert_eq!(vault.withdrawal_count(), 1);

        // same withdrawal again no longer matches the advanced UTXO
        assert_eq!(
            vault.apply_event(&VaultEvent::Claim { withdrawal: w }),
            Err(StateUpdateError::InvalidUtxoChain {
                expected: Some(created),
                found: vault_outpoint(0xAA, 0).into(),
            })
        );
    }

    #[test]
    fn test_claim_insufficient_balance_is_atomic() {
        let mut vault = opened_vault();
        // second token overdraws while the first would succeed
        let w = withdrawal(vault_outpoint(0xAA, 0), &[1, 500_001]).unwrap();

        let before = vault.clone();
        assert_eq!(
            vault.apply_event(&VaultEvent::Claim { withdrawal: w }),
            Err(StateUpdateError::InsufficientVaultBalance {
                index: 1,
                available: 500_000,
                required: 500_001,
            })
        );
        assert_eq!(vault, before);
    }

    #[test]
    fn test_front_and_close() {
        let mut vault = opened_vault();
        let before = vault.clone();

        vault
            .apply_event(&VaultEvent::Front {
                btc_txid: spvault_test_utils::dummy_txid(0xF0),
                recipient: "alice".into(),
                amounts: vec![1_000],
                fronting_address: "fronter".into(),
            })
            .unwrap();
        assert_eq!(vault, before);

        vault
            .apply_event(&VaultEvent::Close {
                btc_txid: spvault_test_utils::dummy_txid(0xF1),
                error: "invalid withdrawal data".into(),
            })
            .unwrap();
        assert!(!vault.is_opened());

        // a closed vault accepts no further claims and cannot reopen
        let w = withdrawal(vault_outpoint(0xAA, 0), &[1, 0]).unwrap();
        assert_eq!(
            vault.apply_event(&VaultEvent::Claim { withdrawal: w }),
            Err(StateUpdateError::VaultNotOpened)
        );
        assert_eq!(
            vault.apply_event(&VaultEvent::Open {
                utxo: vault_outpoint(0xBB, 0).into(),
                confirmations: 1,
                tokens: two_tokens(),
            }),
            Err(StateUpdateError::VaultAlreadyOpened)
        );
    }

    #[test]
    fn test_replay_empty_batch() {
        let vault = opened_vault();
        let projection = vault.calculate_state_after(&[]).unwrap();
        assert_eq!(projection.withdrawal_count, 0);
        assert_eq!(projection.balances, vault.balances());
        for balance in &projection.balances {
            assert_eq!(
                balance.scaled_amount,
                balance.raw_amount as u128 * balance.multiplier as u128
            );
        }
    }

    #[test]
    fn test_replay_chained_withdrawals() {
        let vault = opened_vault();
        let w1 = withdrawal(vault_outpoint(0xAA, 0), &[100_000, 50_000]).unwrap();
        let w2 = withdrawal(OutPoint::new(w1.txid(), 0), &[200_000, 50_000]).unwrap();

        let projection = vault
            .calculate_state_after(&[w1.clone(), w2.clone()])
            .unwrap();
        assert_eq!(projection.withdrawal_count, 2);
        assert_eq!(projection.balances[0].raw_amount, 700_000);
        assert_eq!(projection.balances[1].raw_amount, 400_000);
        assert_eq!(projection.balances[1].scaled_amount, 400_000_000);

        // input state is untouched by the projection
        assert_eq!(vault.balances()[0].raw_amount, 1_000_000);
        assert_eq!(vault.withdrawal_count(), 0);

        // out-of-order batch breaks the UTXO chain
        let w2_spent = w2.spent_vault_utxo();
        assert_eq!(
            vault.calculate_state_after(&[w2, w1]),
            Err(StateUpdateError::InvalidUtxoChain {
                expected: vault.utxo(),
                found: w2_spent,
            })
        );
    }

    #[test]
    fn test_replay_overdraw() {
        let vault = opened_vault();
        let w = withdrawal(vault_outpoint(0xAA, 0), &[1_000_001, 0]).unwrap();
        assert_eq!(
            vault.calculate_state_after(&[w]),
            Err(StateUpdateError::InsufficientVaultBalance {
                index: 0,
                available: 1_000_000,
                required: 1_000_001,
            })
        );
        assert_eq!(vault.balances()[0].raw_amount, 1_000_000);
    }

    #[test]
    fn test_replay_unknown_token() {
        let vault = opened_vault();
        let w = withdrawal(vault_outpoint(0xAA, 0), &[1, 1, 1]).unwrap();
        assert_eq!(
            vault.calculate_state_after(&[w]),
            Err(StateUpdateError::UnknownTokenIndex { index: 2 })
        );
    }

    #[test]
    fn test_state_borsh_roundtrip() {
        let vault = opened_vault();
        let bytes = borsh::to_vec(&vault).unwrap();
        let back = VaultState::try_from_slice(&bytes).unwrap();
        assert_eq!(back, vault);
    }

    #[test]
    fn test_state_json_roundtrip() {
        let vault = opened_vault();
        let json = serde_json::to_string(&vault).unwrap();
        let back: VaultState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vault);
    }
}
