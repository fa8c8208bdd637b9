//! On-chain vault events, as reported by the contract layer.

use bitcoin::Txid;
use serde::{Deserialize, Serialize};
use spvault_btctx::WithdrawalInfo;
use spvault_primitives::{TokenConfig, VaultUtxo};

/// A discrete on-chain event projected onto a vault's state.
///
/// Routing fields (vault owner/id) belong to the event transport and are
/// not repeated here; an event is applied to the vault it was observed
/// for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// A new vault was opened around an ownership UTXO.
    Open {
        utxo: VaultUtxo,
        confirmations: u32,
        tokens: Vec<TokenConfig>,
    },

    /// Funds were deposited into the vault, raw units per token slot.
    Deposit { amounts: Vec<u64> },

    /// A withdrawal was claimed against the vault's current UTXO.
    Claim { withdrawal: WithdrawalInfo },

    /// A withdrawal was fronted by a third party.  Tracked by the
    /// contract layer; no balance effect on the vault ledger.
    Front {
        btc_txid: Txid,
        recipient: String,
        amounts: Vec<u64>,
        fronting_address: String,
    },

    /// The vault was closed; balances are returned to the owner by the
    /// contract, not mutated here.
    Close { btc_txid: Txid, error: String },
}
