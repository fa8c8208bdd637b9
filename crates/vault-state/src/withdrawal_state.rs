//! Smart-chain status of a vault withdrawal.

use serde::{Deserialize, Serialize};

/// Status of a claim (withdrawal) as observed on the smart chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WithdrawalState {
    /// Not yet known on the smart chain: the bitcoin transaction lacks
    /// confirmations or the claim was not submitted yet.
    NotFound,

    /// Successfully claimed.
    Claimed {
        /// Smart-chain transaction that processed the claim.
        txid: String,
        recipient: String,
        claimer: String,
        /// Fronter reimbursed by this claim, if the withdrawal was
        /// fronted.
        fronter: Option<String>,
    },

    /// Fronted by a third party ahead of confirmation.
    Fronted {
        txid: String,
        recipient: String,
        fronter: String,
    },

    /// The claim transaction closed the vault, typically because the
    /// bitcoin transaction spent the vault UTXO without committing valid
    /// withdrawal data.
    Closed { txid: String, error: String },
}

impl WithdrawalState {
    /// Whether the recipient has received funds (claimed or fronted).
    pub fn is_paid_out(&self) -> bool {
        matches!(self, Self::Claimed { .. } | Self::Fronted { .. })
    }
}
