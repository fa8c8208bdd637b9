use std::io::{Read, Write};

use bitcoin::{hashes::Hash, ScriptBuf, Transaction, Txid};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use spvault_primitives::{
    constants::{EXPIRY_OFFSET, FEE_RATE_SCALE, MAX_FEE_RATE},
    VaultUtxo,
};

use crate::{AmountError, MalformedWithdrawal, OpReturnDecoder};

/// Execution action attached to a withdrawal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionData {
    /// Hash of the scheduled execution.
    pub execution_hash: [u8; 32],

    /// Expiry of the execution, `locktime + EXPIRY_OFFSET`.
    pub execution_expiry: u32,
}

/// A vault withdrawal decoded from a bitcoin transaction.
///
/// Construction is the validation step: a successfully parsed value is
/// immutable and every accessor except [`total_output`](Self::total_output)
/// is infallible.  Fee rates are fixed-point parts per 100 000 packed into
/// the first two input sequence fields; the recipient and raw amounts come
/// from the `OP_RETURN` payload via the injected chain decoder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalInfo {
    txid: Txid,
    recipient: String,
    raw_amounts: Vec<u64>,
    caller_fee_rate: u32,
    execution_fee_rate: u32,
    fronting_fee_rate: u32,
    execution_hash: Option<[u8; 32]>,
    execution_expiry: u32,
    spent_vault_utxo: VaultUtxo,
    new_vault_script: ScriptBuf,
    new_vault_btc_amount: u64,
}

impl WithdrawalInfo {
    /// Parses a withdrawal from a bitcoin transaction, validating the
    /// whole binary layout.
    pub fn parse(
        tx: &Transaction,
        decoder: &dyn OpReturnDecoder,
    ) -> Result<Self, MalformedWithdrawal> {
        if tx.input.len() < 2 {
            return Err(MalformedWithdrawal::TooFewInputs(tx.input.len()));
        }
        if tx.output.len() < 2 {
            return Err(MalformedWithdrawal::TooFewOutputs(tx.output.len()));
        }

        let seq0 = tx.input[0].sequence.to_consensus_u32();
        let seq1 = tx.input[1].sequence.to_consensus_u32();
        if seq0 & 0x8000_0000 == 0 {
            return Err(MalformedWithdrawal::SequenceFlagUnset { input: 0 });
        }
        if seq1 & 0x8000_0000 == 0 {
            return Err(MalformedWithdrawal::SequenceFlagUnset { input: 1 });
        }

        let caller_fee_rate = seq0 & MAX_FEE_RATE;
        let execution_fee_rate = seq1 & MAX_FEE_RATE;
        // 20 bits reassembled from the top 10 usable bits of each sequence
        let fronting_fee_rate =
            ((seq0 >> 10) & 0b1111_1111_1100_0000_0000) | ((seq1 >> 20) & 0b11_1111_1111);

        let expiry = tx.lock_time.to_consensus_u32() as u64 + EXPIRY_OFFSET;
        let execution_expiry =
            u32::try_from(expiry).map_err(|_| MalformedWithdrawal::ExpiryOverflow(expiry))?;

        let payload = parse_op_return_push(tx.output[1].script_pubkey.as_bytes())?;
        let data = decoder.decode(payload)?;

        Ok(Self {
            txid: tx.compute_txid(),
            recipient: data.recipient,
            raw_amounts: data.raw_amounts,
            caller_fee_rate,
            execution_fee_rate,
            fronting_fee_rate,
            execution_hash: data.execution_hash,
            execution_expiry,
            spent_vault_utxo: tx.input[0].previous_output.into(),
            new_vault_script: tx.output[0].script_pubkey.clone(),
            new_vault_btc_amount: tx.output[0].value.to_sat(),
        })
    }

    /// Txid of the bitcoin transaction authorizing the withdrawal.
    pub fn txid(&self) -> Txid {
        self.txid
    }

    /// Chain-specific address of the funds recipient.
    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn caller_fee_rate(&self) -> u32 {
        self.caller_fee_rate
    }

    pub fn execution_fee_rate(&self) -> u32 {
        self.execution_fee_rate
    }

    pub fn fronting_fee_rate(&self) -> u32 {
        self.fronting_fee_rate
    }

    /// Raw token amounts the recipient receives, before any fees.
    pub fn output_without_fees(&self) -> &[u64] {
        &self.raw_amounts
    }

    /// Per-token fee paid to the caller submitting the withdrawal on the
    /// smart chain.
    pub fn caller_fee(&self) -> Vec<u128> {
        self.fee_at_rate(self.caller_fee_rate)
    }

    /// Per-token fee paid to the fronter advancing the withdrawal.
    pub fn fronting_fee(&self) -> Vec<u128> {
        self.fee_at_rate(self.fronting_fee_rate)
    }

    /// Fee transferred to the execution contract, defined against token
    /// index 0 only.  Empty when the withdrawal carries no tokens.
    pub fn execution_fee(&self) -> Vec<u128> {
        self.raw_amounts
            .first()
            .map(|amt| *amt as u128 * self.execution_fee_rate as u128 / FEE_RATE_SCALE)
            .into_iter()
            .collect()
    }

    fn fee_at_rate(&self, rate: u32) -> Vec<u128> {
        self.raw_amounts
            .iter()
            .map(|amt| *amt as u128 * rate as u128 / FEE_RATE_SCALE)
            .collect()
    }

    /// Total per-token amounts leaving the vault, raw amounts plus every
    /// nonzero fee component.
    pub fn total_output(&self) -> Result<Vec<u64>, AmountError> {
        let mut amounts: Vec<u128> = self.raw_amounts.iter().map(|amt| *amt as u128).collect();

        let components = [
            ("caller", self.caller_fee()),
            ("fronting", self.fronting_fee()),
            ("execution", self.execution_fee()),
        ];
        for (fee, values) in components {
            for (index, value) in values.into_iter().enumerate() {
                if value == 0 {
                    continue;
                }
                let slot = amounts
                    .get_mut(index)
                    .ok_or(AmountError::TokenIndexOutOfBounds { fee, index })?;
                *slot += value;
            }
        }

        amounts
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                u64::try_from(value).map_err(|_| AmountError::AmountOverflow { index })
            })
            .collect()
    }

    /// Execution action scheduled by this withdrawal, if any.
    pub fn execution_data(&self) -> Option<ExecutionData> {
        self.execution_hash.map(|execution_hash| ExecutionData {
            execution_hash,
            execution_expiry: self.execution_expiry,
        })
    }

    /// Vault ownership UTXO this transaction spends.
    pub fn spent_vault_utxo(&self) -> VaultUtxo {
        self.spent_vault_utxo
    }

    /// Vault ownership UTXO this transaction creates (its own txid, vout 0
    /// by protocol convention).
    pub fn created_vault_utxo(&self) -> VaultUtxo {
        VaultUtxo::new(self.txid, 0)
    }

    /// Locking script of the new vault ownership UTXO.
    pub fn new_vault_script(&self) -> &ScriptBuf {
        &self.new_vault_script
    }

    /// Satoshis assigned to the new vault ownership UTXO.
    pub fn new_vault_btc_amount(&self) -> u64 {
        self.new_vault_btc_amount
    }
}

/// Validates the `OP_RETURN` framing of output 1 and returns the pushed
/// payload bytes.
///
/// Accepts `0x6a` followed by either a direct push (`0x01..=0x4b`) or
/// `OP_PUSHDATA1` (`0x4c` plus one length byte); trailing script bytes
/// past the declared payload are ignored, a shorter payload is an error.
fn parse_op_return_push(script: &[u8]) -> Result<&[u8], MalformedWithdrawal> {
    if script.is_empty() {
        return Err(MalformedWithdrawal::EmptyScript);
    }
    if script[0] != 0x6a {
        return Err(MalformedWithdrawal::NotOpReturn);
    }
    let opcode = *script.get(1).ok_or(MalformedWithdrawal::MissingPushOpcode)?;
    match opcode {
        0x00 => Err(MalformedWithdrawal::EmptyPush),
        0x4c => {
            let declared = *script.get(2).ok_or(MalformedWithdrawal::MissingPushLength)? as usize;
            let actual = script.len().saturating_sub(3).min(declared);
            if actual != declared {
                return Err(MalformedWithdrawal::PushLengthMismatch { declared, actual });
            }
            Ok(&script[3..3 + declared])
        }
        0x01..=0x4b => {
            let declared = opcode as usize;
            let actual = script.len().saturating_sub(2).min(declared);
            if actual != declared {
                return Err(MalformedWithdrawal::PushLengthMismatch { declared, actual });
            }
            Ok(&script[2..2 + declared])
        }
        other => Err(MalformedWithdrawal::InvalidPushOpcode(other)),
    }
}

impl BorshSerialize for WithdrawalInfo {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.txid.to_byte_array(), writer)?;
        BorshSerialize::serialize(&self.recipient, writer)?;
        BorshSerialize::serialize(&self.raw_amounts, writer)?;
        BorshSerialize::serialize(&self.caller_fee_rate, writer)?;
        BorshSerialize::serialize(&self.execution_fee_rate, writer)?;
        BorshSerialize::serialize(&self.fronting_fee_rate, writer)?;
        BorshSerialize::serialize(&self.execution_hash, writer)?;
        BorshSerialize::serialize(&self.execution_expiry, writer)?;
        BorshSerialize::serialize(&self.spent_vault_utxo, writer)?;
        BorshSerialize::serialize(&self.new_vault_script.to_bytes(), writer)?;
        BorshSerialize::serialize(&self.new_vault_btc_amount, writer)
    }
}

impl BorshDeserialize for WithdrawalInfo {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let txid = Txid::from_byte_array(<[u8; 32]>::deserialize_reader(reader)?);
        let recipient = String::deserialize_reader(reader)?;
        let raw_amounts = Vec::<u64>::deserialize_reader(reader)?;
        let caller_fee_rate = u32::deserialize_reader(reader)?;
        let execution_fee_rate = u32::deserialize_reader(reader)?;
        let fronting_fee_rate = u32::deserialize_reader(reader)?;
        let execution_hash = Option::<[u8; 32]>::deserialize_reader(reader)?;
        let execution_expiry = u32::deserialize_reader(reader)?;
        let spent_vault_utxo = VaultUtxo::deserialize_reader(reader)?;
        let new_vault_script = ScriptBuf::from(Vec::<u8>::deserialize_reader(reader)?);
        let new_vault_btc_amount = u64::deserialize_reader(reader)?;

        Ok(Self {
            txid,
            recipient,
            raw_amounts,
            caller_fee_rate,
            execution_fee_rate,
            fronting_fee_rate,
            execution_hash,
            execution_expiry,
            spent_vault_utxo,
            new_vault_script,
            new_vault_btc_amount,
        })
    }
}
