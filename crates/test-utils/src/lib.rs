//! Fixtures for building synthetic vault withdrawal transactions in tests.

use bitcoin::{
    absolute::LockTime, hashes::Hash, transaction::Version, Amount, OutPoint, ScriptBuf, Sequence,
    Transaction, TxIn, TxOut, Txid, Witness,
};
use spvault_btctx::{MalformedWithdrawal, OpReturnData, OpReturnDecoder};

/// Chain tag tests register [`MockPayloadCodec`] under.
pub const TEST_CHAIN_TAG: &str = "mock";

/// Reference `OP_RETURN` payload codec used across the test suites.
///
/// Layout: `recipient_len u8 ∥ recipient utf8 ∥ amount_count u8 ∥
/// amounts u64-be ∥ optional 32-byte execution hash`.
#[derive(Copy, Clone, Debug, Default)]
pub struct MockPayloadCodec;

/// Encodes a payload in the [`MockPayloadCodec`] layout.
pub fn encode_payload(recipient: &str, amounts: &[u64], execution_hash: Option<[u8; 32]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(recipient.len() as u8);
    out.extend_from_slice(recipient.as_bytes());
    out.push(amounts.len() as u8);
    for amt in amounts {
        out.extend_from_slice(&amt.to_be_bytes());
    }
    if let Some(hash) = execution_hash {
        out.extend_from_slice(&hash);
    }
    out
}

impl OpReturnDecoder for MockPayloadCodec {
    fn decode(&self, payload: &[u8]) -> Result<OpReturnData, MalformedWithdrawal> {
        fn invalid(msg: &str) -> MalformedWithdrawal {
            MalformedWithdrawal::InvalidPayload(msg.to_owned())
        }

        let (rlen, rest) = payload.split_first().ok_or_else(|| invalid("empty payload"))?;
        let rlen = *rlen as usize;
        if rest.len() < rlen {
            return Err(invalid("truncated recipient"));
        }
        let (raddr, rest) = rest.split_at(rlen);
        let recipient = std::str::from_utf8(raddr)
            .map_err(|_| invalid("recipient not utf8"))?
            .to_owned();

        let (count, mut rest) = rest.split_first().ok_or_else(|| invalid("missing amount count"))?;
        let mut raw_amounts = Vec::with_capacity(*count as usize);
        for _ in 0..*count {
            if rest.len() < 8 {
                return Err(invalid("truncated amount"));
            }
            let (chunk, tail) = rest.split_at(8);
            raw_amounts.push(u64::from_be_bytes(chunk.try_into().expect("8-byte chunk")));
            rest = tail;
        }

        let execution_hash = match rest.len() {
            0 => None,
            32 => Some(rest.try_into().expect("32-byte hash")),
            _ => return Err(invalid("trailing bytes")),
        };

        Ok(OpReturnData {
            recipient,
            raw_amounts,
            execution_hash,
        })
    }
}

/// Packs the three 20-bit fee rates into the two fee-encoding input
/// sequences, high bits set.
pub fn pack_fee_rates(caller: u32, execution: u32, fronting: u32) -> (Sequence, Sequence) {
    let seq0 = 0x8000_0000 | (caller & 0xFFFFF) | ((fronting & 0xFFC00) << 10);
    let seq1 = 0x8000_0000 | (execution & 0xFFFFF) | ((fronting & 0x3FF) << 20);
    (Sequence(seq0), Sequence(seq1))
}

/// Wraps a payload in the protocol's `OP_RETURN` template, using a direct
/// push when it fits and `OP_PUSHDATA1` otherwise.
pub fn op_return_script(payload: &[u8]) -> ScriptBuf {
    assert!(payload.len() <= u8::MAX as usize, "payload too long for tests");
    let mut bytes = vec![0x6a];
    if payload.len() <= 0x4b {
        bytes.push(payload.len() as u8);
    } else {
        bytes.push(0x4c);
        bytes.push(payload.len() as u8);
    }
    bytes.extend_from_slice(payload);
    ScriptBuf::from(bytes)
}

pub fn dummy_txid(byte: u8) -> Txid {
    Txid::from_byte_array([byte; 32])
}

pub fn vault_outpoint(byte: u8, vout: u32) -> OutPoint {
    OutPoint::new(dummy_txid(byte), vout)
}

pub fn dummy_vault_script() -> ScriptBuf {
    // OP_TRUE placeholder, the codec treats the script as opaque
    ScriptBuf::from(vec![0x51])
}

/// Builds a withdrawal-shaped transaction from raw parts.
pub fn build_withdrawal_tx(
    spent_vault_utxo: OutPoint,
    (seq0, seq1): (Sequence, Sequence),
    locktime: u32,
    op_return: ScriptBuf,
    new_vault_script: ScriptBuf,
    new_vault_amount_sats: u64,
) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::from_consensus(locktime),
        input: vec![
            TxIn {
                previous_output: spent_vault_utxo,
                script_sig: ScriptBuf::new(),
                sequence: seq0,
                witness: Witness::new(),
            },
            TxIn {
                previous_output: vault_outpoint(0xEE, 1),
                script_sig: ScriptBuf::new(),
                sequence: seq1,
                witness: Witness::new(),
            },
        ],
        output: vec![
            TxOut {
                value: Amount::from_sat(new_vault_amount_sats),
                script_pubkey: new_vault_script,
            },
            TxOut {
                value: Amount::ZERO,
                script_pubkey: op_return,
            },
        ],
    }
}

/// Builds a well-formed withdrawal transaction with a
/// [`MockPayloadCodec`]-encoded payload.
pub fn build_simple_withdrawal(
    spent_vault_utxo: OutPoint,
    (caller_rate, execution_rate, fronting_rate): (u32, u32, u32),
    recipient: &str,
    amounts: &[u64],
    execution_hash: Option<[u8; 32]>,
) -> Transaction {
    let payload = encode_payload(recipient, amounts, execution_hash);
    build_withdrawal_tx(
        spent_vault_utxo,
        pack_fee_rates(caller_rate, execution_rate, fronting_rate),
        0,
        op_return_script(&payload),
        dummy_vault_script(),
        100_000,
    )
}
