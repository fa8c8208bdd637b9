//! Chain-specific `OP_RETURN` payload decoding.

use std::{collections::HashMap, fmt, sync::Arc};

use bitcoin::Transaction;
use thiserror::Error;
use tracing::debug;

use crate::{MalformedWithdrawal, WithdrawalInfo};

/// Routing data carried in a withdrawal's `OP_RETURN` payload.
///
/// The binary layout of the payload differs per smart chain (addresses
/// differ by chain); decoding it is the one point of legitimate per-chain
/// polymorphism in the codec.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpReturnData {
    /// Chain-specific address of the withdrawal recipient.
    pub recipient: String,

    /// Raw token amounts, index-aligned with the vault's token list.
    pub raw_amounts: Vec<u64>,

    /// Execution hash if a contract execution is attached to the
    /// withdrawal.
    pub execution_hash: Option<[u8; 32]>,
}

/// Decoder for one smart chain's `OP_RETURN` payload format.
///
/// Injected into [`WithdrawalInfo::parse`] as a strategy object; the codec
/// itself stays chain-agnostic.
pub trait OpReturnDecoder: Send + Sync {
    /// Decodes the raw payload bytes (the push data, script framing
    /// already stripped).
    fn decode(&self, payload: &[u8]) -> Result<OpReturnData, MalformedWithdrawal>;
}

/// Error resolving a chain tag against a [`DecoderRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No decoder was registered for the chain tag.
    #[error("no OP_RETURN decoder registered for chain {0:?}")]
    UnknownChainTag(String),

    /// The transaction itself was malformed.
    #[error(transparent)]
    Malformed(#[from] MalformedWithdrawal),
}

/// Explicit mapping from chain tag to payload decoder.
///
/// Constructed by the application and passed to call sites; there is no
/// global dispatch table and no load-order dependence.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<String, Arc<dyn OpReturnDecoder>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a decoder for a chain tag, replacing any previous one.
    pub fn register(&mut self, chain: impl Into<String>, decoder: Arc<dyn OpReturnDecoder>) {
        self.decoders.insert(chain.into(), decoder);
    }

    pub fn get(&self, chain: &str) -> Option<&dyn OpReturnDecoder> {
        self.decoders.get(chain).map(|d| d.as_ref())
    }

    /// Parses a withdrawal transaction using the decoder registered for
    /// `chain`.
    pub fn parse_for_chain(
        &self,
        chain: &str,
        tx: &Transaction,
    ) -> Result<WithdrawalInfo, RegistryError> {
        let decoder = self
            .get(chain)
            .ok_or_else(|| RegistryError::UnknownChainTag(chain.to_owned()))?;
        debug!(%chain, txid = %tx.compute_txid(), "parsing withdrawal transaction");
        Ok(WithdrawalInfo::parse(tx, decoder)?)
    }
}

impl fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderRegistry")
            .field("chains", &self.decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use spvault_test_utils::{
        build_simple_withdrawal, vault_outpoint, MockPayloadCodec, TEST_CHAIN_TAG,
    };

    use super::*;
    // test-utils links the external build of this crate, so use that
    // instance's types to keep the trait impls compatible
    use spvault_btctx::{DecoderRegistry, MalformedWithdrawal, RegistryError};

    #[test]
    fn test_registry_dispatch() {
        let mut registry = DecoderRegistry::new();
        registry.register(TEST_CHAIN_TAG, Arc::new(MockPayloadCodec));

        let tx =
            build_simple_withdrawal(vault_outpoint(0xAA, 0), (0, 0, 0), "alice", &[42], None);

        let info = registry.parse_for_chain(TEST_CHAIN_TAG, &tx).unwrap();
        assert_eq!(info.output_without_fees(), &[42]);

        assert_eq!(
            registry.parse_for_chain("otherchain", &tx),
            Err(RegistryError::UnknownChainTag("otherchain".to_owned()))
        );
    }

    #[test]
    fn test_registry_surfaces_malformed_tx() {
        let mut registry = DecoderRegistry::new();
        registry.register(TEST_CHAIN_TAG, Arc::new(MockPayloadCodec));

        let mut tx =
            build_simple_withdrawal(vault_outpoint(0xAA, 0), (0, 0, 0), "alice", &[42], None);
        tx.output.truncate(1);

        assert_eq!(
            registry.parse_for_chain(TEST_CHAIN_TAG, &tx),
            Err(RegistryError::Malformed(MalformedWithdrawal::TooFewOutputs(1)))
        );
    }
}
