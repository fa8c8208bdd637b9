use std::{
    fmt::{self, Display},
    io::{Read, Write},
    str::FromStr,
};

use arbitrary::{Arbitrary, Unstructured};
use bitcoin::{hashes::Hash, OutPoint, Txid};
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Reference to the UTXO currently controlling a vault.
///
/// Wraps [`bitcoin::OutPoint`] so the canonical `"txid:vout"` string form
/// (64 hex chars, colon, decimal vout) is the only textual representation.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VaultUtxo(OutPoint);

impl VaultUtxo {
    pub fn new(txid: Txid, vout: u32) -> Self {
        Self(OutPoint { txid, vout })
    }

    pub fn txid(&self) -> Txid {
        self.0.txid
    }

    pub fn vout(&self) -> u32 {
        self.0.vout
    }

    pub fn outpoint(&self) -> &OutPoint {
        &self.0
    }
}

impl From<OutPoint> for VaultUtxo {
    fn from(value: OutPoint) -> Self {
        Self(value)
    }
}

impl From<VaultUtxo> for OutPoint {
    fn from(value: VaultUtxo) -> Self {
        value.0
    }
}

impl Display for VaultUtxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // OutPoint renders as "txid:vout" already.
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for VaultUtxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VaultUtxo({})", self.0)
    }
}

/// Error parsing a `"txid:vout"` string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid utxo reference: {0}")]
pub struct ParseUtxoError(#[from] bitcoin::transaction::ParseOutPointError);

impl FromStr for VaultUtxo {
    type Err = ParseUtxoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(OutPoint::from_str(s)?))
    }
}

impl BorshSerialize for VaultUtxo {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.0.txid.to_byte_array(), writer)?;
        BorshSerialize::serialize(&self.0.vout, writer)
    }
}

impl BorshDeserialize for VaultUtxo {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let txid = <[u8; 32]>::deserialize_reader(reader)?;
        let vout = u32::deserialize_reader(reader)?;
        Ok(Self(OutPoint {
            txid: Txid::from_byte_array(txid),
            vout,
        }))
    }
}

impl Serialize for VaultUtxo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VaultUtxo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl<'a> Arbitrary<'a> for VaultUtxo {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        let txid = Txid::from_byte_array(<[u8; 32]>::arbitrary(u)?);
        Ok(Self::new(txid, u32::arbitrary(u)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_string_roundtrip() {
        let s = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855:7";
        let utxo: VaultUtxo = s.parse().unwrap();
        assert_eq!(utxo.vout(), 7);
        assert_eq!(utxo.to_string(), s);
    }

    #[test]
    fn test_utxo_rejects_garbage() {
        assert!("nothex:0".parse::<VaultUtxo>().is_err());
        assert!("e3b0c44298fc1c149afbf4c8996fb924".parse::<VaultUtxo>().is_err());
    }

    #[test]
    fn test_utxo_serde_as_string() {
        let s = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855:0";
        let utxo: VaultUtxo = s.parse().unwrap();
        let json = serde_json::to_string(&utxo).unwrap();
        assert_eq!(json, format!("\"{s}\""));
        let back: VaultUtxo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, utxo);
    }
}
