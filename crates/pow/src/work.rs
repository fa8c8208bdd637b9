use std::ops::{Add, AddAssign};

use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use ethnum::U256;
use serde::{Deserialize, Serialize};

use crate::chainwork;

/// Cumulative chainwork, a big-endian 256-bit accumulator.
///
/// The relay sums per-header work across a chain and picks the fork with
/// the larger accumulator; ordering is plain big-endian byte comparison.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Arbitrary,
    Serialize,
    Deserialize,
)]
pub struct Chainwork([u8; 32]);

impl Chainwork {
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Work of a single header with the given compact difficulty bits.
    pub fn from_nbits(nbits: u32) -> Self {
        Self(chainwork(nbits))
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl AddAssign for Chainwork {
    fn add_assign(&mut self, rhs: Self) {
        let sum = U256::from_be_bytes(self.0).wrapping_add(U256::from_be_bytes(rhs.0));
        self.0 = sum.to_be_bytes();
    }
}

impl Add for Chainwork {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}
