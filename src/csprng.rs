//! A deterministic scalar stream keyed by a single seed
//!
//! The seed is absorbed once and every output is a squeeze of the same
//! sponge, so a seed always reproduces the same stream. Wallet blinders and
//! private shares are drawn from these streams, which is what lets a wallet
//! be regenerated from its signing key alone.

use crate::poseidon2::Poseidon2Sponge;
use crate::scalar::Scalar;

#[derive(Clone, Debug)]
pub struct PoseidonCSPRNG {
    sponge: Poseidon2Sponge,
}

impl PoseidonCSPRNG {
    pub fn new(seed: Scalar) -> Self {
        let mut sponge = Poseidon2Sponge::new();
        // A fresh sponge has not squeezed
        sponge.absorb_unchecked(seed);
        Self { sponge }
    }

    pub fn next_scalar(&mut self) -> Scalar {
        self.sponge.squeeze()
    }

    pub fn next_n(&mut self, n: usize) -> Vec<Scalar> {
        self.sponge.squeeze_batch(n)
    }

    pub fn next_tuple(&mut self) -> (Scalar, Scalar) {
        (self.next_scalar(), self.next_scalar())
    }
}

impl Iterator for PoseidonCSPRNG {
    type Item = Scalar;

    fn next(&mut self) -> Option<Scalar> {
        Some(self.next_scalar())
    }
}
