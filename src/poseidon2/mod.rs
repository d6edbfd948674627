//! The Poseidon2 permutation and a duplex sponge built on it
//!
//! The sponge is the commitment primitive for wallet shares. Width, rate,
//! round counts and the constant table are fixed by the verifying circuit.

mod round_constants;

use crate::errors::{CoreError, CoreResult};
use crate::scalar::Scalar;

use round_constants::{FULL_ROUND_CONSTANTS, PARTIAL_ROUND_CONSTANTS};

/// Number of state elements
pub const WIDTH: usize = 3;
/// Number of state elements reserved for capacity
pub const CAPACITY: usize = 1;
/// Number of state elements absorbed into or squeezed out of per permutation
pub const RATE: usize = WIDTH - CAPACITY;
/// Number of full rounds, split evenly around the partial rounds
pub const R_F: usize = 8;
/// Number of partial rounds
pub const R_P: usize = 56;
/// The S-box exponent
pub const ALPHA: u64 = 5;

const CANNOT_ABSORB_WHILE_SQUEEZING: &str = "cannot absorb while squeezing";

/// Hash a sequence of scalars with a fresh sponge
pub fn compute_poseidon_hash(values: &[Scalar]) -> Scalar {
    let mut sponge = Poseidon2Sponge::new();
    for value in values {
        sponge.absorb_unchecked(*value);
    }
    sponge.squeeze()
}

#[derive(Clone, Debug)]
pub struct Poseidon2Sponge {
    state: [Scalar; WIDTH],
    /// The next rate slot to absorb into or squeeze from
    next_index: usize,
    squeezing: bool,
}

impl Default for Poseidon2Sponge {
    fn default() -> Self {
        Self::new()
    }
}

impl Poseidon2Sponge {
    pub fn new() -> Self {
        Self {
            state: [Scalar::zero(); WIDTH],
            next_index: 0,
            squeezing: false,
        }
    }

    /// Absorb `values`, then squeeze once
    ///
    /// Fails like [`Poseidon2Sponge::absorb`] once the sponge has squeezed.
    pub fn hash(&mut self, values: &[Scalar]) -> CoreResult<Scalar> {
        self.absorb_batch(values)?;
        Ok(self.squeeze())
    }

    pub fn absorb(&mut self, value: Scalar) -> CoreResult<()> {
        if self.squeezing {
            return Err(CoreError::SpongeMisuse(CANNOT_ABSORB_WHILE_SQUEEZING));
        }

        self.absorb_unchecked(value);
        Ok(())
    }

    pub fn absorb_batch(&mut self, values: &[Scalar]) -> CoreResult<()> {
        if self.squeezing {
            return Err(CoreError::SpongeMisuse(CANNOT_ABSORB_WHILE_SQUEEZING));
        }

        for value in values {
            self.absorb_unchecked(*value);
        }
        Ok(())
    }

    /// Absorb without the mode check; callers must hold a sponge that has
    /// not squeezed
    pub(crate) fn absorb_unchecked(&mut self, value: Scalar) {
        if self.next_index == RATE {
            self.permute();
            self.next_index = 0;
        }

        self.state[CAPACITY + self.next_index] += value;
        self.next_index += 1;
    }

    pub fn squeeze(&mut self) -> Scalar {
        // Switching to squeeze mode always permutes so absorbed input is mixed
        if !self.squeezing || self.next_index == RATE {
            self.permute();
            self.next_index = 0;
            self.squeezing = true;
        }

        let out = self.state[CAPACITY + self.next_index];
        self.next_index += 1;
        out
    }

    pub fn squeeze_batch(&mut self, n: usize) -> Vec<Scalar> {
        (0..n).map(|_| self.squeeze()).collect()
    }

    fn permute(&mut self) {
        permute(&mut self.state);
    }
}

// --- Permutation ---

/// Apply the Poseidon2 permutation in place
pub fn permute(state: &mut [Scalar; WIDTH]) {
    external_mds(state);

    let (first_half, second_half) = FULL_ROUND_CONSTANTS.split_at(R_F / 2);
    for round_constants in first_half {
        external_round(state, round_constants);
    }

    for round_constant in PARTIAL_ROUND_CONSTANTS.iter() {
        internal_round(state, *round_constant);
    }

    for round_constants in second_half {
        external_round(state, round_constants);
    }
}

fn external_round(state: &mut [Scalar; WIDTH], round_constants: &[Scalar; WIDTH]) {
    for (elem, rc) in state.iter_mut().zip(round_constants.iter()) {
        *elem = sbox(*elem + *rc);
    }
    external_mds(state);
}

fn internal_round(state: &mut [Scalar; WIDTH], round_constant: Scalar) {
    state[0] = sbox(state[0] + round_constant);
    internal_mds(state);
}

/// The matrix `circ(2, 1, 1)`: add the sum of the state to each element
fn external_mds(state: &mut [Scalar; WIDTH]) {
    let sum: Scalar = state.iter().sum();
    for elem in state.iter_mut() {
        *elem += sum;
    }
}

/// The matrix `1 + diag(1, 1, 2)`: double the last element, then add the
/// sum of the original state to each element
fn internal_mds(state: &mut [Scalar; WIDTH]) {
    let sum: Scalar = state.iter().sum();
    state[WIDTH - 1] = state[WIDTH - 1] + state[WIDTH - 1];
    for elem in state.iter_mut() {
        *elem += sum;
    }
}

fn sbox(x: Scalar) -> Scalar {
    let x2 = x * x;
    x2 * x2 * x
}
