//! Structural encoding between wallet types and ordered scalar sequences
//!
//! Composite types visit their fields in declaration order and arrays visit
//! their elements in index order. The resulting layout is what the verifying
//! circuit commits to, so reordering fields in any implementor is a breaking
//! change.

use crate::errors::{CoreError, CoreResult};
use crate::fixed_point::FixedPoint;
use crate::scalar::Scalar;

/// A read position over a scalar slice
#[derive(Debug, Clone)]
pub struct ScalarCursor<'a> {
    scalars: &'a [Scalar],
    position: usize,
}

impl<'a> ScalarCursor<'a> {
    pub fn new(scalars: &'a [Scalar]) -> Self {
        Self { scalars, position: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.scalars.len() - self.position
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Fail without consuming anything unless `needed` scalars are left
    pub fn ensure_remaining(&self, needed: usize) -> CoreResult<()> {
        if self.remaining() < needed {
            return Err(CoreError::IncompleteSequence {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn next_scalar(&mut self) -> CoreResult<Scalar> {
        self.ensure_remaining(1)?;
        let scalar = self.scalars[self.position];
        self.position += 1;
        Ok(scalar)
    }
}

/// A type with a fixed-length scalar encoding
pub trait ScalarCodec: Sized {
    /// The number of scalars in the encoding
    const NUM_SCALARS: usize;

    /// Append the encoding of `self` to `out`
    fn write_scalars(&self, out: &mut Vec<Scalar>);

    /// Read one value, consuming exactly `NUM_SCALARS` scalars
    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self>;

    fn num_scalars(&self) -> usize {
        Self::NUM_SCALARS
    }

    fn to_scalars(&self) -> Vec<Scalar> {
        let mut out = Vec::with_capacity(Self::NUM_SCALARS);
        self.write_scalars(&mut out);
        out
    }

    /// Decode from the front of `scalars`; trailing scalars are ignored
    fn from_scalars(scalars: &[Scalar]) -> CoreResult<Self> {
        let mut cursor = ScalarCursor::new(scalars);
        Self::read_scalars(&mut cursor)
    }
}

impl ScalarCodec for Scalar {
    const NUM_SCALARS: usize = 1;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(*self);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.next_scalar()
    }
}

impl ScalarCodec for FixedPoint {
    const NUM_SCALARS: usize = 1;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(self.repr);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.next_scalar().map(FixedPoint::from_repr)
    }
}

impl<T: ScalarCodec, const N: usize> ScalarCodec for [T; N] {
    const NUM_SCALARS: usize = T::NUM_SCALARS * N;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        for elem in self.iter() {
            elem.write_scalars(out);
        }
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;

        let mut elems = Vec::with_capacity(N);
        for _ in 0..N {
            elems.push(T::read_scalars(cursor)?);
        }

        elems.try_into().map_err(|elems: Vec<T>| CoreError::LengthMismatch {
            expected: N,
            actual: elems.len(),
        })
    }
}
