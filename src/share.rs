//! Additive, blinded secret sharing of wallet state
//!
//! A value `v` is split against a private share `p` and a blinder `b` as
//! `public[i] = v[i] - p[i] + b`, so that `p[i] + public[i] - b == v[i]`
//! holds in every scalar position. Only the public share is ever revealed,
//! and its hash is the wallet's commitment.

use serde::{Deserialize, Serialize};

use crate::balance::Balance;
use crate::codec::{ScalarCodec, ScalarCursor};
use crate::constants::{MAX_BALANCES, MAX_ORDERS};
use crate::errors::{CoreError, CoreResult};
use crate::fixed_point::FixedPoint;
use crate::keychain::{EncryptionKey, PublicKeychain};
use crate::order::{Order, OrderShare};
use crate::poseidon2::compute_poseidon_hash;
use crate::scalar::Scalar;

/// The unblinded wallet state in its committed, fixed-size layout
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedWalletState {
    pub balances: [Balance; MAX_BALANCES],
    pub orders: [Order; MAX_ORDERS],
    pub keys: PublicKeychain,
    pub match_fee: FixedPoint,
    pub managing_cluster: EncryptionKey,
    pub blinder: Scalar,
}

impl ScalarCodec for SizedWalletState {
    const NUM_SCALARS: usize = Balance::NUM_SCALARS * MAX_BALANCES
        + Order::NUM_SCALARS * MAX_ORDERS
        + PublicKeychain::NUM_SCALARS
        + FixedPoint::NUM_SCALARS
        + EncryptionKey::NUM_SCALARS
        + Scalar::NUM_SCALARS;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        self.balances.write_scalars(out);
        self.orders.write_scalars(out);
        self.keys.write_scalars(out);
        self.match_fee.write_scalars(out);
        self.managing_cluster.write_scalars(out);
        self.blinder.write_scalars(out);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            balances: ScalarCodec::read_scalars(cursor)?,
            orders: ScalarCodec::read_scalars(cursor)?,
            keys: PublicKeychain::read_scalars(cursor)?,
            match_fee: FixedPoint::read_scalars(cursor)?,
            managing_cluster: EncryptionKey::read_scalars(cursor)?,
            blinder: cursor.next_scalar()?,
        })
    }
}

/// One share of a wallet, in the same layout as [`SizedWalletState`]
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletShare {
    pub balances: [Balance; MAX_BALANCES],
    pub orders: [OrderShare; MAX_ORDERS],
    pub keys: PublicKeychain,
    pub match_fee: FixedPoint,
    pub managing_cluster: EncryptionKey,
    pub blinder: Scalar,
}

impl WalletShare {
    /// Add `blinder` to every scalar of the share
    pub fn blind(&self, blinder: Scalar) -> CoreResult<Self> {
        let scalars: Vec<Scalar> = self.to_scalars().into_iter().map(|s| s + blinder).collect();
        Self::from_scalars(&scalars)
    }

    /// Subtract `blinder` from every scalar of the share
    pub fn unblind(&self, blinder: Scalar) -> CoreResult<Self> {
        self.blind(-blinder)
    }

    /// The Poseidon2 hash of the share's scalar encoding
    pub fn commitment(&self) -> Scalar {
        compute_poseidon_hash(&self.to_scalars())
    }
}

impl ScalarCodec for WalletShare {
    const NUM_SCALARS: usize = SizedWalletState::NUM_SCALARS;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        self.balances.write_scalars(out);
        self.orders.write_scalars(out);
        self.keys.write_scalars(out);
        self.match_fee.write_scalars(out);
        self.managing_cluster.write_scalars(out);
        self.blinder.write_scalars(out);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            balances: ScalarCodec::read_scalars(cursor)?,
            orders: ScalarCodec::read_scalars(cursor)?,
            keys: PublicKeychain::read_scalars(cursor)?,
            match_fee: FixedPoint::read_scalars(cursor)?,
            managing_cluster: EncryptionKey::read_scalars(cursor)?,
            blinder: cursor.next_scalar()?,
        })
    }
}

fn check_arity(expected: usize, actual: usize) -> CoreResult<()> {
    if expected != actual {
        return Err(CoreError::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// Split `value` into a private and a blinded public share
///
/// Returns `(private, public)`.
pub fn split_shares<V, S>(
    value: &V,
    private_scalars: &[Scalar],
    blinder: Scalar,
) -> CoreResult<(S, S)>
where
    V: ScalarCodec,
    S: ScalarCodec,
{
    check_arity(V::NUM_SCALARS, S::NUM_SCALARS)?;
    check_arity(V::NUM_SCALARS, private_scalars.len())?;

    let public_scalars: Vec<Scalar> = value
        .to_scalars()
        .into_iter()
        .zip(private_scalars.iter())
        .map(|(v, p)| v - *p + blinder)
        .collect();

    let private = S::from_scalars(private_scalars)?;
    let public = S::from_scalars(&public_scalars)?;
    Ok((private, public))
}

/// Recover the shared value as `private + public - blinder`
pub fn recombine_shares<S, V>(private: &S, public: &S, blinder: Scalar) -> CoreResult<V>
where
    S: ScalarCodec,
    V: ScalarCodec,
{
    check_arity(S::NUM_SCALARS, V::NUM_SCALARS)?;

    let scalars: Vec<Scalar> = private
        .to_scalars()
        .into_iter()
        .zip(public.to_scalars())
        .map(|(p, q)| p + q - blinder)
        .collect();
    V::from_scalars(&scalars)
}
