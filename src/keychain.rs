//! Wallet keychain types
//!
//! The public half is committed as part of every wallet share; the private
//! half never leaves the holder. The root signing key is optional so that a
//! keychain can be handed to a third party without signing authority.

use std::fmt;

use ethers::core::k256::ecdsa::VerifyingKey;
use ethers::core::k256::elliptic_curve::sec1::ToEncodedPoint;
use ethers::core::k256::{EncodedPoint, FieldBytes};
use ethers::signers::LocalWallet;
use ethers::types::Address;
use ethers::utils::public_key_to_address;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::codec::{ScalarCodec, ScalarCursor};
use crate::constants::SCALAR_WORDS_PER_COORDINATE;
use crate::errors::{CoreError, CoreResult};
use crate::poseidon2::compute_poseidon_hash;
use crate::scalar::Scalar;

const COORDINATE_BYTES: usize = 32;

/// A secp256k1 public key as committed in a wallet share
///
/// Each 256-bit affine coordinate exceeds the scalar field, so it is split
/// into little-endian words in base r. The words are not validated as a
/// curve point until converted with [`PublicSigningKey::to_verifying_key`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicSigningKey {
    pub x: [Scalar; SCALAR_WORDS_PER_COORDINATE],
    pub y: [Scalar; SCALAR_WORDS_PER_COORDINATE],
}

impl PublicSigningKey {
    pub fn from_verifying_key(key: &VerifyingKey) -> CoreResult<Self> {
        let point = key.to_encoded_point(false /* compress */);
        let x = point
            .x()
            .ok_or_else(|| CoreError::Encoding("public key is the identity".to_string()))?;
        let y = point
            .y()
            .ok_or_else(|| CoreError::Encoding("public key is compressed".to_string()))?;

        Ok(Self {
            x: biguint_to_words(&BigUint::from_bytes_be(x)),
            y: biguint_to_words(&BigUint::from_bytes_be(y)),
        })
    }

    pub fn to_verifying_key(&self) -> CoreResult<VerifyingKey> {
        let x = words_to_coordinate_bytes(&self.x)?;
        let y = words_to_coordinate_bytes(&self.y)?;
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&x),
            FieldBytes::from_slice(&y),
            false, /* compress */
        );

        VerifyingKey::from_encoded_point(&point)
            .map_err(|e| CoreError::Encoding(format!("invalid secp256k1 point: {}", e)))
    }

    pub fn address(&self) -> CoreResult<Address> {
        Ok(public_key_to_address(&self.to_verifying_key()?))
    }
}

fn biguint_to_words(value: &BigUint) -> [Scalar; SCALAR_WORDS_PER_COORDINATE] {
    let modulus = Scalar::modulus();
    let mut remaining = value.clone();
    let mut words = [Scalar::zero(); SCALAR_WORDS_PER_COORDINATE];
    for word in words.iter_mut() {
        *word = Scalar::from_biguint(&(&remaining % &modulus));
        remaining /= &modulus;
    }
    words
}

fn words_to_coordinate_bytes(
    words: &[Scalar; SCALAR_WORDS_PER_COORDINATE],
) -> CoreResult<[u8; COORDINATE_BYTES]> {
    let modulus = Scalar::modulus();
    let value = words
        .iter()
        .rev()
        .fold(BigUint::from(0u8), |acc, word| acc * &modulus + word.to_biguint());

    let bytes = value.to_bytes_be();
    if bytes.len() > COORDINATE_BYTES {
        return Err(CoreError::Encoding(
            "coordinate words exceed 256 bits".to_string(),
        ));
    }

    let mut out = [0u8; COORDINATE_BYTES];
    out[COORDINATE_BYTES - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

impl ScalarCodec for PublicSigningKey {
    const NUM_SCALARS: usize = 2 * SCALAR_WORDS_PER_COORDINATE;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        self.x.write_scalars(out);
        self.y.write_scalars(out);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            x: ScalarCodec::read_scalars(cursor)?,
            y: ScalarCodec::read_scalars(cursor)?,
        })
    }
}

/// The public encryption key of the cluster managing a wallet, a point on
/// the curve embedded in bn254
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKey {
    pub x: Scalar,
    pub y: Scalar,
}

impl ScalarCodec for EncryptionKey {
    const NUM_SCALARS: usize = 2;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(self.x);
        out.push(self.y);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            x: cursor.next_scalar()?,
            y: cursor.next_scalar()?,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeychain {
    /// The key that authorizes wallet updates
    pub pk_root: PublicSigningKey,
    /// The key that identifies the wallet to the matching engine
    pub pk_match: Scalar,
    /// Incremented on every key rotation
    pub nonce: Scalar,
}

impl PublicKeychain {
    pub fn increment_nonce(&mut self) {
        self.nonce += Scalar::one();
    }
}

impl ScalarCodec for PublicKeychain {
    const NUM_SCALARS: usize = PublicSigningKey::NUM_SCALARS + 2;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        self.pk_root.write_scalars(out);
        out.push(self.pk_match);
        out.push(self.nonce);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            pk_root: PublicSigningKey::read_scalars(cursor)?,
            pk_match: cursor.next_scalar()?,
            nonce: cursor.next_scalar()?,
        })
    }
}

#[derive(Clone)]
pub struct PrivateKeychain {
    /// `None` when the root key is withheld from the holder of this keychain
    pub sk_root: Option<LocalWallet>,
    pub sk_match: Scalar,
    /// Used to authenticate requests to a relayer
    pub symmetric_key: [u8; 32],
}

impl PrivateKeychain {
    pub fn root_key(&self) -> CoreResult<&LocalWallet> {
        self.sk_root.as_ref().ok_or(CoreError::RootKeyUnavailable)
    }
}

// Never print key material
impl fmt::Debug for PrivateKeychain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeychain")
            .field("has_sk_root", &self.sk_root.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug)]
pub struct KeyChain {
    pub public_keys: PublicKeychain,
    pub secret_keys: PrivateKeychain,
}

impl KeyChain {
    /// Build a keychain from a root key and match key, deriving the public half
    pub fn new(
        sk_root: LocalWallet,
        sk_match: Scalar,
        symmetric_key: [u8; 32],
    ) -> CoreResult<Self> {
        let pk_root = PublicSigningKey::from_verifying_key(sk_root.signer().verifying_key())?;
        let pk_match = compute_poseidon_hash(&[sk_match]);

        Ok(Self {
            public_keys: PublicKeychain {
                pk_root,
                pk_match,
                nonce: Scalar::zero(),
            },
            secret_keys: PrivateKeychain {
                sk_root: Some(sk_root),
                sk_match,
                symmetric_key,
            },
        })
    }

    /// A copy of this keychain with the root key withheld
    pub fn without_root_key(&self) -> Self {
        let mut keychain = self.clone();
        keychain.secret_keys.sk_root = None;
        keychain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn test_wallet() -> LocalWallet {
        TEST_PRIVATE_KEY.parse().unwrap()
    }

    #[test]
    fn test_signing_key_roundtrip() {
        let wallet = test_wallet();
        let pk = PublicSigningKey::from_verifying_key(wallet.signer().verifying_key()).unwrap();
        assert_eq!(&pk.to_verifying_key().unwrap(), wallet.signer().verifying_key());
        assert_eq!(pk.address().unwrap(), TEST_ADDRESS.parse::<Address>().unwrap());
    }

    #[test]
    fn test_coordinate_words_recombine() {
        let value = (BigUint::from(1u8) << 256u32) - 1u32;
        let words = biguint_to_words(&value);
        let bytes = words_to_coordinate_bytes(&words).unwrap();
        assert_eq!(BigUint::from_bytes_be(&bytes), value);
        // 2^256 - 1 needs both words
        assert!(!words[1].is_zero());
    }

    #[test]
    fn test_random_words_are_not_a_key() {
        let pk = PublicSigningKey {
            x: [Scalar::from(5u64), Scalar::zero()],
            y: [Scalar::from(7u64), Scalar::zero()],
        };
        assert!(matches!(pk.to_verifying_key(), Err(CoreError::Encoding(_))));

        let oversized = PublicSigningKey {
            x: [Scalar::zero(), Scalar::from(1000u64)],
            y: [Scalar::zero(); 2],
        };
        assert!(oversized.to_verifying_key().is_err());
    }

    #[test]
    fn test_public_keychain_layout() {
        let keychain = KeyChain::new(test_wallet(), Scalar::from(9u64), [1u8; 32]).unwrap();
        let scalars = keychain.public_keys.to_scalars();

        assert_eq!(scalars.len(), PublicKeychain::NUM_SCALARS);
        assert_eq!(scalars.len(), 6);
        assert_eq!(scalars[4], compute_poseidon_hash(&[Scalar::from(9u64)]));
        assert_eq!(scalars[5], Scalar::zero());
        assert_eq!(PublicKeychain::from_scalars(&scalars).unwrap(), keychain.public_keys);
    }

    #[test]
    fn test_increment_nonce() {
        let mut keys = PublicKeychain::default();
        keys.increment_nonce();
        keys.increment_nonce();
        assert_eq!(keys.nonce, Scalar::from(2u64));
    }

    #[test]
    fn test_without_root_key() {
        let keychain = KeyChain::new(test_wallet(), Scalar::one(), [0u8; 32]).unwrap();
        let withheld = keychain.without_root_key();

        assert!(keychain.secret_keys.root_key().is_ok());
        assert!(matches!(
            withheld.secret_keys.root_key(),
            Err(CoreError::RootKeyUnavailable)
        ));
        assert_eq!(withheld.public_keys, keychain.public_keys);
    }

    #[test]
    fn test_debug_does_not_leak_keys() {
        let keychain = KeyChain::new(test_wallet(), Scalar::from(31337u64), [0xab; 32]).unwrap();
        let debug_output = format!("{:?}", keychain.secret_keys);
        assert!(!debug_output.contains("31337"));
        assert!(!debug_output.contains("abab"));
        assert!(debug_output.contains("has_sk_root: true"));
    }
}
