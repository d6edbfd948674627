//! Deterministic derivation of wallet secrets from a single signing key
//!
//! The holder's key signs a chain-specific unlock message to obtain a
//! derivation key, which in turn signs one fixed message per secret. Each
//! signature is hashed, widened to 64 bytes and reduced into the target
//! group, so every secret is reproducible from the key and chain id alone.
//!
//! ```text
//! signing key ── sign("Unlock ... chain ID:<id>") ──▶ derivation key
//!   derivation key ── sign("root key")      ──▶ sk_root
//!                  ── sign("symmetric key") ──▶ symmetric key
//!                  ── sign("match key")     ──▶ sk_match
//!                  ── sign("blinder seed")  ──▶ blinder seed
//!                  ── sign("share seed")    ──▶ share seed
//!                  ── sign("wallet id")     ──▶ wallet id
//! ```

use std::fmt;

use ethers::signers::LocalWallet;
use ethers::utils::{hash_message, keccak256};
use log::debug;
use num_bigint::BigUint;
use uuid::Uuid;

use crate::constants::{
    BLINDER_SEED_MESSAGE, CREATE_DERIVATION_KEY_MESSAGE_PREFIX, MATCH_KEY_MESSAGE,
    NUM_BYTES_WALLET_ID, ROOT_KEY_MESSAGE, SECP256K1_ORDER_HEX, SHARE_SEED_MESSAGE,
    SYMMETRIC_KEY_MESSAGE, WALLET_ID_MESSAGE,
};
use crate::errors::{CoreError, CoreResult};
use crate::keychain::KeyChain;
use crate::scalar::Scalar;

const HASH_BYTES: usize = 32;
const EXTENDED_BYTES: usize = 2 * HASH_BYTES;

/// Everything needed to build a wallet, derived from the holder's key
#[derive(Clone)]
pub struct WalletSecrets {
    pub wallet_id: Uuid,
    pub keychain: KeyChain,
    /// Seeds the stream the wallet blinder is drawn from
    pub blinder_seed: Scalar,
    /// Seeds the stream the private shares are drawn from
    pub share_seed: Scalar,
}

impl fmt::Debug for WalletSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSecrets")
            .field("wallet_id", &self.wallet_id)
            .field("keychain", &self.keychain)
            .finish_non_exhaustive()
    }
}

/// Derive the wallet secrets for `key` on the given chain
pub fn derive_wallet_secrets(key: &LocalWallet, chain_id: u64) -> CoreResult<WalletSecrets> {
    let derivation_key = derive_signing_key(&derivation_key_message(chain_id), key)?;

    let wallet_id = derive_wallet_id(&derivation_key)?;
    let sk_root = derive_signing_key(ROOT_KEY_MESSAGE, &derivation_key)?;
    let symmetric_key = derive_symmetric_key(&derivation_key)?;
    let sk_match = derive_scalar(MATCH_KEY_MESSAGE, &derivation_key)?;
    let blinder_seed = derive_scalar(BLINDER_SEED_MESSAGE, &derivation_key)?;
    let share_seed = derive_scalar(SHARE_SEED_MESSAGE, &derivation_key)?;

    let keychain = KeyChain::new(sk_root, sk_match, symmetric_key)?;
    debug!("derived secrets for wallet {} on chain {}", wallet_id, chain_id);

    Ok(WalletSecrets {
        wallet_id,
        keychain,
        blinder_seed,
        share_seed,
    })
}

pub fn derivation_key_message(chain_id: u64) -> String {
    format!("{}{}", CREATE_DERIVATION_KEY_MESSAGE_PREFIX, chain_id)
}

/// Derive a secp256k1 signing key from the signature of `message`
pub fn derive_signing_key(message: &str, key: &LocalWallet) -> CoreResult<LocalWallet> {
    let extended = get_extended_sig_bytes(message, key)?;
    let reduced = BigUint::from_bytes_be(&extended) % secp256k1_order();

    let be_bytes = reduced.to_bytes_be();
    let mut key_bytes = [0u8; HASH_BYTES];
    key_bytes[HASH_BYTES - be_bytes.len()..].copy_from_slice(&be_bytes);

    LocalWallet::from_bytes(&key_bytes).map_err(|e| {
        CoreError::InvariantViolation(format!("derived secp256k1 key is invalid: {}", e))
    })
}

/// Derive a scalar from the signature of `message`
pub fn derive_scalar(message: &str, key: &LocalWallet) -> CoreResult<Scalar> {
    let extended = get_extended_sig_bytes(message, key)?;
    Ok(Scalar::from_be_bytes_mod_order(&extended))
}

fn derive_symmetric_key(key: &LocalWallet) -> CoreResult<[u8; HASH_BYTES]> {
    let sig = sign_message(SYMMETRIC_KEY_MESSAGE, key)?;
    Ok(keccak256(sig))
}

fn derive_wallet_id(key: &LocalWallet) -> CoreResult<Uuid> {
    let extended = get_extended_sig_bytes(WALLET_ID_MESSAGE, key)?;
    Uuid::from_slice(&extended[..NUM_BYTES_WALLET_ID])
        .map_err(|e| CoreError::InvariantViolation(format!("wallet id bytes: {}", e)))
}

/// Sign the EIP-191 hash of `message`; RFC 6979 nonces make this deterministic
fn sign_message(message: &str, key: &LocalWallet) -> CoreResult<Vec<u8>> {
    let digest = hash_message(message);
    let signature = key
        .sign_hash(digest)
        .map_err(|e| CoreError::Signing(e.to_string()))?;
    Ok(signature.to_vec())
}

fn get_extended_sig_bytes(message: &str, key: &LocalWallet) -> CoreResult<[u8; EXTENDED_BYTES]> {
    let sig = sign_message(message, key)?;
    extend_to_64_bytes(&keccak256(sig))
}

/// Widen a 32-byte digest to 64 bytes: the digest followed by its own hash
///
/// The wider input makes the reduction modulo a ~256-bit order unbiased.
pub fn extend_to_64_bytes(digest: &[u8]) -> CoreResult<[u8; EXTENDED_BYTES]> {
    if digest.len() != HASH_BYTES {
        return Err(CoreError::InvariantViolation(format!(
            "expected a {}-byte digest, got {} bytes",
            HASH_BYTES,
            digest.len()
        )));
    }

    let mut extended = [0u8; EXTENDED_BYTES];
    extended[..HASH_BYTES].copy_from_slice(digest);
    extended[HASH_BYTES..].copy_from_slice(&keccak256(digest));
    Ok(extended)
}

fn secp256k1_order() -> BigUint {
    // The literal is a constant, parsing cannot fail
    BigUint::parse_bytes(SECP256K1_ORDER_HEX.as_bytes(), 16).unwrap_or_default()
}
