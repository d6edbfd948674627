//! Cryptographic core of a darkpool wallet
//!
//! Wallet state is encoded into bn254 scalars, split into a private and a
//! blinded public share, and committed to with a Poseidon2 sponge. All keys
//! and share streams derive deterministically from one secp256k1 key.

pub mod balance;
pub mod codec;
pub mod constants;
pub mod csprng;
pub mod derivation;
pub mod errors;
pub mod fixed_point;
pub mod keychain;
pub mod order;
pub mod poseidon2;
pub mod scalar;
pub mod share;
pub mod wallet;

pub use balance::Balance;
pub use codec::{ScalarCodec, ScalarCursor};
pub use csprng::PoseidonCSPRNG;
pub use derivation::{derive_wallet_secrets, WalletSecrets};
pub use errors::{CoreError, CoreResult};
pub use fixed_point::FixedPoint;
pub use keychain::{EncryptionKey, KeyChain, PrivateKeychain, PublicKeychain, PublicSigningKey};
pub use order::{Order, OrderId, OrderShare, OrderSide};
pub use poseidon2::{compute_poseidon_hash, Poseidon2Sponge};
pub use scalar::Scalar;
pub use share::{recombine_shares, split_shares, SizedWalletState, WalletShare};
pub use wallet::{Wallet, WalletId};
