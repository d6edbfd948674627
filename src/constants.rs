//! Protocol parameters shared by the wallet engine
//!
//! Changing any of these changes the committed wallet layout and breaks
//! compatibility with the verifying circuit.

/// Maximum number of balances a wallet may hold
pub const MAX_BALANCES: usize = 10;
/// Maximum number of orders a wallet may hold
pub const MAX_ORDERS: usize = 4;
/// Number of fractional bits in a fixed point value
pub const FIXED_POINT_PRECISION_BITS: usize = 63;

/// Number of scalars a secp256k1 coordinate is split into
pub const SCALAR_WORDS_PER_COORDINATE: usize = 2;
/// Number of bytes of the extended derivation output used as a wallet id
pub const NUM_BYTES_WALLET_ID: usize = 16;

// Derivation messages
pub const CREATE_DERIVATION_KEY_MESSAGE_PREFIX: &str = "Unlock your Renegade Wallet on chain ID:";
pub const ROOT_KEY_MESSAGE: &str = "root key";
pub const SYMMETRIC_KEY_MESSAGE: &str = "symmetric key";
pub const MATCH_KEY_MESSAGE: &str = "match key";
pub const BLINDER_SEED_MESSAGE: &str = "blinder seed";
pub const SHARE_SEED_MESSAGE: &str = "share seed";
pub const WALLET_ID_MESSAGE: &str = "wallet id";

/// The secp256k1 group order, big-endian hex
pub const SECP256K1_ORDER_HEX: &str =
    "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";
