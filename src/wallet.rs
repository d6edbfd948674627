//! The wallet aggregate
//!
//! A wallet owns its plaintext balances and orders alongside the private
//! share, the blinded public share and the blinder that together encode
//! them. Mutations only touch the plaintext; [`Wallet::reblind`] recomputes
//! the shares before a new commitment is published.

use std::fmt;

use ethers::types::{Signature, H256};
use ethers::utils::keccak256;
use log::{debug, trace};
use uuid::Uuid;

use crate::balance::Balance;
use crate::codec::ScalarCodec;
use crate::constants::{MAX_BALANCES, MAX_ORDERS};
use crate::csprng::PoseidonCSPRNG;
use crate::derivation::WalletSecrets;
use crate::errors::{CoreError, CoreResult};
use crate::fixed_point::FixedPoint;
use crate::keychain::{EncryptionKey, KeyChain};
use crate::order::{Order, OrderId};
use crate::scalar::Scalar;
use crate::share::{recombine_shares, split_shares, SizedWalletState, WalletShare};

pub type WalletId = Uuid;

#[derive(Clone)]
pub struct Wallet {
    pub wallet_id: WalletId,
    pub balances: Vec<Balance>,
    pub orders: Vec<Order>,
    pub keychain: KeyChain,
    /// The encryption key of the cluster managing this wallet
    pub managing_cluster: EncryptionKey,
    /// The fee the managing cluster takes on each match
    pub match_fee: FixedPoint,
    pub blinded_public_share: WalletShare,
    pub private_share: WalletShare,
    pub blinder: Scalar,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("wallet_id", &self.wallet_id)
            .field("balances", &self.balances)
            .field("orders", &self.orders)
            .field("keychain", &self.keychain)
            .field("managing_cluster", &self.managing_cluster)
            .field("match_fee", &self.match_fee)
            .field("blinded_public_share", &self.blinded_public_share)
            .finish_non_exhaustive()
    }
}

/// Draw a blinder and a full private share from the two seed streams
///
/// The blinder stream yields the blinder and its own private share, which
/// takes the last position; the share stream fills every other position.
fn sample_private_share(blinder_seed: Scalar, share_seed: Scalar) -> (Scalar, Vec<Scalar>) {
    let (blinder, blinder_private_share) = PoseidonCSPRNG::new(blinder_seed).next_tuple();
    let mut private_scalars = PoseidonCSPRNG::new(share_seed).next_n(WalletShare::NUM_SCALARS - 1);
    private_scalars.push(blinder_private_share);

    (blinder, private_scalars)
}

/// Add two amounts as integers, `None` if the sum reaches the modulus
fn checked_add(a: Scalar, b: Scalar) -> Option<Scalar> {
    let sum = a.to_biguint() + b.to_biguint();
    if sum >= Scalar::modulus() {
        return None;
    }
    Some(Scalar::from_biguint(&sum))
}

impl Wallet {
    /// Build an empty wallet whose shares are drawn from the secrets' seeds
    pub fn new_empty(secrets: &WalletSecrets) -> CoreResult<Self> {
        let (blinder, private_scalars) =
            sample_private_share(secrets.blinder_seed, secrets.share_seed);

        let mut wallet = Self {
            wallet_id: secrets.wallet_id,
            balances: Vec::new(),
            orders: Vec::new(),
            keychain: secrets.keychain.clone(),
            managing_cluster: EncryptionKey::default(),
            match_fee: FixedPoint::zero(),
            blinded_public_share: WalletShare::default(),
            private_share: WalletShare::default(),
            blinder,
        };

        let (private_share, blinded_public_share) =
            wallet.compute_shares(&private_scalars, blinder)?;
        wallet.private_share = private_share;
        wallet.blinded_public_share = blinded_public_share;

        debug!("created empty wallet {}", wallet.wallet_id);
        Ok(wallet)
    }

    // --- Balances ---

    pub fn get_balance(&self, mint: &Scalar) -> Option<&Balance> {
        self.balances.iter().find(|b| &b.mint == mint)
    }

    /// Add a balance to the wallet
    ///
    /// An existing balance of the same mint accumulates. Otherwise the first
    /// zero balance is replaced, and failing that the balance is appended.
    /// Amounts are canonical field elements and a sum that would wrap
    /// modulo r is rejected with the wallet unchanged.
    pub fn add_balance(&mut self, balance: Balance) -> CoreResult<()> {
        if let Some(existing) = self.balances.iter_mut().find(|b| b.mint == balance.mint) {
            let overflow = || CoreError::BalanceOverflow { mint: balance.mint.to_hex() };
            let amount = checked_add(existing.amount, balance.amount).ok_or_else(overflow)?;
            let relayer_fee_balance =
                checked_add(existing.relayer_fee_balance, balance.relayer_fee_balance)
                    .ok_or_else(overflow)?;
            let protocol_fee_balance =
                checked_add(existing.protocol_fee_balance, balance.protocol_fee_balance)
                    .ok_or_else(overflow)?;

            existing.amount = amount;
            existing.relayer_fee_balance = relayer_fee_balance;
            existing.protocol_fee_balance = protocol_fee_balance;
        } else if let Some(slot) = self.balances.iter_mut().find(|b| b.is_zero()) {
            *slot = balance;
        } else if self.balances.len() < MAX_BALANCES {
            self.balances.push(balance);
        } else {
            return Err(CoreError::CapacityExceeded(format!(
                "wallet already holds {} balances",
                MAX_BALANCES
            )));
        }

        debug!(
            "wallet {} holds {} balance slots",
            self.wallet_id,
            self.balances.len()
        );
        Ok(())
    }

    /// Remove the balance of `mint` entirely, returning it
    pub fn remove_balance(&mut self, mint: &Scalar) -> CoreResult<Balance> {
        let idx = self
            .balances
            .iter()
            .position(|b| &b.mint == mint)
            .ok_or_else(|| CoreError::NotFound(format!("balance for mint {}", mint.to_hex())))?;

        debug!("removing balance slot {} from wallet {}", idx, self.wallet_id);
        Ok(self.balances.remove(idx))
    }

    /// Decrease the balance of `mint` by `amount`, leaving the slot in place
    pub fn withdraw(&mut self, mint: &Scalar, amount: Scalar) -> CoreResult<()> {
        let balance = self
            .balances
            .iter_mut()
            .find(|b| &b.mint == mint)
            .ok_or_else(|| CoreError::NotFound(format!("balance for mint {}", mint.to_hex())))?;

        if balance.amount < amount {
            return Err(CoreError::InsufficientBalance { mint: mint.to_hex() });
        }
        balance.amount -= amount;
        Ok(())
    }

    // --- Orders ---

    pub fn get_order(&self, id: &OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| &o.id == id)
    }

    /// Add an order to the wallet, returning its id
    ///
    /// An order with the same id is replaced. Otherwise the first zero order
    /// is replaced, and failing that the order is appended. The nil id is
    /// never matched, so orders decoded from shares do not replace each other.
    pub fn new_order(&mut self, order: Order) -> CoreResult<OrderId> {
        let same_id = |o: &&mut Order| !order.id.is_nil() && o.id == order.id;
        if let Some(existing) = self.orders.iter_mut().find(same_id) {
            *existing = order;
        } else if let Some(slot) = self.orders.iter_mut().find(|o| o.is_zero()) {
            *slot = order;
        } else if self.orders.len() < MAX_ORDERS {
            self.orders.push(order);
        } else {
            return Err(CoreError::CapacityExceeded(format!(
                "wallet already holds {} orders",
                MAX_ORDERS
            )));
        }

        debug!("placed order {} in wallet {}", order.id, self.wallet_id);
        Ok(order.id)
    }

    pub fn cancel_order(&mut self, id: &OrderId) -> CoreResult<Order> {
        let idx = self
            .orders
            .iter()
            .position(|o| &o.id == id)
            .ok_or_else(|| CoreError::NotFound(format!("order {}", id)))?;

        debug!("cancelled order {} in wallet {}", id, self.wallet_id);
        Ok(self.orders.remove(idx))
    }

    pub fn set_match_fee(&mut self, match_fee: FixedPoint) {
        self.match_fee = match_fee;
    }

    pub fn set_managing_cluster(&mut self, managing_cluster: EncryptionKey) {
        self.managing_cluster = managing_cluster;
    }

    // --- Shares ---

    /// The plaintext state in its committed layout, with `blinder` in place
    pub fn sized_state(&self, blinder: Scalar) -> CoreResult<SizedWalletState> {
        if self.balances.len() > MAX_BALANCES {
            return Err(CoreError::CapacityExceeded(format!(
                "{} balances, at most {}",
                self.balances.len(),
                MAX_BALANCES
            )));
        }
        if self.orders.len() > MAX_ORDERS {
            return Err(CoreError::CapacityExceeded(format!(
                "{} orders, at most {}",
                self.orders.len(),
                MAX_ORDERS
            )));
        }

        let mut balances = [Balance::default(); MAX_BALANCES];
        balances[..self.balances.len()].copy_from_slice(&self.balances);
        let mut orders = [Order::default(); MAX_ORDERS];
        orders[..self.orders.len()].copy_from_slice(&self.orders);

        Ok(SizedWalletState {
            balances,
            orders,
            keys: self.keychain.public_keys,
            match_fee: self.match_fee,
            managing_cluster: self.managing_cluster,
            blinder,
        })
    }

    fn compute_shares(
        &self,
        private_scalars: &[Scalar],
        blinder: Scalar,
    ) -> CoreResult<(WalletShare, WalletShare)> {
        let state = self.sized_state(blinder)?;
        split_shares(&state, private_scalars, blinder)
    }

    /// Draw a fresh blinder and private share and recompute the public share
    ///
    /// The new streams are seeded from the current private share, so every
    /// generation of shares can be regenerated from the wallet's seeds. The
    /// wallet is untouched if any step fails.
    pub fn reblind(&mut self) -> CoreResult<()> {
        let private_scalars = self.private_share.to_scalars();
        let [.., share_seed, blinder_seed] = private_scalars.as_slice() else {
            return Err(CoreError::InvariantViolation(
                "private share has fewer than two scalars".to_string(),
            ));
        };

        let (blinder, new_private_scalars) = sample_private_share(*blinder_seed, *share_seed);
        let (private_share, blinded_public_share) =
            self.compute_shares(&new_private_scalars, blinder)?;

        self.private_share = private_share;
        self.blinded_public_share = blinded_public_share;
        self.blinder = blinder;

        trace!("reblinded wallet {}", self.wallet_id);
        Ok(())
    }

    /// Recover the plaintext state from the two shares
    pub fn recombine(&self) -> CoreResult<SizedWalletState> {
        recombine_shares(&self.private_share, &self.blinded_public_share, self.blinder)
    }

    /// Whether the shares currently encode the plaintext state
    ///
    /// This is false after a mutation until the wallet is reblinded.
    pub fn check_share_consistency(&self) -> CoreResult<bool> {
        let recombined: WalletShare =
            recombine_shares(&self.private_share, &self.blinded_public_share, self.blinder)?;
        let expected = self.sized_state(self.blinder)?;
        Ok(recombined.to_scalars() == expected.to_scalars())
    }

    // --- Commitments ---

    pub fn get_share_commitment(&self) -> Scalar {
        self.blinded_public_share.commitment()
    }

    fn commitment_digest(&self) -> H256 {
        H256::from(keccak256(self.get_share_commitment().to_bytes_be()))
    }

    /// Sign the share commitment with the root key
    pub fn sign_commitment(&self) -> CoreResult<Signature> {
        let sk_root = self.keychain.secret_keys.root_key()?;
        let signature = sk_root
            .sign_hash(self.commitment_digest())
            .map_err(|e| CoreError::Signing(e.to_string()))?;

        debug!("signed commitment for wallet {}", self.wallet_id);
        Ok(signature)
    }

    /// Check that `signature` is the root key's signature over the current
    /// share commitment
    pub fn verify_commitment_signature(&self, signature: &Signature) -> CoreResult<bool> {
        let address = self.keychain.public_keys.pk_root.address()?;
        Ok(signature.verify(self.commitment_digest(), address).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive_wallet_secrets;
    use crate::order::OrderSide;
    use ethers::signers::LocalWallet;

    const TEST_PRIVATE_KEY: &str =
        "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn test_secrets() -> WalletSecrets {
        let key: LocalWallet = TEST_PRIVATE_KEY.parse().unwrap();
        derive_wallet_secrets(&key, 1).unwrap()
    }

    fn empty_wallet() -> Wallet {
        let _ = pretty_env_logger::try_init();
        Wallet::new_empty(&test_secrets()).unwrap()
    }

    fn balance(mint: u64, amount: u64) -> Balance {
        Balance::new_from_mint_and_amount(Scalar::from(mint), Scalar::from(amount))
    }

    fn order(amount: u64) -> Order {
        Order::new(
            Scalar::from(1u64),
            Scalar::from(2u64),
            OrderSide::Buy,
            Scalar::from(amount),
            FixedPoint::from_integer(10),
        )
    }

    #[test]
    fn test_empty_wallet_is_consistent() {
        let wallet = empty_wallet();
        assert!(wallet.balances.is_empty());
        assert!(wallet.orders.is_empty());
        assert!(wallet.check_share_consistency().unwrap());

        let state = wallet.recombine().unwrap();
        assert_eq!(state.keys, wallet.keychain.public_keys);
        assert_eq!(state.blinder, wallet.blinder);
    }

    #[test]
    fn test_empty_wallet_is_deterministic() {
        let a = empty_wallet();
        let b = empty_wallet();
        assert_eq!(a.blinder, b.blinder);
        assert_eq!(a.private_share, b.private_share);
        assert_eq!(a.get_share_commitment(), b.get_share_commitment());
    }

    #[test]
    fn test_empty_wallet_share_streams() {
        let secrets = test_secrets();
        let wallet = Wallet::new_empty(&secrets).unwrap();

        let (blinder, blinder_private) = PoseidonCSPRNG::new(secrets.blinder_seed).next_tuple();
        let share_stream = PoseidonCSPRNG::new(secrets.share_seed).next_n(69);
        let private_scalars = wallet.private_share.to_scalars();

        assert_eq!(wallet.blinder, blinder);
        assert_eq!(private_scalars[69], blinder_private);
        assert_eq!(&private_scalars[..69], share_stream.as_slice());
    }

    #[test]
    fn test_add_balance_accumulates() {
        let mut wallet = empty_wallet();
        wallet.add_balance(balance(5, 100)).unwrap();
        wallet.add_balance(balance(5, 50)).unwrap();

        assert_eq!(wallet.balances.len(), 1);
        assert_eq!(
            wallet.get_balance(&Scalar::from(5u64)).unwrap().amount,
            Scalar::from(150u64)
        );
    }

    #[test]
    fn test_balance_capacity() {
        let mut wallet = empty_wallet();
        for mint in 1..=MAX_BALANCES as u64 {
            wallet.add_balance(balance(mint, 1)).unwrap();
        }

        let before = wallet.balances.clone();
        let err = wallet.add_balance(balance(11, 1)).unwrap_err();
        assert!(matches!(err, CoreError::CapacityExceeded(_)));
        assert_eq!(wallet.balances, before);

        // An existing mint still accumulates when full
        wallet.add_balance(balance(3, 1)).unwrap();
        assert_eq!(wallet.balances[2].amount, Scalar::from(2u64));
    }

    #[test]
    fn test_zero_balance_slot_is_reused() {
        let mut wallet = empty_wallet();
        for mint in 1..=MAX_BALANCES as u64 {
            wallet.add_balance(balance(mint, 1)).unwrap();
        }
        wallet.withdraw(&Scalar::from(4u64), Scalar::one()).unwrap();

        wallet.add_balance(balance(11, 7)).unwrap();
        assert_eq!(wallet.balances.len(), MAX_BALANCES);
        assert_eq!(wallet.balances[3], balance(11, 7));
    }

    #[test]
    fn test_withdraw_and_remove() {
        let mut wallet = empty_wallet();
        wallet.add_balance(balance(5, 10)).unwrap();

        let err = wallet.withdraw(&Scalar::from(5u64), Scalar::from(11u64)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientBalance { .. }));
        assert_eq!(wallet.balances[0].amount, Scalar::from(10u64));

        wallet.withdraw(&Scalar::from(5u64), Scalar::from(4u64)).unwrap();
        assert_eq!(wallet.balances[0].amount, Scalar::from(6u64));

        let removed = wallet.remove_balance(&Scalar::from(5u64)).unwrap();
        assert_eq!(removed.amount, Scalar::from(6u64));
        assert!(wallet.balances.is_empty());
        assert!(matches!(
            wallet.remove_balance(&Scalar::from(5u64)),
            Err(CoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_order_slots() {
        let mut wallet = empty_wallet();
        let ids: Vec<OrderId> = (1..=MAX_ORDERS as u64)
            .map(|amount| wallet.new_order(order(amount)).unwrap())
            .collect();

        let err = wallet.new_order(order(99)).unwrap_err();
        assert!(matches!(err, CoreError::CapacityExceeded(_)));

        // Replacing by id does not need a free slot
        let mut updated = *wallet.get_order(&ids[1]).unwrap();
        updated.amount = Scalar::from(42u64);
        wallet.new_order(updated).unwrap();
        assert_eq!(wallet.orders[1].amount, Scalar::from(42u64));

        // A zero order is replaceable
        let mut emptied = wallet.orders[2];
        emptied.amount = Scalar::zero();
        wallet.new_order(emptied).unwrap();
        let id = wallet.new_order(order(7)).unwrap();
        assert_eq!(wallet.orders[2].id, id);
    }

    #[test]
    fn test_add_balance_rejects_wrapping_sum() {
        let mut wallet = empty_wallet();
        let max_amount = Scalar::zero() - Scalar::one();
        wallet
            .add_balance(Balance::new_from_mint_and_amount(Scalar::from(5u64), max_amount))
            .unwrap();

        let err = wallet.add_balance(balance(5, 2)).unwrap_err();
        assert!(matches!(err, CoreError::BalanceOverflow { .. }));
        assert_eq!(wallet.balances[0].amount, max_amount);

        // A fee overflow leaves the amount untouched as well
        let mut fee = balance(5, 0);
        fee.protocol_fee_balance = max_amount;
        wallet.add_balance(fee).unwrap();
        let mut more_fee = balance(5, 0);
        more_fee.protocol_fee_balance = Scalar::one();
        assert!(wallet.add_balance(more_fee).is_err());
        assert_eq!(wallet.balances[0].protocol_fee_balance, max_amount);
    }

    #[test]
    fn test_nil_id_orders_do_not_replace_each_other() {
        let mut wallet = empty_wallet();
        let first = Order { id: OrderId::nil(), ..order(3) };
        let second = Order { id: OrderId::nil(), ..order(4) };

        wallet.new_order(first).unwrap();
        wallet.new_order(second).unwrap();
        assert_eq!(wallet.orders.len(), 2);
        assert_eq!(wallet.orders[0].amount, Scalar::from(3u64));
        assert_eq!(wallet.orders[1].amount, Scalar::from(4u64));
    }

    #[test]
    fn test_cancel_order() {
        let mut wallet = empty_wallet();
        let id = wallet.new_order(order(5)).unwrap();
        assert_eq!(wallet.cancel_order(&id).unwrap().amount, Scalar::from(5u64));
        assert!(wallet.get_order(&id).is_none());
        assert!(matches!(wallet.cancel_order(&id), Err(CoreError::NotFound(_))));
    }

    #[test]
    fn test_reblind_restores_consistency() {
        let mut wallet = empty_wallet();
        let old_blinder = wallet.blinder;
        let old_commitment = wallet.get_share_commitment();

        wallet.add_balance(balance(5, 100)).unwrap();
        assert!(!wallet.check_share_consistency().unwrap());

        wallet.reblind().unwrap();
        assert!(wallet.check_share_consistency().unwrap());
        assert_ne!(wallet.blinder, old_blinder);
        assert_ne!(wallet.get_share_commitment(), old_commitment);
        assert_eq!(wallet.recombine().unwrap().balances[0], balance(5, 100));
    }

    #[test]
    fn test_reblind_chains_seeds() {
        let mut wallet = empty_wallet();
        let private_scalars = wallet.private_share.to_scalars();
        let (blinder, blinder_private) = PoseidonCSPRNG::new(private_scalars[69]).next_tuple();
        let shares = PoseidonCSPRNG::new(private_scalars[68]).next_n(69);

        wallet.reblind().unwrap();
        let new_private = wallet.private_share.to_scalars();
        assert_eq!(wallet.blinder, blinder);
        assert_eq!(new_private[69], blinder_private);
        assert_eq!(&new_private[..69], shares.as_slice());
    }

    #[test]
    fn test_failed_reblind_leaves_wallet_unchanged() {
        let mut wallet = empty_wallet();
        // Bypass the mutation methods to exceed the order capacity
        wallet.orders = vec![order(1); MAX_ORDERS + 1];
        let private_share = wallet.private_share.clone();
        let blinder = wallet.blinder;

        assert!(matches!(wallet.reblind(), Err(CoreError::CapacityExceeded(_))));
        assert_eq!(wallet.private_share, private_share);
        assert_eq!(wallet.blinder, blinder);
    }

    #[test]
    fn test_commitment_signature() {
        let mut wallet = empty_wallet();
        let signature = wallet.sign_commitment().unwrap();
        assert!(wallet.verify_commitment_signature(&signature).unwrap());

        wallet.add_balance(balance(5, 1)).unwrap();
        wallet.reblind().unwrap();
        assert!(!wallet.verify_commitment_signature(&signature).unwrap());
    }

    #[test]
    fn test_sign_without_root_key() {
        let mut wallet = empty_wallet();
        wallet.keychain = wallet.keychain.without_root_key();
        assert!(matches!(wallet.sign_commitment(), Err(CoreError::RootKeyUnavailable)));
    }

    #[test]
    fn test_debug_hides_private_share() {
        let wallet = empty_wallet();
        let debug_output = format!("{:?}", wallet);
        assert!(!debug_output.contains("private_share"));
        assert!(!debug_output.contains(&wallet.blinder.to_string()));
    }
}
