use serde::{Deserialize, Serialize};

use crate::codec::{ScalarCodec, ScalarCursor};
use crate::errors::CoreResult;
use crate::scalar::Scalar;

/// A balance of a single token held in a wallet
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// The token address, as a scalar
    pub mint: Scalar,
    pub amount: Scalar,
    /// Fees owed to the relayer, not spendable by the holder
    pub relayer_fee_balance: Scalar,
    /// Fees owed to the protocol, not spendable by the holder
    pub protocol_fee_balance: Scalar,
}

impl Balance {
    pub fn new_from_mint_and_amount(mint: Scalar, amount: Scalar) -> Self {
        Self {
            mint,
            amount,
            ..Default::default()
        }
    }

    pub fn new_from_mint(mint: Scalar) -> Self {
        Self::new_from_mint_and_amount(mint, Scalar::zero())
    }

    /// A zero balance holds nothing and its slot may be reused
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
            && self.relayer_fee_balance.is_zero()
            && self.protocol_fee_balance.is_zero()
    }
}

impl ScalarCodec for Balance {
    const NUM_SCALARS: usize = 4;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(self.mint);
        out.push(self.amount);
        out.push(self.relayer_fee_balance);
        out.push(self.protocol_fee_balance);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            mint: cursor.next_scalar()?,
            amount: cursor.next_scalar()?,
            relayer_fee_balance: cursor.next_scalar()?,
            protocol_fee_balance: cursor.next_scalar()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order() {
        let balance = Balance {
            mint: Scalar::from(1u64),
            amount: Scalar::from(2u64),
            relayer_fee_balance: Scalar::from(3u64),
            protocol_fee_balance: Scalar::from(4u64),
        };
        let expected: Vec<Scalar> = (1..=4u64).map(Scalar::from).collect();
        assert_eq!(balance.to_scalars(), expected);
        assert_eq!(Balance::from_scalars(&expected).unwrap(), balance);
    }

    #[test]
    fn test_is_zero_ignores_mint() {
        assert!(Balance::new_from_mint(Scalar::from(77u64)).is_zero());

        let mut balance = Balance::new_from_mint(Scalar::from(77u64));
        balance.relayer_fee_balance = Scalar::one();
        assert!(!balance.is_zero());
    }
}
