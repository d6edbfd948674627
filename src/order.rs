use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{ScalarCodec, ScalarCursor};
use crate::errors::{CoreError, CoreResult};
use crate::fixed_point::FixedPoint;
use crate::scalar::Scalar;

/// An opaque, in-memory order identifier; never committed
pub type OrderId = Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    #[default]
    Buy = 0,
    Sell = 1,
}

impl OrderSide {
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }

    pub fn to_scalar(&self) -> Scalar {
        Scalar::from(*self as u64)
    }

    pub fn from_scalar(scalar: &Scalar) -> CoreResult<Self> {
        if scalar.is_zero() {
            Ok(OrderSide::Buy)
        } else if scalar.is_one() {
            Ok(OrderSide::Sell)
        } else {
            Err(CoreError::Encoding(format!("invalid order side {}", scalar)))
        }
    }
}

/// An order to trade the base token against the quote token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Skipped by the scalar encoding, decodes as the nil id
    pub id: OrderId,
    pub quote_mint: Scalar,
    pub base_mint: Scalar,
    pub side: OrderSide,
    /// The amount of the base token to trade
    pub amount: Scalar,
    /// The worst price, in quote per base, the order will accept
    pub worst_case_price: FixedPoint,
}

impl Order {
    /// Create an order with a fresh random id
    pub fn new(
        quote_mint: Scalar,
        base_mint: Scalar,
        side: OrderSide,
        amount: Scalar,
        worst_case_price: FixedPoint,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            quote_mint,
            base_mint,
            side,
            amount,
            worst_case_price,
        }
    }

    /// A zero order is inactive and its slot may be reused
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// The mint this order spends from
    pub fn send_mint(&self) -> Scalar {
        match self.side {
            OrderSide::Buy => self.quote_mint,
            OrderSide::Sell => self.base_mint,
        }
    }

    /// The mint this order receives into
    pub fn receive_mint(&self) -> Scalar {
        match self.side {
            OrderSide::Buy => self.base_mint,
            OrderSide::Sell => self.quote_mint,
        }
    }
}

impl ScalarCodec for Order {
    const NUM_SCALARS: usize = 5;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(self.quote_mint);
        out.push(self.base_mint);
        out.push(self.side.to_scalar());
        out.push(self.amount);
        self.worst_case_price.write_scalars(out);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            id: OrderId::nil(),
            quote_mint: cursor.next_scalar()?,
            base_mint: cursor.next_scalar()?,
            side: OrderSide::from_scalar(&cursor.next_scalar()?)?,
            amount: cursor.next_scalar()?,
            worst_case_price: FixedPoint::read_scalars(cursor)?,
        })
    }
}

/// A secret share of an order, where every field is an arbitrary scalar
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShare {
    pub quote_mint: Scalar,
    pub base_mint: Scalar,
    pub side: Scalar,
    pub amount: Scalar,
    pub worst_case_price: FixedPoint,
}

impl From<&Order> for OrderShare {
    fn from(order: &Order) -> Self {
        Self {
            quote_mint: order.quote_mint,
            base_mint: order.base_mint,
            side: order.side.to_scalar(),
            amount: order.amount,
            worst_case_price: order.worst_case_price,
        }
    }
}

impl ScalarCodec for OrderShare {
    const NUM_SCALARS: usize = Order::NUM_SCALARS;

    fn write_scalars(&self, out: &mut Vec<Scalar>) {
        out.push(self.quote_mint);
        out.push(self.base_mint);
        out.push(self.side);
        out.push(self.amount);
        self.worst_case_price.write_scalars(out);
    }

    fn read_scalars(cursor: &mut ScalarCursor<'_>) -> CoreResult<Self> {
        cursor.ensure_remaining(Self::NUM_SCALARS)?;
        Ok(Self {
            quote_mint: cursor.next_scalar()?,
            base_mint: cursor.next_scalar()?,
            side: cursor.next_scalar()?,
            amount: cursor.next_scalar()?,
            worst_case_price: FixedPoint::read_scalars(cursor)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order() -> Order {
        Order::new(
            Scalar::from(1u64),
            Scalar::from(2u64),
            OrderSide::Sell,
            Scalar::from(50u64),
            FixedPoint::from_integer(3),
        )
    }

    #[test]
    fn test_id_is_not_committed() {
        let order = sample_order();
        let mut other = order;
        other.id = Uuid::new_v4();
        assert_eq!(order.to_scalars(), other.to_scalars());

        let decoded = Order::from_scalars(&order.to_scalars()).unwrap();
        assert!(decoded.id.is_nil());
        assert_eq!(decoded, Order { id: OrderId::nil(), ..order });
    }

    #[test]
    fn test_field_order() {
        let order = sample_order();
        let scalars = order.to_scalars();
        assert_eq!(scalars.len(), Order::NUM_SCALARS);
        assert_eq!(scalars[2], Scalar::one());
        assert_eq!(scalars[3], Scalar::from(50u64));
        assert_eq!(scalars[4], FixedPoint::from_integer(3).repr);
    }

    #[test]
    fn test_invalid_side_rejected() {
        let mut scalars = sample_order().to_scalars();
        scalars[2] = Scalar::from(2u64);
        assert!(matches!(Order::from_scalars(&scalars), Err(CoreError::Encoding(_))));

        // The share form accepts any scalar in the side slot
        assert_eq!(OrderShare::from_scalars(&scalars).unwrap().side, Scalar::from(2u64));
    }

    #[test]
    fn test_share_layout_matches_order() {
        let order = sample_order();
        assert_eq!(OrderShare::from(&order).to_scalars(), order.to_scalars());
    }

    #[test]
    fn test_mints_by_side() {
        let order = sample_order();
        assert_eq!(order.send_mint(), order.base_mint);
        assert_eq!(order.receive_mint(), order.quote_mint);
        assert_eq!(order.side.opposite(), OrderSide::Buy);
    }
}
