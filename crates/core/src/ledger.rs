//! Stock movement arithmetic.
//!
//! Every change to a product's `stock_quantity` goes through
//! [`MovementType::apply`], which computes the new on-hand quantity and
//! rejects movements that would push it below zero. The database layer
//! records `quantity_before`/`quantity_after` from the same calculation so
//! the ledger can always be replayed.

use crate::types::MovementType;

/// Errors from applying a stock movement.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Quantity is zero, negative for a movement type that requires a
    /// positive count, or large enough to overflow the balance.
    #[error("invalid quantity {0} for this movement")]
    InvalidQuantity(i32),
    /// The movement would leave less than zero units on hand.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock {
        /// Units on hand before the movement.
        available: i32,
        /// Units the movement tried to remove.
        requested: i32,
    },
}

impl MovementType {
    /// Signed change this movement makes to on-hand stock.
    ///
    /// `quantity` is a positive count for purchases, sales and returns, and a
    /// signed non-zero delta for adjustments.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidQuantity`] when the quantity is not
    /// valid for the movement type.
    pub const fn signed_delta(self, quantity: i32) -> Result<i32, LedgerError> {
        match self {
            Self::Purchase | Self::Return if quantity > 0 => Ok(quantity),
            Self::Sale if quantity > 0 => Ok(-quantity),
            Self::Adjustment if quantity != 0 => Ok(quantity),
            _ => Err(LedgerError::InvalidQuantity(quantity)),
        }
    }

    /// Apply this movement to `current` on-hand stock.
    ///
    /// ```
    /// use solarshop_core::{LedgerError, MovementType};
    ///
    /// assert_eq!(MovementType::Purchase.apply(10, 5), Ok(15));
    /// assert_eq!(MovementType::Adjustment.apply(10, -3), Ok(7));
    /// assert_eq!(
    ///     MovementType::Sale.apply(2, 3),
    ///     Err(LedgerError::InsufficientStock { available: 2, requested: 3 })
    /// );
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is invalid for the movement type or
    /// the result would be negative.
    pub const fn apply(self, current: i32, quantity: i32) -> Result<i32, LedgerError> {
        let delta = match self.signed_delta(quantity) {
            Ok(d) => d,
            Err(e) => return Err(e),
        };
        let Some(next) = current.checked_add(delta) else {
            return Err(LedgerError::InvalidQuantity(quantity));
        };
        if next < 0 {
            return Err(LedgerError::InsufficientStock {
                available: current,
                requested: delta.saturating_neg(),
            });
        }
        Ok(next)
    }
}

/// Delta needed to bring `recorded` stock in line with a physical `counted`
/// value. `None` when they already agree.
#[must_use]
pub const fn stock_take_delta(recorded: i32, counted: i32) -> Option<i32> {
    match counted.checked_sub(recorded) {
        Some(0) | None => None,
        Some(d) => Some(d),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_and_return_add() {
        assert_eq!(MovementType::Purchase.apply(0, 12), Ok(12));
        assert_eq!(MovementType::Return.apply(3, 1), Ok(4));
    }

    #[test]
    fn test_sale_subtracts() {
        assert_eq!(MovementType::Sale.apply(10, 10), Ok(0));
        assert_eq!(MovementType::Sale.apply(10, 4), Ok(6));
    }

    #[test]
    fn test_sale_insufficient() {
        assert_eq!(
            MovementType::Sale.apply(1, 2),
            Err(LedgerError::InsufficientStock {
                available: 1,
                requested: 2
            })
        );
    }

    #[test]
    fn test_negative_adjustment_below_zero() {
        assert_eq!(
            MovementType::Adjustment.apply(5, -6),
            Err(LedgerError::InsufficientStock {
                available: 5,
                requested: 6
            })
        );
    }

    #[test]
    fn test_zero_and_negative_quantities_rejected() {
        assert_eq!(
            MovementType::Purchase.apply(5, 0),
            Err(LedgerError::InvalidQuantity(0))
        );
        assert_eq!(
            MovementType::Sale.apply(5, -1),
            Err(LedgerError::InvalidQuantity(-1))
        );
        assert_eq!(
            MovementType::Adjustment.apply(5, 0),
            Err(LedgerError::InvalidQuantity(0))
        );
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            MovementType::Purchase.apply(i32::MAX, 1),
            Err(LedgerError::InvalidQuantity(1))
        );
    }

    #[test]
    fn test_stock_take_delta() {
        assert_eq!(stock_take_delta(10, 7), Some(-3));
        assert_eq!(stock_take_delta(10, 14), Some(4));
        assert_eq!(stock_take_delta(10, 10), None);
    }
}
