use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult, Money, MovementId, ProductId};

use crate::product::StockAdjusted;

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Increase,
    Decrease,
}

impl MovementKind {
    /// Signed stock delta for a positive `amount`.
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            MovementKind::Increase => amount,
            MovementKind::Decrease => -amount,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Increase => "increase",
            MovementKind::Decrease => "decrease",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded stock movement (immutable, append-only).
///
/// `unit_price` is the price captured when the movement happened: purchase
/// price for increases, sale price for decreases. Later price changes on the
/// product never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub change_amount: i64,
    pub unit_price: Money,
    pub total_amount: Money,
    pub timestamp: DateTime<Utc>,
}

impl StockMovement {
    /// Attach store-assigned identity and time to a decided adjustment.
    pub fn recorded(id: MovementId, timestamp: DateTime<Utc>, adjusted: &StockAdjusted) -> Self {
        Self {
            id,
            product_id: adjusted.product_id,
            kind: adjusted.kind,
            change_amount: adjusted.change_amount,
            unit_price: adjusted.unit_price,
            total_amount: adjusted.total_amount,
            timestamp,
        }
    }

    pub fn signed_change(&self) -> i64 {
        self.kind.signed(self.change_amount)
    }
}

/// Fold a product's movements onto its initial stock.
///
/// Movements for other products are ignored. Fails if the running total
/// leaves the `i64` range.
pub fn derive_stock(product_id: ProductId, initial_stock: i64, movements: &[StockMovement]) -> DomainResult<i64> {
    movements
        .iter()
        .filter(|m| m.product_id == product_id)
        .try_fold(initial_stock, |stock, m| {
            stock
                .checked_add(m.signed_change())
                .ok_or_else(|| DomainError::invariant("derived stock overflow"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn movement(product_id: ProductId, kind: MovementKind, amount: i64) -> StockMovement {
        StockMovement {
            id: MovementId::new(),
            product_id,
            kind,
            change_amount: amount,
            unit_price: Money::new(dec!(1)),
            total_amount: Money::new(dec!(1)).times(amount).unwrap(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn derive_stock_folds_signed_changes() {
        let product_id = ProductId::new();
        let movements = vec![
            movement(product_id, MovementKind::Increase, 5),
            movement(product_id, MovementKind::Decrease, 3),
            movement(ProductId::new(), MovementKind::Decrease, 100),
        ];

        assert_eq!(derive_stock(product_id, 10, &movements), Ok(12));
    }

    #[test]
    fn derive_stock_overflow_is_an_error() {
        let product_id = ProductId::new();
        let movements = vec![movement(product_id, MovementKind::Increase, 1)];
        assert!(matches!(
            derive_stock(product_id, i64::MAX, &movements),
            Err(DomainError::InvariantViolation(_))
        ));
    }

    #[test]
    fn kind_serializes_lowercase() {
        assert_eq!(MovementKind::Decrease.to_string(), "decrease");
        assert_eq!(MovementKind::Increase.signed(4), 4);
        assert_eq!(MovementKind::Decrease.signed(4), -4);
    }
}
