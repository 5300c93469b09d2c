//! Cached stock vs. movement log consistency check.

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainResult, ProductId};
use stockledger_inventory::derive_stock;

/// Result of folding a product's movements onto its initial stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub product_id: ProductId,
    /// `productStock` as stored on the product.
    pub cached_stock: i64,
    pub initial_stock: i64,
    /// `initial_stock` plus every signed movement.
    pub derived_stock: i64,
    pub movement_count: usize,
}

impl Reconciliation {
    pub fn is_consistent(&self) -> bool {
        self.cached_stock == self.derived_stock
    }

    /// `cached - derived`; non-zero when a movement or stock write went missing.
    pub fn drift(&self) -> i64 {
        self.cached_stock.saturating_sub(self.derived_stock)
    }
}

pub(crate) fn reconcile_snapshot(
    product: &stockledger_inventory::Product,
    movements: &[stockledger_inventory::StockMovement],
) -> DomainResult<Reconciliation> {
    let product_id = product.id_typed();
    Ok(Reconciliation {
        product_id,
        cached_stock: product.stock(),
        initial_stock: product.initial_stock(),
        derived_stock: derive_stock(product_id, product.initial_stock(), movements)?,
        movement_count: movements.iter().filter(|m| m.product_id == product_id).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use stockledger_core::{Money, MovementId};
    use stockledger_inventory::{MovementKind, Product, ProductRecord, StockMovement};

    fn product(stock: i64, initial: i64) -> Product {
        Product::rehydrate(ProductRecord {
            id: ProductId::new(),
            version: 1,
            name: "Widget".into(),
            stock,
            initial_stock: initial,
            purchase_price: Money::new(dec!(1)),
            sale_price: Money::new(dec!(2)),
            description: None,
            category: None,
            created_at: Utc::now(),
        })
        .unwrap()
    }

    fn movement(product_id: ProductId, kind: MovementKind, amount: i64) -> StockMovement {
        StockMovement {
            id: MovementId::new(),
            product_id,
            kind,
            change_amount: amount,
            unit_price: Money::ZERO,
            total_amount: Money::ZERO,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn agreeing_log_is_consistent() {
        let p = product(12, 10);
        let log = vec![
            movement(p.id_typed(), MovementKind::Increase, 5),
            movement(p.id_typed(), MovementKind::Decrease, 3),
            movement(ProductId::new(), MovementKind::Increase, 40),
        ];
        let r = reconcile_snapshot(&p, &log).unwrap();
        assert!(r.is_consistent());
        assert_eq!(r.movement_count, 2);
    }

    #[test]
    fn lost_stock_write_shows_as_drift() {
        let p = product(10, 10);
        let log = vec![movement(p.id_typed(), MovementKind::Decrease, 4)];
        let r = reconcile_snapshot(&p, &log).unwrap();
        assert!(!r.is_consistent());
        assert_eq!(r.drift(), 4);
    }
}
