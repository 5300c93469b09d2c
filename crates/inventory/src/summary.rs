//! Stock aggregates over a snapshot of products.

use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

use crate::product::Product;

/// Products with `0 < stock < LOW_STOCK_THRESHOLD` count as low stock.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Aggregate counts for a product snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub total_products: usize,
    pub low_stock_count: usize,
    pub zero_stock_count: usize,
    pub total_stock_units: i64,
}

/// Pure projection over a product snapshot.
///
/// Fails when `total_stock_units` does not fit in an `i64`.
pub fn compute_aggregates(products: &[Product]) -> DomainResult<StockSummary> {
    products.iter().try_fold(StockSummary::default(), |mut acc, p| {
        acc.total_products += 1;
        match p.status() {
            StockStatus::OutOfStock => acc.zero_stock_count += 1,
            StockStatus::Low => acc.low_stock_count += 1,
            StockStatus::InStock => {}
        }
        acc.total_stock_units = acc
            .total_stock_units
            .checked_add(p.stock())
            .ok_or_else(|| DomainError::invariant("total stock units overflow"))?;
        Ok(acc)
    })
}

/// Availability bucket of a single product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    Low,
    InStock,
}

impl StockStatus {
    pub fn of(stock: i64) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock < LOW_STOCK_THRESHOLD {
            StockStatus::Low
        } else {
            StockStatus::InStock
        }
    }

    /// Display label used in product lists.
    pub fn label(self, stock: i64) -> String {
        match self {
            StockStatus::OutOfStock => "Out of stock".to_string(),
            StockStatus::Low | StockStatus::InStock => format!("Stock: {stock}"),
        }
    }
}
