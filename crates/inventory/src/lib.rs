//! Inventory domain module.
//!
//! Business rules for products and their stock movements, implemented purely
//! as deterministic domain logic (no IO, no storage).

pub mod form;
pub mod movement;
pub mod product;
pub mod summary;

pub use form::{AdjustmentRequest, ProductForm};
pub use movement::{MovementKind, StockMovement, derive_stock};
pub use product::{AdjustStock, NewProduct, Product, ProductRecord, StockAdjusted};
pub use summary::{LOW_STOCK_THRESHOLD, StockStatus, StockSummary, compute_aggregates};
