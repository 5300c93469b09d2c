//! Accounting module: income, expense, and profit derived from stock movements.
//!
//! Pure functions over movement snapshots; no IO, no persistence concerns.

pub mod ledger;

pub use ledger::{LedgerPoint, LedgerTotals, compute_ledger_totals, ledger_series};
