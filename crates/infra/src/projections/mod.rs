//! Live projections (read models rebuilt from store snapshots).
//!
//! Each projection subscribes to one or more collections and recomputes its
//! value from every snapshot it receives. Projections are:
//! - **Stateless between snapshots**: only the latest snapshot is kept
//! - **Cancellable**: dropping the returned subscription stops the task and
//!   releases the store listeners it holds

pub mod ledger_view;
pub mod stock_overview;

pub use ledger_view::watch_ledger_totals;
pub use stock_overview::{watch_latest_products, watch_stock_summary};

use tokio::sync::mpsc;

use stockledger_events::Subscription;

use crate::document_store::{Snapshot, StoreError};
use crate::error::{LedgerError, LedgerResult};

/// Map every snapshot of `source` through `view`.
///
/// Store errors are forwarded as [`LedgerError`]s and the projection keeps
/// listening; it ends when `source` ends or the consumer goes away.
///
/// Must be called from within a tokio runtime.
pub fn project<T, F>(
    mut source: Subscription<Result<Snapshot, StoreError>>,
    mut view: F,
) -> Subscription<LedgerResult<T>>
where
    T: Send + 'static,
    F: FnMut(&Snapshot) -> LedgerResult<T> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(async move {
        while let Some(item) = source.recv().await {
            let out = match item {
                Ok(snapshot) => view(&snapshot),
                Err(err) => Err(LedgerError::from(err)),
            };
            if tx.send(out).is_err() {
                break;
            }
        }
    });
    Subscription::with_task(rx, task.abort_handle())
}
