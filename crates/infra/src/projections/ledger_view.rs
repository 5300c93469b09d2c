//! Live income / expense / profit totals.

use tokio::sync::mpsc;

use stockledger_accounting::{LedgerTotals, compute_ledger_totals};
use stockledger_events::Subscription;
use stockledger_inventory::{MovementKind, StockMovement};

use crate::codec;
use crate::document_store::{Collection, DocumentStore, Query, Snapshot};
use crate::error::{LedgerError, LedgerResult};

/// [`LedgerTotals`] recomputed whenever either movement collection changes.
///
/// Nothing is emitted until both collections delivered their first snapshot.
/// Must be called from within a tokio runtime.
pub fn watch_ledger_totals<S>(store: S) -> Subscription<LedgerResult<LedgerTotals>>
where
    S: DocumentStore,
{
    let mut increases = store.subscribe(Collection::StockIncreases, Query::all());
    let mut decreases = store.subscribe(Collection::StockDecreases, Query::all());
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        let mut latest_in: Option<Vec<StockMovement>> = None;
        let mut latest_out: Option<Vec<StockMovement>> = None;

        loop {
            let update = tokio::select! {
                item = increases.recv() => item.map(|r| (MovementKind::Increase, r)),
                item = decreases.recv() => item.map(|r| (MovementKind::Decrease, r)),
            };
            let Some((kind, result)) = update else {
                break;
            };

            let decoded = result
                .map_err(LedgerError::from)
                .and_then(|snapshot| decode_movements(kind, &snapshot));
            let movements = match decoded {
                Ok(movements) => movements,
                Err(err) => {
                    if tx.send(Err(err)).is_err() {
                        break;
                    }
                    continue;
                }
            };

            match kind {
                MovementKind::Increase => latest_in = Some(movements),
                MovementKind::Decrease => latest_out = Some(movements),
            }

            if let (Some(ins), Some(outs)) = (&latest_in, &latest_out) {
                if tx.send(compute_ledger_totals(ins, outs).map_err(LedgerError::from)).is_err() {
                    break;
                }
            }
        }
    });

    Subscription::with_task(rx, task.abort_handle())
}

fn decode_movements(kind: MovementKind, snapshot: &Snapshot) -> LedgerResult<Vec<StockMovement>> {
    snapshot
        .documents
        .iter()
        .map(|doc| codec::decode_movement(kind, doc).map_err(LedgerError::from))
        .collect()
}
