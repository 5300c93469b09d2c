//! Product-side live views: stock summary and latest products.

use stockledger_events::Subscription;
use stockledger_inventory::{Product, StockSummary, compute_aggregates};

use crate::codec;
use crate::document_store::{Collection, DocumentStore, Query, Snapshot};
use crate::error::{LedgerError, LedgerResult};
use crate::ledger_service::latest_products_query;

use super::project;

/// [`StockSummary`] over all products, recomputed on every change.
///
/// Must be called from within a tokio runtime.
pub fn watch_stock_summary<S>(store: S) -> Subscription<LedgerResult<StockSummary>>
where
    S: DocumentStore,
{
    let source = store.subscribe(Collection::Products, Query::all());
    project(source, |snapshot| Ok(compute_aggregates(&decode_products(snapshot)?)?))
}

/// The `limit` most recently created products, newest first. Must be called
/// from within a tokio runtime.
pub fn watch_latest_products<S>(store: S, limit: usize) -> Subscription<LedgerResult<Vec<Product>>>
where
    S: DocumentStore,
{
    let source = store.subscribe(Collection::Products, latest_products_query(limit));
    project(source, decode_products)
}

fn decode_products(snapshot: &Snapshot) -> LedgerResult<Vec<Product>> {
    snapshot
        .documents
        .iter()
        .map(|doc| codec::decode_product(doc).map_err(LedgerError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use rust_decimal_macros::dec;
    use stockledger_core::Money;
    use stockledger_inventory::{AdjustStock, MovementKind, NewProduct};

    use crate::config::LedgerConfig;
    use crate::document_store::InMemoryDocumentStore;
    use crate::ledger_service::StockLedgerService;

    async fn latest<T>(sub: &mut Subscription<LedgerResult<T>>) -> T {
        let mut last = None;
        while let Ok(Some(item)) = sub.recv_timeout(Duration::from_millis(50)).await {
            last = Some(item.unwrap());
        }
        last.unwrap()
    }

    #[tokio::test]
    async fn summary_follows_adjustments() {
        let store = InMemoryDocumentStore::new();
        let svc = StockLedgerService::new(store.clone(), LedgerConfig::default());
        let mut summary = watch_stock_summary(store.clone());

        assert_eq!(latest(&mut summary).await, StockSummary::default());

        let p = svc
            .register_product(NewProduct::new("Widget", 10, Money::new(dec!(1)), Money::new(dec!(2))).unwrap())
            .await
            .unwrap();
        svc.apply_adjustment(AdjustStock {
            product_id: p.id_typed(),
            kind: MovementKind::Decrease,
            amount: 5,
        })
        .await
        .unwrap();

        assert_eq!(
            latest(&mut summary).await,
            StockSummary {
                total_products: 1,
                low_stock_count: 1,
                zero_stock_count: 0,
                total_stock_units: 5,
            }
        );
    }

    #[tokio::test]
    async fn latest_products_window_slides() {
        let store = InMemoryDocumentStore::new();
        let svc = StockLedgerService::new(store.clone(), LedgerConfig::default());
        let mut latest_view = watch_latest_products(store.clone(), 2);

        for name in ["first", "second", "third"] {
            svc.register_product(NewProduct::new(name, 0, Money::ZERO, Money::ZERO).unwrap())
                .await
                .unwrap();
        }

        let names: Vec<_> = latest(&mut latest_view)
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn store_errors_reach_the_consumer() {
        let store = InMemoryDocumentStore::new();
        store.set_online(false);
        let mut summary = watch_stock_summary(store.clone());

        let first = summary.recv().await.unwrap();
        assert!(matches!(first, Err(LedgerError::StoreUnavailable(_))));
    }
}
