//! Walks through a small ledger session against the in-memory store.

use stockledger_infra::{InMemoryDocumentStore, LedgerConfig, LedgerError, StockLedgerService, projections, reference};
use stockledger_inventory::{MovementKind, ProductForm};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), LedgerError> {
    stockledger_observability::init();

    let config = LedgerConfig::from_env();
    let store = InMemoryDocumentStore::new();
    let svc = StockLedgerService::new(store.clone(), config);

    let _summary_handle = svc.observe_stock_summary(|summary| {
        tracing::info!(
            total_products = summary.total_products,
            low_stock = summary.low_stock_count,
            out_of_stock = summary.zero_stock_count,
            units = summary.total_stock_units,
            "stock summary"
        );
    });
    let mut totals = projections::watch_ledger_totals(store.clone());

    reference::add_category(&store, "Hardware").await?;
    reference::add_language(&store, "English").await?;

    let bolt = svc
        .register_product_form(&ProductForm {
            name: "Bolt M6".into(),
            stock: "40".into(),
            purchase_price: "0,12".into(),
            sale_price: "0,30".into(),
            description: "Zinc plated".into(),
            category: "Hardware".into(),
        })
        .await?;

    svc.apply_adjustment_input(bolt.id_typed(), MovementKind::Increase, "60")
        .await?;
    svc.apply_adjustment_input(bolt.id_typed(), MovementKind::Decrease, "95")
        .await?;

    if let Err(err) = svc
        .apply_adjustment_input(bolt.id_typed(), MovementKind::Decrease, "10")
        .await
    {
        tracing::warn!(error = %err, "expected rejection");
    }

    let product = svc.get_product(bolt.id_typed()).await?;
    tracing::info!(
        product = product.name(),
        status = %product.status().label(product.stock()),
        "product status"
    );

    while let Ok(Some(update)) = totals.recv_timeout(std::time::Duration::from_millis(20)).await {
        let t = update?;
        tracing::info!(
            income = %t.total_income,
            expense = %t.total_expense,
            profit = %t.total_profit,
            "ledger totals"
        );
    }

    for point in svc.ledger_series().await? {
        tracing::info!(date = %point.date, expense = %point.expense, income = %point.income, "ledger day");
    }

    let check = svc.reconcile(bolt.id_typed()).await?;
    tracing::info!(
        consistent = check.is_consistent(),
        derived = check.derived_stock,
        cached = check.cached_stock,
        "reconciliation"
    );

    Ok(())
}
