use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use rust_decimal::Decimal;
use stockledger_accounting::{compute_ledger_totals, ledger_series};
use stockledger_core::{Money, MovementId, ProductId};
use stockledger_infra::{InMemoryDocumentStore, LedgerConfig, StockLedgerService};
use stockledger_inventory::{
    AdjustStock, MovementKind, NewProduct, Product, ProductRecord, StockMovement, compute_aggregates,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn movements(kind: MovementKind, count: usize) -> Vec<StockMovement> {
    let product_id = ProductId::new();
    (0..count)
        .map(|i| {
            let unit_price = Money::new(Decimal::new(199 + i as i64 % 50, 2));
            let change_amount = 1 + (i as i64 % 7);
            StockMovement {
                id: MovementId::new(),
                product_id,
                kind,
                change_amount,
                unit_price,
                total_amount: unit_price.times(change_amount).unwrap(),
                timestamp: Utc::now() - chrono::Duration::hours(i as i64),
            }
        })
        .collect()
}

fn products(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| {
            Product::rehydrate(ProductRecord {
                id: ProductId::new(),
                version: 1,
                name: format!("product-{i}"),
                stock: (i % 25) as i64,
                initial_stock: 0,
                purchase_price: Money::ZERO,
                sale_price: Money::ZERO,
                description: None,
                category: None,
                created_at: Utc::now(),
            })
            .unwrap()
        })
        .collect()
}

fn bench_ledger_totals(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger_totals");

    for count in [10, 100, 1000, 10000].iter() {
        let increases = movements(MovementKind::Increase, *count);
        let decreases = movements(MovementKind::Decrease, *count);
        group.throughput(Throughput::Elements((*count * 2) as u64));

        group.bench_with_input(BenchmarkId::new("totals", count), count, |b, _| {
            b.iter(|| compute_ledger_totals(black_box(&increases), black_box(&decreases)));
        });
        group.bench_with_input(BenchmarkId::new("series", count), count, |b, _| {
            b.iter(|| ledger_series(black_box(&increases), black_box(&decreases)));
        });
    }

    group.finish();
}

fn bench_stock_aggregates(c: &mut Criterion) {
    let mut group = c.benchmark_group("stock_aggregates");

    for count in [10, 100, 1000, 10000].iter() {
        let snapshot = products(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, _| {
            b.iter(|| compute_aggregates(black_box(&snapshot)));
        });
    }

    group.finish();
}

fn bench_adjustment_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("adjustment_commit");
    let rt = runtime();

    let svc = StockLedgerService::new(InMemoryDocumentStore::new(), LedgerConfig::default());
    let product = rt
        .block_on(svc.register_product(
            NewProduct::new("bench", 0, Money::new(Decimal::ONE), Money::new(Decimal::TWO)).unwrap(),
        ))
        .unwrap();

    group.bench_function("increase_in_memory", |b| {
        b.iter(|| {
            rt.block_on(svc.apply_adjustment(AdjustStock {
                product_id: product.id_typed(),
                kind: MovementKind::Increase,
                amount: black_box(1),
            }))
            .unwrap()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_ledger_totals,
    bench_stock_aggregates,
    bench_adjustment_commit
);
criterion_main!(benches);
