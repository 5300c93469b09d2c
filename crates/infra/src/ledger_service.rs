//! Stock ledger service (application-level orchestration).
//!
//! Registers products and records stock movements against a
//! [`DocumentStore`], keeping every product's cached `productStock` equal to
//! its initial stock plus the signed sum of its movements.
//!
//! ## Adjustment flow
//!
//! ```text
//! AdjustStock
//!   ↓
//! 1. Load the product document (stock + version)
//!   ↓
//! 2. Decide (pure): reject non-positive amounts / insufficient stock,
//!    value the movement at purchase or sale price
//!   ↓
//! 3. Commit ONE batch: create movement + Increment(±amount) on the product,
//!    guarded by ExpectedVersion::Exact(version)
//!   ↓
//! 4. Precondition failed? Another adjustment won the race: go to 1
//!    (bounded by `max_conflict_retries`)
//! ```
//!
//! Validation and insufficient-stock failures happen before any write. Store
//! failures are returned as-is; only version conflicts are retried.

use tracing::{info, instrument, warn};

use stockledger_accounting::{LedgerPoint, LedgerTotals, compute_ledger_totals, ledger_series};
use stockledger_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, ProductId};
use stockledger_events::{SubscriptionHandle, observe};
use stockledger_inventory::{
    AdjustStock, AdjustmentRequest, MovementKind, NewProduct, Product, ProductForm, StockMovement,
    StockSummary, compute_aggregates,
};

use crate::codec::{self, movement_keys, product_keys};
use crate::config::LedgerConfig;
use crate::document_store::{
    Collection, DocumentStore, FilterOp, Query, SortDirection, StoreError, WriteBatch,
};
use crate::error::{LedgerError, LedgerResult};
use crate::projections;
use crate::reconcile::{Reconciliation, reconcile_snapshot};

/// Product registration, stock adjustments and ledger reads over one store.
#[derive(Debug, Clone)]
pub struct StockLedgerService<S> {
    store: S,
    config: LedgerConfig,
}

impl<S> StockLedgerService<S>
where
    S: DocumentStore + Clone + 'static,
{
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create a product with `stock = initial_stock`; `createdAt` is set by
    /// the store.
    #[instrument(skip(self, product), fields(name = product.name()))]
    pub async fn register_product(&self, product: NewProduct) -> LedgerResult<Product> {
        let doc = self
            .store
            .create(Collection::Products, codec::new_product_fields(&product))
            .await?;
        let registered = codec::decode_product(&doc)?;

        info!(
            product_id = %registered.id_typed(),
            initial_stock = registered.initial_stock(),
            "product registered"
        );
        Ok(registered)
    }

    /// Validate raw form input, then register.
    pub async fn register_product_form(&self, form: &ProductForm) -> LedgerResult<Product> {
        let product = form.validate().inspect_err(|e| {
            warn!(error = %e, "product form rejected");
        })?;
        self.register_product(product).await
    }

    pub async fn get_product(&self, product_id: ProductId) -> LedgerResult<Product> {
        let doc = self
            .store
            .get(Collection::Products, product_id.into())
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("product {product_id}")))?;
        Ok(codec::decode_product(&doc)?)
    }

    /// Every product, oldest first.
    pub async fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let query = Query::all().order_by(product_keys::CREATED_AT, SortDirection::Asc);
        self.products(&query).await
    }

    /// The `latest_products_limit` most recently created products, newest first.
    pub async fn latest_products(&self) -> LedgerResult<Vec<Product>> {
        self.products(&latest_products_query(self.config.latest_products_limit))
            .await
    }

    /// Record a stock movement and update the product's cached stock in one
    /// atomic commit. Returns the stored movement.
    #[instrument(skip(self, cmd), fields(product_id = %cmd.product_id, kind = %cmd.kind, amount = cmd.amount))]
    pub async fn apply_adjustment(&self, cmd: AdjustStock) -> LedgerResult<StockMovement> {
        if cmd.amount <= 0 {
            warn!("non-positive adjustment rejected");
            return Err(DomainError::validation("amount must be a positive integer").into());
        }

        let mut conflicts = 0u32;
        loop {
            let product = self.get_product(cmd.product_id).await?;

            let event = match product.handle(&cmd) {
                Ok(events) => events
                    .into_iter()
                    .next()
                    .ok_or_else(|| LedgerError::Invariant("adjustment produced no movement".into()))?,
                Err(err) => {
                    warn!(stock = product.stock(), error = %err, "adjustment rejected");
                    return Err(err.into());
                }
            };

            let collection = codec::movement_collection(event.kind);
            let batch = WriteBatch::new()
                .create(collection, codec::movement_fields(&event))
                .update(
                    Collection::Products,
                    cmd.product_id.into(),
                    codec::stock_delta_fields(&event),
                    ExpectedVersion::Exact(product.version()),
                );

            match self.store.commit(batch).await {
                Ok(docs) => {
                    let movement_doc = docs
                        .iter()
                        .find(|d| d.field(movement_keys::PRODUCT_ID).is_some())
                        .ok_or_else(|| LedgerError::Invariant("commit returned no movement".into()))?;
                    let movement = codec::decode_movement(event.kind, movement_doc)?;

                    info!(
                        movement_id = %movement.id,
                        total_amount = %movement.total_amount,
                        stock = product.stock() + movement.signed_change(),
                        "stock adjusted"
                    );
                    return Ok(movement);
                }
                Err(StoreError::PreconditionFailed { actual, .. }) if conflicts < self.config.max_conflict_retries => {
                    conflicts += 1;
                    warn!(
                        attempt = conflicts,
                        seen_version = product.version(),
                        actual_version = actual,
                        "concurrent adjustment detected; retrying"
                    );
                }
                Err(err @ StoreError::PreconditionFailed { .. }) => {
                    warn!(retries = conflicts, error = %err, "adjustment conflict retries exhausted");
                    return Err(LedgerError::Conflict(format!(
                        "product {} kept changing after {conflicts} retries",
                        cmd.product_id
                    )));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Parse a typed amount, then adjust.
    pub async fn apply_adjustment_input(
        &self,
        product_id: ProductId,
        kind: MovementKind,
        raw_amount: &str,
    ) -> LedgerResult<StockMovement> {
        let cmd = AdjustmentRequest::parse(product_id, kind, raw_amount).inspect_err(|e| {
            warn!(%product_id, %kind, error = %e, "adjustment input rejected");
        })?;
        self.apply_adjustment(cmd).await
    }

    /// Movements of `kind`, oldest first, optionally for one product.
    pub async fn list_movements(
        &self,
        kind: MovementKind,
        product_id: Option<ProductId>,
    ) -> LedgerResult<Vec<StockMovement>> {
        let mut query = Query::all().order_by(movement_keys::TIMESTAMP, SortDirection::Asc);
        if let Some(id) = product_id {
            query = query.filter(movement_keys::PRODUCT_ID, FilterOp::Eq, id.to_string());
        }

        let snapshot = self
            .store
            .query(codec::movement_collection(kind), &query)
            .await?;
        snapshot
            .documents
            .iter()
            .map(|doc| codec::decode_movement(kind, doc).map_err(LedgerError::from))
            .collect()
    }

    pub async fn stock_summary(&self) -> LedgerResult<StockSummary> {
        Ok(compute_aggregates(&self.list_products().await?)?)
    }

    pub async fn ledger_totals(&self) -> LedgerResult<LedgerTotals> {
        let (increases, decreases) = self.all_movements().await?;
        Ok(compute_ledger_totals(&increases, &decreases)?)
    }

    pub async fn ledger_series(&self) -> LedgerResult<Vec<LedgerPoint>> {
        let (increases, decreases) = self.all_movements().await?;
        Ok(ledger_series(&increases, &decreases)?)
    }

    /// Compare the cached stock against the fold of the movement log.
    pub async fn reconcile(&self, product_id: ProductId) -> LedgerResult<Reconciliation> {
        let product = self.get_product(product_id).await?;
        let mut movements = self
            .list_movements(MovementKind::Increase, Some(product_id))
            .await?;
        movements.extend(
            self.list_movements(MovementKind::Decrease, Some(product_id))
                .await?,
        );

        let result = reconcile_snapshot(&product, &movements)?;
        if !result.is_consistent() {
            warn!(
                %product_id,
                cached = result.cached_stock,
                derived = result.derived_stock,
                "stock drift detected"
            );
        }
        Ok(result)
    }

    /// Push a fresh [`StockSummary`] to `on_summary` whenever products change.
    ///
    /// Dropping the returned handle stops the callbacks and releases the
    /// store listener. Must be called from within a tokio runtime.
    pub fn observe_stock_summary<F>(&self, on_summary: F) -> SubscriptionHandle
    where
        F: FnMut(StockSummary) + Send + 'static,
    {
        observe(
            "stock_summary",
            projections::watch_stock_summary(self.store.clone()),
            on_summary,
            |err: LedgerError| warn!(error = %err, "stock summary update failed"),
        )
    }

    async fn products(&self, query: &Query) -> LedgerResult<Vec<Product>> {
        let snapshot = self.store.query(Collection::Products, query).await?;
        snapshot
            .documents
            .iter()
            .map(|doc| codec::decode_product(doc).map_err(LedgerError::from))
            .collect()
    }

    async fn all_movements(&self) -> LedgerResult<(Vec<StockMovement>, Vec<StockMovement>)> {
        let increases = self.list_movements(MovementKind::Increase, None).await?;
        let decreases = self.list_movements(MovementKind::Decrease, None).await?;
        Ok((increases, decreases))
    }
}

pub(crate) fn latest_products_query(limit: usize) -> Query {
    Query::all()
        .order_by(product_keys::CREATED_AT, SortDirection::Desc)
        .limit(limit)
}
