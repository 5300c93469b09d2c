use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{Aggregate, AggregateRoot, DomainError, DomainResult, Money, ProductId};

use crate::movement::MovementKind;
use crate::summary::StockStatus;

/// Validated input for registering a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    name: String,
    initial_stock: i64,
    purchase_price: Money,
    sale_price: Money,
    description: Option<String>,
    category: Option<String>,
}

impl NewProduct {
    pub fn new(
        name: impl Into<String>,
        initial_stock: i64,
        purchase_price: Money,
        sale_price: Money,
    ) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        if purchase_price.is_negative() {
            return Err(DomainError::validation("purchase price cannot be negative"));
        }
        if sale_price.is_negative() {
            return Err(DomainError::validation("sale price cannot be negative"));
        }

        Ok(Self {
            name,
            initial_stock,
            purchase_price,
            sale_price,
            description: None,
            category: None,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = non_blank(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = non_blank(category.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial_stock(&self) -> i64 {
        self.initial_stock
    }

    pub fn purchase_price(&self) -> Money {
        self.purchase_price
    }

    pub fn sale_price(&self) -> Money {
        self.sale_price
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Raw fields of a stored product, as decoded from the document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: ProductId,
    pub version: u64,
    pub name: String,
    pub stock: i64,
    pub initial_stock: i64,
    pub purchase_price: Money,
    pub sale_price: Money,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate root: Product.
///
/// `stock` is a cached value; the movement log is the source of truth and
/// `stock == initial_stock + Σ signed movements` must hold at all times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    version: u64,
    name: String,
    stock: i64,
    initial_stock: i64,
    purchase_price: Money,
    sale_price: Money,
    description: Option<String>,
    category: Option<String>,
    created_at: DateTime<Utc>,
}

impl Product {
    /// Rebuild a product from its stored fields, checking invariants.
    pub fn rehydrate(record: ProductRecord) -> DomainResult<Self> {
        if record.name.trim().is_empty() {
            return Err(DomainError::invariant("stored product has an empty name"));
        }
        if record.stock < 0 || record.initial_stock < 0 {
            return Err(DomainError::invariant("stored product has negative stock"));
        }
        if record.purchase_price.is_negative() || record.sale_price.is_negative() {
            return Err(DomainError::invariant("stored product has a negative price"));
        }

        Ok(Self {
            id: record.id,
            version: record.version,
            name: record.name,
            stock: record.stock,
            initial_stock: record.initial_stock,
            purchase_price: record.purchase_price,
            sale_price: record.sale_price,
            description: record.description,
            category: record.category,
            created_at: record.created_at,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stock(&self) -> i64 {
        self.stock
    }

    pub fn initial_stock(&self) -> i64 {
        self.initial_stock
    }

    pub fn purchase_price(&self) -> Money {
        self.purchase_price
    }

    pub fn sale_price(&self) -> Money {
        self.sale_price
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Price used to value a movement of `kind`.
    pub fn unit_price_for(&self, kind: MovementKind) -> Money {
        match kind {
            MovementKind::Increase => self.purchase_price,
            MovementKind::Decrease => self.sale_price,
        }
    }

    pub fn status(&self) -> StockStatus {
        StockStatus::of(self.stock)
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub amount: i64,
}

/// Event: StockAdjusted (decided, not yet persisted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub change_amount: i64,
    pub unit_price: Money,
    pub total_amount: Money,
}

impl Aggregate for Product {
    type Command = AdjustStock;
    type Event = StockAdjusted;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        self.stock += event.kind.signed(event.change_amount);
        self.version += 1;
    }

    fn handle(&self, cmd: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        if cmd.product_id != self.id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        if cmd.amount <= 0 {
            return Err(DomainError::validation("amount must be a positive integer"));
        }

        let new_stock = self
            .stock
            .checked_add(cmd.kind.signed(cmd.amount))
            .ok_or_else(|| DomainError::invariant("stock overflow"))?;
        if new_stock < 0 {
            return Err(DomainError::insufficient_stock(cmd.amount, self.stock));
        }

        let unit_price = self.unit_price_for(cmd.kind);
        let total_amount = unit_price.times(cmd.amount)?;

        Ok(vec![StockAdjusted {
            product_id: self.id,
            kind: cmd.kind,
            change_amount: cmd.amount,
            unit_price,
            total_amount,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn product(stock: i64) -> Product {
        Product::rehydrate(ProductRecord {
            id: ProductId::new(),
            version: 1,
            name: "Widget".to_string(),
            stock,
            initial_stock: stock,
            purchase_price: Money::new(dec!(5)),
            sale_price: Money::new(dec!(8)),
            description: None,
            category: None,
            created_at: Utc::now(),
        })
        .unwrap()
    }

    fn adjust(p: &Product, kind: MovementKind, amount: i64) -> AdjustStock {
        AdjustStock {
            product_id: p.id_typed(),
            kind,
            amount,
        }
    }

    #[test]
    fn decrease_is_valued_at_sale_price() {
        let mut p = product(10);
        let events = p.handle(&adjust(&p, MovementKind::Decrease, 3)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].unit_price, Money::new(dec!(8)));
        assert_eq!(events[0].total_amount, Money::new(dec!(24)));

        p.apply(&events[0]);
        assert_eq!(p.stock(), 7);
        assert_eq!(p.version(), 2);
    }

    #[test]
    fn increase_is_valued_at_purchase_price() {
        let p = product(0);
        let events = p.handle(&adjust(&p, MovementKind::Increase, 4)).unwrap();
        assert_eq!(events[0].unit_price, Money::new(dec!(5)));
        assert_eq!(events[0].total_amount, Money::new(dec!(20)));
    }

    #[test]
    fn decrease_beyond_stock_is_rejected() {
        let p = product(7);
        let err = p.handle(&adjust(&p, MovementKind::Decrease, 20)).unwrap_err();
        assert_eq!(err, DomainError::insufficient_stock(20, 7));
        assert_eq!(p.stock(), 7);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let p = product(7);
        for amount in [0, -1] {
            let err = p.handle(&adjust(&p, MovementKind::Increase, amount)).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)));
        }
    }

    #[test]
    fn new_product_trims_and_validates() {
        let np = NewProduct::new("  Bolt ", 3, Money::new(dec!(1)), Money::new(dec!(2)))
            .unwrap()
            .with_description("   ")
            .with_category(" Hardware ");
        assert_eq!(np.name(), "Bolt");
        assert_eq!(np.description(), None);
        assert_eq!(np.category(), Some("Hardware"));

        assert!(NewProduct::new(" ", 0, Money::ZERO, Money::ZERO).is_err());
        assert!(NewProduct::new("x", -1, Money::ZERO, Money::ZERO).is_err());
        assert!(NewProduct::new("x", 0, Money::new(dec!(-1)), Money::ZERO).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever adjustments are attempted, accepted ones keep
        /// stock equal to the initial stock plus the signed sum of movements,
        /// and stock never goes negative.
        #[test]
        fn stock_equals_initial_plus_signed_movements(
            initial in 0i64..100,
            steps in prop::collection::vec((any::<bool>(), -5i64..50), 0..40)
        ) {
            let mut p = product(initial);
            let mut signed_sum = 0i64;

            for (increase, amount) in steps {
                let kind = if increase { MovementKind::Increase } else { MovementKind::Decrease };
                match p.handle(&adjust(&p, kind, amount)) {
                    Ok(events) => {
                        for e in &events {
                            signed_sum += e.kind.signed(e.change_amount);
                            p.apply(e);
                        }
                    }
                    Err(DomainError::InsufficientStock { requested, available }) => {
                        prop_assert!(requested > available);
                    }
                    Err(DomainError::Validation(_)) => prop_assert!(amount <= 0),
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
                prop_assert!(p.stock() >= 0);
            }

            prop_assert_eq!(p.stock(), initial + signed_sum);
        }
    }
}
