//! Parsing of user-typed input into validated commands.

use stockledger_core::{DomainError, DomainResult, Money, ProductId};

use crate::movement::MovementKind;
use crate::product::{AdjustStock, NewProduct};

/// Product registration form, as typed by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductForm {
    pub name: String,
    pub stock: String,
    pub purchase_price: String,
    pub sale_price: String,
    pub description: String,
    pub category: String,
}

impl ProductForm {
    pub fn validate(&self) -> DomainResult<NewProduct> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name is required"));
        }
        let initial_stock = parse_quantity("stock", &self.stock, true)?;
        let purchase_price = Money::parse_price("purchasePrice", &self.purchase_price)?;
        let sale_price = Money::parse_price("salePrice", &self.sale_price)?;

        Ok(NewProduct::new(self.name.as_str(), initial_stock, purchase_price, sale_price)?
            .with_description(self.description.as_str())
            .with_category(self.category.as_str()))
    }
}

/// Raw stock adjustment input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustmentRequest;

impl AdjustmentRequest {
    /// Parse a typed amount into an [`AdjustStock`] command.
    ///
    /// The amount must be a positive integer.
    pub fn parse(product_id: ProductId, kind: MovementKind, raw_amount: &str) -> DomainResult<AdjustStock> {
        let amount = parse_quantity("amount", raw_amount, false)?;
        Ok(AdjustStock {
            product_id,
            kind,
            amount,
        })
    }
}

fn parse_quantity(field: &str, raw: &str, allow_zero: bool) -> DomainResult<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| DomainError::validation(format!("{field} must be a whole number (got '{trimmed}')")))?;

    if value < 0 || (!allow_zero && value == 0) {
        let bound = if allow_zero { "zero or more" } else { "greater than zero" };
        return Err(DomainError::validation(format!("{field} must be {bound} (got {value})")));
    }
    Ok(value)
}
