use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainResult, Money};
use stockledger_inventory::StockMovement;

/// Income / expense / profit over a movement snapshot.
///
/// - expense: value of stock bought in (increases, at purchase price)
/// - income: value of stock sold (decreases, at sale price)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub total_income: Money,
    pub total_expense: Money,
    pub total_profit: Money,
}

/// Sum the stored `total_amount` of each side.
///
/// Uses the valuation captured on each movement, so later price changes on
/// the product do not rewrite history. Fails if a total overflows.
pub fn compute_ledger_totals(
    increases: &[StockMovement],
    decreases: &[StockMovement],
) -> DomainResult<LedgerTotals> {
    let total_expense = Money::checked_sum(increases.iter().map(|m| m.total_amount))?;
    let total_income = Money::checked_sum(decreases.iter().map(|m| m.total_amount))?;

    Ok(LedgerTotals {
        total_income,
        total_expense,
        total_profit: total_income.checked_sub(total_expense)?,
    })
}

/// One day of ledger activity (UTC calendar day).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPoint {
    pub date: NaiveDate,
    pub expense: Money,
    pub income: Money,
}

/// Per-day expense and income, ascending by date. Days without movements
/// are omitted.
pub fn ledger_series(
    increases: &[StockMovement],
    decreases: &[StockMovement],
) -> DomainResult<Vec<LedgerPoint>> {
    let mut days: BTreeMap<NaiveDate, (Money, Money)> = BTreeMap::new();

    for m in increases {
        let entry = days.entry(m.timestamp.date_naive()).or_default();
        entry.0 = entry.0.checked_add(m.total_amount)?;
    }
    for m in decreases {
        let entry = days.entry(m.timestamp.date_naive()).or_default();
        entry.1 = entry.1.checked_add(m.total_amount)?;
    }

    Ok(days
        .into_iter()
        .map(|(date, (expense, income))| LedgerPoint {
            date,
            expense,
            income,
        })
        .collect())
}
