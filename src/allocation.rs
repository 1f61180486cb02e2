// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Budget, Category, CategoryId, DefaultMonthlyType, Month};
use crate::money;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Live (draft) allocation for a category from its default rule.
///
/// `months_back_income` is the total income of the month
/// `percentage_income_months_back` months before the one being resolved.
pub fn resolve(category: &Category, months_back_income: Decimal) -> Decimal {
    match category.default_monthly_type {
        DefaultMonthlyType::Fixed => money::round(category.default_monthly_amount),
        DefaultMonthlyType::Percentage => money::round(
            category.default_monthly_amount / Decimal::ONE_HUNDRED * months_back_income,
        ),
    }
}

/// Allocation used by the calculator for one category in one month.
///
/// Finalized months return the stored amount verbatim (zero when the
/// category did not exist at finalization time).
pub fn allocated_for(
    month: &Month,
    category_id: CategoryId,
    category: Option<&Category>,
    months_back_income: Decimal,
) -> Decimal {
    if month.are_allocations_finalized {
        return month
            .stored_category(category_id)
            .and_then(|b| b.allocated)
            .map(money::round)
            .unwrap_or(Decimal::ZERO);
    }
    category
        .map(|c| resolve(c, months_back_income))
        .unwrap_or(Decimal::ZERO)
}

/// Draft allocations for every category in the budget, with optional
/// per-category overrides applied on top.
pub fn draft_allocations(
    budget: &Budget,
    months_back_income: Decimal,
    overrides: &BTreeMap<CategoryId, Decimal>,
) -> BTreeMap<CategoryId, Decimal> {
    budget
        .categories
        .values()
        .map(|c| {
            let amount = overrides
                .get(&c.id)
                .copied()
                .map(money::round)
                .unwrap_or_else(|| resolve(c, months_back_income));
            (c.id, amount)
        })
        .collect()
}

/// `N` in "percentage of income N months back"; never less than one.
pub fn months_back(budget: &Budget) -> u32 {
    budget.percentage_income_months_back.max(1)
}
