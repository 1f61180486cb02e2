// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! All-time category totals and the budget-wide "ready to assign" pool.

use crate::models::{AccountId, Budget, CategoryId, RecalculatedMonth};
use crate::money::{self, round};
use crate::period::YearMonth;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BudgetTotals {
    pub accounts: BTreeMap<AccountId, Decimal>,
    pub categories: BTreeMap<CategoryId, Decimal>,
    pub ready_to_assign: Decimal,
}

/// "Total available" per category.
///
/// Seeds from the latest finalized month at or before `now` (or from the
/// first walked month's starts when nothing is finalized), then walks every
/// later month of the budget up to `now + horizon`. Each month adds its
/// finalized allocation, spending, category transfers and adjustments.
/// Draft allocations never enter the total.
pub fn category_totals(
    budget: &Budget,
    months: &BTreeMap<YearMonth, RecalculatedMonth>,
    now: YearMonth,
    horizon: u32,
) -> BTreeMap<CategoryId, Decimal> {
    let mut totals: BTreeMap<CategoryId, Decimal> = budget
        .categories
        .values()
        .map(|c| (c.id, round(c.opening_balance)))
        .collect();

    let seed = months
        .range(..=now)
        .rev()
        .find(|(_, m)| m.are_allocations_finalized);
    let first_unseeded = match seed {
        Some((ym, month)) => {
            for b in &month.category_balances {
                totals.insert(b.category_id, b.end_balance);
            }
            ym.next()
        }
        None => match months.first_key_value() {
            Some((ym, month)) => {
                for b in &month.category_balances {
                    totals.insert(b.category_id, b.start_balance);
                }
                *ym
            }
            None => return totals,
        },
    };

    let last = now.shift(horizon as i32);
    for (ym, month) in months.range(first_unseeded..=last) {
        if !budget.has_month(*ym) {
            continue;
        }
        for b in &month.category_balances {
            let total = totals.entry(b.category_id).or_insert(Decimal::ZERO);
            // `allocated` is zero for draft months; `spent` is signed.
            *total = round(*total + b.allocated + b.spent + b.transfers + b.adjustments);
        }
    }
    totals
}

/// Account balances as of the end of `now`; accounts without a walked month
/// keep their opening balance.
pub fn account_totals(
    budget: &Budget,
    months: &BTreeMap<YearMonth, RecalculatedMonth>,
    now: YearMonth,
) -> BTreeMap<AccountId, Decimal> {
    let current = months.range(..=now).next_back().map(|(_, m)| m);
    budget
        .accounts
        .values()
        .map(|a| {
            let balance = current
                .and_then(|m| m.account(a.id))
                .map(|b| b.end_balance)
                .unwrap_or_else(|| round(a.opening_balance));
            (a.id, balance)
        })
        .collect()
}

/// On-budget, active account money minus what positive categories hold.
/// Overspent categories do not give money back to the pool.
pub fn ready_to_assign(
    budget: &Budget,
    accounts: &BTreeMap<AccountId, Decimal>,
    categories: &BTreeMap<CategoryId, Decimal>,
) -> Decimal {
    let pool = money::sum(
        budget
            .accounts
            .values()
            .filter(|a| a.on_budget && a.active)
            .map(|a| accounts.get(&a.id).copied().unwrap_or(a.balance)),
    );
    let held = money::sum(categories.values().copied().filter(|v| *v > Decimal::ZERO));
    round(pool - held)
}

pub fn budget_totals(
    budget: &Budget,
    months: &BTreeMap<YearMonth, RecalculatedMonth>,
    now: YearMonth,
    horizon: u32,
) -> BudgetTotals {
    let accounts = account_totals(budget, months, now);
    let categories = category_totals(budget, months, now, horizon);
    let ready_to_assign = ready_to_assign(budget, &accounts, &categories);
    BudgetTotals {
        accounts,
        categories,
        ready_to_assign,
    }
}

/// Writes computed balances into the budget's account and category maps.
pub fn apply(budget: &mut Budget, totals: &BudgetTotals) {
    for (id, balance) in &totals.accounts {
        if let Some(a) = budget.accounts.get_mut(id) {
            a.balance = *balance;
        }
    }
    for (id, balance) in &totals.categories {
        if let Some(c) = budget.categories.get_mut(id) {
            c.balance = *balance;
        }
    }
}
