// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Per-month balance calculator.
//!
//! Maps the balances carried out of the previous month plus this month's
//! transaction log to the full balance set of this month. Pure: the same
//! inputs always give the same output.

use crate::allocation;
use crate::models::{
    AccountBalance, AccountId, Budget, CategoryBalance, CategoryId, Month, RecalculatedMonth,
    StoredAccountBalance,
};
use crate::money::{self, round};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Start balances handed from one month to the next.
///
/// An entity missing from the maps starts from its configured opening
/// balance, which is also what an empty carryover means for the very first
/// month of a budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Carryover {
    pub accounts: BTreeMap<AccountId, Decimal>,
    pub categories: BTreeMap<CategoryId, Decimal>,
    /// Total income of the month this carryover came out of.
    pub total_income: Option<Decimal>,
}

impl Carryover {
    /// Seeds a walk from the persisted start balances of an anchor month.
    pub fn from_anchor(month: &Month, previous_month_income: Option<Decimal>) -> Self {
        Self {
            accounts: month
                .account_balances
                .iter()
                .map(|b| (b.account_id, round(b.start_balance)))
                .collect(),
            categories: month
                .category_balances
                .iter()
                .filter_map(|b| b.start_balance.map(|s| (b.category_id, round(s))))
                .collect(),
            total_income: previous_month_income,
        }
    }

    /// Balances leaving `month`, ready to become the next month's starts.
    pub fn after(month: &RecalculatedMonth) -> Self {
        Self {
            accounts: month
                .account_balances
                .iter()
                .map(|b| (b.account_id(), b.end_balance))
                .collect(),
            categories: month
                .category_balances
                .iter()
                .map(|b| (b.category_id, b.end_balance))
                .collect(),
            total_income: Some(month.total_income),
        }
    }
}

/// Caller-supplied values the calculator must not look up on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonthInputs {
    /// Keeps a previously computed `previous_month_income` instead of taking
    /// it from the carryover.
    pub previous_month_income: Option<Decimal>,
    /// Total income `percentage_income_months_back` months earlier.
    pub months_back_income: Decimal,
}

pub fn recalculate_month(
    budget: &Budget,
    month: &Month,
    carry: &Carryover,
    inputs: &MonthInputs,
) -> RecalculatedMonth {
    let account_balances = account_ids(budget, month, carry)
        .into_iter()
        .map(|id| account_balance(budget, month, carry, id))
        .collect();

    let category_balances = category_ids(budget, month, carry)
        .into_iter()
        .map(|id| category_balance(budget, month, carry, inputs, id))
        .collect();

    let previous_month_income = inputs
        .previous_month_income
        .or(carry.total_income)
        .map(round)
        .unwrap_or(Decimal::ZERO);

    RecalculatedMonth {
        budget_id: month.budget_id,
        period: month.period,
        account_balances,
        category_balances,
        total_income: month.total_income(),
        total_expenses: money::sum(month.expenses.iter().map(|t| t.amount)),
        previous_month_income,
        are_allocations_finalized: month.are_allocations_finalized,
    }
}

fn account_balance(
    budget: &Budget,
    month: &Month,
    carry: &Carryover,
    id: AccountId,
) -> AccountBalance {
    let start_balance = carry
        .accounts
        .get(&id)
        .copied()
        .or_else(|| budget.accounts.get(&id).map(|a| a.opening_balance))
        .map(round)
        .unwrap_or(Decimal::ZERO);

    let income = money::sum(
        month
            .income
            .iter()
            .filter(|t| t.account_id == id)
            .map(|t| t.amount),
    );
    let expenses = money::sum(
        month
            .expenses
            .iter()
            .filter(|t| t.account_id == id)
            .map(|t| t.amount),
    );
    let transfers_in = money::sum(
        month
            .transfers
            .iter()
            .filter(|t| t.to_account_id == Some(id))
            .map(|t| t.amount),
    );
    let transfers_out = money::sum(
        month
            .transfers
            .iter()
            .filter(|t| t.from_account_id == Some(id))
            .map(|t| t.amount),
    );
    let transfers = round(transfers_in - transfers_out);
    let adjustments = money::sum(
        month
            .adjustments
            .iter()
            .filter(|t| t.account_id == Some(id))
            .map(|t| t.amount),
    );

    let net_change = round(income + expenses + transfers + adjustments);
    AccountBalance {
        stored: StoredAccountBalance {
            account_id: id,
            start_balance,
        },
        income,
        expenses,
        transfers,
        adjustments,
        net_change,
        end_balance: round(start_balance + net_change),
    }
}

fn category_balance(
    budget: &Budget,
    month: &Month,
    carry: &Carryover,
    inputs: &MonthInputs,
    id: CategoryId,
) -> CategoryBalance {
    let category = budget.categories.get(&id);
    let start_balance = carry
        .categories
        .get(&id)
        .copied()
        .or_else(|| category.map(|c| c.opening_balance))
        .map(round)
        .unwrap_or(Decimal::ZERO);

    let resolved = allocation::allocated_for(month, id, category, inputs.months_back_income);
    let (allocated, draft_allocated) = if month.are_allocations_finalized {
        (resolved, Decimal::ZERO)
    } else {
        (Decimal::ZERO, resolved)
    };
    let spent = money::sum(
        month
            .expenses
            .iter()
            .filter(|t| t.category_id == id)
            .map(|t| t.amount),
    );
    let transfers_in = money::sum(
        month
            .transfers
            .iter()
            .filter(|t| t.to_category_id == Some(id))
            .map(|t| t.amount),
    );
    let transfers_out = money::sum(
        month
            .transfers
            .iter()
            .filter(|t| t.from_category_id == Some(id))
            .map(|t| t.amount),
    );
    let transfers = round(transfers_in - transfers_out);
    let adjustments = money::sum(
        month
            .adjustments
            .iter()
            .filter(|t| t.category_id == Some(id))
            .map(|t| t.amount),
    );

    CategoryBalance {
        category_id: id,
        start_balance,
        allocated,
        draft_allocated,
        allocation_finalized: month.are_allocations_finalized,
        spent,
        transfers,
        adjustments,
        end_balance: round(start_balance + allocated + spent + transfers + adjustments),
    }
}

// Known accounts plus any id still referenced by a transaction or the carryover.
fn account_ids(budget: &Budget, month: &Month, carry: &Carryover) -> BTreeSet<AccountId> {
    let mut ids: BTreeSet<AccountId> = budget.accounts.keys().copied().collect();
    ids.extend(carry.accounts.keys().copied());
    ids.extend(month.income.iter().map(|t| t.account_id));
    ids.extend(month.expenses.iter().map(|t| t.account_id));
    for t in &month.transfers {
        ids.extend(t.from_account_id);
        ids.extend(t.to_account_id);
    }
    ids.extend(month.adjustments.iter().filter_map(|t| t.account_id));
    ids
}

fn category_ids(budget: &Budget, month: &Month, carry: &Carryover) -> BTreeSet<CategoryId> {
    let mut ids: BTreeSet<CategoryId> = budget.categories.keys().copied().collect();
    ids.extend(carry.categories.keys().copied());
    ids.extend(month.expenses.iter().map(|t| t.category_id));
    for t in &month.transfers {
        ids.extend(t.from_category_id);
        ids.extend(t.to_category_id);
    }
    ids.extend(month.adjustments.iter().filter_map(|t| t.category_id));
    ids
}
