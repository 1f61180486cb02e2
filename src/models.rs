// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::period::YearMonth;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type BudgetId = i64;
pub type AccountId = i64;
pub type CategoryId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub r#type: String,
    pub group_id: Option<i64>,
    pub on_budget: bool,
    pub active: bool,
    /// Start balance used for the very first month the account appears in.
    pub opening_balance: Decimal,
    /// Computed by the engine; never read back as an input.
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultMonthlyType {
    Fixed,
    Percentage,
}

impl DefaultMonthlyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DefaultMonthlyType::Fixed => "fixed",
            DefaultMonthlyType::Percentage => "percentage",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Some(DefaultMonthlyType::Fixed),
            "percentage" | "percent" | "pct" => Some(DefaultMonthlyType::Percentage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub group_id: Option<i64>,
    pub default_monthly_amount: Decimal,
    pub default_monthly_type: DefaultMonthlyType,
    pub opening_balance: Decimal,
    /// All-time available figure, computed by the engine.
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub sort_order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: BudgetId,
    pub name: String,
    pub accounts: BTreeMap<AccountId, Account>,
    pub account_groups: Vec<Group>,
    pub categories: BTreeMap<CategoryId, Category>,
    pub category_groups: Vec<Group>,
    /// `YYYYMM` ordinals of every month that exists for this budget.
    pub month_map: BTreeSet<u32>,
    pub percentage_income_months_back: u32,
}

impl Budget {
    pub fn new(id: BudgetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            accounts: BTreeMap::new(),
            account_groups: Vec::new(),
            categories: BTreeMap::new(),
            category_groups: Vec::new(),
            month_map: BTreeSet::new(),
            percentage_income_months_back: 1,
        }
    }

    pub fn has_month(&self, ym: YearMonth) -> bool {
        self.month_map.contains(&ym.ordinal())
    }

    pub fn earliest_month(&self) -> Option<YearMonth> {
        self.month_map.first().copied().and_then(YearMonth::from_ordinal)
    }

    pub fn latest_month(&self) -> Option<YearMonth> {
        self.month_map.last().copied().and_then(YearMonth::from_ordinal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    pub amount: Decimal,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub payee: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub cleared: bool,
}

/// Negative amount is money out, positive is a refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub amount: Decimal,
    pub category_id: CategoryId,
    pub account_id: AccountId,
    pub date: NaiveDate,
    pub payee: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub cleared: bool,
}

/// Moves `amount` out of the `from_*` pair into the `to_*` pair.
/// `None` is the "no account" / "no category" sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: i64,
    pub amount: Decimal,
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
    pub from_category_id: Option<CategoryId>,
    pub to_category_id: Option<CategoryId>,
    pub date: NaiveDate,
    pub description: Option<String>,
    #[serde(default)]
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adjustment {
    pub id: i64,
    pub amount: Decimal,
    pub account_id: Option<AccountId>,
    pub category_id: Option<CategoryId>,
    pub date: NaiveDate,
    pub payee: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub cleared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transaction {
    Income(Income),
    Expense(Expense),
    Transfer(Transfer),
    Adjustment(Adjustment),
}

impl Transaction {
    pub fn id(&self) -> i64 {
        match self {
            Transaction::Income(t) => t.id,
            Transaction::Expense(t) => t.id,
            Transaction::Transfer(t) => t.id,
            Transaction::Adjustment(t) => t.id,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            Transaction::Income(t) => t.date,
            Transaction::Expense(t) => t.date,
            Transaction::Transfer(t) => t.date,
            Transaction::Adjustment(t) => t.date,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Transaction::Income(t) => t.amount,
            Transaction::Expense(t) => t.amount,
            Transaction::Transfer(t) => t.amount,
            Transaction::Adjustment(t) => t.amount,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Transaction::Income(_) => "income",
            Transaction::Expense(_) => "expense",
            Transaction::Transfer(_) => "transfer",
            Transaction::Adjustment(_) => "adjustment",
        }
    }
}

/// Persisted part of an account's month balance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredAccountBalance {
    pub account_id: AccountId,
    pub start_balance: Decimal,
}

/// Full account balance for one month. Everything outside `stored` is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    #[serde(flatten)]
    pub stored: StoredAccountBalance,
    pub income: Decimal,
    pub expenses: Decimal,
    pub transfers: Decimal,
    pub adjustments: Decimal,
    pub net_change: Decimal,
    pub end_balance: Decimal,
}

impl AccountBalance {
    pub fn account_id(&self) -> AccountId {
        self.stored.account_id
    }

    pub fn start_balance(&self) -> Decimal {
        self.stored.start_balance
    }
}

/// Persisted part of a category's month balance. `allocated` is only set
/// once the month's allocations are finalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredCategoryBalance {
    pub category_id: CategoryId,
    pub start_balance: Option<Decimal>,
    pub allocated: Option<Decimal>,
}

/// `allocated` is the finalized amount and counts towards `end_balance`.
/// `draft_allocated` is what the default rule would assign to an unfinalized
/// month; it is display-only and never reaches `end_balance` or the next month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBalance {
    pub category_id: CategoryId,
    pub start_balance: Decimal,
    pub allocated: Decimal,
    pub draft_allocated: Decimal,
    pub allocation_finalized: bool,
    pub spent: Decimal,
    pub transfers: Decimal,
    pub adjustments: Decimal,
    pub end_balance: Decimal,
}

impl CategoryBalance {
    /// Allocation to show for the month, finalized or draft.
    pub fn shown_allocation(&self) -> Decimal {
        if self.allocation_finalized {
            self.allocated
        } else {
            self.draft_allocated
        }
    }

    /// Start-balance view of this row, the only shape allowed back into storage.
    pub fn to_stored_start(&self) -> StoredCategoryBalance {
        StoredCategoryBalance {
            category_id: self.category_id,
            start_balance: Some(self.start_balance),
            allocated: None,
        }
    }
}

/// A month as it is kept in storage: the transaction log plus the sparse
/// persisted balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Month {
    pub budget_id: BudgetId,
    pub period: YearMonth,
    pub income: Vec<Income>,
    pub expenses: Vec<Expense>,
    pub transfers: Vec<Transfer>,
    pub adjustments: Vec<Adjustment>,
    pub account_balances: Vec<StoredAccountBalance>,
    pub category_balances: Vec<StoredCategoryBalance>,
    pub are_allocations_finalized: bool,
}

impl Month {
    pub fn empty(budget_id: BudgetId, period: YearMonth) -> Self {
        Self {
            budget_id,
            period,
            income: Vec::new(),
            expenses: Vec::new(),
            transfers: Vec::new(),
            adjustments: Vec::new(),
            account_balances: Vec::new(),
            category_balances: Vec::new(),
            are_allocations_finalized: false,
        }
    }

    pub fn total_income(&self) -> Decimal {
        crate::money::sum(self.income.iter().map(|t| t.amount))
    }

    pub fn stored_account_start(&self, id: AccountId) -> Option<Decimal> {
        self.account_balances
            .iter()
            .find(|b| b.account_id == id)
            .map(|b| b.start_balance)
    }

    pub fn stored_category(&self, id: CategoryId) -> Option<&StoredCategoryBalance> {
        self.category_balances.iter().find(|b| b.category_id == id)
    }

    /// True when at least one entity has a persisted start balance.
    pub fn has_anchor(&self) -> bool {
        !self.account_balances.is_empty()
            || self.category_balances.iter().any(|b| b.start_balance.is_some())
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        let mut all: Vec<Transaction> = Vec::new();
        all.extend(self.income.iter().cloned().map(Transaction::Income));
        all.extend(self.expenses.iter().cloned().map(Transaction::Expense));
        all.extend(self.transfers.iter().cloned().map(Transaction::Transfer));
        all.extend(self.adjustments.iter().cloned().map(Transaction::Adjustment));
        all.sort_by_key(|t| (t.date(), t.id()));
        all
    }
}

/// Derived view of one month, produced by the balance calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculatedMonth {
    pub budget_id: BudgetId,
    pub period: YearMonth,
    pub account_balances: Vec<AccountBalance>,
    pub category_balances: Vec<CategoryBalance>,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub previous_month_income: Decimal,
    pub are_allocations_finalized: bool,
}

impl RecalculatedMonth {
    pub fn account(&self, id: AccountId) -> Option<&AccountBalance> {
        self.account_balances.iter().find(|b| b.account_id() == id)
    }

    pub fn category(&self, id: CategoryId) -> Option<&CategoryBalance> {
        self.category_balances.iter().find(|b| b.category_id == id)
    }
}
