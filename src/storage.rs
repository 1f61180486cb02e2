// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Boundary contracts with durable storage.
//!
//! Reads may lag behind writes made earlier in the same pass, so the engine
//! prefers its own cache over a re-read. Writes are partial: nothing here can
//! carry a derived field.

use crate::error::Result;
use crate::models::{AccountId, Budget, BudgetId, CategoryId, Month};
use crate::period::YearMonth;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// Start balances for one month, the only balance shape the chain walker
/// ever writes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartBalances {
    pub accounts: BTreeMap<AccountId, Decimal>,
    pub categories: BTreeMap<CategoryId, Decimal>,
}

impl StartBalances {
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.categories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len() + self.categories.len()
    }
}

/// Budget-level fields that may be written individually.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BudgetFields {
    pub month_map: Option<BTreeSet<u32>>,
    pub percentage_income_months_back: Option<u32>,
}

pub trait StorageReader {
    fn read_month(&self, budget_id: BudgetId, period: YearMonth) -> Result<Option<Month>>;
    fn read_budget(&self, budget_id: BudgetId) -> Result<Option<Budget>>;
}

pub trait StorageWriter {
    /// Additive write of start balances; entities absent from `starts` keep
    /// whatever is stored.
    fn write_partial_month(
        &self,
        budget_id: BudgetId,
        period: YearMonth,
        starts: &StartBalances,
    ) -> Result<()>;

    fn write_budget_field(&self, budget_id: BudgetId, fields: &BudgetFields) -> Result<()>;

    /// Locks a month's allocations and sets its finalized flag.
    fn write_finalized_allocations(
        &self,
        budget_id: BudgetId,
        period: YearMonth,
        allocations: &BTreeMap<CategoryId, Decimal>,
    ) -> Result<()>;
}

pub trait Storage: StorageReader + StorageWriter {}

impl<T: StorageReader + StorageWriter> Storage for T {}
