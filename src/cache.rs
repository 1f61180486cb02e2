// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! In-memory read-through cache of recalculated budgets and months.
//!
//! The cache is what callers render balances from. It also owns the
//! per-budget pass state, so at most one recalculation per budget is in
//! flight and results of a pass that went stale are dropped.

use crate::all_time::BudgetTotals;
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetId, RecalculatedMonth};
use crate::period::YearMonth;
use crate::storage::StorageReader;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassState {
    Idle,
    Running,
    Done,
    /// The last pass failed; edits stay blocked until a retry succeeds.
    Failed(String),
}

/// Proof that a pass was started. Carries the identity it must still match
/// when its results are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassTicket {
    pub budget_id: BudgetId,
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct BudgetCache {
    active: Option<BudgetId>,
    budgets: HashMap<BudgetId, Budget>,
    months: HashMap<BudgetId, BTreeMap<YearMonth, RecalculatedMonth>>,
    totals: HashMap<BudgetId, BudgetTotals>,
    states: HashMap<BudgetId, PassState>,
    generations: HashMap<BudgetId, u64>,
}

impl BudgetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_budget(&self) -> Option<BudgetId> {
        self.active
    }

    /// Switching budgets invalidates the one being left, which also makes any
    /// pass still running for it stale.
    pub fn set_active_budget(&mut self, budget_id: BudgetId) {
        if let Some(previous) = self.active.filter(|p| *p != budget_id) {
            self.invalidate(previous);
        }
        self.active = Some(budget_id);
    }

    pub fn state(&self, budget_id: BudgetId) -> PassState {
        self.states
            .get(&budget_id)
            .cloned()
            .unwrap_or(PassState::Idle)
    }

    pub fn generation(&self, budget_id: BudgetId) -> u64 {
        self.generations.get(&budget_id).copied().unwrap_or(0)
    }

    /// Drops the cached budget (it is fetched again on next access), bumps the
    /// generation and rearms the guard. Recalculated months stay visible until
    /// a newer pass replaces them. A failed state survives invalidation.
    pub fn invalidate(&mut self, budget_id: BudgetId) {
        *self.generations.entry(budget_id).or_insert(0) += 1;
        self.budgets.remove(&budget_id);
        if !matches!(self.state(budget_id), PassState::Failed(_)) {
            self.states.insert(budget_id, PassState::Idle);
        }
    }

    /// Rearms the guard without touching cached data.
    pub fn reset_guard(&mut self, budget_id: BudgetId) {
        if self.state(budget_id) == PassState::Done {
            self.states.insert(budget_id, PassState::Idle);
        }
    }

    pub fn budget(&self, budget_id: BudgetId) -> Option<&Budget> {
        self.budgets.get(&budget_id)
    }

    /// Cached budget, fetched from storage when absent.
    pub fn load_budget<S: StorageReader + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
    ) -> Result<&Budget> {
        if !self.budgets.contains_key(&budget_id) {
            debug!(err = %Error::StaleCache(budget_id), "fetching budget");
            let budget = storage
                .read_budget(budget_id)?
                .ok_or_else(|| Error::NotFound(format!("budget {}", budget_id)))?;
            self.budgets.insert(budget_id, budget);
        }
        self.budgets
            .get(&budget_id)
            .ok_or(Error::StaleCache(budget_id))
    }

    pub fn month(&self, budget_id: BudgetId, period: YearMonth) -> Option<&RecalculatedMonth> {
        self.months.get(&budget_id).and_then(|m| m.get(&period))
    }

    pub fn months(&self, budget_id: BudgetId) -> Option<&BTreeMap<YearMonth, RecalculatedMonth>> {
        self.months.get(&budget_id)
    }

    pub fn totals(&self, budget_id: BudgetId) -> Option<&BudgetTotals> {
        self.totals.get(&budget_id)
    }

    /// Idle (or Failed) → Running. `None` when a pass is already running or
    /// has already completed for the current generation.
    pub fn try_begin(&mut self, budget_id: BudgetId) -> Option<PassTicket> {
        match self.state(budget_id) {
            PassState::Running | PassState::Done => None,
            PassState::Idle | PassState::Failed(_) => {
                self.states.insert(budget_id, PassState::Running);
                Some(PassTicket {
                    budget_id,
                    generation: self.generation(budget_id),
                })
            }
        }
    }

    pub fn is_current(&self, ticket: &PassTicket) -> bool {
        self.active == Some(ticket.budget_id)
            && self.generation(ticket.budget_id) == ticket.generation
    }

    /// Running → Done, replacing the budget's cached values. Returns `false`
    /// and leaves the cache untouched when the ticket went stale.
    pub fn commit(
        &mut self,
        ticket: &PassTicket,
        budget: Budget,
        months: BTreeMap<YearMonth, RecalculatedMonth>,
        totals: BudgetTotals,
    ) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.budgets.insert(ticket.budget_id, budget);
        self.months.insert(ticket.budget_id, months);
        self.totals.insert(ticket.budget_id, totals);
        self.states.insert(ticket.budget_id, PassState::Done);
        true
    }

    /// Running → Failed. Cached values from the last good pass stay.
    pub fn fail(&mut self, ticket: &PassTicket, reason: String) {
        if self.generation(ticket.budget_id) == ticket.generation {
            self.states.insert(ticket.budget_id, PassState::Failed(reason));
        }
    }

    pub fn ensure_editable(&self, budget_id: BudgetId) -> Result<()> {
        match self.state(budget_id) {
            PassState::Failed(_) => Err(Error::EditsBlocked(budget_id)),
            _ => Ok(()),
        }
    }
}
