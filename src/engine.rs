// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Recalculation entry point.
//!
//! A pass is `begin` → `run` → `commit`. `recalculate` does all three;
//! the split form exists for callers that can switch budgets between
//! running and committing.

use crate::all_time::{self, BudgetTotals};
use crate::allocation;
use crate::cache::{BudgetCache, PassTicket};
use crate::chain::{self, Anchor, ChainOutcome, WalkMode};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetId, CategoryId, RecalculatedMonth};
use crate::money;
use crate::period::YearMonth;
use crate::storage::{BudgetFields, Storage};
use crate::window::PersistenceWindow;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Results of a pass that has not been committed yet.
#[derive(Debug, Clone)]
pub struct ComputedPass {
    pub budget: Budget,
    pub outcome: ChainOutcome,
    pub totals: BudgetTotals,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassSummary {
    pub anchor: Option<Anchor>,
    pub months: usize,
    pub writes: usize,
    pub ready_to_assign: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PassReport {
    /// The guard refused: a pass already ran or is running.
    Skipped,
    /// The budget changed underneath the pass; nothing was cached.
    Discarded,
    Completed(PassSummary),
}

#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    cache: BudgetCache,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            cache: BudgetCache::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &BudgetCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut BudgetCache {
        &mut self.cache
    }

    pub fn begin(&mut self, budget_id: BudgetId) -> Option<PassTicket> {
        self.cache.try_begin(budget_id)
    }

    /// Walks the chain and aggregates totals without touching the cache's
    /// rendered values.
    pub fn run<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        ticket: &PassTicket,
        now: YearMonth,
        mode: WalkMode,
    ) -> Result<ComputedPass> {
        let mut budget = self.cache.load_budget(storage, ticket.budget_id)?.clone();
        let outcome = chain::walk(storage, &budget, now, &self.config, mode)?;
        budget.month_map = outcome.month_map.clone();
        let totals =
            all_time::budget_totals(&budget, &outcome.months, now, self.config.forward_horizon);
        all_time::apply(&mut budget, &totals);
        Ok(ComputedPass {
            budget,
            outcome,
            totals,
        })
    }

    /// Caches the pass unless it went stale. Returns whether it was kept.
    pub fn commit(&mut self, ticket: &PassTicket, pass: ComputedPass) -> bool {
        let kept = self
            .cache
            .commit(ticket, pass.budget, pass.outcome.months, pass.totals);
        if !kept {
            warn!(budget_id = ticket.budget_id, "discarding results of a stale pass");
        }
        kept
    }

    /// Runs a pass for `budget_id`, making it the active budget.
    ///
    /// `WalkMode::Full` is the explicit "recalculate all" action and rearms
    /// the guard; incremental passes run at most once per cache generation.
    pub fn recalculate<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
        now: YearMonth,
        mode: WalkMode,
    ) -> Result<PassReport> {
        self.cache.set_active_budget(budget_id);
        if mode == WalkMode::Full {
            self.cache.reset_guard(budget_id);
        }
        let Some(ticket) = self.begin(budget_id) else {
            debug!(budget_id, "recalculation already ran, skipping");
            return Ok(PassReport::Skipped);
        };

        let pass = match self.run(storage, &ticket, now, mode) {
            Ok(pass) => pass,
            Err(err) => {
                self.cache.fail(&ticket, err.to_string());
                return Err(err);
            }
        };
        let summary = PassSummary {
            anchor: pass.outcome.anchor,
            months: pass.outcome.months.len(),
            writes: pass.outcome.writes,
            ready_to_assign: pass.totals.ready_to_assign,
        };
        if !self.commit(&ticket, pass) {
            return Ok(PassReport::Discarded);
        }
        info!(
            budget_id,
            months = summary.months,
            writes = summary.writes,
            "recalculation complete"
        );
        Ok(PassReport::Completed(summary))
    }

    /// Mutation trigger: call after a transaction in `period` was added,
    /// edited or deleted. Edits at or before the window boundary invalidate
    /// persisted anchors, so those rebuild from the oldest month.
    pub fn after_mutation<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
        period: YearMonth,
        now: YearMonth,
    ) -> Result<PassReport> {
        self.cache.invalidate(budget_id);
        let window = PersistenceWindow::new(now, self.config.window_months_back);
        let mode = if window.persists_start(period) {
            WalkMode::Full
        } else {
            WalkMode::Incremental
        };
        self.recalculate(storage, budget_id, now, mode)
    }

    /// Locks the current draft allocations of `period` (with `overrides`
    /// applied on top) and recalculates. An already finalized month keeps its
    /// locked amounts; only `overrides` change them.
    pub fn finalize_month<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
        period: YearMonth,
        now: YearMonth,
        overrides: &BTreeMap<CategoryId, Decimal>,
    ) -> Result<BTreeMap<CategoryId, Decimal>> {
        self.cache.ensure_editable(budget_id)?;
        let locked = storage
            .read_month(budget_id, period)?
            .filter(|m| m.are_allocations_finalized);
        let allocations: BTreeMap<CategoryId, Decimal> = match locked {
            Some(month) => {
                let budget = self.cache.load_budget(storage, budget_id)?;
                debug!(budget_id, month = %period, "month already finalized, keeping locked amounts");
                budget
                    .categories
                    .keys()
                    .map(|id| {
                        let amount = overrides
                            .get(id)
                            .copied()
                            .or_else(|| month.stored_category(*id).and_then(|b| b.allocated))
                            .map(money::round)
                            .unwrap_or(Decimal::ZERO);
                        (*id, amount)
                    })
                    .collect()
            }
            None => self.draft_allocations(storage, budget_id, period, overrides)?,
        };
        storage.write_finalized_allocations(budget_id, period, &allocations)?;
        self.after_mutation(storage, budget_id, period, now)?;
        Ok(allocations)
    }

    /// What `period` would lock in if finalized now.
    pub fn draft_allocations<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
        period: YearMonth,
        overrides: &BTreeMap<CategoryId, Decimal>,
    ) -> Result<BTreeMap<CategoryId, Decimal>> {
        let budget = self.cache.load_budget(storage, budget_id)?.clone();
        let source = period.shift(-(allocation::months_back(&budget) as i32));
        let income = if budget.has_month(source) {
            storage
                .read_month(budget_id, source)?
                .map(|m| m.total_income())
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };
        Ok(allocation::draft_allocations(&budget, income, overrides))
    }

    /// Changes N for percentage rules. Only months that are not finalized
    /// see a different allocation afterwards.
    pub fn set_percentage_income_months_back<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        budget_id: BudgetId,
        months_back: u32,
        now: YearMonth,
    ) -> Result<PassReport> {
        self.cache.ensure_editable(budget_id)?;
        if months_back == 0 {
            return Err(Error::InvalidData(
                "percentage_income_months_back must be at least 1".into(),
            ));
        }
        storage.write_budget_field(
            budget_id,
            &BudgetFields {
                month_map: None,
                percentage_income_months_back: Some(months_back),
            },
        )?;
        self.cache.invalidate(budget_id);
        self.recalculate(storage, budget_id, now, WalkMode::Incremental)
    }

    pub fn month(&self, budget_id: BudgetId, period: YearMonth) -> Option<&RecalculatedMonth> {
        self.cache.month(budget_id, period)
    }
}
