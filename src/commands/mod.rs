// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod accounts;
pub mod allocations;
pub mod budgets;
pub mod categories;
pub mod doctor;
pub mod reports;
pub mod settings;
pub mod transactions;

use crate::chain::WalkMode;
use crate::config::EngineConfig;
use crate::db::SqliteStorage;
use crate::engine::{Engine, PassReport};
use crate::models::{Budget, BudgetId};
use crate::period::YearMonth;
use anyhow::{Context, Result};
use rusqlite::Connection;

/// One command's view of the active budget: storage, engine and "now".
pub struct Session<'a> {
    pub storage: SqliteStorage<'a>,
    pub engine: Engine,
    pub budget_id: BudgetId,
    pub now: YearMonth,
}

impl<'a> Session<'a> {
    /// Opens the active budget and runs the load-time recalculation.
    pub fn open(conn: &'a Connection, now: YearMonth) -> Result<Self> {
        let config = EngineConfig::load(conn)?;
        let budget_id = crate::utils::get_active_budget(conn)?;
        let mut session = Self {
            storage: SqliteStorage::new(conn),
            engine: Engine::new(config),
            budget_id,
            now,
        };
        session.recalculate(WalkMode::Incremental)?;
        Ok(session)
    }

    pub fn recalculate(&mut self, mode: WalkMode) -> Result<PassReport> {
        self.engine
            .recalculate(&self.storage, self.budget_id, self.now, mode)
            .context("Recalculation failed; balances shown are from the last good pass")
    }

    /// Mutation trigger for a change in `period`.
    pub fn after_mutation(&mut self, period: YearMonth) -> Result<PassReport> {
        self.engine
            .after_mutation(&self.storage, self.budget_id, period, self.now)
            .context("Recalculation failed; balances shown are from the last good pass")
    }

    pub fn ensure_editable(&self) -> Result<()> {
        self.engine.cache().ensure_editable(self.budget_id)?;
        Ok(())
    }

    pub fn budget(&self) -> Result<&Budget> {
        self.engine
            .cache()
            .budget(self.budget_id)
            .context("Budget is not loaded")
    }
}
