// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Chain walker.
//!
//! Finds the nearest month with persisted start balances at or before the
//! window boundary, then re-derives every month from there up to the forward
//! horizon, threading each month's closing balances into the next. Boundary
//! and older months that lack (or disagree with) persisted starts get a
//! partial start-balance write.

use crate::allocation;
use crate::calc::{Carryover, MonthInputs, recalculate_month};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Budget, BudgetId, Month, RecalculatedMonth};
use crate::money;
use crate::period::YearMonth;
use crate::storage::{BudgetFields, StartBalances, Storage, StorageReader};
use crate::window::PersistenceWindow;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkMode {
    /// Start from the nearest persisted anchor.
    Incremental,
    /// Ignore anchors and rebuild from the oldest month of the budget.
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// A month with persisted start balances.
    Stored(YearMonth),
    /// The oldest month of the budget, started from opening balances.
    Oldest(YearMonth),
    /// The backward search hit its cap; started from opening balances here.
    GaveUp(YearMonth),
}

impl Anchor {
    pub fn period(self) -> YearMonth {
        match self {
            Anchor::Stored(ym) | Anchor::Oldest(ym) | Anchor::GaveUp(ym) => ym,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub budget_id: BudgetId,
    pub now: YearMonth,
    /// `None` only for a budget without months.
    pub anchor: Option<Anchor>,
    pub months: BTreeMap<YearMonth, RecalculatedMonth>,
    /// Month map after the walk, including boundary months it created.
    pub month_map: BTreeSet<u32>,
    /// Number of storage writes issued during the walk.
    pub writes: usize,
}

/// Memoized month reads for one pass. A month is read from storage at most
/// once, so a write earlier in the pass never has to be read back.
struct MonthSource<'a, S: StorageReader + ?Sized> {
    storage: &'a S,
    budget: &'a Budget,
    months: BTreeMap<YearMonth, Option<Month>>,
}

impl<'a, S: StorageReader + ?Sized> MonthSource<'a, S> {
    fn new(storage: &'a S, budget: &'a Budget) -> Self {
        Self {
            storage,
            budget,
            months: BTreeMap::new(),
        }
    }

    fn get(&mut self, ym: YearMonth) -> Result<Option<&Month>> {
        if !self.months.contains_key(&ym) {
            let month = if self.budget.has_month(ym) {
                self.storage.read_month(self.budget.id, ym)?
            } else {
                None
            };
            self.months.insert(ym, month);
        }
        Ok(self.months.get(&ym).and_then(Option::as_ref))
    }

    fn income(&mut self, ym: YearMonth) -> Result<Decimal> {
        Ok(self
            .get(ym)?
            .map(Month::total_income)
            .unwrap_or(Decimal::ZERO))
    }
}

pub fn walk<S: Storage + ?Sized>(
    storage: &S,
    budget: &Budget,
    now: YearMonth,
    config: &EngineConfig,
    mode: WalkMode,
) -> Result<ChainOutcome> {
    let mut outcome = ChainOutcome {
        budget_id: budget.id,
        now,
        anchor: None,
        months: BTreeMap::new(),
        month_map: budget.month_map.clone(),
        writes: 0,
    };
    let (Some(earliest), Some(latest)) = (budget.earliest_month(), budget.latest_month()) else {
        debug!(budget_id = budget.id, "budget has no months, nothing to walk");
        return Ok(outcome);
    };

    let window = PersistenceWindow::new(now, config.window_months_back);
    let boundary = window.first_month();
    let end = now.max(latest.min(now.shift(config.forward_horizon as i32)));
    let mut source = MonthSource::new(storage, budget);

    let anchor = match mode {
        WalkMode::Full => Anchor::Oldest(earliest),
        WalkMode::Incremental => find_anchor(&mut source, budget, boundary, earliest, config)?,
    };
    outcome.anchor = Some(anchor);
    debug!(budget_id = budget.id, ?anchor, %end, "walking chain");

    let start = anchor.period();
    let previous_income = source.income(start.prev())?;
    let mut carry = match anchor {
        Anchor::Stored(ym) => {
            let month = source
                .get(ym)?
                .ok_or_else(|| Error::NotFound(format!("anchor month {}", ym)))?;
            Carryover::from_anchor(month, Some(previous_income))
        }
        Anchor::Oldest(_) | Anchor::GaveUp(_) => Carryover {
            total_income: Some(previous_income),
            ..Carryover::default()
        },
    };

    let months_back = allocation::months_back(budget) as i32;
    for ym in start.through(end) {
        let inputs = MonthInputs {
            previous_month_income: None,
            months_back_income: source.income(ym.shift(-months_back))?,
        };
        let month = source
            .get(ym)?
            .cloned()
            .unwrap_or_else(|| Month::empty(budget.id, ym));
        let recalculated = recalculate_month(budget, &month, &carry, &inputs);

        let must_persist = window.persists_start(ym) && (budget.has_month(ym) || ym == boundary);
        if must_persist {
            let missing = missing_starts(&month, &recalculated);
            if !missing.is_empty() {
                debug!(budget_id = budget.id, month = %ym, entities = missing.len(), "persisting start balances");
                storage.write_partial_month(budget.id, ym, &missing)?;
                outcome.writes += 1;
                outcome.month_map.insert(ym.ordinal());
            }
        }

        carry = Carryover::after(&recalculated);
        outcome.months.insert(ym, recalculated);
    }

    if outcome.month_map != budget.month_map {
        storage.write_budget_field(
            budget.id,
            &BudgetFields {
                month_map: Some(outcome.month_map.clone()),
                percentage_income_months_back: None,
            },
        )?;
        outcome.writes += 1;
    }

    Ok(outcome)
}

fn find_anchor<S: StorageReader + ?Sized>(
    source: &mut MonthSource<'_, S>,
    budget: &Budget,
    boundary: YearMonth,
    earliest: YearMonth,
    config: &EngineConfig,
) -> Result<Anchor> {
    let mut probe = boundary;
    for _ in 0..config.max_backward_months {
        if probe < earliest {
            debug!(budget_id = budget.id, %earliest, "no stored anchor, starting from the oldest month");
            return Ok(Anchor::Oldest(earliest));
        }
        if source.get(probe)?.is_some_and(Month::has_anchor) {
            return Ok(Anchor::Stored(probe));
        }
        probe = probe.prev();
    }
    let gave_up_at = probe.next();
    let err = Error::MissingAnchor {
        budget_id: budget.id,
        searched_from: boundary,
    };
    warn!(%err, start = %gave_up_at, "treating balances as zero");
    Ok(Anchor::GaveUp(gave_up_at))
}

/// Start balances that storage lacks or holds with a different value.
fn missing_starts(month: &Month, recalculated: &RecalculatedMonth) -> StartBalances {
    let mut missing = StartBalances::default();
    for b in &recalculated.account_balances {
        let stored = month.stored_account_start(b.account_id());
        if !stored.is_some_and(|s| money::same_amount(s, b.start_balance())) {
            missing.accounts.insert(b.account_id(), b.start_balance());
        }
    }
    for b in &recalculated.category_balances {
        let stored = month
            .stored_category(b.category_id)
            .and_then(|s| s.start_balance);
        if !stored.is_some_and(|s| money::same_amount(s, b.start_balance)) {
            missing.categories.insert(b.category_id, b.start_balance);
        }
    }
    missing
}
