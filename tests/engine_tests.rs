// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use envelope_ledger::cache::PassState;
use envelope_ledger::chain::{Anchor, WalkMode};
use envelope_ledger::config::EngineConfig;
use envelope_ledger::db::{self, SqliteStorage};
use envelope_ledger::engine::{Engine, PassReport};
use envelope_ledger::error::{Error, Result as EngineResult};
use envelope_ledger::models::{
    Account, Adjustment, Budget, BudgetId, Category, CategoryId, DefaultMonthlyType, Expense,
    Income, Month, Transaction, Transfer,
};
use envelope_ledger::period::YearMonth;
use envelope_ledger::storage::{BudgetFields, StartBalances, StorageReader, StorageWriter};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn ym(y: i32, m: u32) -> YearMonth {
    YearMonth::new(y, m).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn add_account(storage: &SqliteStorage<'_>, budget_id: i64, name: &str, opening: &str, on_budget: bool) -> i64 {
    storage
        .add_account(
            budget_id,
            &Account {
                id: 0,
                name: name.into(),
                r#type: "checking".into(),
                group_id: None,
                on_budget,
                active: true,
                opening_balance: d(opening),
                balance: Decimal::ZERO,
            },
        )
        .unwrap()
}

fn add_category(
    storage: &SqliteStorage<'_>,
    budget_id: i64,
    name: &str,
    rule: DefaultMonthlyType,
    amount: &str,
) -> i64 {
    storage
        .add_category(
            budget_id,
            &Category {
                id: 0,
                name: name.into(),
                group_id: None,
                default_monthly_amount: d(amount),
                default_monthly_type: rule,
                opening_balance: Decimal::ZERO,
                balance: Decimal::ZERO,
            },
        )
        .unwrap()
}

fn earn(storage: &SqliteStorage<'_>, budget_id: i64, account_id: i64, day: &str, amount: &str) {
    storage
        .insert_transaction(
            budget_id,
            &Transaction::Income(Income {
                id: 0,
                amount: d(amount),
                account_id,
                date: date(day),
                payee: None,
                description: None,
                cleared: false,
            }),
        )
        .unwrap();
}

fn spend(
    storage: &SqliteStorage<'_>,
    budget_id: i64,
    account_id: i64,
    category_id: i64,
    day: &str,
    amount: &str,
) {
    storage
        .insert_transaction(
            budget_id,
            &Transaction::Expense(Expense {
                id: 0,
                amount: d(amount),
                category_id,
                account_id,
                date: date(day),
                payee: None,
                description: None,
                cleared: false,
            }),
        )
        .unwrap();
}

fn completed(report: PassReport) -> envelope_ledger::engine::PassSummary {
    match report {
        PassReport::Completed(summary) => summary,
        other => panic!("expected a completed pass, got {:?}", other),
    }
}

/// Storage whose month reads always fail.
struct Broken<'a>(SqliteStorage<'a>);

impl StorageReader for Broken<'_> {
    fn read_month(&self, _: BudgetId, _: YearMonth) -> EngineResult<Option<Month>> {
        Err(Error::InvalidData("month table unreadable".into()))
    }

    fn read_budget(&self, budget_id: BudgetId) -> EngineResult<Option<Budget>> {
        self.0.read_budget(budget_id)
    }
}

impl StorageWriter for Broken<'_> {
    fn write_partial_month(&self, b: BudgetId, p: YearMonth, s: &StartBalances) -> EngineResult<()> {
        self.0.write_partial_month(b, p, s)
    }

    fn write_budget_field(&self, b: BudgetId, f: &BudgetFields) -> EngineResult<()> {
        self.0.write_budget_field(b, f)
    }

    fn write_finalized_allocations(
        &self,
        b: BudgetId,
        p: YearMonth,
        a: &BTreeMap<CategoryId, Decimal>,
    ) -> EngineResult<()> {
        self.0.write_finalized_allocations(b, p, a)
    }
}

#[test]
fn guard_skips_repeat_passes_until_rearmed() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "1000", true);
    let food = add_category(&storage, budget_id, "Food", DefaultMonthlyType::Fixed, "0");
    spend(&storage, budget_id, checking, food, "2025-06-02", "-40");
    let now = ym(2025, 6);

    let mut engine = Engine::new(EngineConfig::default());
    let first = completed(engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap());
    assert_eq!(first.anchor, Some(Anchor::Oldest(now)));
    assert_eq!(engine.cache().state(budget_id), PassState::Done);

    let again = engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap();
    assert_eq!(again, PassReport::Skipped);

    let full = completed(engine.recalculate(&storage, budget_id, now, WalkMode::Full).unwrap());
    assert_eq!(full.months, first.months);
    // Food is overspent, so the whole account balance is unassigned
    assert_eq!(full.ready_to_assign, d("960"));

    let budget = engine.cache().budget(budget_id).unwrap();
    assert_eq!(budget.accounts.get(&checking).unwrap().balance, d("960"));
    assert_eq!(budget.categories.get(&food).unwrap().balance, d("-40"));
}

#[test]
fn stale_pass_is_discarded() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let home = storage.add_budget("Home").unwrap();
    let cabin = storage.add_budget("Cabin").unwrap();
    add_account(&storage, home, "Checking", "10", true);
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    engine.cache_mut().set_active_budget(home);
    let ticket = engine.begin(home).unwrap();
    assert!(engine.begin(home).is_none());
    let pass = engine.run(&storage, &ticket, now, WalkMode::Incremental).unwrap();
    engine.cache_mut().set_active_budget(cabin);
    assert!(!engine.commit(&ticket, pass));
    assert!(engine.cache().totals(home).is_none());
    assert_eq!(engine.cache().state(home), PassState::Idle);

    // Same budget, but invalidated while the pass ran
    engine.cache_mut().set_active_budget(home);
    let ticket = engine.begin(home).unwrap();
    let pass = engine.run(&storage, &ticket, now, WalkMode::Incremental).unwrap();
    engine.cache_mut().invalidate(home);
    assert!(!engine.commit(&ticket, pass));

    let summary = completed(engine.recalculate(&storage, home, now, WalkMode::Incremental).unwrap());
    assert_eq!(summary.ready_to_assign, d("10"));
    assert_eq!(engine.cache().active_budget(), Some(home));
}

#[test]
fn failed_pass_blocks_edits_until_retry() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "100", true);
    let food = add_category(&storage, budget_id, "Food", DefaultMonthlyType::Fixed, "0");
    spend(&storage, budget_id, checking, food, "2025-01-02", "-40");
    let now = ym(2025, 6);

    let broken = Broken(SqliteStorage::new(&conn));
    let mut engine = Engine::default();
    assert!(engine.recalculate(&broken, budget_id, now, WalkMode::Incremental).is_err());
    assert!(matches!(engine.cache().state(budget_id), PassState::Failed(_)));
    assert!(matches!(
        engine.cache().ensure_editable(budget_id),
        Err(Error::EditsBlocked(_))
    ));
    let err = engine
        .finalize_month(&storage, budget_id, now, now, &BTreeMap::new())
        .unwrap_err();
    assert!(matches!(err, Error::EditsBlocked(_)));

    engine.cache_mut().invalidate(budget_id);
    assert!(matches!(engine.cache().state(budget_id), PassState::Failed(_)));

    completed(engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap());
    assert!(engine.cache().ensure_editable(budget_id).is_ok());
}

#[test]
fn old_edit_rebuilds_from_the_oldest_month() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "1000", true);
    let food = add_category(&storage, budget_id, "Food", DefaultMonthlyType::Fixed, "0");
    spend(&storage, budget_id, checking, food, "2025-01-10", "-100");
    spend(&storage, budget_id, checking, food, "2025-02-10", "-50");
    spend(&storage, budget_id, checking, food, "2025-05-10", "-25");
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap();
    let june = engine.month(budget_id, now).unwrap();
    assert_eq!(june.account(checking).unwrap().end_balance, d("825"));

    spend(&storage, budget_id, checking, food, "2025-01-20", "-10");
    let summary = completed(engine.after_mutation(&storage, budget_id, ym(2025, 1), now).unwrap());
    assert_eq!(summary.anchor, Some(Anchor::Oldest(ym(2025, 1))));
    assert_eq!(summary.writes, 2);
    let june = engine.month(budget_id, now).unwrap();
    assert_eq!(june.account(checking).unwrap().end_balance, d("815"));

    let march = storage.read_month(budget_id, ym(2025, 3)).unwrap().unwrap();
    assert_eq!(march.stored_account_start(checking), Some(d("840")));

    // A recent edit keeps the stored anchor
    spend(&storage, budget_id, checking, food, "2025-06-01", "-5");
    let summary = completed(engine.after_mutation(&storage, budget_id, now, now).unwrap());
    assert_eq!(summary.anchor, Some(Anchor::Stored(ym(2025, 3))));
    assert_eq!(summary.writes, 0);
}

#[test]
fn finalizing_moves_the_allocation_into_the_carry() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "500", true);
    let fun = add_category(&storage, budget_id, "Fun", DefaultMonthlyType::Fixed, "100");
    spend(&storage, budget_id, checking, fun, "2025-05-10", "-20");
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap();
    let may = engine.month(budget_id, ym(2025, 5)).unwrap();
    // The draft allocation is shown but not part of the balance
    assert_eq!(may.category(fun).unwrap().draft_allocated, d("100"));
    assert_eq!(may.category(fun).unwrap().end_balance, d("-20"));
    let june = engine.month(budget_id, now).unwrap();
    assert_eq!(june.category(fun).unwrap().start_balance, d("-20"));

    let locked = engine
        .finalize_month(&storage, budget_id, ym(2025, 5), now, &BTreeMap::new())
        .unwrap();
    assert_eq!(locked.get(&fun), Some(&d("100")));
    let june = engine.month(budget_id, now).unwrap();
    assert_eq!(june.category(fun).unwrap().start_balance, d("80"));
    assert!(engine.month(budget_id, ym(2025, 5)).unwrap().are_allocations_finalized);
}

#[test]
fn finalized_month_ignores_months_back_change() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "0", true);
    let save = add_category(&storage, budget_id, "Save", DefaultMonthlyType::Percentage, "10");
    earn(&storage, budget_id, checking, "2025-03-01", "3000");
    earn(&storage, budget_id, checking, "2025-04-01", "2000");
    let now = ym(2025, 5);

    let mut engine = Engine::default();
    engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap();
    assert_eq!(
        engine.month(budget_id, ym(2025, 4)).unwrap().category(save).unwrap().draft_allocated,
        d("300")
    );
    assert_eq!(
        engine.month(budget_id, now).unwrap().category(save).unwrap().draft_allocated,
        d("200")
    );

    engine
        .finalize_month(&storage, budget_id, ym(2025, 4), now, &BTreeMap::new())
        .unwrap();
    engine
        .set_percentage_income_months_back(&storage, budget_id, 2, now)
        .unwrap();

    let april = engine.month(budget_id, ym(2025, 4)).unwrap();
    assert_eq!(april.category(save).unwrap().allocated, d("300"));
    let may = engine.month(budget_id, now).unwrap();
    assert_eq!(may.category(save).unwrap().draft_allocated, d("300"));
    assert_eq!(engine.cache().budget(budget_id).unwrap().percentage_income_months_back, 2);

    assert!(matches!(
        engine.set_percentage_income_months_back(&storage, budget_id, 0, now),
        Err(Error::InvalidData(_))
    ));
}

#[test]
fn all_time_totals_and_ready_to_assign() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "0", true);
    add_account(&storage, budget_id, "Brokerage", "5000", false);
    let rent = add_category(&storage, budget_id, "Rent", DefaultMonthlyType::Fixed, "600");
    let fun = add_category(&storage, budget_id, "Fun", DefaultMonthlyType::Fixed, "100");
    earn(&storage, budget_id, checking, "2025-05-01", "1000");
    spend(&storage, budget_id, checking, fun, "2025-05-12", "-150");
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    engine
        .finalize_month(&storage, budget_id, ym(2025, 5), now, &BTreeMap::new())
        .unwrap();
    let totals = engine.cache().totals(budget_id).unwrap();
    assert_eq!(totals.categories.get(&rent), Some(&d("600")));
    assert_eq!(totals.categories.get(&fun), Some(&d("-50")));
    assert_eq!(totals.accounts.get(&checking), Some(&d("850")));
    // Overspent Fun does not return money to the pool; Brokerage is off budget
    assert_eq!(totals.ready_to_assign, d("250"));

    // June is a draft month: its spending counts, its allocation does not
    spend(&storage, budget_id, checking, rent, "2025-06-01", "-600");
    engine.after_mutation(&storage, budget_id, now, now).unwrap();
    let totals = engine.cache().totals(budget_id).unwrap();
    assert_eq!(totals.categories.get(&rent), Some(&d("0")));
    assert_eq!(totals.accounts.get(&checking), Some(&d("250")));
    assert_eq!(totals.ready_to_assign, d("250"));

    let june = engine.month(budget_id, now).unwrap();
    assert_eq!(june.category(rent).unwrap().draft_allocated, d("600"));
    assert_eq!(june.category(rent).unwrap().end_balance, d("0"));
}

#[test]
fn draft_allocations_follow_the_rules() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "0", true);
    let rent = add_category(&storage, budget_id, "Rent", DefaultMonthlyType::Fixed, "500");
    let save = add_category(&storage, budget_id, "Save", DefaultMonthlyType::Percentage, "10");
    earn(&storage, budget_id, checking, "2025-05-03", "3000");

    let mut engine = Engine::default();
    let mut overrides = BTreeMap::new();
    overrides.insert(rent, d("550"));
    let drafts = engine
        .draft_allocations(&storage, budget_id, ym(2025, 6), &overrides)
        .unwrap();
    assert_eq!(drafts.get(&rent), Some(&d("550")));
    assert_eq!(drafts.get(&save), Some(&d("300")));

    // No income a month before July
    let drafts = engine
        .draft_allocations(&storage, budget_id, ym(2025, 7), &BTreeMap::new())
        .unwrap();
    assert_eq!(drafts.get(&save), Some(&Decimal::ZERO));
    assert_eq!(drafts.get(&rent), Some(&d("500")));
}

#[test]
fn refinalizing_keeps_locked_amounts() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    let checking = add_account(&storage, budget_id, "Checking", "0", true);
    let save = add_category(&storage, budget_id, "Save", DefaultMonthlyType::Percentage, "10");
    earn(&storage, budget_id, checking, "2025-03-01", "1000");
    earn(&storage, budget_id, checking, "2025-04-01", "3000");
    let may = ym(2025, 5);
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    let locked = engine
        .finalize_month(&storage, budget_id, may, now, &BTreeMap::new())
        .unwrap();
    assert_eq!(locked.get(&save), Some(&d("300")));

    engine
        .set_percentage_income_months_back(&storage, budget_id, 2, now)
        .unwrap();
    let again = engine
        .finalize_month(&storage, budget_id, may, now, &BTreeMap::new())
        .unwrap();
    assert_eq!(again.get(&save), Some(&d("300")));
    assert_eq!(engine.month(budget_id, may).unwrap().category(save).unwrap().allocated, d("300"));

    // Explicit amounts still replace the locked ones
    let mut overrides = BTreeMap::new();
    overrides.insert(save, d("250"));
    engine
        .finalize_month(&storage, budget_id, may, now, &overrides)
        .unwrap();
    assert_eq!(engine.month(budget_id, may).unwrap().category(save).unwrap().allocated, d("250"));
}

#[test]
fn category_transfers_and_adjustments_reach_all_time_totals() {
    let conn = setup();
    let storage = SqliteStorage::new(&conn);
    let budget_id = storage.add_budget("Home").unwrap();
    add_account(&storage, budget_id, "Checking", "0", true);
    let a = add_category(&storage, budget_id, "A", DefaultMonthlyType::Fixed, "0");
    let b = add_category(&storage, budget_id, "B", DefaultMonthlyType::Fixed, "0");
    storage
        .insert_transaction(
            budget_id,
            &Transaction::Transfer(Transfer {
                id: 0,
                amount: d("50"),
                from_account_id: None,
                to_account_id: None,
                from_category_id: Some(a),
                to_category_id: Some(b),
                date: date("2025-06-04"),
                description: None,
                cleared: false,
            }),
        )
        .unwrap();
    storage
        .insert_transaction(
            budget_id,
            &Transaction::Adjustment(Adjustment {
                id: 0,
                amount: d("-10"),
                account_id: None,
                category_id: Some(b),
                date: date("2025-06-05"),
                payee: None,
                description: None,
                cleared: false,
            }),
        )
        .unwrap();
    let now = ym(2025, 6);

    let mut engine = Engine::default();
    let summary = completed(engine.recalculate(&storage, budget_id, now, WalkMode::Incremental).unwrap());
    let totals = engine.cache().totals(budget_id).unwrap();
    assert_eq!(totals.categories.get(&a), Some(&d("-50")));
    assert_eq!(totals.categories.get(&b), Some(&d("40")));
    assert_eq!(summary.ready_to_assign, d("-40"));

    let june = engine.month(budget_id, now).unwrap();
    for balance in &june.category_balances {
        assert_eq!(totals.categories.get(&balance.category_id), Some(&balance.end_balance));
    }
}
