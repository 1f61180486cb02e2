// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use envelope_ledger::allocation;
use envelope_ledger::calc::{Carryover, MonthInputs, recalculate_month};
use envelope_ledger::models::{
    Account, Budget, Category, DefaultMonthlyType, Expense, Income, Month, StoredCategoryBalance,
    Transfer,
};
use envelope_ledger::period::YearMonth;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn jan() -> YearMonth {
    YearMonth::new(2025, 1).unwrap()
}

fn account(id: i64, name: &str, opening: &str) -> Account {
    Account {
        id,
        name: name.into(),
        r#type: "checking".into(),
        group_id: None,
        on_budget: true,
        active: true,
        opening_balance: d(opening),
        balance: Decimal::ZERO,
    }
}

fn category(id: i64, name: &str, rule: DefaultMonthlyType, amount: &str) -> Category {
    Category {
        id,
        name: name.into(),
        group_id: None,
        default_monthly_amount: d(amount),
        default_monthly_type: rule,
        opening_balance: Decimal::ZERO,
        balance: Decimal::ZERO,
    }
}

fn setup() -> Budget {
    let mut b = Budget::new(1, "Home");
    b.accounts.insert(1, account(1, "Checking", "100"));
    b.accounts.insert(2, account(2, "Savings", "0"));
    b.categories
        .insert(1, category(1, "Groceries", DefaultMonthlyType::Fixed, "0"));
    b.categories
        .insert(2, category(2, "Fun", DefaultMonthlyType::Fixed, "0"));
    b
}

fn expense(id: i64, amount: &str, account_id: i64, category_id: i64) -> Expense {
    Expense {
        id,
        amount: d(amount),
        category_id,
        account_id,
        date: date("2025-01-05"),
        payee: None,
        description: None,
        cleared: false,
    }
}

fn income(id: i64, amount: &str, account_id: i64) -> Income {
    Income {
        id,
        amount: d(amount),
        account_id,
        date: date("2025-01-01"),
        payee: None,
        description: None,
        cleared: false,
    }
}

#[test]
fn expense_and_income_settle_the_account() {
    let budget = setup();
    let mut month = Month::empty(1, jan());
    month.expenses.push(expense(1, "-42.55", 1, 1));
    month.income.push(income(2, "10", 1));

    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    let checking = out.account(1).unwrap();
    assert_eq!(checking.start_balance(), d("100"));
    assert_eq!(checking.net_change, d("-32.55"));
    assert_eq!(checking.end_balance, d("67.45"));

    let groceries = out.category(1).unwrap();
    assert_eq!(groceries.spent, d("-42.55"));
    assert_eq!(groceries.end_balance, d("-42.55"));
    assert_eq!(out.total_income, d("10"));
    assert_eq!(out.total_expenses, d("-42.55"));
}

#[test]
fn carryover_overrides_opening_balance() {
    let budget = setup();
    let month = Month::empty(1, jan());
    let mut carry = Carryover::default();
    carry.accounts.insert(1, d("250.10"));
    carry.total_income = Some(d("1200"));

    let out = recalculate_month(&budget, &month, &carry, &MonthInputs::default());
    assert_eq!(out.account(1).unwrap().end_balance, d("250.10"));
    // Savings is not in the carryover, so it opens at its configured balance
    assert_eq!(out.account(2).unwrap().start_balance(), Decimal::ZERO);
    assert_eq!(out.previous_month_income, d("1200"));

    let pinned = MonthInputs {
        previous_month_income: Some(d("99")),
        months_back_income: Decimal::ZERO,
    };
    let out = recalculate_month(&budget, &month, &carry, &pinned);
    assert_eq!(out.previous_month_income, d("99"));
}

#[test]
fn fixed_rule_allocates_its_amount() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Rent", DefaultMonthlyType::Fixed, "500"));
    let month = Month::empty(1, jan());
    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    let rent = out.category(3).unwrap();
    assert_eq!(rent.draft_allocated, d("500"));
    assert_eq!(rent.shown_allocation(), d("500"));
    assert!(!rent.allocation_finalized);
    assert_eq!(rent.allocated, Decimal::ZERO);
    assert_eq!(rent.end_balance, Decimal::ZERO);
}

#[test]
fn percentage_rule_uses_income_from_months_back() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Savings goal", DefaultMonthlyType::Percentage, "10"));
    let month = Month::empty(1, jan());
    let inputs = MonthInputs {
        previous_month_income: None,
        months_back_income: d("3000"),
    };
    let out = recalculate_month(&budget, &month, &Carryover::default(), &inputs);
    assert_eq!(out.category(3).unwrap().draft_allocated, d("300"));
    assert_eq!(
        allocation::resolve(budget.categories.get(&3).unwrap(), d("1234.56")),
        d("123.46")
    );
}

#[test]
fn finalized_month_keeps_stored_allocation() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Rent", DefaultMonthlyType::Fixed, "500"));
    let mut month = Month::empty(1, jan());
    month.are_allocations_finalized = true;
    month.category_balances.push(StoredCategoryBalance {
        category_id: 3,
        start_balance: None,
        allocated: Some(d("450")),
    });

    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    let rent = out.category(3).unwrap();
    assert_eq!(rent.allocated, d("450"));
    assert_eq!(rent.draft_allocated, Decimal::ZERO);
    assert!(rent.allocation_finalized);
    assert_eq!(rent.end_balance, d("450"));
    // Categories without a stored row were not around at finalization
    assert_eq!(out.category(1).unwrap().allocated, Decimal::ZERO);
}

#[test]
fn draft_allocation_is_shown_but_not_carried() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Rent", DefaultMonthlyType::Fixed, "500"));
    let mut month = Month::empty(1, jan());
    month.expenses.push(expense(1, "-120", 1, 3));

    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    let rent = out.category(3).unwrap();
    assert_eq!(rent.shown_allocation(), d("500"));
    assert_eq!(rent.end_balance, d("-120"));

    let next = Carryover::after(&out);
    assert_eq!(next.categories.get(&3), Some(&d("-120")));
    assert_eq!(next.accounts.get(&1), Some(&d("-20")));
}

#[test]
fn unfinalized_months_chain_end_to_start() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Rent", DefaultMonthlyType::Fixed, "500"));
    let feb = jan().next();
    let mut first = Month::empty(1, jan());
    first.expenses.push(expense(1, "-100", 1, 3));
    let mut second = Month::empty(1, feb);
    second.expenses.push(expense(2, "-100", 1, 3));
    second.transfers.push(Transfer {
        id: 3,
        amount: d("30"),
        from_account_id: None,
        to_account_id: None,
        from_category_id: Some(1),
        to_category_id: Some(2),
        date: date("2025-02-09"),
        description: None,
        cleared: false,
    });

    let inputs = MonthInputs::default();
    let m1 = recalculate_month(&budget, &first, &Carryover::default(), &inputs);
    let m2 = recalculate_month(&budget, &second, &Carryover::after(&m1), &inputs);
    for b in &m2.category_balances {
        assert_eq!(Some(b.start_balance), m1.category(b.category_id).map(|p| p.end_balance));
    }
    for b in &m2.account_balances {
        assert_eq!(Some(b.start_balance()), m1.account(b.account_id()).map(|p| p.end_balance));
    }
    assert_eq!(m2.category(3).unwrap().end_balance, d("-200"));
    assert_eq!(m2.category(1).unwrap().end_balance, d("-30"));
}

#[test]
fn transfers_are_symmetric_and_conserve_money() {
    let budget = setup();
    let mut month = Month::empty(1, jan());
    month.income.push(income(1, "900", 1));
    month.expenses.push(expense(2, "-75.25", 1, 1));
    month.transfers.push(Transfer {
        id: 3,
        amount: d("50"),
        from_account_id: Some(1),
        to_account_id: Some(2),
        from_category_id: None,
        to_category_id: None,
        date: date("2025-01-09"),
        description: None,
        cleared: false,
    });
    month.transfers.push(Transfer {
        id: 4,
        amount: d("30"),
        from_account_id: None,
        to_account_id: None,
        from_category_id: Some(1),
        to_category_id: Some(2),
        date: date("2025-01-10"),
        description: None,
        cleared: false,
    });

    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    assert_eq!(out.account(1).unwrap().transfers, d("-50"));
    assert_eq!(out.account(2).unwrap().transfers, d("50"));
    assert_eq!(out.category(1).unwrap().transfers, d("-30"));
    assert_eq!(out.category(2).unwrap().transfers, d("30"));

    let start: Decimal = out.account_balances.iter().map(|b| b.start_balance()).sum();
    let end: Decimal = out.account_balances.iter().map(|b| b.end_balance).sum();
    assert_eq!(end, start + d("900") - d("75.25"));
    assert_eq!(end, d("924.75"));
}

#[test]
fn unknown_ids_in_transactions_still_get_a_balance() {
    let budget = setup();
    let mut month = Month::empty(1, jan());
    month.expenses.push(expense(1, "-5", 7, 9));
    let out = recalculate_month(&budget, &month, &Carryover::default(), &MonthInputs::default());
    assert_eq!(out.account(7).unwrap().end_balance, d("-5"));
    assert_eq!(out.category(9).unwrap().end_balance, d("-5"));
}

#[test]
fn draft_overrides_replace_rule_amounts() {
    let mut budget = setup();
    budget
        .categories
        .insert(3, category(3, "Rent", DefaultMonthlyType::Fixed, "500"));
    let mut overrides = BTreeMap::new();
    overrides.insert(3, d("650"));
    let drafts = allocation::draft_allocations(&budget, Decimal::ZERO, &overrides);
    assert_eq!(drafts.get(&3), Some(&d("650")));
    assert_eq!(drafts.get(&1), Some(&Decimal::ZERO));
    assert_eq!(drafts.len(), 3);

    budget.percentage_income_months_back = 0;
    assert_eq!(allocation::months_back(&budget), 1);
}
