// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::models::RecalculatedMonth;
use crate::period::{YearMonth, parse_month};
use crate::utils::{fmt_money, maybe_print_json, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn status(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let session = Session::open(conn, now)?;
    let recalculated = session.engine.month(session.budget_id, month).with_context(|| {
        format!(
            "Month {} is outside the recalculated range of the active budget",
            month
        )
    })?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), recalculated)? {
        return Ok(());
    }
    print_month(&session, recalculated)
}

fn print_month(session: &Session<'_>, month: &RecalculatedMonth) -> Result<()> {
    let budget = session.budget()?;
    let account_rows = month
        .account_balances
        .iter()
        .map(|b| {
            let name = budget
                .accounts
                .get(&b.account_id())
                .map(|a| a.name.clone())
                .unwrap_or_else(|| format!("#{}", b.account_id()));
            vec![
                name,
                fmt_money(b.start_balance()),
                fmt_money(b.income),
                fmt_money(b.expenses),
                fmt_money(b.transfers),
                fmt_money(b.adjustments),
                fmt_money(b.end_balance),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Account", "Start", "Income", "Expenses", "Transfers", "Adjust", "End"],
            account_rows
        )
    );

    let state = if month.are_allocations_finalized {
        "finalized"
    } else {
        "draft"
    };
    let category_rows = month
        .category_balances
        .iter()
        .map(|b| {
            let name = budget
                .categories
                .get(&b.category_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", b.category_id));
            vec![
                name,
                fmt_money(b.start_balance),
                fmt_money(b.shown_allocation()),
                fmt_money(b.spent),
                fmt_money(b.transfers),
                fmt_money(b.adjustments),
                fmt_money(b.end_balance),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Start", "Allocated", "Spent", "Transfers", "Adjust", "End"],
            category_rows
        )
    );
    println!(
        "{}: income {}, expenses {}, allocations {}",
        month.period,
        fmt_money(month.total_income),
        fmt_money(month.total_expenses),
        state
    );
    Ok(())
}

#[derive(Serialize)]
pub struct ReadySummary {
    pub budget: String,
    pub ready_to_assign: Decimal,
    pub categories: Vec<CategoryAvailable>,
}

#[derive(Serialize)]
pub struct CategoryAvailable {
    pub name: String,
    pub available: Decimal,
}

pub fn ready_summary(session: &Session<'_>) -> Result<ReadySummary> {
    let budget = session.budget()?;
    let totals = session
        .engine
        .cache()
        .totals(session.budget_id)
        .context("No completed recalculation for the active budget")?;
    let categories = budget
        .categories
        .values()
        .map(|c| CategoryAvailable {
            name: c.name.clone(),
            available: totals.categories.get(&c.id).copied().unwrap_or(c.balance),
        })
        .collect();
    Ok(ReadySummary {
        budget: budget.name.clone(),
        ready_to_assign: totals.ready_to_assign,
        categories,
    })
}

pub fn ready(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let session = Session::open(conn, now)?;
    let summary = ready_summary(&session)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
        let rows = summary
            .categories
            .iter()
            .map(|c| vec![c.name.clone(), fmt_money(c.available)])
            .collect();
        println!("{}", pretty_table(&["Category", "Available"], rows));
        println!(
            "Ready to assign in '{}': {}",
            summary.budget,
            fmt_money(summary.ready_to_assign)
        );
    }
    Ok(())
}
