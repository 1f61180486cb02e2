// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::models::CategoryId;
use crate::period::{YearMonth, parse_month};
use crate::utils::{fmt_money, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(conn, sub, now)?,
        Some(("finalize", sub)) => finalize(conn, sub, now)?,
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct AllocationRow {
    pub category: String,
    pub allocated: String,
    pub finalized: bool,
}

fn show(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let mut session = Session::open(conn, now)?;
    let cached = session
        .engine
        .month(session.budget_id, month)
        .map(|m| {
            (
                m.are_allocations_finalized,
                m.category_balances
                    .iter()
                    .map(|b| (b.category_id, b.shown_allocation()))
                    .collect::<BTreeMap<_, _>>(),
            )
        });
    // Months outside the walked range still show what they would draft.
    let (finalized, amounts) = match cached {
        Some(found) => found,
        None => (
            false,
            session.engine.draft_allocations(
                &session.storage,
                session.budget_id,
                month,
                &BTreeMap::new(),
            )?,
        ),
    };
    let budget = session.budget()?;
    let data: Vec<AllocationRow> = budget
        .categories
        .values()
        .map(|c| AllocationRow {
            category: c.name.clone(),
            allocated: fmt_money(amounts.get(&c.id).copied().unwrap_or_default()),
            finalized,
        })
        .collect();
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let state = if finalized { "finalized" } else { "draft" };
        let rows = data
            .iter()
            .map(|r| vec![r.category.clone(), r.allocated.clone(), state.to_string()])
            .collect();
        println!("{}", pretty_table(&["Category", "Allocated", "State"], rows));
    }
    Ok(())
}

fn finalize(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let mut session = Session::open(conn, now)?;
    let overrides = parse_overrides(&session, sub)?;
    let locked = session.engine.finalize_month(
        &session.storage,
        session.budget_id,
        month,
        now,
        &overrides,
    )?;
    let total: Decimal = locked.values().copied().sum();
    println!(
        "Finalized {} allocation(s) for {} totalling {}",
        locked.len(),
        month,
        fmt_money(total)
    );
    Ok(())
}

fn parse_overrides(
    session: &Session<'_>,
    sub: &clap::ArgMatches,
) -> Result<BTreeMap<CategoryId, Decimal>> {
    let mut out = BTreeMap::new();
    if let Some(values) = sub.get_many::<String>("set") {
        for raw in values {
            let (name, amount) = raw
                .split_once('=')
                .with_context(|| format!("Invalid override '{}', expected CATEGORY=AMOUNT", raw))?;
            let id = session.storage.category_id(session.budget_id, name.trim())?;
            out.insert(id, parse_decimal(amount)?);
        }
    }
    Ok(out)
}
