// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::chain::WalkMode;
use crate::db::SqliteStorage;
use crate::engine::PassReport;
use crate::period::YearMonth;
use crate::utils::{fmt_money, pretty_table, set_active_budget};
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = SqliteStorage::new(conn).add_budget(name)?;
            set_active_budget(conn, id)?;
            println!("Added budget '{}' and made it active", name);
        }
        Some(("list", _)) => {
            let active = crate::utils::get_active_budget(conn).ok();
            let data = SqliteStorage::new(conn)
                .list_budgets()?
                .into_iter()
                .map(|(id, name)| {
                    let marker = if Some(id) == active { "*" } else { "" };
                    vec![marker.to_string(), name]
                })
                .collect();
            println!("{}", pretty_table(&["Active", "Budget"], data));
        }
        Some(("use", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let id = SqliteStorage::new(conn).budget_id_by_name(name)?;
            set_active_budget(conn, id)?;
            println!("Switched to budget '{}'", name);
        }
        Some(("months-back", sub)) => {
            let months = *sub.get_one::<u32>("months").unwrap();
            let mut session = Session::open(conn, now)?;
            session.engine.set_percentage_income_months_back(
                &session.storage,
                session.budget_id,
                months,
                now,
            )?;
            println!("Percentage allocations now use income from {} month(s) back", months);
        }
        _ => {}
    }
    Ok(())
}

pub fn recalc(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let mode = if m.get_flag("all") {
        WalkMode::Full
    } else {
        WalkMode::Incremental
    };
    let mut session = Session::open(conn, now)?;
    // Opening already ran an incremental pass; only a full rebuild runs again.
    let report = if mode == WalkMode::Full {
        session.recalculate(mode)?
    } else {
        PassReport::Skipped
    };
    let budget = session.budget()?;
    match report {
        PassReport::Completed(summary) => println!(
            "Rebuilt {} month(s) of '{}' ({} write(s)); ready to assign {}",
            summary.months,
            budget.name,
            summary.writes,
            fmt_money(summary.ready_to_assign)
        ),
        _ => {
            let ready = session
                .engine
                .cache()
                .totals(session.budget_id)
                .map(|t| t.ready_to_assign)
                .unwrap_or_default();
            println!(
                "Balances of '{}' are up to date; ready to assign {}",
                budget.name,
                fmt_money(ready)
            );
        }
    }
    Ok(())
}
