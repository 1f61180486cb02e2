// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::db::SqliteStorage;
use crate::models::Account;
use crate::period::YearMonth;
use crate::utils::{fmt_money, get_active_budget, maybe_print_json, parse_decimal, pretty_table};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let budget_id = get_active_budget(conn)?;
            let storage = SqliteStorage::new(conn);
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let typ = sub.get_one::<String>("type").unwrap().trim().to_string();
            let group_id = sub
                .get_one::<String>("group")
                .map(|g| storage.add_account_group(budget_id, g.trim()))
                .transpose()?;
            let opening = parse_decimal(sub.get_one::<String>("opening").unwrap())?;
            let on_budget = !sub.get_flag("off-budget");
            storage.add_account(
                budget_id,
                &Account {
                    id: 0,
                    name: name.clone(),
                    r#type: typ.clone(),
                    group_id,
                    on_budget,
                    active: true,
                    opening_balance: opening,
                    balance: Decimal::ZERO,
                },
            )?;
            println!(
                "Added account '{}' ({}, {}) opening {}",
                name,
                typ,
                if on_budget { "on budget" } else { "off budget" },
                fmt_money(opening)
            );
        }
        Some(("list", sub)) => list(conn, sub, now)?,
        Some(("close", sub)) => {
            let budget_id = get_active_budget(conn)?;
            let name = sub.get_one::<String>("name").unwrap().trim();
            SqliteStorage::new(conn).set_account_active(budget_id, name, false)?;
            println!("Closed account '{}'", name);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct AccountRow {
    pub name: String,
    pub r#type: String,
    pub group: String,
    pub on_budget: bool,
    pub active: bool,
    pub balance: String,
}

pub fn rows(session: &Session<'_>) -> Result<Vec<AccountRow>> {
    let budget = session.budget()?;
    Ok(budget
        .accounts
        .values()
        .map(|a| AccountRow {
            name: a.name.clone(),
            r#type: a.r#type.clone(),
            group: a
                .group_id
                .and_then(|g| budget.account_groups.iter().find(|x| x.id == g))
                .map(|g| g.name.clone())
                .unwrap_or_default(),
            on_budget: a.on_budget,
            active: a.active,
            balance: fmt_money(a.balance),
        })
        .collect())
}

fn list(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let session = Session::open(conn, now)?;
    let data = rows(&session)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let table = data
            .iter()
            .map(|r| {
                vec![
                    r.name.clone(),
                    r.r#type.clone(),
                    r.group.clone(),
                    if r.on_budget { "yes" } else { "no" }.to_string(),
                    if r.active { "open" } else { "closed" }.to_string(),
                    r.balance.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Name", "Type", "Group", "On budget", "State", "Balance"],
                table
            )
        );
    }
    Ok(())
}
