// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::db::SqliteStorage;
use crate::models::{Category, DefaultMonthlyType};
use crate::period::YearMonth;
use crate::utils::{fmt_money, get_active_budget, maybe_print_json, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let budget_id = get_active_budget(conn)?;
            let storage = SqliteStorage::new(conn);
            let name = sub.get_one::<String>("name").unwrap().trim().to_string();
            let group_id = sub
                .get_one::<String>("group")
                .map(|g| storage.add_category_group(budget_id, g.trim()))
                .transpose()?;
            let rule_s = sub.get_one::<String>("rule").unwrap();
            let rule = DefaultMonthlyType::parse(rule_s)
                .with_context(|| format!("Invalid rule '{}'", rule_s))?;
            let default = parse_decimal(sub.get_one::<String>("default").unwrap())?;
            let opening = parse_decimal(sub.get_one::<String>("opening").unwrap())?;
            storage.add_category(
                budget_id,
                &Category {
                    id: 0,
                    name: name.clone(),
                    group_id,
                    default_monthly_amount: default,
                    default_monthly_type: rule,
                    opening_balance: opening,
                    balance: Decimal::ZERO,
                },
            )?;
            let rule_desc = match rule {
                DefaultMonthlyType::Fixed => format!("{} per month", fmt_money(default)),
                DefaultMonthlyType::Percentage => format!("{}% of income", default),
            };
            println!("Added category '{}' ({})", name, rule_desc);
        }
        Some(("list", sub)) => {
            let session = Session::open(conn, now)?;
            let budget = session.budget()?;
            let data: Vec<CategoryRow> = budget
                .categories
                .values()
                .map(|c| CategoryRow {
                    name: c.name.clone(),
                    group: c
                        .group_id
                        .and_then(|g| budget.category_groups.iter().find(|x| x.id == g))
                        .map(|g| g.name.clone())
                        .unwrap_or_default(),
                    rule: c.default_monthly_type.as_str().to_string(),
                    default: c.default_monthly_amount.to_string(),
                    available: fmt_money(c.balance),
                })
                .collect();
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .iter()
                    .map(|r| {
                        vec![
                            r.name.clone(),
                            r.group.clone(),
                            r.rule.clone(),
                            r.default.clone(),
                            r.available.clone(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Category", "Group", "Rule", "Default", "Available"], rows)
                );
            }
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct CategoryRow {
    pub name: String,
    pub group: String,
    pub rule: String,
    pub default: String,
    pub available: String,
}
