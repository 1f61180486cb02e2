// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::{get_setting, set_setting};
use crate::models::BudgetId;
use crate::period::YearMonth;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    let d = s
        .trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))?;
    if crate::money::needs_fix(d) {
        anyhow::bail!("Amount '{}' has more than two decimal places", s.trim());
    }
    Ok(d)
}

pub fn fmt_money(d: Decimal) -> String {
    crate::money::format(d)
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// The month every command treats as "now": `--today` when given, else the
/// local date.
pub fn current_month(m: &clap::ArgMatches) -> Result<YearMonth> {
    let today = match m.get_one::<String>("today") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    Ok(YearMonth::from_date(today))
}

// Active budget settings
pub fn get_active_budget(conn: &Connection) -> Result<BudgetId> {
    let v = get_setting(conn, "active_budget")?
        .context("No active budget; run `envelope budget add --name <NAME>` first")?;
    let id: BudgetId = v
        .parse()
        .with_context(|| format!("Invalid active_budget setting '{}'", v))?;
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM budgets WHERE id=?1)",
        params![id],
        |r| r.get(0),
    )?;
    if !exists {
        anyhow::bail!("Active budget {} no longer exists", id);
    }
    Ok(id)
}

pub fn set_active_budget(conn: &Connection, id: BudgetId) -> Result<()> {
    set_setting(conn, "active_budget", &id.to_string())
}
