// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::EngineConfig;
use crate::db::SqliteStorage;
use crate::error::Error;
use crate::money;
use crate::period::YearMonth;
use crate::storage::StorageReader;
use crate::utils::{get_active_budget, pretty_table};
use crate::window::PersistenceWindow;
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

/// Read-only health checks. Nothing here runs a recalculation, so the
/// report reflects storage exactly as it is.
pub fn issues(conn: &Connection, now: YearMonth) -> Result<Vec<Vec<String>>> {
    let budget_id = get_active_budget(conn)?;
    let storage = SqliteStorage::new(conn);
    let mut rows = Vec::new();

    // 1) Amounts with sub-cent noise
    for (field, raw) in storage.stored_amounts(budget_id)? {
        let drift = match raw.trim().parse::<Decimal>() {
            Ok(d) => money::needs_fix(d).then(|| money::round(d)),
            Err(_) => match raw.trim().parse::<f64>() {
                Ok(f) if money::needs_fix_f64(f) => money::from_f64(f),
                Ok(_) => None,
                Err(_) => {
                    rows.push(vec!["unparseable_amount".into(), format!("{} = {}", field, raw)]);
                    None
                }
            },
        };
        if let Some(fixed) = drift {
            let err = Error::PrecisionDrift {
                field,
                value: raw.clone(),
            };
            rows.push(vec![
                "precision_drift".into(),
                format!("{} (rounds to {})", err, money::format(fixed)),
            ]);
        }
    }

    // 2) Window boundary without persisted starts
    let config = EngineConfig::load(conn)?;
    let boundary = PersistenceWindow::new(now, config.window_months_back).first_month();
    if let Some(budget) = storage.read_budget(budget_id)? {
        let anchored = storage
            .read_month(budget_id, boundary)?
            .is_some_and(|m| m.has_anchor());
        let has_history = budget.earliest_month().is_some_and(|e| e <= boundary);
        if has_history && !anchored {
            rows.push(vec![
                "missing_anchor".into(),
                format!("{} has no stored start balances; run `envelope recalc`", boundary),
            ]);
        }
    }
    Ok(rows)
}

pub fn handle(conn: &Connection, now: YearMonth) -> Result<()> {
    let rows = issues(conn, now)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
