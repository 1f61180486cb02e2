// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result as StoreResult};
use crate::models::{
    Account, Adjustment, Budget, BudgetId, Category, CategoryId, DefaultMonthlyType, Expense,
    Group, Income, Month, StoredAccountBalance, StoredCategoryBalance, Transaction, Transfer,
};
use crate::period::YearMonth;
use crate::storage::{BudgetFields, StartBalances, StorageReader, StorageWriter};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("com.alphavelocity", "EnvelopeLedger", "envelope-ledger"));

/// Overrides the platform data directory location of the database file.
pub const DB_ENV: &str = "ENVELOPE_LEDGER_DB";

pub fn db_path() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(DB_ENV) {
        return Ok(PathBuf::from(p));
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("envelope-ledger.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS budgets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        percentage_income_months_back INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS account_groups(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE(budget_id, name),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL,
        group_id INTEGER,
        on_budget INTEGER NOT NULL DEFAULT 1,
        active INTEGER NOT NULL DEFAULT 1,
        opening_balance TEXT NOT NULL DEFAULT '0',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE(budget_id, name),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
        FOREIGN KEY(group_id) REFERENCES account_groups(id) ON DELETE SET NULL
    );

    CREATE TABLE IF NOT EXISTS category_groups(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        sort_order INTEGER NOT NULL DEFAULT 0,
        UNIQUE(budget_id, name),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        group_id INTEGER,
        default_monthly_amount TEXT NOT NULL DEFAULT '0',
        default_monthly_type TEXT NOT NULL DEFAULT 'fixed'
            CHECK(default_monthly_type IN ('fixed','percentage')),
        opening_balance TEXT NOT NULL DEFAULT '0',
        UNIQUE(budget_id, name),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE,
        FOREIGN KEY(group_id) REFERENCES category_groups(id) ON DELETE SET NULL
    );

    -- month_map: which months exist for a budget, as YYYYMM ordinals
    CREATE TABLE IF NOT EXISTS budget_months(
        budget_id INTEGER NOT NULL,
        ym INTEGER NOT NULL,
        PRIMARY KEY(budget_id, ym),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS months(
        budget_id INTEGER NOT NULL,
        ym INTEGER NOT NULL,
        are_allocations_finalized INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY(budget_id, ym),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    -- Transfers use account_id/category_id as the "from" side.
    CREATE TABLE IF NOT EXISTS transactions(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        budget_id INTEGER NOT NULL,
        ym INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('income','expense','transfer','adjustment')),
        date TEXT NOT NULL,
        amount TEXT NOT NULL,
        account_id INTEGER,
        to_account_id INTEGER,
        category_id INTEGER,
        to_category_id INTEGER,
        payee TEXT,
        description TEXT,
        cleared INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_month ON transactions(budget_id, ym);

    -- Only start balances (and finalized allocations) are durable.
    CREATE TABLE IF NOT EXISTS month_account_balances(
        budget_id INTEGER NOT NULL,
        ym INTEGER NOT NULL,
        account_id INTEGER NOT NULL,
        start_balance TEXT NOT NULL,
        PRIMARY KEY(budget_id, ym, account_id),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS month_category_balances(
        budget_id INTEGER NOT NULL,
        ym INTEGER NOT NULL,
        category_id INTEGER NOT NULL,
        start_balance TEXT,
        allocated TEXT,
        PRIMARY KEY(budget_id, ym, category_id),
        FOREIGN KEY(budget_id) REFERENCES budgets(id) ON DELETE CASCADE
    );
    "#,
    )?;
    Ok(())
}

fn decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let s: String = r.get(idx)?;
    s.trim().parse::<Decimal>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn opt_decimal_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Decimal>> {
    let s: Option<String> = r.get(idx)?;
    s.map(|s| {
        s.trim().parse::<Decimal>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
    })
    .transpose()
}

fn date_at(r: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = r.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// [`StorageReader`]/[`StorageWriter`] over the SQLite schema above, plus
/// the record-keeping operations the CLI needs.
pub struct SqliteStorage<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStorage<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn conn(&self) -> &Connection {
        self.conn
    }

    pub fn add_budget(&self, name: &str) -> Result<BudgetId> {
        self.conn
            .execute("INSERT INTO budgets(name) VALUES (?1)", params![name])
            .with_context(|| format!("Budget '{}' already exists", name))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn budget_id_by_name(&self, name: &str) -> Result<BudgetId> {
        self.conn
            .query_row(
                "SELECT id FROM budgets WHERE name=?1",
                params![name],
                |r| r.get(0),
            )
            .with_context(|| format!("Budget '{}' not found", name))
    }

    pub fn add_account_group(&self, budget_id: BudgetId, name: &str) -> Result<i64> {
        group_id_or_insert(self.conn, "account_groups", budget_id, name)
    }

    pub fn add_category_group(&self, budget_id: BudgetId, name: &str) -> Result<i64> {
        group_id_or_insert(self.conn, "category_groups", budget_id, name)
    }

    pub fn add_account(&self, budget_id: BudgetId, account: &Account) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO accounts(budget_id, name, type, group_id, on_budget, active, opening_balance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                budget_id,
                account.name,
                account.r#type,
                account.group_id,
                account.on_budget,
                account.active,
                account.opening_balance.to_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn set_account_active(&self, budget_id: BudgetId, name: &str, active: bool) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE accounts SET active=?1 WHERE budget_id=?2 AND name=?3",
            params![active, budget_id, name],
        )?;
        if n == 0 {
            anyhow::bail!("Account '{}' not found", name);
        }
        Ok(())
    }

    pub fn add_category(&self, budget_id: BudgetId, category: &Category) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories(budget_id, name, group_id, default_monthly_amount, default_monthly_type, opening_balance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                budget_id,
                category.name,
                category.group_id,
                category.default_monthly_amount.to_string(),
                category.default_monthly_type.as_str(),
                category.opening_balance.to_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn account_id(&self, budget_id: BudgetId, name: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT id FROM accounts WHERE budget_id=?1 AND name=?2",
                params![budget_id, name],
                |r| r.get(0),
            )
            .with_context(|| format!("Account '{}' not found", name))
    }

    pub fn category_id(&self, budget_id: BudgetId, name: &str) -> Result<i64> {
        self.conn
            .query_row(
                "SELECT id FROM categories WHERE budget_id=?1 AND name=?2",
                params![budget_id, name],
                |r| r.get(0),
            )
            .with_context(|| format!("Category '{}' not found", name))
    }

    /// Records a transaction and makes sure its month exists. The id in
    /// `tx` is ignored; the new id is returned.
    pub fn insert_transaction(&self, budget_id: BudgetId, tx: &Transaction) -> Result<i64> {
        let period = YearMonth::from_date(tx.date());
        let (amount, account, to_account, category, to_category, payee, description, cleared) =
            match tx {
                Transaction::Income(t) => (
                    t.amount,
                    Some(t.account_id),
                    None,
                    None,
                    None,
                    t.payee.clone(),
                    t.description.clone(),
                    t.cleared,
                ),
                Transaction::Expense(t) => (
                    t.amount,
                    Some(t.account_id),
                    None,
                    Some(t.category_id),
                    None,
                    t.payee.clone(),
                    t.description.clone(),
                    t.cleared,
                ),
                Transaction::Transfer(t) => (
                    t.amount,
                    t.from_account_id,
                    t.to_account_id,
                    t.from_category_id,
                    t.to_category_id,
                    None,
                    t.description.clone(),
                    t.cleared,
                ),
                Transaction::Adjustment(t) => (
                    t.amount,
                    t.account_id,
                    None,
                    t.category_id,
                    None,
                    t.payee.clone(),
                    t.description.clone(),
                    t.cleared,
                ),
            };
        self.ensure_month(budget_id, period)?;
        self.conn.execute(
            "INSERT INTO transactions(budget_id, ym, kind, date, amount, account_id, to_account_id, category_id, to_category_id, payee, description, cleared)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                budget_id,
                period.ordinal(),
                tx.kind(),
                tx.date().to_string(),
                amount.to_string(),
                account,
                to_account,
                category,
                to_category,
                payee,
                description,
                cleared
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Deletes a transaction and returns the month it belonged to.
    pub fn delete_transaction(&self, budget_id: BudgetId, id: i64) -> Result<YearMonth> {
        let ym: u32 = self
            .conn
            .query_row(
                "SELECT ym FROM transactions WHERE budget_id=?1 AND id=?2",
                params![budget_id, id],
                |r| r.get(0),
            )
            .with_context(|| format!("Transaction {} not found", id))?;
        self.conn.execute(
            "DELETE FROM transactions WHERE budget_id=?1 AND id=?2",
            params![budget_id, id],
        )?;
        YearMonth::from_ordinal(ym).with_context(|| format!("Invalid month ordinal {}", ym))
    }

    /// Creates the month row and its month_map entry when missing.
    pub fn ensure_month(&self, budget_id: BudgetId, period: YearMonth) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO months(budget_id, ym) VALUES (?1, ?2)",
            params![budget_id, period.ordinal()],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO budget_months(budget_id, ym) VALUES (?1, ?2)",
            params![budget_id, period.ordinal()],
        )?;
        Ok(())
    }

    pub fn list_budgets(&self) -> Result<Vec<(BudgetId, String)>> {
        let mut stmt = self.conn.prepare("SELECT id, name FROM budgets ORDER BY name")?;
        let rows = stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Every stored amount, labelled, for precision sweeps.
    pub fn stored_amounts(&self, budget_id: BudgetId) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        let queries = [
            (
                "transaction",
                "SELECT id, amount FROM transactions WHERE budget_id=?1",
            ),
            (
                "account_start",
                "SELECT ym || ':' || account_id, start_balance FROM month_account_balances WHERE budget_id=?1",
            ),
            (
                "category_start",
                "SELECT ym || ':' || category_id, start_balance FROM month_category_balances WHERE budget_id=?1 AND start_balance IS NOT NULL",
            ),
            (
                "allocated",
                "SELECT ym || ':' || category_id, allocated FROM month_category_balances WHERE budget_id=?1 AND allocated IS NOT NULL",
            ),
        ];
        for (label, sql) in queries {
            let mut stmt = self.conn.prepare(sql)?;
            let mut rows = stmt.query(params![budget_id])?;
            while let Some(r) = rows.next()? {
                let key: rusqlite::types::Value = r.get(0)?;
                let value: String = r.get(1)?;
                let key = match key {
                    rusqlite::types::Value::Integer(i) => i.to_string(),
                    rusqlite::types::Value::Text(s) => s,
                    other => format!("{:?}", other),
                };
                out.push((format!("{} {}", label, key), value));
            }
        }
        Ok(out)
    }

    fn read_transactions(&self, budget_id: BudgetId, period: YearMonth, month: &mut Month) -> StoreResult<()> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, kind, date, amount, account_id, to_account_id, category_id, to_category_id, payee, description, cleared
             FROM transactions WHERE budget_id=?1 AND ym=?2 ORDER BY date, id",
        )?;
        let mut rows = stmt.query(params![budget_id, period.ordinal()])?;
        while let Some(r) = rows.next()? {
            let id: i64 = r.get(0)?;
            let kind: String = r.get(1)?;
            let date = date_at(r, 2)?;
            let amount = decimal_at(r, 3)?;
            let account_id: Option<i64> = r.get(4)?;
            let to_account_id: Option<i64> = r.get(5)?;
            let category_id: Option<i64> = r.get(6)?;
            let to_category_id: Option<i64> = r.get(7)?;
            let payee: Option<String> = r.get(8)?;
            let description: Option<String> = r.get(9)?;
            let cleared: bool = r.get(10)?;
            match kind.as_str() {
                "income" => month.income.push(Income {
                    id,
                    amount,
                    account_id: account_id
                        .ok_or_else(|| Error::InvalidData(format!("income {} has no account", id)))?,
                    date,
                    payee,
                    description,
                    cleared,
                }),
                "expense" => month.expenses.push(Expense {
                    id,
                    amount,
                    category_id: category_id.ok_or_else(|| {
                        Error::InvalidData(format!("expense {} has no category", id))
                    })?,
                    account_id: account_id.ok_or_else(|| {
                        Error::InvalidData(format!("expense {} has no account", id))
                    })?,
                    date,
                    payee,
                    description,
                    cleared,
                }),
                "transfer" => month.transfers.push(Transfer {
                    id,
                    amount,
                    from_account_id: account_id,
                    to_account_id,
                    from_category_id: category_id,
                    to_category_id,
                    date,
                    description,
                    cleared,
                }),
                "adjustment" => month.adjustments.push(Adjustment {
                    id,
                    amount,
                    account_id,
                    category_id,
                    date,
                    payee,
                    description,
                    cleared,
                }),
                other => {
                    return Err(Error::InvalidData(format!(
                        "transaction {} has unknown kind '{}'",
                        id, other
                    )));
                }
            }
        }
        Ok(())
    }
}

fn group_id_or_insert(conn: &Connection, table: &str, budget_id: BudgetId, name: &str) -> Result<i64> {
    let select = format!("SELECT id FROM {} WHERE budget_id=?1 AND name=?2", table);
    if let Some(id) = conn
        .query_row(&select, params![budget_id, name], |r| r.get(0))
        .optional()?
    {
        return Ok(id);
    }
    let insert = format!(
        "INSERT INTO {}(budget_id, name, sort_order)
         VALUES (?1, ?2, (SELECT IFNULL(MAX(sort_order), -1) + 1 FROM {} WHERE budget_id=?1))",
        table, table
    );
    conn.execute(&insert, params![budget_id, name])?;
    Ok(conn.last_insert_rowid())
}

fn read_groups(conn: &Connection, table: &str, budget_id: BudgetId) -> StoreResult<Vec<Group>> {
    let sql = format!(
        "SELECT id, name, sort_order FROM {} WHERE budget_id=?1 ORDER BY sort_order, id",
        table
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![budget_id], |r| {
        Ok(Group {
            id: r.get(0)?,
            name: r.get(1)?,
            sort_order: r.get(2)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

impl StorageReader for SqliteStorage<'_> {
    fn read_month(&self, budget_id: BudgetId, period: YearMonth) -> StoreResult<Option<Month>> {
        let finalized: Option<bool> = self
            .conn
            .query_row(
                "SELECT are_allocations_finalized FROM months WHERE budget_id=?1 AND ym=?2",
                params![budget_id, period.ordinal()],
                |r| r.get(0),
            )
            .optional()?;
        let Some(finalized) = finalized else {
            return Ok(None);
        };

        let mut month = Month::empty(budget_id, period);
        month.are_allocations_finalized = finalized;
        self.read_transactions(budget_id, period, &mut month)?;

        let mut stmt = self.conn.prepare_cached(
            "SELECT account_id, start_balance FROM month_account_balances
             WHERE budget_id=?1 AND ym=?2 ORDER BY account_id",
        )?;
        let rows = stmt.query_map(params![budget_id, period.ordinal()], |r| {
            Ok(StoredAccountBalance {
                account_id: r.get(0)?,
                start_balance: decimal_at(r, 1)?,
            })
        })?;
        for row in rows {
            month.account_balances.push(row?);
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT category_id, start_balance, allocated FROM month_category_balances
             WHERE budget_id=?1 AND ym=?2 ORDER BY category_id",
        )?;
        let rows = stmt.query_map(params![budget_id, period.ordinal()], |r| {
            Ok(StoredCategoryBalance {
                category_id: r.get(0)?,
                start_balance: opt_decimal_at(r, 1)?,
                allocated: opt_decimal_at(r, 2)?,
            })
        })?;
        for row in rows {
            month.category_balances.push(row?);
        }
        Ok(Some(month))
    }

    fn read_budget(&self, budget_id: BudgetId) -> StoreResult<Option<Budget>> {
        let head: Option<(String, u32)> = self
            .conn
            .query_row(
                "SELECT name, percentage_income_months_back FROM budgets WHERE id=?1",
                params![budget_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .optional()?;
        let Some((name, months_back)) = head else {
            return Ok(None);
        };
        let mut budget = Budget::new(budget_id, name);
        budget.percentage_income_months_back = months_back;

        let mut stmt = self.conn.prepare(
            "SELECT id, name, type, group_id, on_budget, active, opening_balance
             FROM accounts WHERE budget_id=?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![budget_id], |r| {
            Ok(Account {
                id: r.get(0)?,
                name: r.get(1)?,
                r#type: r.get(2)?,
                group_id: r.get(3)?,
                on_budget: r.get(4)?,
                active: r.get(5)?,
                opening_balance: decimal_at(r, 6)?,
                balance: Decimal::ZERO,
            })
        })?;
        for row in rows {
            let a = row?;
            budget.accounts.insert(a.id, a);
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, name, group_id, default_monthly_amount, default_monthly_type, opening_balance
             FROM categories WHERE budget_id=?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![budget_id], |r| {
            let rule: String = r.get(4)?;
            Ok((
                Category {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    group_id: r.get(2)?,
                    default_monthly_amount: decimal_at(r, 3)?,
                    default_monthly_type: DefaultMonthlyType::Fixed,
                    opening_balance: decimal_at(r, 5)?,
                    balance: Decimal::ZERO,
                },
                rule,
            ))
        })?;
        for row in rows {
            let (mut c, rule) = row?;
            c.default_monthly_type = DefaultMonthlyType::parse(&rule).ok_or_else(|| {
                Error::InvalidData(format!("category {} has unknown rule '{}'", c.id, rule))
            })?;
            budget.categories.insert(c.id, c);
        }

        budget.account_groups = read_groups(self.conn, "account_groups", budget_id)?;
        budget.category_groups = read_groups(self.conn, "category_groups", budget_id)?;

        let mut stmt = self
            .conn
            .prepare("SELECT ym FROM budget_months WHERE budget_id=?1")?;
        let rows = stmt.query_map(params![budget_id], |r| r.get::<_, u32>(0))?;
        for row in rows {
            budget.month_map.insert(row?);
        }
        Ok(Some(budget))
    }
}

impl StorageWriter for SqliteStorage<'_> {
    fn write_partial_month(
        &self,
        budget_id: BudgetId,
        period: YearMonth,
        starts: &StartBalances,
    ) -> StoreResult<()> {
        let ym = period.ordinal();
        self.conn.execute(
            "INSERT OR IGNORE INTO months(budget_id, ym) VALUES (?1, ?2)",
            params![budget_id, ym],
        )?;
        for (account_id, start) in &starts.accounts {
            self.conn.execute(
                "INSERT INTO month_account_balances(budget_id, ym, account_id, start_balance)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(budget_id, ym, account_id) DO UPDATE SET start_balance=excluded.start_balance",
                params![budget_id, ym, account_id, start.to_string()],
            )?;
        }
        for (category_id, start) in &starts.categories {
            self.conn.execute(
                "INSERT INTO month_category_balances(budget_id, ym, category_id, start_balance)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(budget_id, ym, category_id) DO UPDATE SET start_balance=excluded.start_balance",
                params![budget_id, ym, category_id, start.to_string()],
            )?;
        }
        Ok(())
    }

    fn write_budget_field(&self, budget_id: BudgetId, fields: &BudgetFields) -> StoreResult<()> {
        if let Some(n) = fields.percentage_income_months_back {
            self.conn.execute(
                "UPDATE budgets SET percentage_income_months_back=?1 WHERE id=?2",
                params![n, budget_id],
            )?;
        }
        if let Some(map) = &fields.month_map {
            let stored: BTreeSet<u32> = {
                let mut stmt = self
                    .conn
                    .prepare("SELECT ym FROM budget_months WHERE budget_id=?1")?;
                let rows = stmt.query_map(params![budget_id], |r| r.get::<_, u32>(0))?;
                let mut set = BTreeSet::new();
                for row in rows {
                    set.insert(row?);
                }
                set
            };
            for ym in stored.difference(map) {
                self.conn.execute(
                    "DELETE FROM budget_months WHERE budget_id=?1 AND ym=?2",
                    params![budget_id, ym],
                )?;
            }
            for ym in map.difference(&stored) {
                self.conn.execute(
                    "INSERT INTO budget_months(budget_id, ym) VALUES (?1, ?2)",
                    params![budget_id, ym],
                )?;
            }
        }
        Ok(())
    }

    fn write_finalized_allocations(
        &self,
        budget_id: BudgetId,
        period: YearMonth,
        allocations: &BTreeMap<CategoryId, Decimal>,
    ) -> StoreResult<()> {
        let ym = period.ordinal();
        self.conn.execute(
            "INSERT INTO months(budget_id, ym, are_allocations_finalized) VALUES (?1, ?2, 1)
             ON CONFLICT(budget_id, ym) DO UPDATE SET are_allocations_finalized=1",
            params![budget_id, ym],
        )?;
        self.conn.execute(
            "INSERT OR IGNORE INTO budget_months(budget_id, ym) VALUES (?1, ?2)",
            params![budget_id, ym],
        )?;
        for (category_id, amount) in allocations {
            self.conn.execute(
                "INSERT INTO month_category_balances(budget_id, ym, category_id, allocated)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(budget_id, ym, category_id) DO UPDATE SET allocated=excluded.allocated",
                params![budget_id, ym, category_id, amount.to_string()],
            )?;
        }
        Ok(())
    }
}
