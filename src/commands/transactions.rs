// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use super::Session;
use crate::models::{Adjustment, Expense, Income, Transaction};
use crate::period::{YearMonth, parse_month};
use crate::storage::StorageReader;
use crate::transfer::TransferDraft;
use crate::utils::{fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub, now)?,
        Some((kind, sub)) => {
            let mut session = Session::open(conn, now)?;
            session.ensure_editable()?;
            match kind {
                "income" | "expense" | "transfer" | "adjust" => {
                    let tx = build(&session, kind, sub)?;
                    let id = session.storage.insert_transaction(session.budget_id, &tx)?;
                    session.after_mutation(YearMonth::from_date(tx.date()))?;
                    println!(
                        "Recorded {} #{} of {} on {}",
                        tx.kind(),
                        id,
                        fmt_money(tx.amount()),
                        tx.date()
                    );
                }
                "rm" => {
                    let id = *sub.get_one::<i64>("id").unwrap();
                    let period = session.storage.delete_transaction(session.budget_id, id)?;
                    session.after_mutation(period)?;
                    println!("Removed transaction #{}", id);
                }
                _ => {}
            }
        }
        None => {}
    }
    Ok(())
}

/// Builds and validates a transaction from command-line arguments.
pub fn build(session: &Session<'_>, kind: &str, sub: &clap::ArgMatches) -> Result<Transaction> {
    let storage = &session.storage;
    let budget_id = session.budget_id;
    let date = parse_date(sub.get_one::<String>("date").unwrap())?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let note = sub.get_one::<String>("note").map(|s| s.to_string());
    let payee = sub.try_get_one::<String>("payee").ok().flatten().map(|s| s.to_string());
    let account = |arg: &str| -> Result<Option<i64>> {
        sub.get_one::<String>(arg)
            .map(|n| storage.account_id(budget_id, n.trim()))
            .transpose()
    };
    let category = |arg: &str| -> Result<Option<i64>> {
        sub.get_one::<String>(arg)
            .map(|n| storage.category_id(budget_id, n.trim()))
            .transpose()
    };

    let tx = match kind {
        "income" => {
            if amount <= Decimal::ZERO {
                anyhow::bail!("Income amount must be greater than zero");
            }
            Transaction::Income(Income {
                id: 0,
                amount,
                account_id: account("account")?.context("--account is required")?,
                date,
                payee,
                description: note,
                cleared: false,
            })
        }
        "expense" => Transaction::Expense(Expense {
            id: 0,
            amount,
            category_id: category("category")?.context("--category is required")?,
            account_id: account("account")?.context("--account is required")?,
            date,
            payee,
            description: note,
            cleared: false,
        }),
        "transfer" => {
            let mut draft = TransferDraft::new();
            draft
                .set_from_account(account("from-account")?)
                .set_to_account(account("to-account")?)
                .set_from_category(category("from-category")?)
                .set_to_category(category("to-category")?);
            Transaction::Transfer(draft.submit(0, amount, date, note)?)
        }
        "adjust" => {
            let account_id = account("account")?;
            let category_id = category("category")?;
            if account_id.is_none() && category_id.is_none() {
                anyhow::bail!("An adjustment needs an account, a category, or both");
            }
            Transaction::Adjustment(Adjustment {
                id: 0,
                amount,
                account_id,
                category_id,
                date,
                payee,
                description: note,
                cleared: false,
            })
        }
        other => anyhow::bail!("Unknown transaction kind '{}'", other),
    };
    Ok(tx)
}

#[derive(Serialize)]
pub struct TransactionRow {
    pub id: i64,
    pub date: String,
    pub kind: String,
    pub amount: String,
    pub account: String,
    pub category: String,
    pub payee: String,
    pub note: String,
}

pub fn query_rows(session: &Session<'_>, month: YearMonth) -> Result<Vec<TransactionRow>> {
    let budget = session.budget()?;
    let Some(stored) = session.storage.read_month(session.budget_id, month)? else {
        return Ok(Vec::new());
    };
    let account_name = |id: Option<i64>| -> String {
        id.map(|id| {
            budget
                .accounts
                .get(&id)
                .map(|a| a.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "-".to_string())
    };
    let category_name = |id: Option<i64>| -> String {
        id.map(|id| {
            budget
                .categories
                .get(&id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("#{}", id))
        })
        .unwrap_or_else(|| "-".to_string())
    };

    let mut data: Vec<TransactionRow> = stored
        .transactions()
        .into_iter()
        .map(|tx| {
            let (amount, account, category, payee, note) = match &tx {
                Transaction::Income(t) => (
                    t.amount,
                    account_name(Some(t.account_id)),
                    "-".to_string(),
                    t.payee.clone(),
                    t.description.clone(),
                ),
                Transaction::Expense(t) => (
                    t.amount,
                    account_name(Some(t.account_id)),
                    category_name(Some(t.category_id)),
                    t.payee.clone(),
                    t.description.clone(),
                ),
                Transaction::Transfer(t) => (
                    t.amount,
                    format!(
                        "{} -> {}",
                        account_name(t.from_account_id),
                        account_name(t.to_account_id)
                    ),
                    format!(
                        "{} -> {}",
                        category_name(t.from_category_id),
                        category_name(t.to_category_id)
                    ),
                    None,
                    t.description.clone(),
                ),
                Transaction::Adjustment(t) => (
                    t.amount,
                    account_name(t.account_id),
                    category_name(t.category_id),
                    t.payee.clone(),
                    t.description.clone(),
                ),
            };
            TransactionRow {
                id: tx.id(),
                date: tx.date().to_string(),
                kind: tx.kind().to_string(),
                amount: fmt_money(amount),
                account,
                category,
                payee: payee.unwrap_or_default(),
                note: note.unwrap_or_default(),
            }
        })
        .collect();
    data.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
    Ok(data)
}

fn list(conn: &Connection, sub: &clap::ArgMatches, now: YearMonth) -> Result<()> {
    let month = parse_month(sub.get_one::<String>("month").unwrap())?;
    let session = Session::open(conn, now)?;
    let data = query_rows(&session, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.date.clone(),
                    r.kind.clone(),
                    r.amount.clone(),
                    r.account.clone(),
                    r.category.clone(),
                    r.payee.clone(),
                    r.note.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "Amount", "Account", "Category", "Payee", "Note"],
                rows,
            )
        );
    }
    Ok(())
}
