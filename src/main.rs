// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use envelope_ledger::{cli, commands, db, utils};

fn main() -> Result<()> {
    let cli = cli::build_cli();
    let matches = cli.get_matches();

    // Priority: RUST_LOG env var > --verbose flag > default (warn)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if matches.get_flag("verbose") {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let conn = db::open_or_init()?;
    let now = utils::current_month(&matches)?;

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path()?.display());
        }
        Some(("config", sub)) => commands::settings::handle(&conn, sub)?,
        Some(("budget", sub)) => commands::budgets::handle(&conn, sub, now)?,
        Some(("account", sub)) => commands::accounts::handle(&conn, sub, now)?,
        Some(("category", sub)) => commands::categories::handle(&conn, sub, now)?,
        Some(("tx", sub)) => commands::transactions::handle(&conn, sub, now)?,
        Some(("alloc", sub)) => commands::allocations::handle(&conn, sub, now)?,
        Some(("recalc", sub)) => commands::budgets::recalc(&conn, sub, now)?,
        Some(("status", sub)) => commands::reports::status(&conn, sub, now)?,
        Some(("ready", sub)) => commands::reports::ready(&conn, sub, now)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn, now)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
