// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::config::EngineConfig;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let rows = EngineConfig::load(conn)?
                .entries()
                .into_iter()
                .map(|(k, v)| vec![k.to_string(), v.to_string()])
                .collect();
            println!("{}", pretty_table(&["Setting", "Value"], rows));
        }
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            let value = *sub.get_one::<u32>("value").unwrap();
            EngineConfig::set(conn, key, value)?;
            println!("Set {} = {}", key, value);
        }
        _ => {}
    }
    Ok(())
}
