// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};

/// Tunables of the recalculation engine, kept in the `settings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// K: calendar months behind the current one that stay inside the window.
    pub window_months_back: u32,
    /// Future months the all-time category walk looks ahead.
    pub forward_horizon: u32,
    /// Cap on the backward anchor search.
    pub max_backward_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_months_back: 3,
            forward_horizon: 3,
            max_backward_months: 120,
        }
    }
}

const KEYS: [&str; 3] = ["window_months_back", "forward_horizon", "max_backward_months"];

impl EngineConfig {
    pub fn load(conn: &Connection) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            window_months_back: get_u32(conn, KEYS[0])?.unwrap_or(defaults.window_months_back),
            forward_horizon: get_u32(conn, KEYS[1])?.unwrap_or(defaults.forward_horizon),
            max_backward_months: get_u32(conn, KEYS[2])?
                .unwrap_or(defaults.max_backward_months)
                .max(1),
        })
    }

    pub fn set(conn: &Connection, key: &str, value: u32) -> Result<()> {
        if !KEYS.contains(&key) {
            anyhow::bail!("Unknown setting '{}', expected one of {}", key, KEYS.join(", "));
        }
        set_setting(conn, key, &value.to_string())
    }

    pub fn entries(&self) -> Vec<(&'static str, u32)> {
        vec![
            (KEYS[0], self.window_months_back),
            (KEYS[1], self.forward_horizon),
            (KEYS[2], self.max_backward_months),
        ]
    }
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

fn get_u32(conn: &Connection, key: &str) -> Result<Option<u32>> {
    get_setting(conn, key)?
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .with_context(|| format!("Invalid value '{}' for setting {}", s, key))
        })
        .transpose()
}
