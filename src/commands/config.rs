// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::{LedgerError, LedgerResult};
use crate::utils::{get_setting, pretty_table, set_setting};
use anyhow::Result;
use rusqlite::Connection;

/// Keys accepted by `config set`.
pub const KNOWN_KEYS: [&str; 1] = ["currency"];

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => {
            let key = sub.get_one::<String>("key").unwrap();
            let value = sub.get_one::<String>("value").unwrap();
            let stored = set(conn, key, value)?;
            println!("{} = {}", key.trim(), stored);
        }
        Some(("get", sub)) => {
            let key = sub.get_one::<String>("key").unwrap().trim();
            match get_setting(conn, key)? {
                Some(v) => println!("{}", v),
                None => println!("{} is not set", key),
            }
        }
        Some(("list", _)) => {
            let mut rows = Vec::new();
            for key in KNOWN_KEYS {
                rows.push(vec![
                    key.to_string(),
                    get_setting(conn, key)?.unwrap_or_default(),
                ]);
            }
            println!("{}", pretty_table(&["Key", "Value"], rows));
        }
        _ => {}
    }
    Ok(())
}

pub fn set(conn: &Connection, key: &str, value: &str) -> LedgerResult<String> {
    let key = key.trim();
    if !KNOWN_KEYS.contains(&key) {
        return Err(LedgerError::Validation(format!(
            "Unknown setting '{}' (known: {})",
            key,
            KNOWN_KEYS.join(", ")
        )));
    }
    let value = match key {
        "currency" => value.trim().to_uppercase(),
        _ => value.trim().to_string(),
    };
    if value.is_empty() {
        return Err(LedgerError::Validation(format!("Empty value for '{}'", key)));
    }
    set_setting(conn, key, &value)?;
    Ok(value)
}
