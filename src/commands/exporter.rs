// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::{self, TxFilter};
use crate::errors::LedgerError;
use anyhow::Result;
use rusqlite::Connection;
use serde_json::json;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("transactions", sub)) => export_transactions(conn, sub),
        _ => Ok(()),
    }
}

fn export_transactions(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap().trim();
    if fmt != "csv" && fmt != "json" {
        return Err(LedgerError::Validation(format!(
            "Unknown format: {} (use csv|json)",
            fmt
        ))
        .into());
    }

    let mut filter = TxFilter::from_matches(sub)?;
    filter.limit = None;
    let rows = transactions::list(conn, &filter)?;

    if fmt == "csv" {
        let mut wtr = csv::Writer::from_path(out)?;
        wtr.write_record([
            "id",
            "date",
            "counterparty",
            "direction",
            "kind",
            "amount",
            "remaining",
            "status",
            "note",
        ])?;
        for t in &rows {
            wtr.write_record([
                t.id.to_string(),
                t.date.to_string(),
                t.counterparty.clone(),
                t.direction.to_string(),
                t.kind.to_string(),
                t.base_amount.to_string(),
                t.remaining_due.to_string(),
                t.status.to_string(),
                t.note.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush()?;
    } else {
        let items: Vec<_> = rows
            .iter()
            .map(|t| {
                json!({
                    "id": t.id,
                    "date": t.date.to_string(),
                    "counterparty": t.counterparty,
                    "direction": t.direction.as_str(),
                    "kind": t.kind.as_str(),
                    "amount": t.base_amount.to_string(),
                    "remaining": t.remaining_due.to_string(),
                    "status": t.status.as_str(),
                    "note": t.note,
                })
            })
            .collect();
        std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
    }
    println!("Exported {} transactions to {}", rows.len(), out);
    Ok(())
}
