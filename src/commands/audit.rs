// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerResult;
use crate::models::AuditEntry;
use crate::utils::{maybe_print_json, now_stamp, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};

/// Append-only; nothing in the crate updates or deletes audit rows.
pub fn record(
    conn: &Connection,
    entity: &str,
    entity_id: i64,
    action: &str,
    detail: Option<&str>,
) -> LedgerResult<()> {
    conn.execute(
        "INSERT INTO audit_log(at, entity, entity_id, action, detail) VALUES (?1,?2,?3,?4,?5)",
        params![now_stamp(), entity, entity_id, action, detail],
    )?;
    tracing::debug!(entity, entity_id, action, "audit");
    Ok(())
}

pub fn list(conn: &Connection, entity: Option<&str>, limit: usize) -> LedgerResult<Vec<AuditEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, at, entity, entity_id, action, detail FROM audit_log
         WHERE ?1 IS NULL OR entity=?1
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![entity, limit as i64], |r| {
        Ok(AuditEntry {
            id: r.get(0)?,
            at: r.get(1)?,
            entity: r.get(2)?,
            entity_id: r.get(3)?,
            action: r.get(4)?,
            detail: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let entity = m.get_one::<String>("entity").map(|s| s.trim().to_lowercase());
    let limit = *m.get_one::<usize>("limit").unwrap_or(&50);
    let data = list(conn, entity.as_deref(), limit)?;
    if !maybe_print_json(m.get_flag("json"), m.get_flag("jsonl"), &data)? {
        let rows = data
            .into_iter()
            .map(|e| {
                vec![
                    e.id.to_string(),
                    e.at,
                    e.entity,
                    e.entity_id.to_string(),
                    e.action,
                    e.detail.unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "At", "Entity", "Entity ID", "Action", "Detail"], rows)
        );
    }
    Ok(())
}
