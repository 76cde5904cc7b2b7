// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Whole-database JSON backup and restore.

use crate::commands::{audit, transactions};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{AuditEntry, Counterparty, PartialPayment, Reminder, Task, Transaction};
use crate::utils::{decimal_col, now_stamp};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub const FORMAT: &str = "duebook-backup";
pub const VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backup {
    pub format: String,
    pub version: u32,
    pub exported_at: String,
    pub counterparties: Vec<Counterparty>,
    pub transactions: Vec<Transaction>,
    pub payments: Vec<PartialPayment>,
    pub tasks: Vec<Task>,
    pub reminders: Vec<Reminder>,
    pub audit: Vec<AuditEntry>,
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RestoreStats {
    pub counterparties: usize,
    pub transactions: usize,
    pub payments: usize,
    pub tasks: usize,
    pub reminders: usize,
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("export", sub)) => {
            let out = sub.get_one::<String>("out").unwrap().trim();
            let b = snapshot(conn)?;
            write_backup(&b, Path::new(out))?;
            println!(
                "Backed up {} transactions to {}",
                b.transactions.len(),
                out
            );
        }
        Some(("import", sub)) => {
            let path = sub.get_one::<String>("path").unwrap().trim();
            let b = read_backup(Path::new(path))?;
            let stats = restore(conn, &b)?;
            println!(
                "Restored {} counterparties, {} transactions, {} payments, {} tasks, {} reminders from {}",
                stats.counterparties,
                stats.transactions,
                stats.payments,
                stats.tasks,
                stats.reminders,
                path
            );
        }
        _ => {}
    }
    Ok(())
}

fn collect<T>(
    conn: &Connection,
    sql: &str,
    f: impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
) -> LedgerResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], f)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Everything, including cancelled and soft-deleted rows.
pub fn snapshot(conn: &Connection) -> LedgerResult<Backup> {
    let counterparties = collect(
        conn,
        "SELECT id, name, phone, note, created_at FROM counterparties ORDER BY id",
        |r| {
            Ok(Counterparty {
                id: r.get(0)?,
                name: r.get(1)?,
                phone: r.get(2)?,
                note: r.get(3)?,
                created_at: r.get(4)?,
            })
        },
    )?;
    let transactions = collect(
        conn,
        &format!("{} ORDER BY t.id", transactions::TX_SELECT),
        transactions::tx_from_row,
    )?;
    let payments = collect(
        conn,
        "SELECT id, transaction_id, amount, date, note FROM payments ORDER BY id",
        |r| {
            Ok(PartialPayment {
                id: r.get(0)?,
                transaction_id: r.get(1)?,
                amount: decimal_col(r, 2)?,
                date: r.get(3)?,
                note: r.get(4)?,
            })
        },
    )?;
    let tasks = collect(
        conn,
        "SELECT id, title, note, due_date, status, created_at, completed_at FROM tasks ORDER BY id",
        |r| {
            Ok(Task {
                id: r.get(0)?,
                title: r.get(1)?,
                note: r.get(2)?,
                due_date: r.get(3)?,
                status: r.get(4)?,
                created_at: r.get(5)?,
                completed_at: r.get(6)?,
            })
        },
    )?;
    let reminders = collect(
        conn,
        "SELECT id, title, note, due_at, status, transaction_id FROM reminders ORDER BY id",
        |r| {
            Ok(Reminder {
                id: r.get(0)?,
                title: r.get(1)?,
                note: r.get(2)?,
                due_at: r.get(3)?,
                status: r.get(4)?,
                transaction_id: r.get(5)?,
            })
        },
    )?;
    let audit = collect(
        conn,
        "SELECT id, at, entity, entity_id, action, detail FROM audit_log ORDER BY id",
        |r| {
            Ok(AuditEntry {
                id: r.get(0)?,
                at: r.get(1)?,
                entity: r.get(2)?,
                entity_id: r.get(3)?,
                action: r.get(4)?,
                detail: r.get(5)?,
            })
        },
    )?;
    let settings = collect(conn, "SELECT key, value FROM settings ORDER BY key", |r| {
        Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
    })?
    .into_iter()
    .collect();

    Ok(Backup {
        format: FORMAT.to_string(),
        version: VERSION,
        exported_at: now_stamp(),
        counterparties,
        transactions,
        payments,
        tasks,
        reminders,
        audit,
        settings,
    })
}

pub fn write_backup(b: &Backup, path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(b)?;
    std::fs::write(path, body).with_context(|| format!("Write backup {}", path.display()))?;
    info!(path = %path.display(), "backup written");
    Ok(())
}

pub fn read_backup(path: &Path) -> Result<Backup> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Read backup {}", path.display()))?;
    let b: Backup = serde_json::from_str(&raw)
        .with_context(|| format!("Parse backup {}", path.display()))?;
    Ok(b)
}

fn validate(b: &Backup) -> LedgerResult<()> {
    if b.format != FORMAT {
        return Err(LedgerError::Validation(format!(
            "Not a duebook backup (format '{}')",
            b.format
        )));
    }
    if b.version != VERSION {
        return Err(LedgerError::Validation(format!(
            "Unsupported backup version {} (expected {})",
            b.version, VERSION
        )));
    }
    if let Some(t) = b.transactions.iter().find(|t| t.base_amount <= Decimal::ZERO) {
        return Err(LedgerError::Validation(format!(
            "Transaction {} has non-positive amount {}",
            t.id, t.base_amount
        )));
    }
    if let Some(p) = b.payments.iter().find(|p| p.amount <= Decimal::ZERO) {
        return Err(LedgerError::Validation(format!(
            "Payment {} has non-positive amount {}",
            p.id, p.amount
        )));
    }
    Ok(())
}

/// Replaces the whole database with the backup inside one SQLite
/// transaction. Remaining dues are recomputed from the restored payments.
pub fn restore(conn: &mut Connection, b: &Backup) -> LedgerResult<RestoreStats> {
    validate(b)?;
    let tx = conn.transaction()?;
    tx.execute_batch(
        "DELETE FROM audit_log;
         DELETE FROM reminders;
         DELETE FROM payments;
         DELETE FROM transactions;
         DELETE FROM tasks;
         DELETE FROM counterparties;
         DELETE FROM settings;",
    )?;

    for c in &b.counterparties {
        tx.execute(
            "INSERT INTO counterparties(id, name, phone, note, created_at) VALUES (?1,?2,?3,?4,?5)",
            params![c.id, c.name, c.phone, c.note, c.created_at],
        )?;
    }
    for t in &b.transactions {
        tx.execute(
            "INSERT INTO transactions(id, counterparty_id, direction, kind, base_amount, remaining_due, status, date, note, cancelled, deleted, created_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12)",
            params![
                t.id,
                t.counterparty_id,
                t.direction,
                t.kind,
                t.base_amount.to_string(),
                t.remaining_due.to_string(),
                t.status,
                t.date,
                t.note,
                t.cancelled,
                t.deleted,
                t.created_at
            ],
        )?;
    }
    for p in &b.payments {
        tx.execute(
            "INSERT INTO payments(id, transaction_id, amount, date, note) VALUES (?1,?2,?3,?4,?5)",
            params![p.id, p.transaction_id, p.amount.to_string(), p.date, p.note],
        )?;
    }
    for t in &b.transactions {
        crate::commands::payments::recompute(&tx, t.id)?;
    }
    for t in &b.tasks {
        tx.execute(
            "INSERT INTO tasks(id, title, note, due_date, status, created_at, completed_at) VALUES (?1,?2,?3,?4,?5,?6,?7)",
            params![t.id, t.title, t.note, t.due_date, t.status, t.created_at, t.completed_at],
        )?;
    }
    for r in &b.reminders {
        tx.execute(
            "INSERT INTO reminders(id, title, note, due_at, status, transaction_id) VALUES (?1,?2,?3,?4,?5,?6)",
            params![r.id, r.title, r.note, r.due_at, r.status, r.transaction_id],
        )?;
    }
    for a in &b.audit {
        tx.execute(
            "INSERT INTO audit_log(id, at, entity, entity_id, action, detail) VALUES (?1,?2,?3,?4,?5,?6)",
            params![a.id, a.at, a.entity, a.entity_id, a.action, a.detail],
        )?;
    }
    for (k, v) in &b.settings {
        tx.execute(
            "INSERT INTO settings(key, value) VALUES (?1, ?2)",
            params![k, v],
        )?;
    }
    audit::record(
        &tx,
        "backup",
        0,
        "import",
        Some(&format!("exported_at {}", b.exported_at)),
    )?;
    tx.commit()?;

    let stats = RestoreStats {
        counterparties: b.counterparties.len(),
        transactions: b.transactions.len(),
        payments: b.payments.len(),
        tasks: b.tasks.len(),
        reminders: b.reminders.len(),
    };
    info!(?stats, "backup restored");
    Ok(stats)
}
