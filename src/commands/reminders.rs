// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{audit, transactions};
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Reminder, ReminderStatus};
use crate::utils::{clean_opt, maybe_print_json, parse_datetime, pretty_table};
use anyhow::Result;
use chrono::{NaiveDateTime, TimeDelta};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

const SELECT: &str = "SELECT id, title, note, due_at, status, transaction_id FROM reminders";

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let now = chrono::Local::now().naive_local();
    match m.subcommand() {
        Some(("add", sub)) => {
            let r = add(
                conn,
                sub.get_one::<String>("title").unwrap(),
                clean_opt(sub.get_one::<String>("note")).as_deref(),
                parse_datetime(sub.get_one::<String>("at").unwrap())?,
                sub.get_one::<i64>("tx").copied(),
            )?;
            println!("Reminder #{} set for {}", r.id, r.due_at);
        }
        Some(("list", sub)) => {
            let status = sub
                .get_one::<String>("status")
                .map(|s| s.parse::<ReminderStatus>())
                .transpose()?;
            print_list(sub, &list(conn, status)?)?;
        }
        Some(("due", sub)) => print_list(sub, &due(conn, now)?)?,
        Some(("done", sub)) => {
            let r = mark_done(conn, *sub.get_one::<i64>("id").unwrap())?;
            println!("Reminder #{} done", r.id);
        }
        Some(("snooze", sub)) => {
            let minutes = *sub.get_one::<i64>("minutes").unwrap_or(&60);
            let r = snooze(conn, *sub.get_one::<i64>("id").unwrap(), minutes, now)?;
            println!("Reminder #{} snoozed until {}", r.id, r.due_at);
        }
        _ => {}
    }
    Ok(())
}

fn print_list(sub: &clap::ArgMatches, data: &[Reminder]) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows = data
            .iter()
            .map(|r| {
                vec![
                    r.id.to_string(),
                    r.title.clone(),
                    r.due_at.format("%Y-%m-%d %H:%M").to_string(),
                    r.status.to_string(),
                    r.transaction_id.map(|t| t.to_string()).unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Title", "Due", "Status", "Tx"], rows)
        );
    }
    Ok(())
}

fn reminder_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: r.get(0)?,
        title: r.get(1)?,
        note: r.get(2)?,
        due_at: r.get(3)?,
        status: r.get(4)?,
        transaction_id: r.get(5)?,
    })
}

pub fn add(
    conn: &Connection,
    title: &str,
    note: Option<&str>,
    due_at: NaiveDateTime,
    transaction_id: Option<i64>,
) -> LedgerResult<Reminder> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LedgerError::Validation("Reminder title is empty".into()));
    }
    let tx = conn.unchecked_transaction()?;
    if let Some(tx_id) = transaction_id {
        transactions::get(&tx, tx_id)?;
    }
    tx.execute(
        "INSERT INTO reminders(title, note, due_at, status, transaction_id) VALUES (?1,?2,?3,?4,?5)",
        params![title, note, due_at, ReminderStatus::Upcoming, transaction_id],
    )?;
    let id = tx.last_insert_rowid();
    audit::record(&tx, "reminder", id, "create", Some(title))?;
    tx.commit()?;
    info!(id, %due_at, "added reminder");
    get(conn, id)
}

pub fn get(conn: &Connection, id: i64) -> LedgerResult<Reminder> {
    conn.query_row(&format!("{} WHERE id=?1", SELECT), params![id], reminder_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("reminder", id))
}

pub fn list(conn: &Connection, status: Option<ReminderStatus>) -> LedgerResult<Vec<Reminder>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE ?1 IS NULL OR status=?1 ORDER BY due_at, id",
        SELECT
    ))?;
    let rows = stmt.query_map(params![status], reminder_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Upcoming or snoozed reminders whose time has come.
pub fn due(conn: &Connection, now: NaiveDateTime) -> LedgerResult<Vec<Reminder>> {
    Ok(list(conn, None)?
        .into_iter()
        .filter(|r| r.status != ReminderStatus::Done && r.due_at <= now)
        .collect())
}

pub fn mark_done(conn: &Connection, id: i64) -> LedgerResult<Reminder> {
    let tx = conn.unchecked_transaction()?;
    if get(&tx, id)?.status == ReminderStatus::Done {
        return Err(LedgerError::Validation(format!(
            "Reminder {} is already done",
            id
        )));
    }
    tx.execute(
        "UPDATE reminders SET status=?2 WHERE id=?1",
        params![id, ReminderStatus::Done],
    )?;
    audit::record(&tx, "reminder", id, "done", None)?;
    tx.commit()?;
    get(conn, id)
}

/// Pushes the reminder to `max(due_at, now) + minutes`.
pub fn snooze(
    conn: &Connection,
    id: i64,
    minutes: i64,
    now: NaiveDateTime,
) -> LedgerResult<Reminder> {
    if minutes <= 0 {
        return Err(LedgerError::Validation(format!(
            "Snooze minutes must be positive, got {}",
            minutes
        )));
    }
    let tx = conn.unchecked_transaction()?;
    let r = get(&tx, id)?;
    if r.status == ReminderStatus::Done {
        return Err(LedgerError::Validation(format!(
            "Reminder {} is already done",
            id
        )));
    }
    let next = TimeDelta::try_minutes(minutes)
        .and_then(|d| r.due_at.max(now).checked_add_signed(d))
        .ok_or_else(|| {
            LedgerError::Validation(format!("Snooze of {} minutes is out of range", minutes))
        })?;
    tx.execute(
        "UPDATE reminders SET status=?2, due_at=?3 WHERE id=?1",
        params![id, ReminderStatus::Snoozed, next],
    )?;
    audit::record(
        &tx,
        "reminder",
        id,
        "snooze",
        Some(&format!("until {}", next)),
    )?;
    tx.commit()?;
    get(conn, id)
}
