// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::audit;
use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Task, TaskStatus};
use crate::utils::{clean_opt, maybe_print_json, now_stamp, parse_date, pretty_table};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let due = sub
                .get_one::<String>("due")
                .map(|s| parse_date(s))
                .transpose()?;
            let t = add(
                conn,
                sub.get_one::<String>("title").unwrap(),
                clean_opt(sub.get_one::<String>("note")).as_deref(),
                due,
            )?;
            println!("Added task #{} '{}'", t.id, t.title);
        }
        Some(("list", sub)) => {
            let status = sub
                .get_one::<String>("status")
                .map(|s| s.parse::<TaskStatus>())
                .transpose()?;
            let data = list(conn, status)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let rows = data
                    .into_iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            t.title,
                            t.due_date.map(|d| d.to_string()).unwrap_or_default(),
                            t.status.to_string(),
                            t.note.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["ID", "Title", "Due", "Status", "Note"], rows)
                );
            }
        }
        Some(("done", sub)) => {
            let t = complete(conn, *sub.get_one::<i64>("id").unwrap())?;
            println!("Completed task #{} '{}'", t.id, t.title);
        }
        Some(("cancel", sub)) => {
            let t = cancel(conn, *sub.get_one::<i64>("id").unwrap())?;
            println!("Cancelled task #{} '{}'", t.id, t.title);
        }
        Some(("reopen", sub)) => {
            let t = reopen(conn, *sub.get_one::<i64>("id").unwrap())?;
            println!("Reopened task #{} '{}'", t.id, t.title);
        }
        _ => {}
    }
    Ok(())
}

pub fn add(
    conn: &Connection,
    title: &str,
    note: Option<&str>,
    due_date: Option<NaiveDate>,
) -> LedgerResult<Task> {
    let title = title.trim();
    if title.is_empty() {
        return Err(LedgerError::Validation("Task title is empty".into()));
    }
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO tasks(title, note, due_date, status) VALUES (?1, ?2, ?3, ?4)",
        params![title, note, due_date, TaskStatus::Pending],
    )?;
    let id = tx.last_insert_rowid();
    audit::record(&tx, "task", id, "create", Some(title))?;
    tx.commit()?;
    info!(id, title, "added task");
    get(conn, id)
}

pub fn get(conn: &Connection, id: i64) -> LedgerResult<Task> {
    conn.query_row(
        "SELECT id, title, note, due_date, status, created_at, completed_at FROM tasks WHERE id=?1",
        params![id],
        task_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::not_found("task", id))
}

fn task_from_row(r: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: r.get(0)?,
        title: r.get(1)?,
        note: r.get(2)?,
        due_date: r.get(3)?,
        status: r.get(4)?,
        created_at: r.get(5)?,
        completed_at: r.get(6)?,
    })
}

/// Pending tasks sort by due date (undated last); others by id.
pub fn list(conn: &Connection, status: Option<TaskStatus>) -> LedgerResult<Vec<Task>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, note, due_date, status, created_at, completed_at FROM tasks
         WHERE ?1 IS NULL OR status=?1
         ORDER BY status='PENDING' DESC, due_date IS NULL, due_date, id",
    )?;
    let rows = stmt.query_map(params![status], task_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Moves a task along `Pending -> Completed | Cancelled`, or back to
/// `Pending` on reopen.
fn transition(conn: &Connection, id: i64, to: TaskStatus, action: &str) -> LedgerResult<Task> {
    let tx = conn.unchecked_transaction()?;
    match (get(&tx, id)?.status, to) {
        (TaskStatus::Pending, TaskStatus::Pending) => {
            return Err(LedgerError::Validation(format!(
                "Task {} is already pending",
                id
            )));
        }
        (TaskStatus::Completed, TaskStatus::Completed | TaskStatus::Cancelled) => {
            return Err(LedgerError::AlreadyCompleted(id));
        }
        (TaskStatus::Cancelled, TaskStatus::Completed | TaskStatus::Cancelled) => {
            return Err(LedgerError::TaskCancelled(id));
        }
        _ => {}
    }
    let completed_at = (to == TaskStatus::Completed).then(now_stamp);
    tx.execute(
        "UPDATE tasks SET status=?2, completed_at=?3 WHERE id=?1",
        params![id, to, completed_at],
    )?;
    audit::record(&tx, "task", id, action, None)?;
    tx.commit()?;
    get(conn, id)
}

pub fn complete(conn: &Connection, id: i64) -> LedgerResult<Task> {
    transition(conn, id, TaskStatus::Completed, "complete")
}

pub fn cancel(conn: &Connection, id: i64) -> LedgerResult<Task> {
    transition(conn, id, TaskStatus::Cancelled, "cancel")
}

pub fn reopen(conn: &Connection, id: i64) -> LedgerResult<Task> {
    transition(conn, id, TaskStatus::Pending, "reopen")
}
