// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{audit, counterparties};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::LedgerLine;
use crate::models::{Direction, Transaction, TxKind, TxStatus};
use crate::utils::{
    clean_opt, decimal_col, get_currency, maybe_print_json, parse_date, parse_decimal,
    parse_month, pretty_table,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list_cmd(conn, sub)?,
        Some(("show", sub)) => show(conn, sub)?,
        Some(("cancel", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let tx = cancel(conn, id)?;
            println!("Cancelled transaction {} ({})", tx.id, tx.counterparty);
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            delete(conn, id)?;
            println!("Deleted transaction {}", id);
        }
        Some(("restore", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let tx = restore(conn, id)?;
            println!("Restored transaction {} ({})", tx.id, tx.status);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub counterparty: String,
    pub direction: Direction,
    pub kind: TxKind,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Creates the counterparty on first use. The new transaction starts with
/// `remaining_due == base_amount`, i.e. PENDING.
pub fn record(conn: &Connection, new: &NewTransaction) -> LedgerResult<Transaction> {
    if new.amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "Amount must be positive, got {}",
            new.amount
        )));
    }
    let name = new.counterparty.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("Counterparty name is empty".into()));
    }
    let tx = conn.unchecked_transaction()?;
    let cp_id = counterparties::ensure(&tx, name)?;
    tx.execute(
        "INSERT INTO transactions(counterparty_id, direction, kind, base_amount, remaining_due, status, date, note)
         VALUES (?1, ?2, ?3, ?4, ?4, ?5, ?6, ?7)",
        params![
            cp_id,
            new.direction,
            new.kind,
            new.amount.to_string(),
            TxStatus::Pending,
            new.date,
            new.note
        ],
    )?;
    let id = tx.last_insert_rowid();
    audit::record(
        &tx,
        "transaction",
        id,
        "create",
        Some(&format!("{} {} {}", new.direction, new.kind, new.amount)),
    )?;
    tx.commit()?;
    info!(id, counterparty = name, amount = %new.amount, "recorded transaction");
    get(conn, id)
}

pub(crate) const TX_SELECT: &str = "SELECT t.id, t.counterparty_id, c.name, t.direction, t.kind, t.base_amount, t.remaining_due, t.status, t.date, t.note, t.cancelled, t.deleted, t.created_at
     FROM transactions t JOIN counterparties c ON t.counterparty_id=c.id";

pub(crate) fn tx_from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        counterparty_id: r.get(1)?,
        counterparty: r.get(2)?,
        direction: r.get(3)?,
        kind: r.get(4)?,
        base_amount: decimal_col(r, 5)?,
        remaining_due: decimal_col(r, 6)?,
        status: r.get(7)?,
        date: r.get(8)?,
        note: r.get(9)?,
        cancelled: r.get(10)?,
        deleted: r.get(11)?,
        created_at: r.get(12)?,
    })
}

pub(crate) fn get_any(conn: &Connection, id: i64) -> LedgerResult<Transaction> {
    conn.query_row(&format!("{} WHERE t.id=?1", TX_SELECT), params![id], tx_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::not_found("transaction", id))
}

/// Cancelled transactions are returned; soft-deleted ones are not.
pub fn get(conn: &Connection, id: i64) -> LedgerResult<Transaction> {
    let tx = get_any(conn, id)?;
    if tx.deleted {
        return Err(LedgerError::not_found("transaction", id));
    }
    Ok(tx)
}

#[derive(Debug, Clone, Default)]
pub struct TxFilter {
    pub counterparty: Option<String>,
    pub direction: Option<Direction>,
    pub kind: Option<TxKind>,
    pub status: Option<TxStatus>,
    pub month: Option<(i32, u32)>,
    pub include_cancelled: bool,
    pub limit: Option<usize>,
}

impl TxFilter {
    pub fn from_matches(sub: &clap::ArgMatches) -> Result<Self> {
        Ok(TxFilter {
            counterparty: clean_opt(sub.get_one::<String>("counterparty")),
            direction: sub
                .get_one::<String>("direction")
                .map(|s| s.parse::<Direction>())
                .transpose()?,
            kind: sub
                .get_one::<String>("kind")
                .map(|s| s.parse::<TxKind>())
                .transpose()?,
            status: sub
                .get_one::<String>("status")
                .map(|s| s.parse::<TxStatus>())
                .transpose()?,
            month: sub
                .get_one::<String>("month")
                .map(|s| parse_month(s))
                .transpose()?,
            include_cancelled: sub.get_flag("include_cancelled"),
            limit: sub.get_one::<usize>("limit").copied(),
        })
    }
}

pub fn list(conn: &Connection, f: &TxFilter) -> LedgerResult<Vec<Transaction>> {
    let mut sql = format!("{} WHERE t.deleted=0", TX_SELECT);
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(cp) = &f.counterparty {
        sql.push_str(" AND c.name=?");
        params_vec.push(cp.clone());
    }
    if let Some(d) = f.direction {
        sql.push_str(" AND t.direction=?");
        params_vec.push(d.as_str().into());
    }
    if let Some(k) = f.kind {
        sql.push_str(" AND t.kind=?");
        params_vec.push(k.as_str().into());
    }
    if let Some(s) = f.status {
        sql.push_str(" AND t.status=?");
        params_vec.push(s.as_str().into());
    }
    if !f.include_cancelled && f.status != Some(TxStatus::Cancelled) {
        sql.push_str(" AND t.cancelled=0");
    }
    if let Some((y, m)) = f.month {
        sql.push_str(" AND substr(t.date,1,7)=?");
        params_vec.push(format!("{:04}-{:02}", y, m));
    }
    sql.push_str(" ORDER BY t.date DESC, t.id DESC");
    if let Some(limit) = f.limit {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params_vec.iter()), tx_from_row)?;
    let mut data = Vec::new();
    for row in rows {
        data.push(row?);
    }
    Ok(data)
}

pub fn cancel(conn: &Connection, id: i64) -> LedgerResult<Transaction> {
    let tx = conn.unchecked_transaction()?;
    if get(&tx, id)?.cancelled {
        return Err(LedgerError::Cancelled(id));
    }
    tx.execute(
        "UPDATE transactions SET cancelled=1, status=?2 WHERE id=?1",
        params![id, TxStatus::Cancelled],
    )?;
    audit::record(&tx, "transaction", id, "cancel", None)?;
    tx.commit()?;
    info!(id, "cancelled transaction");
    get(conn, id)
}

pub fn delete(conn: &Connection, id: i64) -> LedgerResult<()> {
    let tx = conn.unchecked_transaction()?;
    get(&tx, id)?;
    tx.execute("UPDATE transactions SET deleted=1 WHERE id=?1", params![id])?;
    audit::record(&tx, "transaction", id, "delete", None)?;
    tx.commit()?;
    info!(id, "soft-deleted transaction");
    Ok(())
}

pub fn restore(conn: &Connection, id: i64) -> LedgerResult<Transaction> {
    let tx = conn.unchecked_transaction()?;
    if !get_any(&tx, id)?.deleted {
        return Err(LedgerError::Validation(format!(
            "Transaction {} is not deleted",
            id
        )));
    }
    tx.execute("UPDATE transactions SET deleted=0 WHERE id=?1", params![id])?;
    audit::record(&tx, "transaction", id, "restore", None)?;
    tx.commit()?;
    get(conn, id)
}

/// Non-deleted transactions as kernel lines; cancelled ones are kept so the
/// kernel decides what to exclude.
pub fn ledger_lines(conn: &Connection, counterparty_id: Option<i64>) -> LedgerResult<Vec<LedgerLine>> {
    let mut stmt = conn.prepare(
        "SELECT c.name, t.direction, t.base_amount, t.remaining_due, t.date, t.cancelled
         FROM transactions t JOIN counterparties c ON t.counterparty_id=c.id
         WHERE t.deleted=0 AND (?1 IS NULL OR t.counterparty_id=?1)",
    )?;
    let rows = stmt.query_map(params![counterparty_id], |r| {
        Ok(LedgerLine {
            counterparty: r.get(0)?,
            direction: r.get(1)?,
            base: decimal_col(r, 2)?,
            remaining: decimal_col(r, 3)?,
            date: r.get(4)?,
            cancelled: r.get(5)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let new = NewTransaction {
        counterparty: sub.get_one::<String>("counterparty").unwrap().trim().to_string(),
        direction: sub.get_one::<String>("direction").unwrap().parse::<Direction>()?,
        kind: sub
            .get_one::<String>("kind")
            .map(|s| s.parse::<TxKind>())
            .transpose()?
            .unwrap_or(TxKind::Loan),
        amount: parse_decimal(sub.get_one::<String>("amount").unwrap())?,
        date: match sub.get_one::<String>("date") {
            Some(d) => parse_date(d)?,
            None => chrono::Local::now().date_naive(),
        },
        note: clean_opt(sub.get_one::<String>("note")),
    };
    let tx = record(conn, &new)?;
    println!(
        "Recorded #{}: {} {} {} with '{}' on {}",
        tx.id,
        tx.direction,
        tx.kind,
        tx.base_amount,
        tx.counterparty,
        tx.date
    );
    Ok(())
}

pub fn rows_for_display(data: &[Transaction], ccy: &str) -> Vec<Vec<String>> {
    data.iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.date.to_string(),
                t.counterparty.clone(),
                t.direction.to_string(),
                t.kind.to_string(),
                crate::utils::fmt_money(&t.base_amount, ccy),
                crate::utils::fmt_money(&t.remaining_due, ccy),
                t.status.to_string(),
                t.note.clone().unwrap_or_default(),
            ]
        })
        .collect()
}

pub const TX_HEADERS: [&str; 9] = [
    "ID",
    "Date",
    "Counterparty",
    "Direction",
    "Kind",
    "Amount",
    "Remaining",
    "Status",
    "Note",
];

fn list_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let filter = TxFilter::from_matches(sub)?;
    let data = list(conn, &filter)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let ccy = get_currency(conn)?;
        println!("{}", pretty_table(&TX_HEADERS, rows_for_display(&data, &ccy)));
    }
    Ok(())
}

fn show(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let id = *sub.get_one::<i64>("id").unwrap();
    let tx = get(conn, id)?;
    let payments = crate::commands::payments::list_payments(conn, id)?;
    if sub.get_flag("json") {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "transaction": tx,
                "payments": payments,
            }))?
        );
        return Ok(());
    }
    let ccy = get_currency(conn)?;
    println!("{}", pretty_table(&TX_HEADERS, rows_for_display(&[tx], &ccy)));
    if !payments.is_empty() {
        let rows = payments
            .into_iter()
            .map(|p| {
                vec![
                    p.id.to_string(),
                    p.date.to_string(),
                    crate::utils::fmt_money(&p.amount, &ccy),
                    p.note.unwrap_or_default(),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Payment", "Date", "Amount", "Note"], rows));
    }
    Ok(())
}
