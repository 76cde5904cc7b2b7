// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{audit, transactions};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger;
use crate::models::{Counterparty, Transaction};
use crate::utils::{
    clean_opt, fmt_money, get_currency, id_for_counterparty, maybe_print_json, pretty_table,
};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let cp = add(
                conn,
                sub.get_one::<String>("name").unwrap(),
                clean_opt(sub.get_one::<String>("phone")).as_deref(),
                clean_opt(sub.get_one::<String>("note")).as_deref(),
            )?;
            println!("Added counterparty '{}'", cp.name);
        }
        Some(("list", sub)) => {
            let data = list(conn)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let ccy = get_currency(conn)?;
                let rows = data
                    .iter()
                    .map(|b| {
                        vec![
                            b.name.clone(),
                            b.phone.clone().unwrap_or_default(),
                            b.open.to_string(),
                            fmt_money(&b.net, &ccy),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Name", "Phone", "Open", "Net (+ owes you)"], rows)
                );
            }
        }
        Some(("balance", sub)) => {
            let st = statement(conn, sub.get_one::<String>("name").unwrap())?;
            if !maybe_print_json(sub.get_flag("json"), false, &st)? {
                let ccy = get_currency(conn)?;
                println!(
                    "{}",
                    pretty_table(
                        &transactions::TX_HEADERS,
                        transactions::rows_for_display(&st.transactions, &ccy)
                    )
                );
                let verdict = if st.net > Decimal::ZERO {
                    format!("{} owes you {}", st.name, fmt_money(&st.net, &ccy))
                } else if st.net < Decimal::ZERO {
                    format!("You owe {} {}", st.name, fmt_money(&st.net.abs(), &ccy))
                } else {
                    format!("All square with {}", st.name)
                };
                println!("{}", verdict);
            }
        }
        Some(("rename", sub)) => {
            let from = sub.get_one::<String>("from").unwrap();
            let to = sub.get_one::<String>("to").unwrap();
            rename(conn, from, to)?;
            println!("Renamed '{}' to '{}'", from.trim(), to.trim());
        }
        Some(("rm", sub)) => {
            let name = sub.get_one::<String>("name").unwrap();
            remove(conn, name)?;
            println!("Removed counterparty '{}'", name.trim());
        }
        _ => {}
    }
    Ok(())
}

fn validate_name(name: &str) -> LedgerResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("Counterparty name is empty".into()));
    }
    Ok(name)
}

pub fn add(
    conn: &Connection,
    name: &str,
    phone: Option<&str>,
    note: Option<&str>,
) -> LedgerResult<Counterparty> {
    let tx = conn.unchecked_transaction()?;
    let id = insert(&tx, name, phone, note)?;
    tx.commit()?;
    info!(id, name = name.trim(), "added counterparty");
    find(conn, name)?.ok_or_else(|| LedgerError::not_found("counterparty", name.trim()))
}

fn insert(conn: &Connection, name: &str, phone: Option<&str>, note: Option<&str>) -> LedgerResult<i64> {
    let name = validate_name(name)?;
    if find(conn, name)?.is_some() {
        return Err(LedgerError::Duplicate(format!("Counterparty '{}'", name)));
    }
    conn.execute(
        "INSERT INTO counterparties(name, phone, note) VALUES (?1, ?2, ?3)",
        params![name, phone, note],
    )?;
    let id = conn.last_insert_rowid();
    audit::record(conn, "counterparty", id, "create", Some(name))?;
    Ok(id)
}

/// Id of the named counterparty, creating it when missing. Runs inside the
/// caller's transaction.
pub(crate) fn ensure(conn: &Connection, name: &str) -> LedgerResult<i64> {
    let name = validate_name(name)?;
    match find(conn, name)? {
        Some(cp) => Ok(cp.id),
        None => {
            let id = insert(conn, name, None, None)?;
            info!(id, name, "added counterparty");
            Ok(id)
        }
    }
}

pub fn find(conn: &Connection, name: &str) -> LedgerResult<Option<Counterparty>> {
    Ok(conn
        .query_row(
            "SELECT id, name, phone, note, created_at FROM counterparties WHERE name=?1",
            params![name.trim()],
            |r| {
                Ok(Counterparty {
                    id: r.get(0)?,
                    name: r.get(1)?,
                    phone: r.get(2)?,
                    note: r.get(3)?,
                    created_at: r.get(4)?,
                })
            },
        )
        .optional()?)
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterpartyBalance {
    pub name: String,
    pub phone: Option<String>,
    /// Non-cancelled transactions that still carry a positive remaining due.
    pub open: usize,
    pub net: Decimal,
}

pub fn list(conn: &Connection) -> LedgerResult<Vec<CounterpartyBalance>> {
    let mut stmt = conn.prepare("SELECT id, name, phone FROM counterparties ORDER BY name")?;
    let cps = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            r.get::<_, String>(1)?,
            r.get::<_, Option<String>>(2)?,
        ))
    })?;
    let mut out = Vec::new();
    for cp in cps {
        let (id, name, phone) = cp?;
        let lines = transactions::ledger_lines(conn, Some(id))?;
        let open = lines
            .iter()
            .filter(|l| !l.cancelled && l.remaining > Decimal::ZERO)
            .count();
        out.push(CounterpartyBalance {
            name,
            phone,
            open,
            net: ledger::net_balance(&lines)?,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub name: String,
    pub net: Decimal,
    pub owed_to_me: Decimal,
    pub i_owe: Decimal,
    pub transactions: Vec<Transaction>,
}

pub fn statement(conn: &Connection, name: &str) -> LedgerResult<Statement> {
    let id = id_for_counterparty(conn, name)?;
    let totals = ledger::totals_by_direction(&transactions::ledger_lines(conn, Some(id))?)?;
    let txs = transactions::list(
        conn,
        &transactions::TxFilter {
            counterparty: Some(name.trim().to_string()),
            include_cancelled: true,
            ..Default::default()
        },
    )?;
    Ok(Statement {
        name: name.trim().to_string(),
        net: totals.net()?,
        owed_to_me: totals.owed_to_me,
        i_owe: totals.i_owe,
        transactions: txs,
    })
}

pub fn rename(conn: &Connection, from: &str, to: &str) -> LedgerResult<()> {
    let tx = conn.unchecked_transaction()?;
    let id = id_for_counterparty(&tx, from)?;
    let to = validate_name(to)?;
    if find(&tx, to)?.is_some() {
        return Err(LedgerError::Duplicate(format!("Counterparty '{}'", to)));
    }
    tx.execute(
        "UPDATE counterparties SET name=?1 WHERE id=?2",
        params![to, id],
    )?;
    audit::record(
        &tx,
        "counterparty",
        id,
        "rename",
        Some(&format!("{} -> {}", from.trim(), to)),
    )?;
    tx.commit()?;
    Ok(())
}

/// Refused while live transactions reference the counterparty.
pub fn remove(conn: &Connection, name: &str) -> LedgerResult<()> {
    let tx = conn.unchecked_transaction()?;
    let id = id_for_counterparty(&tx, name)?;
    let live: i64 = tx.query_row(
        "SELECT COUNT(*) FROM transactions WHERE counterparty_id=?1 AND deleted=0",
        params![id],
        |r| r.get(0),
    )?;
    if live > 0 {
        return Err(LedgerError::Validation(format!(
            "Counterparty '{}' still has {} transaction(s)",
            name.trim(),
            live
        )));
    }
    tx.execute(
        "DELETE FROM payments WHERE transaction_id IN (SELECT id FROM transactions WHERE counterparty_id=?1)",
        params![id],
    )?;
    tx.execute(
        "UPDATE reminders SET transaction_id=NULL WHERE transaction_id IN (SELECT id FROM transactions WHERE counterparty_id=?1)",
        params![id],
    )?;
    tx.execute("DELETE FROM transactions WHERE counterparty_id=?1", params![id])?;
    tx.execute("DELETE FROM counterparties WHERE id=?1", params![id])?;
    audit::record(&tx, "counterparty", id, "delete", Some(name.trim()))?;
    tx.commit()?;
    Ok(())
}
