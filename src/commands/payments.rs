// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::{audit, transactions};
use crate::errors::{LedgerError, LedgerResult};
use crate::ledger::{self, Settlement};
use crate::models::{PartialPayment, TxStatus};
use crate::utils::{
    clean_opt, decimal_col, fmt_money, get_currency, maybe_print_json, parse_date, parse_decimal,
    pretty_table,
};
use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => {
            let tx_id = *sub.get_one::<i64>("tx").unwrap();
            let data = list_payments(conn, tx_id)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
                let ccy = get_currency(conn)?;
                let rows = data
                    .into_iter()
                    .map(|p| {
                        vec![
                            p.id.to_string(),
                            p.date.to_string(),
                            fmt_money(&p.amount, &ccy),
                            p.note.unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!("{}", pretty_table(&["ID", "Date", "Amount", "Note"], rows));
            }
        }
        Some(("rm", sub)) => {
            let id = *sub.get_one::<i64>("id").unwrap();
            let s = remove_payment(conn, id)?;
            println!("Removed payment {}; transaction now {} ({})", id, s.status, s.remaining);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub payment_id: i64,
    pub transaction_id: i64,
    pub remaining: Decimal,
    pub status: TxStatus,
    pub surplus: Option<Decimal>,
}

fn payment_amounts(conn: &Connection, tx_id: i64) -> LedgerResult<Vec<Decimal>> {
    let mut stmt = conn.prepare("SELECT amount FROM payments WHERE transaction_id=?1")?;
    let rows = stmt.query_map(params![tx_id], |r| decimal_col(r, 0))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

/// Applies a payment against a transaction's remaining due.
///
/// An overpayment is refused with [`LedgerError::Surplus`] unless
/// `allow_surplus` is set, in which case it is stored and the surplus is
/// reported in the outcome. Nothing is clamped.
pub fn add_payment(
    conn: &Connection,
    tx_id: i64,
    amount: Decimal,
    date: NaiveDate,
    note: Option<&str>,
    allow_surplus: bool,
) -> LedgerResult<PaymentOutcome> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "Payment must be positive, got {}",
            amount
        )));
    }
    let tx = conn.unchecked_transaction()?;
    let t = transactions::get(&tx, tx_id)?;
    if t.cancelled {
        return Err(LedgerError::Cancelled(tx_id));
    }

    let mut amounts = payment_amounts(&tx, tx_id)?;
    let before = ledger::remaining_due(t.base_amount, &amounts)?;
    if before <= Decimal::ZERO {
        return Err(LedgerError::AlreadySettled(tx_id));
    }
    amounts.push(amount);
    let settlement = Settlement::compute(t.base_amount, &amounts, false)?;
    if let Some(surplus) = settlement.surplus {
        if !allow_surplus {
            return Err(LedgerError::Surplus { surplus });
        }
        warn!(tx_id, %surplus, "overpayment accepted");
    }

    tx.execute(
        "INSERT INTO payments(transaction_id, amount, date, note) VALUES (?1, ?2, ?3, ?4)",
        params![tx_id, amount.to_string(), date, note],
    )?;
    let payment_id = tx.last_insert_rowid();
    store_settlement(&tx, tx_id, &settlement)?;
    audit::record(
        &tx,
        "payment",
        payment_id,
        "create",
        Some(&format!("tx {} amount {}", tx_id, amount)),
    )?;
    tx.commit()?;
    info!(tx_id, payment_id, %amount, remaining = %settlement.remaining, "payment applied");

    Ok(PaymentOutcome {
        payment_id,
        transaction_id: tx_id,
        remaining: settlement.remaining,
        status: settlement.status,
        surplus: settlement.surplus,
    })
}

fn store_settlement(conn: &Connection, tx_id: i64, s: &Settlement) -> LedgerResult<()> {
    conn.execute(
        "UPDATE transactions SET remaining_due=?2, status=?3 WHERE id=?1",
        params![tx_id, s.remaining.to_string(), s.status],
    )?;
    Ok(())
}

pub fn list_payments(conn: &Connection, tx_id: i64) -> LedgerResult<Vec<PartialPayment>> {
    transactions::get(conn, tx_id)?;
    let mut stmt = conn.prepare(
        "SELECT id, transaction_id, amount, date, note FROM payments
         WHERE transaction_id=?1 ORDER BY date, id",
    )?;
    let rows = stmt.query_map(params![tx_id], |r| {
        Ok(PartialPayment {
            id: r.get(0)?,
            transaction_id: r.get(1)?,
            amount: decimal_col(r, 2)?,
            date: r.get(3)?,
            note: r.get(4)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn remove_payment(conn: &Connection, payment_id: i64) -> LedgerResult<Settlement> {
    let tx = conn.unchecked_transaction()?;
    let tx_id: i64 = tx
        .query_row(
            "SELECT transaction_id FROM payments WHERE id=?1",
            params![payment_id],
            |r| r.get(0),
        )
        .optional()?
        .ok_or_else(|| LedgerError::not_found("payment", payment_id))?;
    let t = transactions::get(&tx, tx_id)?;
    if t.cancelled {
        return Err(LedgerError::Cancelled(tx_id));
    }
    tx.execute("DELETE FROM payments WHERE id=?1", params![payment_id])?;
    let s = recompute(&tx, tx_id)?;
    audit::record(
        &tx,
        "payment",
        payment_id,
        "delete",
        Some(&format!("tx {}", tx_id)),
    )?;
    tx.commit()?;
    Ok(s)
}

/// Rebuilds the stored remaining due and status from the payment rows.
pub fn recompute(conn: &Connection, tx_id: i64) -> LedgerResult<Settlement> {
    let t = transactions::get_any(conn, tx_id)?;
    let amounts = payment_amounts(conn, tx_id)?;
    let s = Settlement::compute(t.base_amount, &amounts, t.cancelled)?;
    store_settlement(conn, tx_id, &s)?;
    Ok(s)
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let tx_id = *sub.get_one::<i64>("tx").unwrap();
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap())?;
    let date = match sub.get_one::<String>("date") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    let note = clean_opt(sub.get_one::<String>("note"));
    let allow = sub.get_flag("allow_surplus");
    let ccy = get_currency(conn)?;
    let out = add_payment(conn, tx_id, amount, date, note.as_deref(), allow)?;
    println!(
        "Applied {} to #{}: remaining {}, {}",
        fmt_money(&amount, &ccy),
        tx_id,
        fmt_money(&out.remaining, &ccy),
        out.status
    );
    if let Some(s) = out.surplus {
        println!("Surplus of {} recorded as overpayment", fmt_money(&s, &ccy));
    }
    Ok(())
}
