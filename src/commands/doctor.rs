// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::payments;
use crate::errors::LedgerResult;
use crate::ledger::Settlement;
use crate::utils::{decimal_col, pretty_table};
use anyhow::Result;
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: &'static str,
    pub detail: String,
    /// Transaction whose stored settlement can be rebuilt by `--fix`.
    pub fixable_tx: Option<i64>,
}

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    let issues = check(conn)?;
    if issues.is_empty() {
        println!("doctor: no issues found");
        return Ok(());
    }
    let rows = issues
        .iter()
        .map(|i| vec![i.kind.to_string(), i.detail.clone()])
        .collect();
    println!("{}", pretty_table(&["Issue", "Detail"], rows));
    if m.get_flag("fix") {
        let fixed = fix(conn, &issues)?;
        println!("Recomputed {} transaction(s)", fixed);
    }
    Ok(())
}

pub fn check(conn: &Connection) -> LedgerResult<Vec<Issue>> {
    let mut issues = Vec::new();

    // 1) Stored settlement disagreeing with the payments
    let mut stmt = conn.prepare(
        "SELECT id, base_amount, remaining_due, status, cancelled FROM transactions ORDER BY id",
    )?;
    let txs = stmt.query_map([], |r| {
        Ok((
            r.get::<_, i64>(0)?,
            decimal_col(r, 1)?,
            decimal_col(r, 2)?,
            r.get::<_, crate::models::TxStatus>(3)?,
            r.get::<_, bool>(4)?,
        ))
    })?;
    let mut amt_stmt = conn.prepare("SELECT amount FROM payments WHERE transaction_id=?1")?;
    for row in txs {
        let (id, base, stored_remaining, stored_status, cancelled) = row?;
        let amounts = amt_stmt
            .query_map(params![id], |r| decimal_col(r, 0))?
            .collect::<rusqlite::Result<Vec<Decimal>>>()?;
        let Ok(s) = Settlement::compute(base, &amounts, cancelled) else {
            issues.push(Issue {
                kind: "amount_out_of_range",
                detail: format!("tx {}: payments overflow the decimal range", id),
                fixable_tx: None,
            });
            continue;
        };
        if s.remaining != stored_remaining || s.status != stored_status {
            issues.push(Issue {
                kind: "stale_settlement",
                detail: format!(
                    "tx {}: stored {} {}, expected {} {}",
                    id, stored_remaining, stored_status, s.remaining, s.status
                ),
                fixable_tx: Some(id),
            });
        }
    }

    // 2) Payments without a transaction
    let mut stmt2 = conn.prepare(
        "SELECT p.id, p.transaction_id FROM payments p
         LEFT JOIN transactions t ON p.transaction_id=t.id WHERE t.id IS NULL",
    )?;
    let orphans = stmt2.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))?;
    for row in orphans {
        let (pid, tid) = row?;
        issues.push(Issue {
            kind: "orphan_payment",
            detail: format!("payment {} -> missing tx {}", pid, tid),
            fixable_tx: None,
        });
    }

    // 3) Open reminders pointing at deleted transactions
    let mut stmt3 = conn.prepare(
        "SELECT r.id, r.transaction_id FROM reminders r JOIN transactions t ON r.transaction_id=t.id
         WHERE t.deleted=1 AND r.status != 'DONE'",
    )?;
    let stale = stmt3.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)))?;
    for row in stale {
        let (rid, tid) = row?;
        issues.push(Issue {
            kind: "reminder_on_deleted_tx",
            detail: format!("reminder {} -> deleted tx {}", rid, tid),
            fixable_tx: None,
        });
    }

    Ok(issues)
}

pub fn fix(conn: &Connection, issues: &[Issue]) -> LedgerResult<usize> {
    let mut n = 0;
    for id in issues.iter().filter_map(|i| i.fixable_tx) {
        payments::recompute(conn, id)?;
        n += 1;
    }
    Ok(n)
}
