// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::commands::transactions::ledger_lines;
use crate::errors::LedgerResult;
use crate::ledger::{self, MonthSummary, Totals};
use crate::utils::{fmt_money, get_currency, maybe_print_json, parse_month, pretty_table};
use anyhow::Result;
use chrono::Datelike;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("summary", sub)) => summary_cmd(conn, sub)?,
        Some(("monthly", sub)) => monthly_cmd(conn, sub)?,
        Some(("by-counterparty", sub)) => by_counterparty_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

pub fn summary(conn: &Connection) -> LedgerResult<Totals> {
    ledger::totals_by_direction(&ledger_lines(conn, None)?)
}

pub fn monthly(conn: &Connection, year: i32, month: u32) -> LedgerResult<MonthSummary> {
    ledger::month_summary(&ledger_lines(conn, None)?, year, month)
}

/// Summaries for every month that has at least one live transaction,
/// newest first.
pub fn monthly_history(conn: &Connection, months: usize) -> LedgerResult<Vec<MonthSummary>> {
    let lines = ledger_lines(conn, None)?;
    let mut keys: Vec<(i32, u32)> = lines
        .iter()
        .filter(|l| !l.cancelled)
        .map(|l| (l.date.year(), l.date.month()))
        .collect();
    keys.sort_unstable();
    keys.dedup();
    keys.into_iter()
        .rev()
        .take(months)
        .map(|(y, m)| ledger::month_summary(&lines, y, m))
        .collect()
}

#[derive(Debug, Clone, Serialize)]
pub struct CounterpartyNet {
    pub counterparty: String,
    pub net: Decimal,
}

/// Largest absolute exposure first; zero balances are dropped.
pub fn by_counterparty(conn: &Connection) -> LedgerResult<Vec<CounterpartyNet>> {
    let mut out: Vec<CounterpartyNet> = ledger::balances_by_counterparty(&ledger_lines(conn, None)?)?
        .into_iter()
        .filter(|(_, net)| !net.is_zero())
        .map(|(counterparty, net)| CounterpartyNet { counterparty, net })
        .collect();
    out.sort_by(|a, b| {
        b.net
            .abs()
            .cmp(&a.net.abs())
            .then_with(|| a.counterparty.cmp(&b.counterparty))
    });
    Ok(out)
}

fn summary_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let t = summary(conn)?;
    #[derive(Serialize)]
    struct Out {
        owed_to_me: Decimal,
        i_owe: Decimal,
        net: Decimal,
    }
    let out = Out {
        owed_to_me: t.owed_to_me,
        i_owe: t.i_owe,
        net: t.net()?,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &out)? {
        let ccy = get_currency(conn)?;
        println!(
            "{}",
            pretty_table(
                &["Owed to me", "I owe", "Net"],
                vec![vec![
                    fmt_money(&out.owed_to_me, &ccy),
                    fmt_money(&out.i_owe, &ccy),
                    fmt_money(&out.net, &ccy),
                ]],
            )
        );
    }
    Ok(())
}

fn monthly_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = match sub.get_one::<String>("month") {
        Some(m) => {
            let (y, mo) = parse_month(m)?;
            vec![monthly(conn, y, mo)?]
        }
        None => monthly_history(conn, *sub.get_one::<usize>("months").unwrap_or(&12))?,
    };
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let ccy = get_currency(conn)?;
        let rows = data
            .iter()
            .map(|s| {
                Ok(vec![
                    s.month.clone(),
                    s.gave.count.to_string(),
                    fmt_money(&s.gave.base, &ccy),
                    fmt_money(&s.gave.remaining, &ccy),
                    s.received.count.to_string(),
                    fmt_money(&s.received.base, &ccy),
                    fmt_money(&s.received.remaining, &ccy),
                    fmt_money(&s.net()?, &ccy),
                ])
            })
            .collect::<LedgerResult<Vec<_>>>()?;
        println!(
            "{}",
            pretty_table(
                &[
                    "Month",
                    "Gave #",
                    "Gave",
                    "Gave due",
                    "Received #",
                    "Received",
                    "Received due",
                    "Net",
                ],
                rows
            )
        );
    }
    Ok(())
}

fn by_counterparty_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let data = by_counterparty(conn)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let ccy = get_currency(conn)?;
        let rows = data
            .iter()
            .map(|c| vec![c.counterparty.clone(), fmt_money(&c.net, &ccy)])
            .collect();
        println!("{}", pretty_table(&["Counterparty", "Net (+ owes you)"], rows));
    }
    Ok(())
}
