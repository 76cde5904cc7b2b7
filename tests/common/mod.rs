// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use chrono::NaiveDate;
use duebook::commands::transactions::{self, NewTransaction};
use duebook::models::{Direction, Transaction, TxKind};
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn setup() -> Connection {
    duebook::db::open_in_memory().unwrap()
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn lend(conn: &Connection, who: &str, amount: &str, on: &str) -> Transaction {
    record(conn, who, Direction::Gave, amount, on)
}

pub fn borrow(conn: &Connection, who: &str, amount: &str, on: &str) -> Transaction {
    record(conn, who, Direction::Received, amount, on)
}

pub fn record(conn: &Connection, who: &str, dir: Direction, amount: &str, on: &str) -> Transaction {
    transactions::record(
        conn,
        &NewTransaction {
            counterparty: who.to_string(),
            direction: dir,
            kind: TxKind::Loan,
            amount: amount.parse::<Decimal>().unwrap(),
            date: date(on),
            note: None,
        },
    )
    .unwrap()
}
