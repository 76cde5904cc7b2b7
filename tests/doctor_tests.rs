// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{date, lend, setup};
use duebook::commands::{config, doctor, payments, transactions};
use duebook::models::TxStatus;
use duebook::utils::get_currency;
use rusqlite::params;
use rust_decimal_macros::dec;

#[test]
fn doctor_finds_and_fixes_stale_settlement() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "100", "2025-03-01");
    payments::add_payment(&conn, tx.id, dec!(40), date("2025-03-02"), None, false).unwrap();
    assert!(doctor::check(&conn).unwrap().is_empty());

    conn.execute(
        "UPDATE transactions SET remaining_due='100', status='PENDING' WHERE id=?1",
        params![tx.id],
    )
    .unwrap();
    let issues = doctor::check(&conn).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, "stale_settlement");

    assert_eq!(doctor::fix(&conn, &issues).unwrap(), 1);
    let fixed = transactions::get(&conn, tx.id).unwrap();
    assert_eq!(fixed.remaining_due, dec!(60));
    assert_eq!(fixed.status, TxStatus::PartiallySettled);
    assert!(doctor::check(&conn).unwrap().is_empty());
}

#[test]
fn config_normalises_currency_and_rejects_unknown_keys() {
    let conn = setup();
    assert_eq!(get_currency(&conn).unwrap(), "USD");
    assert_eq!(config::set(&conn, "currency", " eur ").unwrap(), "EUR");
    assert_eq!(get_currency(&conn).unwrap(), "EUR");
    assert!(config::set(&conn, "theme", "dark").is_err());
    assert!(config::set(&conn, "currency", "  ").is_err());
}
