// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{date, lend, setup};
use duebook::cli;
use duebook::commands::{payments, transactions};
use duebook::errors::LedgerError;
use duebook::models::TxStatus;
use rust_decimal_macros::dec;

#[test]
fn partial_then_full_settlement() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "100.00", "2025-03-01");

    let first = payments::add_payment(&conn, tx.id, dec!(40.50), date("2025-03-05"), None, false)
        .unwrap();
    assert_eq!(first.remaining, dec!(59.50));
    assert_eq!(first.status, TxStatus::PartiallySettled);
    assert_eq!(first.surplus, None);

    let second =
        payments::add_payment(&conn, tx.id, dec!(59.50), date("2025-03-09"), Some("cash"), false)
            .unwrap();
    assert_eq!(second.remaining, dec!(0));
    assert_eq!(second.status, TxStatus::Settled);

    let stored = transactions::get(&conn, tx.id).unwrap();
    assert_eq!(stored.remaining_due, dec!(0));
    assert_eq!(stored.status, TxStatus::Settled);
    assert_eq!(payments::list_payments(&conn, tx.id).unwrap().len(), 2);
}

#[test]
fn overpayment_is_refused_without_writing() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "50", "2025-03-01");
    payments::add_payment(&conn, tx.id, dec!(30), date("2025-03-02"), None, false).unwrap();

    let err = payments::add_payment(&conn, tx.id, dec!(25), date("2025-03-03"), None, false)
        .unwrap_err();
    match err {
        LedgerError::Surplus { surplus } => assert_eq!(surplus, dec!(5)),
        other => panic!("expected surplus, got {other:?}"),
    }
    let stored = transactions::get(&conn, tx.id).unwrap();
    assert_eq!(stored.remaining_due, dec!(20));
    assert_eq!(payments::list_payments(&conn, tx.id).unwrap().len(), 1);
}

#[test]
fn accepted_overpayment_reports_surplus_and_settles() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "50", "2025-03-01");
    let out = payments::add_payment(&conn, tx.id, dec!(65), date("2025-03-02"), None, true)
        .unwrap();
    assert_eq!(out.remaining, dec!(-15));
    assert_eq!(out.surplus, Some(dec!(15)));
    assert_eq!(out.status, TxStatus::Settled);

    assert!(matches!(
        payments::add_payment(&conn, tx.id, dec!(1), date("2025-03-03"), None, true),
        Err(LedgerError::AlreadySettled(_))
    ));
}

#[test]
fn payments_rejected_on_cancelled_or_invalid() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "50", "2025-03-01");
    assert!(matches!(
        payments::add_payment(&conn, tx.id, dec!(0), date("2025-03-02"), None, false),
        Err(LedgerError::Validation(_))
    ));
    transactions::cancel(&conn, tx.id).unwrap();
    assert!(matches!(
        payments::add_payment(&conn, tx.id, dec!(10), date("2025-03-02"), None, false),
        Err(LedgerError::Cancelled(_))
    ));
    assert!(matches!(
        payments::add_payment(&conn, 999, dec!(10), date("2025-03-02"), None, false),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn removing_a_payment_recomputes_status() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "80", "2025-03-01");
    let p = payments::add_payment(&conn, tx.id, dec!(80), date("2025-03-02"), None, false)
        .unwrap();
    assert_eq!(p.status, TxStatus::Settled);

    let s = payments::remove_payment(&conn, p.payment_id).unwrap();
    assert_eq!(s.remaining, dec!(80));
    assert_eq!(s.status, TxStatus::Pending);
    assert_eq!(
        transactions::get(&conn, tx.id).unwrap().status,
        TxStatus::Pending
    );
    assert!(matches!(
        payments::remove_payment(&conn, p.payment_id),
        Err(LedgerError::NotFound { .. })
    ));
}

#[test]
fn cli_pay_add_with_allow_surplus() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "10", "2025-03-01");
    let id = tx.id.to_string();
    let matches = cli::build_cli().get_matches_from([
        "duebook",
        "pay",
        "add",
        "--tx",
        &id,
        "--amount",
        "12.5",
        "--date",
        "2025-03-02",
        "--allow-surplus",
    ]);
    let Some(("pay", pay_m)) = matches.subcommand() else {
        panic!("no pay subcommand");
    };
    payments::handle(&conn, pay_m).unwrap();
    let stored = transactions::get(&conn, tx.id).unwrap();
    assert_eq!(stored.remaining_due, dec!(-2.5));
    assert_eq!(stored.status, TxStatus::Settled);
}

#[test]
fn payment_overflowing_the_decimal_range_is_rejected() {
    let conn = setup();
    let max = rust_decimal::Decimal::MAX;
    let tx = lend(&conn, "Asha", &max.to_string(), "2025-03-01");

    let first =
        payments::add_payment(&conn, tx.id, max - dec!(1), date("2025-03-02"), None, false)
            .unwrap();
    assert_eq!(first.remaining, dec!(1));

    assert!(matches!(
        payments::add_payment(&conn, tx.id, max, date("2025-03-03"), None, true),
        Err(LedgerError::Validation(_))
    ));
    assert_eq!(payments::list_payments(&conn, tx.id).unwrap().len(), 1);
    let stored = transactions::get(&conn, tx.id).unwrap();
    assert_eq!(stored.remaining_due, dec!(1));
    assert_eq!(stored.status, TxStatus::PartiallySettled);
}
