// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use common::{borrow, date, lend, setup};
use duebook::cli;
use duebook::commands::transactions::{self, NewTransaction, TxFilter};
use duebook::errors::LedgerError;
use duebook::models::{Direction, TxKind, TxStatus};
use rust_decimal_macros::dec;

#[test]
fn new_transaction_starts_pending_with_full_remaining() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "250.75", "2025-03-04");
    assert_eq!(tx.status, TxStatus::Pending);
    assert_eq!(tx.base_amount, dec!(250.75));
    assert_eq!(tx.remaining_due, dec!(250.75));
    assert_eq!(tx.counterparty, "Asha");
    assert!(!tx.cancelled && !tx.deleted);
}

#[test]
fn record_rejects_non_positive_amounts() {
    let conn = setup();
    for amount in [dec!(0), dec!(-5)] {
        let err = transactions::record(
            &conn,
            &NewTransaction {
                counterparty: "Asha".into(),
                direction: Direction::Gave,
                kind: TxKind::BillPayment,
                amount,
                date: date("2025-03-04"),
                note: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM transactions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn record_reuses_existing_counterparty() {
    let conn = setup();
    let a = lend(&conn, "Asha", "10", "2025-03-04");
    let b = borrow(&conn, " Asha ", "5", "2025-03-05");
    assert_eq!(a.counterparty_id, b.counterparty_id);
}

#[test]
fn cancelled_transaction_stays_retrievable() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "100", "2025-03-04");
    let cancelled = transactions::cancel(&conn, tx.id).unwrap();
    assert_eq!(cancelled.status, TxStatus::Cancelled);

    let again = transactions::get(&conn, tx.id).unwrap();
    assert!(again.cancelled);
    assert!(matches!(
        transactions::cancel(&conn, tx.id),
        Err(LedgerError::Cancelled(id)) if id == tx.id
    ));

    let listed = transactions::list(&conn, &TxFilter::default()).unwrap();
    assert!(listed.is_empty());
    let with_cancelled = transactions::list(
        &conn,
        &TxFilter {
            include_cancelled: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(with_cancelled.len(), 1);
}

#[test]
fn soft_delete_hides_and_restore_brings_back() {
    let conn = setup();
    let tx = lend(&conn, "Asha", "100", "2025-03-04");
    transactions::delete(&conn, tx.id).unwrap();
    assert!(matches!(
        transactions::get(&conn, tx.id),
        Err(LedgerError::NotFound { .. })
    ));
    assert!(transactions::list(&conn, &TxFilter::default()).unwrap().is_empty());

    let restored = transactions::restore(&conn, tx.id).unwrap();
    assert!(!restored.deleted);
    assert!(transactions::restore(&conn, tx.id).is_err());
}

#[test]
fn list_filters_by_month_and_direction() {
    let conn = setup();
    lend(&conn, "Asha", "10", "2025-02-28");
    lend(&conn, "Asha", "20", "2025-03-01");
    borrow(&conn, "Ben", "30", "2025-03-15");

    let march = transactions::list(
        &conn,
        &TxFilter {
            month: Some((2025, 3)),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(march.len(), 2);
    assert_eq!(march[0].date, date("2025-03-15"));

    let gave = transactions::list(
        &conn,
        &TxFilter {
            month: Some((2025, 3)),
            direction: Some(Direction::Gave),
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(gave.len(), 1);
    assert_eq!(gave[0].base_amount, dec!(20));
}

#[test]
fn list_limit_respected_from_cli() {
    let conn = setup();
    for d in ["2025-01-01", "2025-01-02", "2025-01-03"] {
        lend(&conn, "Asha", "10", d);
    }
    let matches = cli::build_cli().get_matches_from(["duebook", "tx", "list", "--limit", "2"]);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    let Some(("list", list_m)) = tx_m.subcommand() else {
        panic!("no list subcommand");
    };
    let filter = TxFilter::from_matches(list_m).unwrap();
    let rows = transactions::list(&conn, &filter).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].date, date("2025-01-03"));
}

#[test]
fn cli_add_parses_direction_and_kind() {
    let conn = setup();
    let matches = cli::build_cli().get_matches_from([
        "duebook",
        "tx",
        "add",
        "--counterparty",
        "Power Co",
        "--direction",
        "received",
        "--kind",
        "bill-payment",
        "--amount",
        " 42.10 ",
        "--date",
        "2025-04-02",
    ]);
    let Some(("tx", tx_m)) = matches.subcommand() else {
        panic!("no tx subcommand");
    };
    transactions::handle(&conn, tx_m).unwrap();

    let rows = transactions::list(&conn, &TxFilter::default()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].direction, Direction::Received);
    assert_eq!(rows[0].kind, TxKind::BillPayment);
    assert_eq!(rows[0].base_amount, dec!(42.10));
}

#[test]
fn mutations_roll_back_when_audit_write_fails() {
    use duebook::commands::{counterparties, payments, reminders, tasks};
    use duebook::models::TaskStatus;

    let conn = setup();
    let tx = lend(&conn, "Asha", "100", "2025-03-01");
    let gone = lend(&conn, "Asha", "5", "2025-03-02");
    transactions::delete(&conn, gone.id).unwrap();
    let task = tasks::add(&conn, "call Ben", None, None).unwrap();
    let at = duebook::utils::parse_datetime("2025-05-10 09:00").unwrap();
    let rem = reminders::add(&conn, "collect", None, at, Some(tx.id)).unwrap();

    conn.execute("DROP TABLE audit_log", []).unwrap();

    assert!(matches!(transactions::cancel(&conn, tx.id), Err(LedgerError::Db(_))));
    assert!(matches!(transactions::delete(&conn, tx.id), Err(LedgerError::Db(_))));
    assert!(matches!(transactions::restore(&conn, gone.id), Err(LedgerError::Db(_))));
    let stored = transactions::get(&conn, tx.id).unwrap();
    assert!(!stored.cancelled);
    assert_eq!(stored.status, TxStatus::Pending);
    assert!(transactions::get(&conn, gone.id).is_err());

    assert!(
        payments::add_payment(&conn, tx.id, dec!(10), date("2025-03-05"), None, false).is_err()
    );
    assert!(payments::list_payments(&conn, tx.id).unwrap().is_empty());
    assert_eq!(transactions::get(&conn, tx.id).unwrap().remaining_due, dec!(100));

    assert!(counterparties::add(&conn, "Ben", None, None).is_err());
    assert!(counterparties::find(&conn, "Ben").unwrap().is_none());
    assert!(counterparties::rename(&conn, "Asha", "Asha K").is_err());
    assert!(counterparties::find(&conn, "Asha").unwrap().is_some());

    assert!(tasks::complete(&conn, task.id).is_err());
    assert_eq!(tasks::get(&conn, task.id).unwrap().status, TaskStatus::Pending);

    assert!(reminders::snooze(&conn, rem.id, 30, at).is_err());
    assert_eq!(reminders::get(&conn, rem.id).unwrap().due_at, at);
}
