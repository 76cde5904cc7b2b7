// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Settlement arithmetic. Everything here is pure and works on exact
//! decimals; persistence lives in `commands`.

use crate::errors::{LedgerError, LedgerResult};
use crate::models::{Direction, TxStatus};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

fn out_of_range() -> LedgerError {
    LedgerError::Validation("Amount out of range".into())
}

fn add(a: Decimal, b: Decimal) -> LedgerResult<Decimal> {
    a.checked_add(b).ok_or_else(out_of_range)
}

fn sub(a: Decimal, b: Decimal) -> LedgerResult<Decimal> {
    a.checked_sub(b).ok_or_else(out_of_range)
}

/// `base - Σ payments`. May go negative on overpayment.
pub fn remaining_due(base: Decimal, payments: &[Decimal]) -> LedgerResult<Decimal> {
    let paid = payments
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| add(acc, *p))?;
    sub(base, paid)
}

pub fn derive_status(base: Decimal, remaining: Decimal, cancelled: bool) -> TxStatus {
    if cancelled {
        TxStatus::Cancelled
    } else if remaining <= Decimal::ZERO {
        TxStatus::Settled
    } else if remaining == base {
        TxStatus::Pending
    } else {
        TxStatus::PartiallySettled
    }
}

pub fn surplus(remaining: Decimal) -> Option<Decimal> {
    (remaining < Decimal::ZERO).then(|| remaining.abs())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Settlement {
    pub remaining: Decimal,
    pub status: TxStatus,
    pub surplus: Option<Decimal>,
}

impl Settlement {
    pub fn compute(base: Decimal, payments: &[Decimal], cancelled: bool) -> LedgerResult<Self> {
        let remaining = remaining_due(base, payments)?;
        Ok(Settlement {
            remaining,
            status: derive_status(base, remaining, cancelled),
            surplus: surplus(remaining),
        })
    }
}

/// One transaction as seen by the aggregates. Soft-deleted rows are never
/// turned into lines.
#[derive(Debug, Clone)]
pub struct LedgerLine {
    pub counterparty: String,
    pub direction: Direction,
    pub base: Decimal,
    pub remaining: Decimal,
    pub date: NaiveDate,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    /// Σ remaining over GAVE lines.
    pub owed_to_me: Decimal,
    /// Σ remaining over RECEIVED lines.
    pub i_owe: Decimal,
}

impl Totals {
    pub fn net(&self) -> LedgerResult<Decimal> {
        sub(self.owed_to_me, self.i_owe)
    }
}

fn active(lines: &[LedgerLine]) -> impl Iterator<Item = &LedgerLine> {
    lines.iter().filter(|l| !l.cancelled)
}

pub fn totals_by_direction(lines: &[LedgerLine]) -> LedgerResult<Totals> {
    let mut t = Totals::default();
    for l in active(lines) {
        match l.direction {
            Direction::Gave => t.owed_to_me = add(t.owed_to_me, l.remaining)?,
            Direction::Received => t.i_owe = add(t.i_owe, l.remaining)?,
        }
    }
    Ok(t)
}

/// Positive: the counterparty owes the user. Negative: the user owes them.
pub fn net_balance(lines: &[LedgerLine]) -> LedgerResult<Decimal> {
    totals_by_direction(lines)?.net()
}

pub fn balances_by_counterparty(lines: &[LedgerLine]) -> LedgerResult<BTreeMap<String, Decimal>> {
    let mut out: BTreeMap<String, Decimal> = BTreeMap::new();
    for l in active(lines) {
        let e = out.entry(l.counterparty.clone()).or_insert(Decimal::ZERO);
        *e = match l.direction {
            Direction::Gave => add(*e, l.remaining)?,
            Direction::Received => sub(*e, l.remaining)?,
        };
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectionSummary {
    pub count: usize,
    pub base: Decimal,
    pub remaining: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthSummary {
    pub month: String,
    pub gave: DirectionSummary,
    pub received: DirectionSummary,
}

impl MonthSummary {
    pub fn net(&self) -> LedgerResult<Decimal> {
        sub(self.gave.remaining, self.received.remaining)
    }
}

pub fn month_summary(lines: &[LedgerLine], year: i32, month: u32) -> LedgerResult<MonthSummary> {
    let mut s = MonthSummary {
        month: format!("{:04}-{:02}", year, month),
        gave: DirectionSummary::default(),
        received: DirectionSummary::default(),
    };
    for l in active(lines).filter(|l| l.date.year() == year && l.date.month() == month) {
        let d = match l.direction {
            Direction::Gave => &mut s.gave,
            Direction::Received => &mut s.received,
        };
        d.count += 1;
        d.base = add(d.base, l.base)?;
        d.remaining = add(d.remaining, l.remaining)?;
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn line(cp: &str, dir: Direction, remaining: Decimal, date: &str, cancelled: bool) -> LedgerLine {
        LedgerLine {
            counterparty: cp.to_string(),
            direction: dir,
            base: remaining,
            remaining,
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            cancelled,
        }
    }

    #[test]
    fn status_boundaries() {
        assert_eq!(derive_status(dec!(100), dec!(100), false), TxStatus::Pending);
        assert_eq!(
            derive_status(dec!(100), dec!(0.01), false),
            TxStatus::PartiallySettled
        );
        assert_eq!(derive_status(dec!(100), dec!(0), false), TxStatus::Settled);
        assert_eq!(derive_status(dec!(100), dec!(-5), false), TxStatus::Settled);
        assert_eq!(derive_status(dec!(100), dec!(100), true), TxStatus::Cancelled);
    }

    #[test]
    fn decimal_payments_do_not_drift() {
        let pays = vec![dec!(0.1); 10];
        assert_eq!(remaining_due(dec!(1.00), &pays).unwrap(), Decimal::ZERO);
        assert_eq!(
            Settlement::compute(dec!(1.00), &pays, false).unwrap().status,
            TxStatus::Settled
        );
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let err = remaining_due(Decimal::MAX, &[Decimal::MAX, Decimal::MAX]).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(remaining_due(Decimal::MIN, &[Decimal::ONE]).is_err());

        let lines = vec![
            line("ana", Direction::Gave, Decimal::MAX, "2025-03-01", false),
            line("bo", Direction::Gave, Decimal::MAX, "2025-03-02", false),
        ];
        assert!(totals_by_direction(&lines).is_err());
        assert!(month_summary(&lines, 2025, 3).is_err());

        let same = vec![
            line("ana", Direction::Gave, Decimal::MAX, "2025-03-01", false),
            line("ana", Direction::Gave, Decimal::MAX, "2025-03-02", false),
        ];
        assert!(balances_by_counterparty(&same).is_err());

        let split = vec![
            line("ana", Direction::Gave, Decimal::MAX, "2025-03-01", false),
            line("ana", Direction::Received, Decimal::MAX, "2025-03-02", false),
        ];
        assert_eq!(net_balance(&split).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn surplus_only_when_negative() {
        assert_eq!(surplus(dec!(0)), None);
        assert_eq!(surplus(dec!(3)), None);
        assert_eq!(surplus(dec!(-2.50)), Some(dec!(2.50)));
    }

    #[test]
    fn month_summary_filters_month_and_cancelled() {
        let lines = vec![
            line("ana", Direction::Gave, dec!(10), "2025-03-01", false),
            line("ana", Direction::Gave, dec!(5), "2025-03-31", true),
            line("bo", Direction::Received, dec!(7), "2025-03-15", false),
            line("bo", Direction::Gave, dec!(99), "2025-04-01", false),
            line("bo", Direction::Gave, dec!(42), "2024-03-10", false),
        ];
        let s = month_summary(&lines, 2025, 3).unwrap();
        assert_eq!(s.month, "2025-03");
        assert_eq!(s.gave.count, 1);
        assert_eq!(s.gave.remaining, dec!(10));
        assert_eq!(s.received.remaining, dec!(7));
        assert_eq!(s.net().unwrap(), dec!(3));
    }

    #[test]
    fn balances_group_by_counterparty() {
        let lines = vec![
            line("ana", Direction::Gave, dec!(10), "2025-03-01", false),
            line("ana", Direction::Received, dec!(4), "2025-03-02", false),
            line("bo", Direction::Received, dec!(7), "2025-03-15", false),
            line("bo", Direction::Gave, dec!(100), "2025-03-16", true),
        ];
        let b = balances_by_counterparty(&lines).unwrap();
        assert_eq!(b["ana"], dec!(6));
        assert_eq!(b["bo"], dec!(-7));
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn payments(max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
        prop::collection::vec((0i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2)), 0..=max_len)
    }

    fn lines_strategy() -> impl Strategy<Value = Vec<LedgerLine>> {
        prop::collection::vec(
            (
                prop::sample::select(vec!["ana", "bo", "cy"]),
                any::<bool>(),
                amount(),
                1u32..=28,
                1u32..=12,
                any::<bool>(),
            )
                .prop_map(|(cp, gave, rem, day, month, cancelled)| LedgerLine {
                    counterparty: cp.to_string(),
                    direction: if gave { Direction::Gave } else { Direction::Received },
                    base: rem,
                    remaining: rem,
                    date: NaiveDate::from_ymd_opt(2025, month, day).unwrap(),
                    cancelled,
                }),
            0..30,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn prop_remaining_is_exact_and_order_independent(
            base in amount(),
            pays in payments(12),
        ) {
            let total: Decimal = pays.iter().copied().sum();
            prop_assert_eq!(remaining_due(base, &pays).unwrap(), base - total);
            let mut reversed = pays.clone();
            reversed.reverse();
            prop_assert_eq!(
                remaining_due(base, &reversed).unwrap(),
                remaining_due(base, &pays).unwrap()
            );
        }

        #[test]
        fn prop_status_follows_remaining(base in amount(), pays in payments(6)) {
            let s = Settlement::compute(base, &pays, false).unwrap();
            if s.remaining <= Decimal::ZERO {
                prop_assert_eq!(s.status, TxStatus::Settled);
            } else if s.remaining == base {
                prop_assert_eq!(s.status, TxStatus::Pending);
            } else {
                prop_assert_eq!(s.status, TxStatus::PartiallySettled);
            }
        }

        #[test]
        fn prop_overpayment_reports_surplus(base in amount(), extra in amount()) {
            let s = Settlement::compute(base, &[base + extra], false).unwrap();
            prop_assert_eq!(s.surplus, Some(extra));
            prop_assert_eq!(s.status, TxStatus::Settled);
        }

        #[test]
        fn prop_cancelled_lines_contribute_nothing(lines in lines_strategy()) {
            let mut with_cancelled = lines.clone();
            let kept: Vec<LedgerLine> = lines.into_iter().filter(|l| !l.cancelled).collect();
            with_cancelled.push(LedgerLine {
                counterparty: "ana".into(),
                direction: Direction::Gave,
                base: dec!(1000),
                remaining: dec!(1000),
                date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                cancelled: true,
            });
            prop_assert_eq!(
                totals_by_direction(&with_cancelled).unwrap(),
                totals_by_direction(&kept).unwrap()
            );
        }

        #[test]
        fn prop_net_balance_is_gave_minus_received(lines in lines_strategy()) {
            let gave: Decimal = lines.iter()
                .filter(|l| !l.cancelled && l.direction == Direction::Gave)
                .map(|l| l.remaining).sum();
            let received: Decimal = lines.iter()
                .filter(|l| !l.cancelled && l.direction == Direction::Received)
                .map(|l| l.remaining).sum();
            prop_assert_eq!(net_balance(&lines).unwrap(), gave - received);
            let mut shuffled = lines.clone();
            shuffled.reverse();
            prop_assert_eq!(net_balance(&shuffled).unwrap(), net_balance(&lines).unwrap());
        }

        #[test]
        fn prop_month_summary_stays_in_month(lines in lines_strategy(), month in 1u32..=12) {
            let s = month_summary(&lines, 2025, month).unwrap();
            let expected = lines.iter()
                .filter(|l| !l.cancelled && l.date.month() == month)
                .count();
            prop_assert_eq!(s.gave.count + s.received.count, expected);
        }
    }
}
