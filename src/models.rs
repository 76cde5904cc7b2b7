// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::errors::LedgerError;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Enums persisted as upper-case TEXT columns.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let norm = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
                match norm.as_str() {
                    $($text => Ok($name::$variant),)+
                    _ => Err(LedgerError::Validation(format!(
                        "Unknown {} '{}'",
                        stringify!($name),
                        s
                    ))),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let s = value.as_str()?;
                s.parse().map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    /// Money went out; the counterparty owes the user.
    Gave,
    /// Money came in; the user owes the counterparty.
    Received,
}
text_enum!(Direction { Gave => "GAVE", Received => "RECEIVED" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxKind {
    Loan,
    BillPayment,
    Recharge,
    Other,
}
text_enum!(TxKind {
    Loan => "LOAN",
    BillPayment => "BILL_PAYMENT",
    Recharge => "RECHARGE",
    Other => "OTHER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    PartiallySettled,
    Settled,
    Cancelled,
}
text_enum!(TxStatus {
    Pending => "PENDING",
    PartiallySettled => "PARTIALLY_SETTLED",
    Settled => "SETTLED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Completed,
    Cancelled,
}
text_enum!(TaskStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    Upcoming,
    Done,
    Snoozed,
}
text_enum!(ReminderStatus {
    Upcoming => "UPCOMING",
    Done => "DONE",
    Snoozed => "SNOOZED",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counterparty {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub counterparty_id: i64,
    #[serde(default)]
    pub counterparty: String,
    pub direction: Direction,
    pub kind: TxKind,
    pub base_amount: Decimal,
    pub remaining_due: Decimal,
    pub status: TxStatus,
    pub date: NaiveDate,
    pub note: Option<String>,
    pub cancelled: bool,
    pub deleted: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialPayment {
    pub id: i64,
    pub transaction_id: i64,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub note: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub status: TaskStatus,
    pub created_at: String,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    pub note: Option<String>,
    pub due_at: NaiveDateTime,
    pub status: ReminderStatus,
    pub transaction_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub at: String,
    pub entity: String,
    pub entity_id: i64,
    pub action: String,
    pub detail: Option<String>,
}
